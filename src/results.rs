//! Neutral hit envelope and result-set merging.

use crate::error::FihristError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One highlighted fragment of a matched field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Highlight {
    pub field: String,
    pub snippet: String,
}

/// A single matched record, passed through from the service unmodified,
/// plus whatever highlight fragments the service returned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hit<T> {
    pub document: T,
    #[serde(default = "Vec::new", skip_serializing_if = "Vec::is_empty")]
    pub highlights: Vec<Highlight>,
}

/// The response envelope every backend adapter parses into: one page of
/// hits plus the full match count the service reported.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchPage<T> {
    pub hits: Vec<Hit<T>>,
    pub total_found: u64,
    pub current_page: u32,
}

impl SearchPage<serde_json::Value> {
    /// Deserializes the raw documents of a page into a concrete record
    /// type, keeping envelope and highlights intact.
    pub fn into_typed<T: DeserializeOwned>(self) -> Result<SearchPage<T>, FihristError> {
        let hits = self
            .hits
            .into_iter()
            .map(|hit| {
                let document = serde_json::from_value(hit.document)
                    .map_err(|e| FihristError::Response(format!("bad document in hit: {e}")))?;
                Ok(Hit {
                    document,
                    highlights: hit.highlights,
                })
            })
            .collect::<Result<Vec<_>, FihristError>>()?;

        Ok(SearchPage {
            hits,
            total_found: self.total_found,
            current_page: self.current_page,
        })
    }
}

/// Records that carry the service-assigned unique id.
pub trait Identified {
    fn id(&self) -> &str;
}

/// Puts the must-include hits first, then the general hits minus any
/// whose id already appeared. Order within each list is preserved; ids
/// unique within each input stay unique in the output.
pub fn merge_hits<T: Identified>(must_include: Vec<Hit<T>>, general: Vec<Hit<T>>) -> Vec<Hit<T>> {
    let pinned: HashSet<String> = must_include
        .iter()
        .map(|hit| hit.document.id().to_string())
        .collect();

    let mut merged = must_include;
    merged.extend(
        general
            .into_iter()
            .filter(|hit| !pinned.contains(hit.document.id())),
    );
    merged
}
