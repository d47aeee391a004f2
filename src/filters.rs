//! Filter and sort options for the catalog endpoints.

use crate::error::FihristError;
use chrono::Datelike;
use serde::{Deserialize, Serialize};

/// Inclusive death-year range (Hijri), parsed from the `"from-to"`
/// URL form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    pub from: i32,
    pub to: i32,
}

impl YearRange {
    pub fn parse(raw: &str) -> Result<Self, FihristError> {
        let invalid = || {
            FihristError::InvalidParameter(format!(
                "year range must look like \"700-800\", got {raw:?}"
            ))
        };

        let (from, to) = raw.split_once('-').ok_or_else(invalid)?;
        let from: i32 = from.trim().parse().map_err(|_| invalid())?;
        let to: i32 = to.trim().parse().map_err(|_| invalid())?;

        if from > to {
            return Err(FihristError::InvalidParameter(format!(
                "year range is inverted: {from} > {to}"
            )));
        }

        Ok(Self { from, to })
    }
}

/// Approximate current Hijri year, the ceiling for year filters.
pub fn current_hijri_year() -> i32 {
    let gregorian = chrono::Utc::now().year();
    (((gregorian - 622) as f64) * (33.0 / 32.0)).ceil() as i32
}

/// Sort orders the catalog exposes. Books support relevance only;
/// authors also sort by death year.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortKey {
    #[default]
    Relevance,
    YearAsc,
    YearDesc,
}

impl SortKey {
    pub fn parse(raw: &str) -> Result<Self, FihristError> {
        match raw {
            "relevance" => Ok(SortKey::Relevance),
            "year-asc" => Ok(SortKey::YearAsc),
            "year-desc" => Ok(SortKey::YearDesc),
            other => Err(FihristError::InvalidParameter(format!(
                "unknown sort key: {other:?}"
            ))),
        }
    }
}

/// A filter constraint in backend-neutral terms; each adapter lowers
/// these to its service's filter syntax.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterClause {
    /// Numeric field within an inclusive range.
    Range {
        field: &'static str,
        from: i64,
        to: i64,
    },
    /// Field equals any of the given values.
    AnyOf {
        field: &'static str,
        values: Vec<String>,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthorFilters {
    pub year: Option<YearRange>,
}

impl AuthorFilters {
    pub fn clauses(&self) -> Vec<FilterClause> {
        let mut clauses = Vec::new();
        if let Some(range) = self.year {
            clauses.push(FilterClause::Range {
                field: "year",
                from: range.from as i64,
                to: range.to as i64,
            });
        }
        clauses
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookFilters {
    pub genres: Vec<String>,
    pub authors: Vec<String>,
}

impl BookFilters {
    pub fn clauses(&self) -> Vec<FilterClause> {
        let mut clauses = Vec::new();
        if !self.genres.is_empty() {
            clauses.push(FilterClause::AnyOf {
                field: "genreTags",
                values: self.genres.clone(),
            });
        }
        if !self.authors.is_empty() {
            clauses.push(FilterClause::AnyOf {
                field: "authorId",
                values: self.authors.clone(),
            });
        }
        clauses
    }
}

/// Splits a comma-separated multi-value URL param, dropping empty
/// entries.
pub fn parse_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}
