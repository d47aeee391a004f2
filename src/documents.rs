//! Author and book records as indexed in the search service.
//!
//! Field names are camelCase on the wire because that is how the
//! collections are populated by `fihrist-index`; documents round-trip
//! through the API unmodified.

use crate::query::{FieldTier, Script};
use crate::results::Identified;
use serde::{Deserialize, Serialize};

pub const AUTHORS_COLLECTION: &str = "authors";
pub const BOOKS_COLLECTION: &str = "books";

/// Search-field tiers for author queries, highest relevance first.
pub const AUTHOR_FIELD_TIERS: &[FieldTier] = &[
    FieldTier { weight: 3, fields: &["primaryArabicName", "primaryLatinName"] },
    FieldTier { weight: 2, fields: &["shuhra"] },
    FieldTier { weight: 1, fields: &["otherArabicNames", "otherLatinNames"] },
];

/// Search-field tiers for book-title queries.
pub const BOOK_FIELD_TIERS: &[FieldTier] = &[
    FieldTier { weight: 3, fields: &["primaryArabicName", "primaryLatinName"] },
    FieldTier { weight: 1, fields: &["otherArabicNames", "otherLatinNames"] },
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuthorRecord {
    pub id: String,
    /// Death year, Hijri calendar. Missing when the corpus metadata has
    /// no parseable date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_arabic_name: Option<String>,
    #[serde(default)]
    pub other_arabic_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_latin_name: Option<String>,
    #[serde(default)]
    pub other_latin_names: Vec<String>,
    /// The name the author is commonly known by, when the corpus
    /// records one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shuhra: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookRecord {
    /// OpenITI URI, `<authorUri>.<bookUri>`.
    pub id: String,
    pub author_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_arabic_name: Option<String>,
    #[serde(default)]
    pub other_arabic_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_latin_name: Option<String>,
    #[serde(default)]
    pub other_latin_names: Vec<String>,
    #[serde(default)]
    pub genre_tags: Vec<String>,
}

impl AuthorRecord {
    /// Name to display for a query in the given script, falling back to
    /// the other script when one side is missing.
    pub fn display_name(&self, script: Script) -> Option<&str> {
        let (preferred, fallback) = match script {
            Script::Arabic => (&self.primary_arabic_name, &self.primary_latin_name),
            Script::Latin => (&self.primary_latin_name, &self.primary_arabic_name),
        };
        preferred.as_deref().or(fallback.as_deref())
    }
}

impl BookRecord {
    pub fn display_name(&self, script: Script) -> Option<&str> {
        let (preferred, fallback) = match script {
            Script::Arabic => (&self.primary_arabic_name, &self.primary_latin_name),
            Script::Latin => (&self.primary_latin_name, &self.primary_arabic_name),
        };
        preferred.as_deref().or(fallback.as_deref())
    }
}

impl Identified for AuthorRecord {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Identified for BookRecord {
    fn id(&self) -> &str {
        &self.id
    }
}

/// How a field is indexed, in backend-neutral terms. `Keyword` kinds
/// are matched exactly (ids, tags); `Text` kinds are analyzed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    TextArray,
    Keyword,
    KeywordArray,
    Int,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub facet: bool,
    pub optional: bool,
    /// Analyzer hint for backends that support one (Elasticsearch);
    /// the others ignore it.
    pub analyzer: Option<&'static str>,
}

/// Everything the indexer needs to (re)create one collection, in terms
/// each backend adapter lowers to its own schema language.
#[derive(Debug, Clone, Copy)]
pub struct CollectionSpec {
    pub name: &'static str,
    pub fields: &'static [FieldSpec],
    pub search_tiers: &'static [FieldTier],
    pub filterable: &'static [&'static str],
    pub sortable: &'static [&'static str],
}

pub const AUTHORS_SPEC: CollectionSpec = CollectionSpec {
    name: AUTHORS_COLLECTION,
    fields: &[
        FieldSpec { name: "id", kind: FieldKind::Keyword, facet: false, optional: false, analyzer: None },
        FieldSpec { name: "year", kind: FieldKind::Int, facet: true, optional: true, analyzer: None },
        FieldSpec { name: "primaryArabicName", kind: FieldKind::Text, facet: false, optional: true, analyzer: Some("arabic") },
        FieldSpec { name: "otherArabicNames", kind: FieldKind::TextArray, facet: false, optional: true, analyzer: Some("arabic") },
        FieldSpec { name: "primaryLatinName", kind: FieldKind::Text, facet: false, optional: true, analyzer: None },
        FieldSpec { name: "otherLatinNames", kind: FieldKind::TextArray, facet: false, optional: true, analyzer: None },
        FieldSpec { name: "shuhra", kind: FieldKind::Text, facet: false, optional: true, analyzer: None },
    ],
    search_tiers: AUTHOR_FIELD_TIERS,
    filterable: &["year", "id"],
    sortable: &["year"],
};

pub const BOOKS_SPEC: CollectionSpec = CollectionSpec {
    name: BOOKS_COLLECTION,
    fields: &[
        FieldSpec { name: "id", kind: FieldKind::Keyword, facet: false, optional: false, analyzer: None },
        FieldSpec { name: "authorId", kind: FieldKind::Keyword, facet: true, optional: false, analyzer: None },
        FieldSpec { name: "primaryArabicName", kind: FieldKind::Text, facet: false, optional: true, analyzer: Some("arabic") },
        FieldSpec { name: "otherArabicNames", kind: FieldKind::TextArray, facet: false, optional: true, analyzer: Some("arabic") },
        FieldSpec { name: "primaryLatinName", kind: FieldKind::Text, facet: false, optional: true, analyzer: None },
        FieldSpec { name: "otherLatinNames", kind: FieldKind::TextArray, facet: false, optional: true, analyzer: None },
        FieldSpec { name: "genreTags", kind: FieldKind::KeywordArray, facet: true, optional: true, analyzer: None },
    ],
    search_tiers: BOOK_FIELD_TIERS,
    filterable: &["genreTags", "authorId", "id"],
    sortable: &[],
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::build_field_query;

    #[test]
    fn test_tier_tables_build_cleanly() {
        let authors = build_field_query(AUTHOR_FIELD_TIERS);
        assert_eq!(
            authors.field_list,
            "primaryArabicName,primaryLatinName,shuhra,otherArabicNames,otherLatinNames"
        );
        assert_eq!(authors.weight_list, "3,3,2,1,1");

        let books = build_field_query(BOOK_FIELD_TIERS);
        assert_eq!(
            books.field_list,
            "primaryArabicName,primaryLatinName,otherArabicNames,otherLatinNames"
        );
        assert_eq!(books.weight_list, "3,3,1,1");
    }

    #[test]
    fn test_record_deserializes_camel_case() {
        let record: AuthorRecord = serde_json::from_value(serde_json::json!({
            "id": "0256Bukhari",
            "year": 256,
            "primaryArabicName": "البخاري",
            "otherArabicNames": [],
            "primaryLatinName": "al-Bukhari",
            "otherLatinNames": ["Muhammad b. Ismail"],
            "shuhra": "Bukhari"
        }))
        .unwrap();
        assert_eq!(record.id, "0256Bukhari");
        assert_eq!(record.year, Some(256));
        assert_eq!(record.shuhra.as_deref(), Some("Bukhari"));
    }

    #[test]
    fn test_record_tolerates_missing_fields() {
        let record: AuthorRecord =
            serde_json::from_value(serde_json::json!({"id": "0001Anon"})).unwrap();
        assert_eq!(record.year, None);
        assert!(record.other_latin_names.is_empty());
    }

    #[test]
    fn test_display_name_prefers_query_script() {
        let record: AuthorRecord = serde_json::from_value(serde_json::json!({
            "id": "0256Bukhari",
            "primaryArabicName": "البخاري",
            "primaryLatinName": "al-Bukhari"
        }))
        .unwrap();
        assert_eq!(record.display_name(Script::Arabic), Some("البخاري"));
        assert_eq!(record.display_name(Script::Latin), Some("al-Bukhari"));
    }

    #[test]
    fn test_display_name_falls_back_across_scripts() {
        let record: AuthorRecord = serde_json::from_value(serde_json::json!({
            "id": "0310Tabari",
            "primaryArabicName": "الطبري"
        }))
        .unwrap();
        assert_eq!(record.display_name(Script::Latin), Some("الطبري"));
    }
}
