//! Bilingual query construction: script detection, article-stripped
//! variants, and weighted multi-field query lists.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Romanized Arabic definite article, in any casing ("al-", "Al-", "AL-").
static ARTICLE: Lazy<Regex> = Lazy::new(|| Regex::new("(?i)al-").unwrap());

/// Separator the search services accept between alternative phrasings
/// of one query.
const VARIANT_SEPARATOR: &str = " || ";

/// Script class of a query, decided by the Arabic Unicode block
/// U+0600..=U+06FF. Anything without an Arabic character counts as
/// Latin, including digits and punctuation-only input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Script {
    Arabic,
    Latin,
}

pub fn classify_script(text: &str) -> Script {
    if text.chars().any(|c| ('\u{0600}'..='\u{06FF}').contains(&c)) {
        Script::Arabic
    } else {
        Script::Latin
    }
}

/// A catalog query after normalization: the text as typed plus the
/// article-stripped variant, when stripping changes anything.
///
/// Romanized Arabic names are written inconsistently with and without
/// the definite article ("al-Bukhari" / "Bukhari"), so Latin-script
/// queries search both forms. Arabic-script input never contains the
/// romanized marker and passes through with a single variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    raw: String,
    script: Script,
    variants: Vec<String>,
}

impl SearchQuery {
    pub fn normalize(raw: &str) -> Self {
        let script = classify_script(raw);
        let mut variants = vec![raw.to_string()];

        if ARTICLE.is_match(raw) {
            let stripped = ARTICLE.replace_all(raw, "");
            // A freestanding "al-" token leaves doubled spaces behind;
            // the services would tokenize those into empty terms. Input
            // that is nothing but article tokens strips to an empty
            // string, which would turn the expression into a trailing
            // empty disjunct.
            let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
            if !collapsed.is_empty() && collapsed != raw {
                variants.push(collapsed);
            }
        }

        Self {
            raw: raw.to_string(),
            script,
            variants,
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn script(&self) -> Script {
        self.script
    }

    pub fn variants(&self) -> &[String] {
        &self.variants
    }

    /// All variants joined into one disjunctive search expression.
    pub fn expression(&self) -> String {
        self.variants.join(VARIANT_SEPARATOR)
    }

    /// An empty query means "browse everything"; adapters map it to
    /// their service's match-all form.
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }
}

/// One relevance tier: a weight and the document fields it covers.
/// Tiers are declared highest weight first per collection.
#[derive(Debug, Clone, Copy)]
pub struct FieldTier {
    pub weight: u32,
    pub fields: &'static [&'static str],
}

/// Parallel comma-separated field and weight lists, the form the
/// search services take their per-query weighting in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightedFields {
    pub field_list: String,
    pub weight_list: String,
    pairs: Vec<(&'static str, u32)>,
}

impl WeightedFields {
    /// Field names in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.pairs.iter().map(|(field, _)| *field)
    }

    /// (field, weight) pairs in declaration order, for backends that
    /// take per-field weight markup instead of parallel lists.
    pub fn pairs(&self) -> &[(&'static str, u32)] {
        &self.pairs
    }
}

/// Flattens relevance tiers into aligned field/weight lists.
///
/// Panics on a duplicate field or a zero weight: both are bugs in the
/// caller's tier tables, not runtime conditions.
pub fn build_field_query(tiers: &[FieldTier]) -> WeightedFields {
    let mut seen = HashSet::new();
    let mut pairs = Vec::new();

    for tier in tiers {
        assert!(tier.weight > 0, "field tier weight must be positive");
        for &field in tier.fields {
            assert!(seen.insert(field), "field {field:?} listed in more than one tier");
            pairs.push((field, tier.weight));
        }
    }

    let field_list = pairs.iter().map(|(f, _)| *f).collect::<Vec<_>>().join(",");
    let weight_list = pairs
        .iter()
        .map(|(_, w)| w.to_string())
        .collect::<Vec<_>>()
        .join(",");

    WeightedFields {
        field_list,
        weight_list,
        pairs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_classification() {
        assert_eq!(classify_script("البخاري"), Script::Arabic);
        assert_eq!(classify_script("Bukhari"), Script::Latin);
        assert_eq!(classify_script("ibn سينا"), Script::Arabic);
        assert_eq!(classify_script(""), Script::Latin);
        assert_eq!(classify_script("123 --"), Script::Latin);
    }

    #[test]
    fn test_normalize_strips_article() {
        let query = SearchQuery::normalize("Al-Bukhari al-Jami");
        assert_eq!(query.variants(), &["Al-Bukhari al-Jami", "Bukhari Jami"]);
        assert_eq!(query.expression(), "Al-Bukhari al-Jami || Bukhari Jami");
        assert_eq!(query.script(), Script::Latin);
    }

    #[test]
    fn test_normalize_without_article() {
        let query = SearchQuery::normalize("Bukhari");
        assert_eq!(query.variants(), &["Bukhari"]);
        assert_eq!(query.expression(), "Bukhari");
    }

    #[test]
    fn test_normalize_arabic_passthrough() {
        let query = SearchQuery::normalize("الجامع الصحيح");
        assert_eq!(query.script(), Script::Arabic);
        assert_eq!(query.variants(), &["الجامع الصحيح"]);
    }

    #[test]
    fn test_normalize_is_deterministic() {
        let a = SearchQuery::normalize("al-Ghazali");
        let b = SearchQuery::normalize("al-Ghazali");
        assert_eq!(a, b);
        assert_eq!(a.variants(), &["al-Ghazali", "Ghazali"]);
    }

    #[test]
    fn test_normalize_caps_at_two_variants() {
        let query = SearchQuery::normalize("al-Jami al-Sahih al-Musnad");
        assert_eq!(query.variants().len(), 2);
        assert_eq!(query.variants()[1], "Jami Sahih Musnad");
    }

    #[test]
    fn test_normalize_mixed_case_article() {
        let query = SearchQuery::normalize("AL-Tabari");
        assert_eq!(query.variants(), &["AL-Tabari", "Tabari"]);
    }

    #[test]
    fn test_normalize_freestanding_article_collapses_spaces() {
        let query = SearchQuery::normalize("kitab al- tarikh");
        assert_eq!(query.variants()[1], "kitab tarikh");
    }

    #[test]
    fn test_normalize_article_only_input_stays_single_variant() {
        let query = SearchQuery::normalize("al-");
        assert_eq!(query.variants(), &["al-"]);
        assert_eq!(query.expression(), "al-");

        let query = SearchQuery::normalize("al- Al-");
        assert_eq!(query.variants(), &["al- Al-"]);
    }

    #[test]
    fn test_normalize_empty_query() {
        let query = SearchQuery::normalize("");
        assert!(query.is_empty());
        assert_eq!(query.variants(), &[""]);
        assert_eq!(query.expression(), "");
    }

    #[test]
    fn test_normalize_preserves_raw_text() {
        let query = SearchQuery::normalize("  al-Shafi'i  ");
        assert_eq!(query.raw(), "  al-Shafi'i  ");
        assert_eq!(query.variants()[0], "  al-Shafi'i  ");
        assert_eq!(query.variants()[1], "Shafi'i");
    }

    #[test]
    fn test_build_field_query_aligned_lists() {
        let tiers = [
            FieldTier { weight: 3, fields: &["primaryArabicName", "primaryLatinName"] },
            FieldTier { weight: 2, fields: &["shuhra"] },
            FieldTier { weight: 1, fields: &["otherArabicNames", "otherLatinNames"] },
        ];
        let built = build_field_query(&tiers);
        assert_eq!(
            built.field_list,
            "primaryArabicName,primaryLatinName,shuhra,otherArabicNames,otherLatinNames"
        );
        assert_eq!(built.weight_list, "3,3,2,1,1");
        assert_eq!(
            built.field_list.split(',').count(),
            built.weight_list.split(',').count()
        );
    }

    #[test]
    fn test_build_field_query_preserves_order() {
        let tiers = [
            FieldTier { weight: 5, fields: &["b", "a"] },
            FieldTier { weight: 1, fields: &["c"] },
        ];
        let built = build_field_query(&tiers);
        assert_eq!(built.fields().collect::<Vec<_>>(), vec!["b", "a", "c"]);
        assert_eq!(built.pairs(), &[("b", 5), ("a", 5), ("c", 1)]);
    }

    #[test]
    #[should_panic(expected = "listed in more than one tier")]
    fn test_build_field_query_rejects_duplicate_field() {
        let tiers = [
            FieldTier { weight: 3, fields: &["name"] },
            FieldTier { weight: 1, fields: &["name"] },
        ];
        build_field_query(&tiers);
    }

    #[test]
    #[should_panic(expected = "weight must be positive")]
    fn test_build_field_query_rejects_zero_weight() {
        let tiers = [FieldTier { weight: 0, fields: &["name"] }];
        build_field_query(&tiers);
    }
}
