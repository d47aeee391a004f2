//! Meilisearch adapter.
//!
//! Meilisearch has no per-query field weights; ranking follows the
//! `searchableAttributes` order set at bootstrap, so the tier tables
//! are lowered into that order and the per-query body only names the
//! fields to search.

use super::{HttpPlan, SearchBackend, SearchRequest};
use crate::documents::CollectionSpec;
use crate::error::FihristError;
use crate::filters::{FilterClause, SortKey};
use crate::query::build_field_query;
use crate::results::{Hit, SearchPage};
use serde_json::{json, Value};

pub struct MeilisearchBackend {
    api_key: Option<String>,
}

impl MeilisearchBackend {
    pub fn new(api_key: Option<String>) -> Self {
        Self { api_key }
    }

    fn authed(&self, plan: HttpPlan) -> HttpPlan {
        match &self.api_key {
            Some(key) => plan.with_header("Authorization", format!("Bearer {key}")),
            None => plan,
        }
    }
}

fn sort_value(sort: SortKey) -> Option<Value> {
    match sort {
        SortKey::Relevance => None,
        SortKey::YearAsc => Some(json!(["year:asc"])),
        SortKey::YearDesc => Some(json!(["year:desc"])),
    }
}

/// Lowers neutral clauses to a Meilisearch filter string. Values are
/// JSON-quoted, which matches Meilisearch's string escaping.
fn filter_string(filters: &[FilterClause]) -> String {
    filters
        .iter()
        .map(|clause| match clause {
            FilterClause::Range { field, from, to } => format!("{field} {from} TO {to}"),
            FilterClause::AnyOf { field, values } => {
                let list = values
                    .iter()
                    .map(|value| Value::String(value.clone()).to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{field} IN [{list}]")
            }
        })
        .collect::<Vec<_>>()
        .join(" AND ")
}

fn malformed(what: &str) -> FihristError {
    FihristError::Response(format!("meilisearch response missing {what}"))
}

impl SearchBackend for MeilisearchBackend {
    fn name(&self) -> &'static str {
        "meilisearch"
    }

    fn search_plan(&self, collection: &str, request: &SearchRequest) -> HttpPlan {
        // Empty q is Meilisearch's match-all (placeholder search).
        let q = if request.is_match_all() { "" } else { &request.expression };

        let mut body = json!({
            "q": q,
            "attributesToSearchOn": request.fields.fields().collect::<Vec<_>>(),
            "page": request.page,
            "hitsPerPage": request.per_page,
        });

        if let Some(sort) = sort_value(request.sort) {
            body["sort"] = sort;
        }
        if !request.filters.is_empty() {
            body["filter"] = Value::String(filter_string(&request.filters));
        }

        self.authed(HttpPlan::post(format!("/indexes/{collection}/search")).with_json(body))
    }

    fn parse_page(
        &self,
        body: &Value,
        requested_page: u32,
    ) -> Result<SearchPage<Value>, FihristError> {
        let total_found = body
            .get("totalHits")
            .and_then(Value::as_u64)
            .ok_or_else(|| malformed("totalHits"))?;
        let current_page = body
            .get("page")
            .and_then(Value::as_u64)
            .map(|page| page as u32)
            .unwrap_or(requested_page);

        // Hits are bare documents; highlighting is not requested.
        let hits = body
            .get("hits")
            .and_then(Value::as_array)
            .ok_or_else(|| malformed("hits"))?
            .iter()
            .map(|document| Hit {
                document: document.clone(),
                highlights: Vec::new(),
            })
            .collect();

        Ok(SearchPage { hits, total_found, current_page })
    }

    fn bootstrap_plans(&self, spec: &CollectionSpec) -> Vec<HttpPlan> {
        let searchable: Vec<&str> = build_field_query(spec.search_tiers).fields().collect();

        vec![
            self.authed(HttpPlan::post("/indexes").with_json(json!({
                "uid": spec.name,
                "primaryKey": "id",
            }))),
            self.authed(
                HttpPlan::patch(format!("/indexes/{}/settings", spec.name)).with_json(json!({
                    "searchableAttributes": searchable,
                    "filterableAttributes": spec.filterable,
                    "sortableAttributes": spec.sortable,
                })),
            ),
        ]
    }

    fn drop_plan(&self, collection: &str) -> HttpPlan {
        self.authed(HttpPlan::delete(format!("/indexes/{collection}")))
    }

    fn import_plan(&self, collection: &str, documents: &[Value]) -> HttpPlan {
        self.authed(
            HttpPlan::post(format!("/indexes/{collection}/documents"))
                .with_json(Value::Array(documents.to_vec())),
        )
    }

    fn health_plan(&self) -> HttpPlan {
        self.authed(HttpPlan::get("/health"))
    }
}
