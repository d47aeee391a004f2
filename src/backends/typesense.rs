//! Typesense adapter.

use super::{HttpPlan, SearchBackend, SearchRequest};
use crate::documents::{CollectionSpec, FieldKind};
use crate::error::FihristError;
use crate::filters::{FilterClause, SortKey};
use crate::results::{Highlight, Hit, SearchPage};
use serde_json::{json, Value};

const API_KEY_HEADER: &str = "X-TYPESENSE-API-KEY";

pub struct TypesenseBackend {
    api_key: Option<String>,
}

impl TypesenseBackend {
    pub fn new(api_key: Option<String>) -> Self {
        Self { api_key }
    }

    fn authed(&self, plan: HttpPlan) -> HttpPlan {
        match &self.api_key {
            Some(key) => plan.with_header(API_KEY_HEADER, key.clone()),
            None => plan,
        }
    }
}

fn field_type(kind: FieldKind) -> &'static str {
    match kind {
        FieldKind::Text | FieldKind::Keyword => "string",
        FieldKind::TextArray | FieldKind::KeywordArray => "string[]",
        FieldKind::Int => "int32",
    }
}

fn sort_by(sort: SortKey) -> Option<&'static str> {
    match sort {
        SortKey::Relevance => None,
        SortKey::YearAsc => Some("year:asc"),
        SortKey::YearDesc => Some("year:desc"),
    }
}

/// Lowers neutral clauses to Typesense `filter_by` syntax. Values are
/// backtick-quoted so ids and tags with spaces survive.
fn filter_by(filters: &[FilterClause]) -> String {
    filters
        .iter()
        .map(|clause| match clause {
            FilterClause::Range { field, from, to } => format!("{field}:[{from}..{to}]"),
            FilterClause::AnyOf { field, values } => {
                let list = values
                    .iter()
                    .map(|value| format!("`{value}`"))
                    .collect::<Vec<_>>()
                    .join(",");
                format!("{field}:=[{list}]")
            }
        })
        .collect::<Vec<_>>()
        .join(" && ")
}

fn malformed(what: &str) -> FihristError {
    FihristError::Response(format!("typesense response missing {what}"))
}

impl SearchBackend for TypesenseBackend {
    fn name(&self) -> &'static str {
        "typesense"
    }

    fn search_plan(&self, collection: &str, request: &SearchRequest) -> HttpPlan {
        let q = if request.is_match_all() { "*" } else { &request.expression };

        let mut plan = HttpPlan::get(format!("/collections/{collection}/documents/search"))
            .with_query("q", q)
            .with_query("query_by", request.fields.field_list.clone())
            .with_query("query_by_weights", request.fields.weight_list.clone())
            .with_query("page", request.page.to_string())
            .with_query("per_page", request.per_page.to_string());

        if let Some(sort) = sort_by(request.sort) {
            plan = plan.with_query("sort_by", sort);
        }
        if !request.filters.is_empty() {
            plan = plan.with_query("filter_by", filter_by(&request.filters));
        }

        self.authed(plan)
    }

    fn parse_page(
        &self,
        body: &Value,
        requested_page: u32,
    ) -> Result<SearchPage<Value>, FihristError> {
        let total_found = body
            .get("found")
            .and_then(Value::as_u64)
            .ok_or_else(|| malformed("found"))?;
        let current_page = body
            .get("page")
            .and_then(Value::as_u64)
            .map(|page| page as u32)
            .unwrap_or(requested_page);

        let hits = body
            .get("hits")
            .and_then(Value::as_array)
            .ok_or_else(|| malformed("hits"))?
            .iter()
            .map(|hit| {
                let document = hit
                    .get("document")
                    .cloned()
                    .ok_or_else(|| malformed("hits[].document"))?;
                let highlights = hit
                    .get("highlights")
                    .and_then(Value::as_array)
                    .map(|entries| {
                        entries
                            .iter()
                            .filter_map(|entry| {
                                Some(Highlight {
                                    field: entry.get("field")?.as_str()?.to_string(),
                                    snippet: entry.get("snippet")?.as_str()?.to_string(),
                                })
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                Ok(Hit { document, highlights })
            })
            .collect::<Result<Vec<_>, FihristError>>()?;

        Ok(SearchPage { hits, total_found, current_page })
    }

    fn bootstrap_plans(&self, spec: &CollectionSpec) -> Vec<HttpPlan> {
        let fields: Vec<Value> = spec
            .fields
            .iter()
            // `id` is implicit in Typesense and may not be declared
            .filter(|field| field.name != "id")
            .map(|field| {
                json!({
                    "name": field.name,
                    "type": field_type(field.kind),
                    "facet": field.facet,
                    "optional": field.optional,
                })
            })
            .collect();

        vec![self.authed(
            HttpPlan::post("/collections").with_json(json!({
                "name": spec.name,
                "fields": fields,
            })),
        )]
    }

    fn drop_plan(&self, collection: &str) -> HttpPlan {
        self.authed(HttpPlan::delete(format!("/collections/{collection}")))
    }

    fn import_plan(&self, collection: &str, documents: &[Value]) -> HttpPlan {
        let lines = documents
            .iter()
            .map(Value::to_string)
            .collect::<Vec<_>>()
            .join("\n");

        self.authed(
            HttpPlan::post(format!("/collections/{collection}/documents/import"))
                .with_query("action", "upsert")
                .with_ndjson(lines),
        )
    }

    fn health_plan(&self) -> HttpPlan {
        self.authed(HttpPlan::get("/health"))
    }
}
