//! Elasticsearch adapter.

use super::{HttpPlan, SearchBackend, SearchRequest};
use crate::documents::{CollectionSpec, FieldKind};
use crate::error::FihristError;
use crate::filters::{FilterClause, SortKey};
use crate::results::{Highlight, Hit, SearchPage};
use serde_json::{json, Map, Value};

pub struct ElasticBackend {
    api_key: Option<String>,
}

impl ElasticBackend {
    pub fn new(api_key: Option<String>) -> Self {
        Self { api_key }
    }

    fn authed(&self, plan: HttpPlan) -> HttpPlan {
        match &self.api_key {
            Some(key) => plan.with_header("Authorization", format!("ApiKey {key}")),
            None => plan,
        }
    }
}

/// `field^weight` strings for the query clause.
fn boosted_fields(request: &SearchRequest) -> Vec<String> {
    request
        .fields
        .pairs()
        .iter()
        .map(|(field, weight)| format!("{field}^{weight}"))
        .collect()
}

fn filter_clauses(filters: &[FilterClause]) -> Vec<Value> {
    filters
        .iter()
        .map(|clause| match clause {
            FilterClause::Range { field, from, to } => json!({
                "range": { (*field): { "gte": from, "lte": to } }
            }),
            FilterClause::AnyOf { field, values } => json!({
                "terms": { (*field): values }
            }),
        })
        .collect()
}

fn sort_value(sort: SortKey) -> Option<Value> {
    match sort {
        SortKey::Relevance => None,
        SortKey::YearAsc => Some(json!([{ "year": { "order": "asc" } }])),
        SortKey::YearDesc => Some(json!([{ "year": { "order": "desc" } }])),
    }
}

fn mapping_for(kind: FieldKind, analyzer: Option<&str>) -> Value {
    let mut mapping = Map::new();
    let type_name = match kind {
        // Arrays are implicit in Elasticsearch mappings
        FieldKind::Text | FieldKind::TextArray => "text",
        FieldKind::Keyword | FieldKind::KeywordArray => "keyword",
        FieldKind::Int => "integer",
    };
    mapping.insert("type".to_string(), json!(type_name));
    if let Some(analyzer) = analyzer {
        if matches!(kind, FieldKind::Text | FieldKind::TextArray) {
            mapping.insert("analyzer".to_string(), json!(analyzer));
        }
    }
    Value::Object(mapping)
}

fn malformed(what: &str) -> FihristError {
    FihristError::Response(format!("elasticsearch response missing {what}"))
}

impl SearchBackend for ElasticBackend {
    fn name(&self) -> &'static str {
        "elasticsearch"
    }

    fn search_plan(&self, collection: &str, request: &SearchRequest) -> HttpPlan {
        // simple_query_string treats ` || ` as a disjunction and never
        // rejects user input as a syntax error.
        let must = if request.is_match_all() {
            json!({ "match_all": {} })
        } else {
            json!({
                "simple_query_string": {
                    "query": request.expression,
                    "fields": boosted_fields(request),
                }
            })
        };

        let mut body = json!({
            "query": {
                "bool": {
                    "must": [must],
                    "filter": filter_clauses(&request.filters),
                }
            },
            "from": request.page.saturating_sub(1) * request.per_page,
            "size": request.per_page,
        });

        if let Some(sort) = sort_value(request.sort) {
            body["sort"] = sort;
        }

        self.authed(HttpPlan::post(format!("/{collection}/_search")).with_json(body))
    }

    fn parse_page(
        &self,
        body: &Value,
        requested_page: u32,
    ) -> Result<SearchPage<Value>, FihristError> {
        let outer = body.get("hits").ok_or_else(|| malformed("hits"))?;
        let total_found = outer
            .pointer("/total/value")
            .and_then(Value::as_u64)
            .ok_or_else(|| malformed("hits.total.value"))?;

        let hits = outer
            .get("hits")
            .and_then(Value::as_array)
            .ok_or_else(|| malformed("hits.hits"))?
            .iter()
            .map(|hit| {
                let document = hit
                    .get("_source")
                    .cloned()
                    .ok_or_else(|| malformed("hits.hits[]._source"))?;
                let highlights = hit
                    .get("highlight")
                    .and_then(Value::as_object)
                    .map(|fields| {
                        fields
                            .iter()
                            .filter_map(|(field, snippets)| {
                                Some(Highlight {
                                    field: field.clone(),
                                    snippet: snippets.get(0)?.as_str()?.to_string(),
                                })
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                Ok(Hit { document, highlights })
            })
            .collect::<Result<Vec<_>, FihristError>>()?;

        // The response does not echo pagination; trust the request.
        Ok(SearchPage { hits, total_found, current_page: requested_page })
    }

    fn bootstrap_plans(&self, spec: &CollectionSpec) -> Vec<HttpPlan> {
        let mut properties = Map::new();
        for field in spec.fields {
            properties.insert(field.name.to_string(), mapping_for(field.kind, field.analyzer));
        }

        vec![self.authed(HttpPlan::put(format!("/{}", spec.name)).with_json(json!({
            "mappings": { "properties": properties }
        })))]
    }

    fn drop_plan(&self, collection: &str) -> HttpPlan {
        self.authed(HttpPlan::delete(format!("/{collection}")))
    }

    fn import_plan(&self, collection: &str, documents: &[Value]) -> HttpPlan {
        let mut lines = String::new();
        for document in documents {
            let action = match document.get("id").and_then(Value::as_str) {
                Some(id) => json!({ "index": { "_index": collection, "_id": id } }),
                None => json!({ "index": { "_index": collection } }),
            };
            lines.push_str(&action.to_string());
            lines.push('\n');
            lines.push_str(&document.to_string());
            lines.push('\n');
        }

        self.authed(HttpPlan::post("/_bulk").with_ndjson(lines))
    }

    fn health_plan(&self) -> HttpPlan {
        self.authed(HttpPlan::get("/_cluster/health"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::PlanBody;
    use crate::documents::{AUTHORS_SPEC, AUTHOR_FIELD_TIERS, BOOK_FIELD_TIERS};
    use crate::query::SearchQuery;

    fn backend() -> ElasticBackend {
        ElasticBackend::new(Some("test-key".to_string()))
    }

    fn json_body(plan: &HttpPlan) -> &Value {
        match &plan.body {
            Some(PlanBody::Json(body)) => body,
            other => panic!("expected JSON body, got {other:?}"),
        }
    }

    #[test]
    fn test_search_plan_boosted_fields() {
        let query = SearchQuery::normalize("al-Bukhari");
        let request = SearchRequest::new(&query, AUTHOR_FIELD_TIERS, 3, 20);
        let plan = backend().search_plan("authors", &request);

        assert_eq!(plan.path, "/authors/_search");
        let body = json_body(&plan);
        assert_eq!(body["from"], 40);
        assert_eq!(body["size"], 20);

        let sqs = &body["query"]["bool"]["must"][0]["simple_query_string"];
        assert_eq!(sqs["query"], "al-Bukhari || Bukhari");
        assert_eq!(
            sqs["fields"],
            json!([
                "primaryArabicName^3",
                "primaryLatinName^3",
                "shuhra^2",
                "otherArabicNames^1",
                "otherLatinNames^1"
            ])
        );
    }

    #[test]
    fn test_search_plan_match_all() {
        let request = SearchRequest::match_all(BOOK_FIELD_TIERS, 10);
        let plan = backend().search_plan("books", &request);
        let body = json_body(&plan);
        assert_eq!(body["query"]["bool"]["must"][0], json!({ "match_all": {} }));
        assert_eq!(body["from"], 0);
    }

    #[test]
    fn test_search_plan_filters_and_sort() {
        let query = SearchQuery::normalize("");
        let request = SearchRequest::new(&query, AUTHOR_FIELD_TIERS, 1, 20)
            .with_sort(SortKey::YearAsc)
            .with_filters(vec![
                FilterClause::Range { field: "year", from: 700, to: 800 },
                FilterClause::AnyOf {
                    field: "genreTags",
                    values: vec!["hadith".to_string()],
                },
            ]);
        let plan = backend().search_plan("authors", &request);

        let body = json_body(&plan);
        let filter = body["query"]["bool"]["filter"].as_array().unwrap();
        assert_eq!(filter[0], json!({ "range": { "year": { "gte": 700, "lte": 800 } } }));
        assert_eq!(filter[1], json!({ "terms": { "genreTags": ["hadith"] } }));
        assert_eq!(body["sort"], json!([{ "year": { "order": "asc" } }]));
    }

    #[test]
    fn test_parse_page_fixture() {
        let body = json!({
            "took": 2,
            "hits": {
                "total": { "value": 7, "relation": "eq" },
                "hits": [
                    {
                        "_id": "0256Bukhari",
                        "_source": { "id": "0256Bukhari", "primaryLatinName": "al-Bukhari" },
                        "highlight": { "primaryLatinName": ["al-<em>Bukhari</em>"] }
                    }
                ]
            }
        });

        let page = backend().parse_page(&body, 2).unwrap();
        assert_eq!(page.total_found, 7);
        assert_eq!(page.current_page, 2);
        assert_eq!(page.hits[0].document["id"], "0256Bukhari");
        assert_eq!(page.hits[0].highlights[0].snippet, "al-<em>Bukhari</em>");
    }

    #[test]
    fn test_parse_page_rejects_missing_total() {
        let body = json!({"hits": {"hits": []}});
        assert!(backend().parse_page(&body, 1).is_err());
    }

    #[test]
    fn test_bootstrap_mapping_types() {
        let plans = backend().bootstrap_plans(&AUTHORS_SPEC);
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].method, reqwest::Method::PUT);

        let props = &json_body(&plans[0])["mappings"]["properties"];
        assert_eq!(props["id"]["type"], "keyword");
        assert_eq!(props["year"]["type"], "integer");
        assert_eq!(props["primaryArabicName"]["type"], "text");
        assert_eq!(props["primaryArabicName"]["analyzer"], "arabic");
        assert!(props["primaryLatinName"].get("analyzer").is_none());
    }

    #[test]
    fn test_import_plan_bulk_pairs() {
        let docs = vec![json!({"id": "a", "year": 1})];
        let plan = backend().import_plan("authors", &docs);

        assert_eq!(plan.path, "/_bulk");
        match &plan.body {
            Some(PlanBody::Ndjson(lines)) => {
                let rows: Vec<&str> = lines.trim_end().split('\n').collect();
                assert_eq!(rows.len(), 2);
                assert_eq!(
                    rows[0],
                    "{\"index\":{\"_id\":\"a\",\"_index\":\"authors\"}}"
                );
                assert!(lines.ends_with('\n'));
            }
            other => panic!("expected NDJSON body, got {other:?}"),
        }
    }
}
