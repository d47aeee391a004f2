//! Neutral search-service contract and the per-backend adapters.
//!
//! Adapters translate one neutral request into each service's parameter
//! syntax. They build HTTP plans and parse response envelopes; the
//! client owns all actual I/O, so every adapter is testable without a
//! network.

pub mod elastic;
pub mod meilisearch;
pub mod typesense;

pub use elastic::ElasticBackend;
pub use meilisearch::MeilisearchBackend;
pub use typesense::TypesenseBackend;

use crate::documents::CollectionSpec;
use crate::error::FihristError;
use crate::filters::{FilterClause, SortKey};
use crate::query::{build_field_query, FieldTier, SearchQuery, WeightedFields};
use crate::results::SearchPage;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Which hosted search service a deployment talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Typesense,
    Meilisearch,
    Elasticsearch,
}

impl BackendKind {
    pub fn parse(raw: &str) -> Result<Self, FihristError> {
        match raw.to_ascii_lowercase().as_str() {
            "typesense" => Ok(BackendKind::Typesense),
            "meilisearch" => Ok(BackendKind::Meilisearch),
            "elasticsearch" => Ok(BackendKind::Elasticsearch),
            other => Err(FihristError::Config(format!(
                "unknown search backend {other:?}, expected typesense, meilisearch or elasticsearch"
            ))),
        }
    }

    pub fn adapter(self, api_key: Option<String>) -> Arc<dyn SearchBackend> {
        match self {
            BackendKind::Typesense => Arc::new(TypesenseBackend::new(api_key)),
            BackendKind::Meilisearch => Arc::new(MeilisearchBackend::new(api_key)),
            BackendKind::Elasticsearch => Arc::new(ElasticBackend::new(api_key)),
        }
    }
}

/// One paginated search call against a collection, in neutral terms.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub expression: String,
    pub fields: WeightedFields,
    pub page: u32,
    pub per_page: u32,
    pub sort: SortKey,
    pub filters: Vec<FilterClause>,
}

impl SearchRequest {
    pub fn new(query: &SearchQuery, tiers: &[FieldTier], page: u32, per_page: u32) -> Self {
        Self {
            expression: query.expression(),
            fields: build_field_query(tiers),
            page,
            per_page,
            sort: SortKey::Relevance,
            filters: Vec::new(),
        }
    }

    /// A request that matches every document; used for filtered
    /// browsing and pinned-id lookups.
    pub fn match_all(tiers: &[FieldTier], per_page: u32) -> Self {
        Self {
            expression: String::new(),
            fields: build_field_query(tiers),
            page: 1,
            per_page,
            sort: SortKey::Relevance,
            filters: Vec::new(),
        }
    }

    pub fn with_sort(mut self, sort: SortKey) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_filters(mut self, filters: Vec<FilterClause>) -> Self {
        self.filters = filters;
        self
    }

    /// Whether the request should match everything. Adapters map this
    /// to their service's match-all form.
    pub fn is_match_all(&self) -> bool {
        self.expression.trim().is_empty()
    }
}

/// Request body of a planned call.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanBody {
    Json(serde_json::Value),
    /// Newline-delimited JSON, for bulk imports.
    Ndjson(String),
}

/// A planned HTTP call: everything the transport needs, nothing it
/// decides. Paths are relative to the configured service URL.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpPlan {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(&'static str, String)>,
    pub body: Option<PlanBody>,
}

impl HttpPlan {
    fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn with_header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    pub fn with_json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(PlanBody::Json(body));
        self
    }

    pub fn with_ndjson(mut self, body: String) -> Self {
        self.body = Some(PlanBody::Ndjson(body));
        self
    }

    /// Stable signature of the call, used as the response-cache key.
    /// Headers are excluded: they carry credentials, not request
    /// identity.
    pub fn cache_key(&self) -> String {
        let mut key = format!("{} {}", self.method, self.path);
        for (name, value) in &self.query {
            key.push('&');
            key.push_str(name);
            key.push('=');
            key.push_str(value);
        }
        match &self.body {
            Some(PlanBody::Json(value)) => {
                key.push('#');
                key.push_str(&value.to_string());
            }
            Some(PlanBody::Ndjson(lines)) => {
                key.push('#');
                key.push_str(lines);
            }
            None => {}
        }
        key
    }
}

/// A hosted search service, described entirely through planned calls.
pub trait SearchBackend: Send + Sync {
    /// Service name for logs and the health endpoint.
    fn name(&self) -> &'static str;

    /// Plan a paginated weighted search against `collection`.
    fn search_plan(&self, collection: &str, request: &SearchRequest) -> HttpPlan;

    /// Parse the service's search response into the neutral envelope.
    /// `requested_page` backs services that do not echo the page.
    fn parse_page(
        &self,
        body: &serde_json::Value,
        requested_page: u32,
    ) -> Result<SearchPage<serde_json::Value>, FihristError>;

    /// Plan the calls that create a collection and its settings.
    fn bootstrap_plans(&self, spec: &CollectionSpec) -> Vec<HttpPlan>;

    /// Plan dropping a collection. A missing collection is the
    /// caller's concern.
    fn drop_plan(&self, collection: &str) -> HttpPlan;

    /// Plan a batch document upsert.
    fn import_plan(&self, collection: &str, documents: &[serde_json::Value]) -> HttpPlan;

    /// Plan a liveness probe of the service.
    fn health_plan(&self) -> HttpPlan;
}
