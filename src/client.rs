//! Catalog operations against the configured search service.

use crate::backends::{BackendKind, HttpPlan, PlanBody, SearchBackend, SearchRequest};
use crate::config::AppConfig;
use crate::documents::{
    AuthorRecord, BookRecord, CollectionSpec, AUTHORS_COLLECTION, AUTHOR_FIELD_TIERS,
    BOOKS_COLLECTION, BOOK_FIELD_TIERS,
};
use crate::error::FihristError;
use crate::filters::{AuthorFilters, BookFilters, FilterClause, SortKey};
use crate::pagination::{paginate, PageDescriptor, PageToken, LINK_RADIUS};
use crate::query::{Script, SearchQuery};
use crate::results::{merge_hits, Hit, SearchPage};
use lru::LruCache;
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Rows per page on the author and book catalog listings.
const CATALOG_PAGE_SIZE: u32 = 20;
/// Author rows in the quick-search dropdown.
const QUICK_AUTHOR_LIMIT: u32 = 5;
/// Book rows in the quick-search dropdown.
const QUICK_BOOK_LIMIT: u32 = 20;
/// Rows per page in the author filter panel.
const FILTER_PAGE_SIZE: u32 = 10;
/// Cached search responses. The collections only change when the
/// indexer runs, so responses stay valid for a long time.
const RESPONSE_CACHE_SIZE: usize = 512;

/// One page of the author or book catalog.
#[derive(Debug, Serialize)]
pub struct CatalogPage<T> {
    pub query: String,
    pub script: Script,
    pub hits: Vec<Hit<T>>,
    pub pagination: PageDescriptor,
    pub page_links: Vec<PageToken>,
    pub elapsed_ms: u64,
}

/// Combined author/book results for the search dropdown.
#[derive(Debug, Serialize)]
pub struct QuickSearchResults {
    pub query: String,
    pub script: Script,
    pub authors: Vec<Hit<AuthorRecord>>,
    pub books: Vec<Hit<BookRecord>>,
    pub elapsed_ms: u64,
}

/// One page of a filter panel: currently selected entries pinned ahead
/// of the matching rest.
#[derive(Debug, Serialize)]
pub struct FilterOptions<T> {
    pub items: Vec<Hit<T>>,
    pub page: u32,
    pub has_more: bool,
}

pub struct SearchClient {
    http: reqwest::Client,
    backend: Arc<dyn SearchBackend>,
    kind: BackendKind,
    base_url: String,
    cache: Mutex<LruCache<String, Arc<Value>>>,
}

impl SearchClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            backend: config.backend.adapter(config.search_key.clone()),
            kind: config.backend,
            base_url: config.search_url.clone(),
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(RESPONSE_CACHE_SIZE).unwrap_or(NonZeroUsize::new(128).unwrap()),
            )),
        }
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.kind
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Searches the author catalog. `page` is 1-based; handlers
    /// normalize raw page input before calling.
    pub async fn search_authors(
        &self,
        q: &str,
        page: u32,
        sort: SortKey,
        filters: &AuthorFilters,
    ) -> Result<CatalogPage<AuthorRecord>, FihristError> {
        let started = Instant::now();
        let query = SearchQuery::normalize(q);
        let request = SearchRequest::new(&query, AUTHOR_FIELD_TIERS, page, CATALOG_PAGE_SIZE)
            .with_sort(sort)
            .with_filters(filters.clauses());

        let results = self
            .search_page(AUTHORS_COLLECTION, &request)
            .await?
            .into_typed::<AuthorRecord>()?;
        let pagination = paginate(results.total_found, page, CATALOG_PAGE_SIZE);

        Ok(CatalogPage {
            query: query.raw().to_string(),
            script: query.script(),
            hits: results.hits,
            page_links: pagination.link_row(LINK_RADIUS),
            pagination,
            elapsed_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// Searches the book catalog. Books sort by relevance only.
    pub async fn search_books(
        &self,
        q: &str,
        page: u32,
        filters: &BookFilters,
    ) -> Result<CatalogPage<BookRecord>, FihristError> {
        let started = Instant::now();
        let query = SearchQuery::normalize(q);
        let request = SearchRequest::new(&query, BOOK_FIELD_TIERS, page, CATALOG_PAGE_SIZE)
            .with_filters(filters.clauses());

        let results = self
            .search_page(BOOKS_COLLECTION, &request)
            .await?
            .into_typed::<BookRecord>()?;
        let pagination = paginate(results.total_found, page, CATALOG_PAGE_SIZE);

        Ok(CatalogPage {
            query: query.raw().to_string(),
            script: query.script(),
            hits: results.hits,
            page_links: pagination.link_row(LINK_RADIUS),
            pagination,
            elapsed_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// Author and book lookups for the search dropdown, issued
    /// concurrently.
    pub async fn quick_search(&self, q: &str) -> Result<QuickSearchResults, FihristError> {
        let started = Instant::now();
        let query = SearchQuery::normalize(q);
        let author_request = SearchRequest::new(&query, AUTHOR_FIELD_TIERS, 1, QUICK_AUTHOR_LIMIT);
        let book_request = SearchRequest::new(&query, BOOK_FIELD_TIERS, 1, QUICK_BOOK_LIMIT);

        let (authors, books) = tokio::join!(
            self.search_page(AUTHORS_COLLECTION, &author_request),
            self.search_page(BOOKS_COLLECTION, &book_request),
        );

        Ok(QuickSearchResults {
            query: query.raw().to_string(),
            script: query.script(),
            authors: authors?.into_typed::<AuthorRecord>()?.hits,
            books: books?.into_typed::<BookRecord>()?.hits,
            elapsed_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// One page of the author filter panel. Selected authors are
    /// looked up by id and pinned ahead of the general matches on the
    /// first page; every page drops general rows that duplicate a
    /// selection.
    pub async fn author_filter_options(
        &self,
        q: &str,
        page: u32,
        selected_ids: &[String],
    ) -> Result<FilterOptions<AuthorRecord>, FihristError> {
        let query = SearchQuery::normalize(q);
        let general_request = SearchRequest::new(&query, AUTHOR_FIELD_TIERS, page, FILTER_PAGE_SIZE);

        let (pinned_hits, general) = if page <= 1 && !selected_ids.is_empty() {
            let pinned_request =
                SearchRequest::match_all(AUTHOR_FIELD_TIERS, selected_ids.len() as u32)
                    .with_filters(vec![FilterClause::AnyOf {
                        field: "id",
                        values: selected_ids.to_vec(),
                    }]);

            let (pinned, general) = tokio::join!(
                self.search_page(AUTHORS_COLLECTION, &pinned_request),
                self.search_page(AUTHORS_COLLECTION, &general_request),
            );
            (
                pinned?.into_typed::<AuthorRecord>()?.hits,
                general?.into_typed::<AuthorRecord>()?,
            )
        } else {
            (
                Vec::new(),
                self.search_page(AUTHORS_COLLECTION, &general_request)
                    .await?
                    .into_typed::<AuthorRecord>()?,
            )
        };

        let pagination = paginate(general.total_found, page, FILTER_PAGE_SIZE);

        let selected: HashSet<&str> = selected_ids.iter().map(String::as_str).collect();
        let general_hits: Vec<Hit<AuthorRecord>> = general
            .hits
            .into_iter()
            .filter(|hit| !selected.contains(hit.document.id.as_str()))
            .collect();

        Ok(FilterOptions {
            items: merge_hits(pinned_hits, general_hits),
            page,
            has_more: pagination.has_next,
        })
    }

    /// Whether the search service answers its health probe.
    pub async fn ping(&self) -> bool {
        self.send(&self.backend.health_plan()).await.is_ok()
    }

    /// Drops and re-creates a collection; used by the indexer before a
    /// full import. A missing collection on the drop is fine.
    pub async fn recreate_collection(&self, spec: &CollectionSpec) -> Result<(), FihristError> {
        match self.execute(&self.backend.drop_plan(spec.name)).await {
            Ok(_) | Err(FihristError::NotFound(_)) => {}
            Err(err) => return Err(err),
        }
        for plan in self.backend.bootstrap_plans(spec) {
            self.execute(&plan).await?;
        }
        Ok(())
    }

    /// Upserts one batch of documents into a collection.
    pub async fn import_batch(
        &self,
        collection: &str,
        documents: &[Value],
    ) -> Result<(), FihristError> {
        let plan = self.backend.import_plan(collection, documents);
        let body = self.send(&plan).await?;

        // Typesense answers one JSON result per document line, with a
        // `success` flag each; Elasticsearch answers a single object
        // with an `errors` flag. A one-document Typesense batch is a
        // single object too, so both checks run on every line.
        for line in body.lines() {
            let Ok(result) = serde_json::from_str::<Value>(line) else {
                continue;
            };
            if result.get("success").and_then(Value::as_bool) == Some(false) {
                return Err(FihristError::Backend(format!(
                    "import into {collection} rejected a document: {line}"
                )));
            }
            if result.get("errors").and_then(Value::as_bool) == Some(true) {
                return Err(FihristError::Backend(format!(
                    "bulk import into {collection} reported item errors"
                )));
            }
        }
        Ok(())
    }

    /// Runs one search plan, serving repeats from the response cache.
    async fn search_page(
        &self,
        collection: &str,
        request: &SearchRequest,
    ) -> Result<SearchPage<Value>, FihristError> {
        let plan = self.backend.search_plan(collection, request);
        let key = plan.cache_key();

        let cached = {
            let mut cache = self.cache.lock().unwrap();
            cache.get(&key).cloned()
        };

        let body = match cached {
            Some(body) => body,
            None => {
                let body = Arc::new(self.execute(&plan).await?);
                let mut cache = self.cache.lock().unwrap();
                cache.put(key, Arc::clone(&body));
                body
            }
        };

        self.backend.parse_page(&body, request.page)
    }

    async fn execute(&self, plan: &HttpPlan) -> Result<Value, FihristError> {
        let body = self.send(plan).await?;
        serde_json::from_str(&body).map_err(|e| {
            FihristError::Response(format!("invalid JSON from {}: {e}", self.backend.name()))
        })
    }

    async fn send(&self, plan: &HttpPlan) -> Result<String, FihristError> {
        let url = format!("{}{}", self.base_url, plan.path);
        let mut request = self.http.request(plan.method.clone(), &url);

        if !plan.query.is_empty() {
            request = request.query(&plan.query);
        }
        for (name, value) in &plan.headers {
            request = request.header(*name, value);
        }
        match &plan.body {
            Some(PlanBody::Json(body)) => request = request.json(body),
            Some(PlanBody::Ndjson(lines)) => {
                request = request
                    .header("Content-Type", "application/x-ndjson")
                    .body(lines.clone());
            }
            None => {}
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(FihristError::NotFound(plan.path.clone()));
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            tracing::warn!("{} {} failed with {}", plan.method, plan.path, status);
            return Err(FihristError::Backend(format!(
                "{} returned {}: {}",
                self.backend.name(),
                status,
                truncate(&detail, 200)
            )));
        }

        Ok(response.text().await?)
    }
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
