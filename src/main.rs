use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use fihrist::client::{CatalogPage, FilterOptions, QuickSearchResults, SearchClient};
use fihrist::config::AppConfig;
use fihrist::documents::{AuthorRecord, BookRecord};
use fihrist::error::FihristError;
use fihrist::filters::{
    current_hijri_year, parse_csv, AuthorFilters, BookFilters, SortKey, YearRange,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::GovernorLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;

struct AppState {
    client: SearchClient,
}

// === Request/Response types ===

#[derive(Deserialize)]
struct AuthorsQuery {
    q: Option<String>,
    page: Option<u32>,
    sort: Option<String>,
    year: Option<String>,
}

#[derive(Deserialize)]
struct BooksQuery {
    q: Option<String>,
    page: Option<u32>,
    sort: Option<String>,
    genres: Option<String>,
    authors: Option<String>,
}

#[derive(Deserialize)]
struct QuickSearchQuery {
    q: Option<String>,
}

#[derive(Deserialize)]
struct AuthorFilterQuery {
    q: Option<String>,
    page: Option<u32>,
    selected: Option<String>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    backend: String,
    service_ok: bool,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error_response(err: FihristError) -> ApiError {
    let status = match &err {
        FihristError::InvalidParameter(_) => StatusCode::BAD_REQUEST,
        FihristError::NotFound(_) => StatusCode::NOT_FOUND,
        FihristError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        FihristError::Backend(_) | FihristError::Network(_) | FihristError::Response(_) => {
            StatusCode::BAD_GATEWAY
        }
    };
    (status, Json(ErrorResponse { error: err.to_string() }))
}

/// Page params are 1-based; absent or zero means the first page.
fn normalize_page(page: Option<u32>) -> u32 {
    page.unwrap_or(1).max(1)
}

// === Handlers ===

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let service_ok = state.client.ping().await;
    Json(HealthResponse {
        status: "ok".to_string(),
        backend: state.client.backend_name().to_string(),
        service_ok,
    })
}

async fn list_authors(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AuthorsQuery>,
) -> Result<Json<CatalogPage<AuthorRecord>>, ApiError> {
    let q = params.q.unwrap_or_default();
    let page = normalize_page(params.page);
    let sort = match params.sort.as_deref() {
        Some(raw) => SortKey::parse(raw).map_err(error_response)?,
        None => SortKey::Relevance,
    };

    let mut filters = AuthorFilters::default();
    if let Some(raw) = params.year.as_deref().filter(|raw| !raw.is_empty()) {
        let range = YearRange::parse(raw).map_err(error_response)?;
        if range.from > current_hijri_year() {
            return Err(error_response(FihristError::InvalidParameter(format!(
                "year range starts after the current Hijri year: {}",
                range.from
            ))));
        }
        filters.year = Some(range);
    }

    state
        .client
        .search_authors(&q, page, sort, &filters)
        .await
        .map(Json)
        .map_err(error_response)
}

async fn list_books(
    State(state): State<Arc<AppState>>,
    Query(params): Query<BooksQuery>,
) -> Result<Json<CatalogPage<BookRecord>>, ApiError> {
    let q = params.q.unwrap_or_default();
    let page = normalize_page(params.page);

    if let Some(raw) = params.sort.as_deref() {
        if SortKey::parse(raw).map_err(error_response)? != SortKey::Relevance {
            return Err(error_response(FihristError::InvalidParameter(
                "books sort by relevance only".to_string(),
            )));
        }
    }

    let filters = BookFilters {
        genres: parse_csv(params.genres.as_deref().unwrap_or_default()),
        authors: parse_csv(params.authors.as_deref().unwrap_or_default()),
    };

    state
        .client
        .search_books(&q, page, &filters)
        .await
        .map(Json)
        .map_err(error_response)
}

async fn quick_search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<QuickSearchQuery>,
) -> Result<Json<QuickSearchResults>, ApiError> {
    state
        .client
        .quick_search(params.q.as_deref().unwrap_or_default())
        .await
        .map(Json)
        .map_err(error_response)
}

async fn author_filter_options(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AuthorFilterQuery>,
) -> Result<Json<FilterOptions<AuthorRecord>>, ApiError> {
    let q = params.q.unwrap_or_default();
    let page = normalize_page(params.page);
    let selected = parse_csv(params.selected.as_deref().unwrap_or_default());

    state
        .client
        .author_filter_options(&q, page, &selected)
        .await
        .map(Json)
        .map_err(error_response)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = AppConfig::from_env()?;
    let client = SearchClient::new(&config);
    tracing::info!("Search backend: {} at {}", client.backend_name(), config.search_url);

    let state = Arc::new(AppState { client });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(30)
            .finish()
            .unwrap(),
    );
    // Per-IP limiter state grows until stale entries are evicted
    let governor_limiter = governor_conf.limiter().clone();
    std::thread::spawn(move || loop {
        std::thread::sleep(Duration::from_secs(60));
        governor_limiter.retain_recent();
    });

    let app = Router::new()
        .route("/health", get(health))
        .route("/authors", get(list_authors))
        .route("/books", get(list_books))
        .route("/search", get(quick_search))
        .route("/filters/authors", get(author_filter_options))
        .layer(GovernorLayer { config: governor_conf })
        .layer(RequestBodyLimitLayer::new(64 * 1024))
        .layer(cors)
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Listening on http://{}", config.bind_addr);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
