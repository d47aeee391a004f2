//! Runtime configuration from environment variables.

use crate::backends::BackendKind;
use crate::error::FihristError;

/// Service configuration, read once at startup.
///
/// - `FIHRIST_BACKEND`: `typesense` (default), `meilisearch`, or
///   `elasticsearch`
/// - `FIHRIST_SEARCH_URL`: search service base URL
/// - `FIHRIST_SEARCH_KEY`: search service API key, omitted when unset
/// - `FIHRIST_ADDR`: address the API binds to
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub backend: BackendKind,
    pub search_url: String,
    pub search_key: Option<String>,
    pub bind_addr: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, FihristError> {
        let backend = match std::env::var("FIHRIST_BACKEND") {
            Ok(raw) => BackendKind::parse(&raw)?,
            Err(_) => BackendKind::Typesense,
        };

        let search_url = std::env::var("FIHRIST_SEARCH_URL")
            .map(|url| normalize_base_url(&url))
            .unwrap_or_else(|_| "http://127.0.0.1:8108".to_string());

        let search_key = std::env::var("FIHRIST_SEARCH_KEY")
            .ok()
            .filter(|key| !key.is_empty());

        let bind_addr =
            std::env::var("FIHRIST_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".to_string());

        Ok(Self {
            backend,
            search_url,
            search_key,
            bind_addr,
        })
    }
}

/// Plan paths always start with `/`, so the base URL must not end
/// with one.
fn normalize_base_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}
