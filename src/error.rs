//! Error types for Fihrist

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FihristError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Search service error: {0}")]
    Backend(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Malformed response: {0}")]
    Response(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl serde::Serialize for FihristError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
