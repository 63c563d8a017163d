//! Error types for the shared cache and the site data service
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Errors raised by the cache coordinator and its storage backends.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Key is empty or exceeds the maximum length
    #[error("Invalid cache key: {0}")]
    InvalidKey(String),

    /// The persistent store rejected a read or write
    #[error("Store error: {0}")]
    Store(String),

    /// A stored value could not be parsed into the expected shape
    #[error("Corrupt entry for '{key}': {reason}")]
    Corrupt { key: String, reason: String },

    /// A payload could not be serialized for storage or broadcast
    #[error("Serialization error: {0}")]
    Serialization(String),
}

// == Result Type Alias ==
/// Convenience Result type for the cache layer.
pub type Result<T> = std::result::Result<T, CacheError>;

// == Api Error Enum ==
/// Errors surfaced by the upstream client and the HTTP handlers.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Upstream answered with a non-success status
    #[error("API responded with status: {0}")]
    Upstream(u16),

    /// Upstream request did not complete in time
    #[error("API request timed out")]
    Timeout,

    /// Transport-level failure talking to the upstream API
    #[error("API request failed: {0}")]
    Request(String),

    /// Upstream body could not be decoded
    #[error("Invalid API response: {0}")]
    Decode(String),

    /// Write operation attempted without an API key
    #[error("Missing or malformed bearer token")]
    Unauthorized,

    /// Cache layer failure
    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            ApiError::Upstream(status.as_u16())
        } else {
            ApiError::Request(err.to_string())
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Upstream(_) | ApiError::Request(_) | ApiError::Decode(_) => {
                StatusCode::BAD_GATEWAY
            }
            ApiError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Cache(CacheError::InvalidKey(_)) => StatusCode::BAD_REQUEST,
            ApiError::Cache(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::Upstream(500).into_response().status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError::Timeout.into_response().status(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            ApiError::Unauthorized.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(CacheError::InvalidKey(String::new()))
                .into_response()
                .status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_corrupt_message_names_key() {
        let err = CacheError::Corrupt {
            key: "greed_shard_data".to_string(),
            reason: "expected value".to_string(),
        };
        assert!(err.to_string().contains("greed_shard_data"));
    }
}
