//! Error types for the cache manager
//!
//! Provides unified error handling using thiserror. Only connection and
//! configuration errors ever reach callers of the manager; every other
//! variant is counted and swallowed at the operation boundary.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache manager.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Initial cluster connection or liveness probe failed
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Operation issued while the manager is not ready and queueing is off
    #[error("Cache not ready: {0}")]
    NotReady(String),

    /// Command failed in the underlying store
    #[error("Backend error: {0}")]
    Backend(String),

    /// Value could not be encoded or decoded as JSON
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Stats log could not be written
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Cache did not answer a health probe
    #[error("Cache unavailable: {0}")]
    Unavailable(String),
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        CacheError::Backend(err.to_string())
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::Config(_) => StatusCode::BAD_REQUEST,
            CacheError::Connection(_) | CacheError::NotReady(_) | CacheError::Unavailable(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache manager.
pub type Result<T> = std::result::Result<T, CacheError>;
