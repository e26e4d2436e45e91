//! Error types for the cache server
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Accepted `ttl` grammar, echoed back to clients on rejected writes.
pub const VALID_DURATION: &str =
    r#""ns", "us" (or "µs"), "ms", "s", "m", "h" e.g.: "300ms", "-1.5h" or "2h45m""#;

// == Expiry Error ==
/// Rejection of a malformed expiry specification on a write.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExpiryError {
    /// Relative duration that does not follow the duration grammar
    #[error("invalid duration {input:?}: {reason}")]
    InvalidDuration { input: String, reason: &'static str },

    /// Absolute timestamp that is not RFC 3339
    #[error("invalid timestamp {input:?}: {reason}")]
    InvalidTimestamp { input: String, reason: String },

    /// Expiry instant not representable once added to the current time
    #[error("expiry out of range: {0}")]
    OutOfRange(String),
}

// == API Error Enum ==
/// Errors surfaced to HTTP clients.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Key absent or expired
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Malformed expiry on a write
    #[error(
        "invalid expiry ({0}). valid format: ttl={formats} or expires_at=RFC3339 with optional fractional seconds",
        formats = VALID_DURATION
    )]
    InvalidExpiry(#[from] ExpiryError),
}

// == IntoResponse Implementation ==
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidExpiry(_) => StatusCode::BAD_REQUEST,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Replication Error ==
/// Failure of a single outbound replication attempt. Never reaches the writer.
#[derive(Error, Debug)]
pub enum ReplicationError {
    /// Connection failure, timeout or malformed request
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Peer answered with a non-success status
    #[error("peer responded with status {0}")]
    Status(reqwest::StatusCode),
}

// == Config Error ==
/// Invalid process configuration, fatal at startup.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown node role {0:?}, expected primary or secondary")]
    UnknownRole(String),

    #[error("invalid value {value:?} for {name}")]
    InvalidValue { name: &'static str, value: String },

    #[error("a primary node requires REPLICA_ADDR")]
    MissingReplica,

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

// == Result Type Alias ==
/// Convenience Result type for HTTP handlers.
pub type Result<T> = std::result::Result<T, ApiError>;
