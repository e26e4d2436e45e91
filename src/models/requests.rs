//! Request DTOs for the cache server API
//!
//! Writes and reads carry their arguments as query parameters, the same way
//! a primary forwards writes to its secondary.

use serde::Deserialize;

/// Query parameters of `POST /store`.
///
/// A missing `key` or `value` is the empty string, which is a valid key or
/// value in its own right.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreParams {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub value: String,
    /// Relative expiry such as `300ms` or `2h45m`; wins over `expires_at`
    #[serde(default)]
    pub ttl: Option<String>,
    /// Absolute RFC 3339 expiry
    #[serde(default)]
    pub expires_at: Option<String>,
}

/// Query parameters of `GET /load`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoadParams {
    #[serde(default)]
    pub key: String,
}
