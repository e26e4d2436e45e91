//! Response DTOs for the cache server API
//!
//! Defines the structure of outgoing JSON response bodies.

use serde::Serialize;

use crate::cache::CacheStatsSnapshot;
use crate::replication::ReplicationStatsSnapshot;

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Number of successful lookups
    pub hits: u64,
    /// Number of lookups for absent or expired keys
    pub misses: u64,
    /// Entries removed by the janitor since startup
    pub expired_evictions: u64,
    /// Current number of entries in cache
    pub total_entries: usize,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
    /// Replication counters, present on a primary only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replication: Option<ReplicationStatsSnapshot>,
}

impl StatsResponse {
    /// Creates a new StatsResponse from cache and replication statistics
    pub fn new(cache: CacheStatsSnapshot, replication: Option<ReplicationStatsSnapshot>) -> Self {
        Self {
            hits: cache.hits,
            misses: cache.misses,
            expired_evictions: cache.expired_evictions,
            total_entries: cache.total_entries,
            hit_rate: cache.hit_rate(),
            replication,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Node role, "primary" or "secondary"
    pub role: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy(role: impl Into<String>) -> Self {
        Self {
            status: "healthy".to_string(),
            role: role.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
