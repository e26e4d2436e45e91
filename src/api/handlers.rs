//! API Handlers
//!
//! HTTP request handlers for each cache server endpoint.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use tracing::{debug, warn};

use crate::cache::{Cache, CacheStats, Item, MemoryCache};
use crate::config::Role;
use crate::error::{ApiError, Result};
use crate::expiry::resolve_expiry;
use crate::models::{HealthResponse, LoadParams, StatsResponse, StoreParams};
use crate::replication::{ReplicationSender, ReplicationStats};

/// Write-path view of the replication pipeline.
#[derive(Debug, Clone)]
pub struct ReplicationState {
    pub sender: ReplicationSender,
    pub stats: Arc<ReplicationStats>,
}

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Backing cache
    pub cache: Arc<dyn Cache>,
    /// Counters of the backing cache
    pub cache_stats: Arc<CacheStats>,
    pub role: Role,
    /// Present on a primary; accepted writes are queued here
    pub replication: Option<ReplicationState>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("role", &self.role)
            .field("replication", &self.replication)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Creates a new AppState over an in-memory cache.
    pub fn new(cache: Arc<MemoryCache>, role: Role) -> Self {
        let cache_stats = cache.stats();
        Self::with_cache(cache, cache_stats, role)
    }

    /// Creates a new AppState over any [`Cache`] implementation.
    pub fn with_cache(cache: Arc<dyn Cache>, cache_stats: Arc<CacheStats>, role: Role) -> Self {
        Self {
            cache,
            cache_stats,
            role,
            replication: None,
        }
    }

    /// Routes accepted writes into the replication queue.
    pub fn with_replication(
        mut self,
        sender: ReplicationSender,
        stats: Arc<ReplicationStats>,
    ) -> Self {
        self.replication = Some(ReplicationState { sender, stats });
        self
    }
}

/// Handler for POST /store
///
/// Stores a value under a key, then queues it for the secondary when this
/// node replicates. The queue hand-off never waits.
pub async fn store_handler(
    State(state): State<AppState>,
    Query(params): Query<StoreParams>,
) -> Result<&'static str> {
    debug!(
        key = %params.key,
        ttl = ?params.ttl,
        expires_at = ?params.expires_at,
        "received data to store"
    );

    let expires_at = resolve_expiry(
        params.ttl.as_deref(),
        params.expires_at.as_deref(),
        Utc::now(),
    )
    .map_err(|err| {
        warn!(key = %params.key, error = %err, "rejecting write with malformed expiry");
        ApiError::from(err)
    })?;

    let item = Item::new(params.key, params.value, expires_at);
    match &state.replication {
        Some(replication) => {
            state.cache.save(item.clone()).await;
            replication.sender.enqueue(item);
        }
        None => state.cache.save(item).await,
    }

    Ok("ok")
}

/// Handler for GET /load
///
/// Returns the raw value, or 404 when the key is absent or expired.
pub async fn load_handler(
    State(state): State<AppState>,
    Query(params): Query<LoadParams>,
) -> Result<String> {
    state
        .cache
        .get(&params.key)
        .await
        .ok_or(ApiError::NotFound(params.key))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let replication = state
        .replication
        .as_ref()
        .map(|replication| replication.stats.snapshot());

    Json(StatsResponse::new(state.cache_stats.snapshot(), replication))
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(state.role.to_string()))
}
