//! API Routes
//!
//! Configures the Axum router with all cache server endpoints.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use super::handlers::{health_handler, load_handler, stats_handler, store_handler, AppState};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `POST /store?key=&value=&ttl=&expires_at=` - Store a value
/// - `GET /load?key=` - Retrieve a value
/// - `GET /stats` - Get cache and replication statistics
/// - `GET /health` - Health check endpoint
///
/// Requests with any other method on these paths get 405.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/store", post(store_handler))
        .route("/load", get(load_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
