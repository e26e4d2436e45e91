//! API Module
//!
//! HTTP handlers and routing for the cache server.
//!
//! # Endpoints
//! - `POST /store` - Store a value, replicated on a primary
//! - `GET /load` - Retrieve a value by key
//! - `GET /stats` - Get cache and replication statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
