//! Tidecache - An in-memory TTL cache server with replication
//!
//! Stores string values with optional expiry, sweeps expired entries in the
//! background and, on a primary, forwards accepted writes to a secondary on a
//! best-effort basis.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod expiry;
pub mod models;
pub mod node;
pub mod replication;
pub mod tasks;

pub use api::{create_router, AppState};
pub use config::{Config, Role};
pub use node::Node;
