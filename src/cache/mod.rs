//! Cache Module
//!
//! Provides the in-memory item store with TTL expiration.

mod item;
mod stats;
mod store;


// Re-export public types
pub use item::Item;
pub use stats::{CacheStats, CacheStatsSnapshot};
pub use store::{Cache, MemoryCache};
