//! Cache Store Module
//!
//! Concurrent key to item map guarded by a reader/writer lock.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use crate::cache::{CacheStats, Item};

// == Cache Capability ==
/// The narrow contract handlers rely on.
///
/// Both operations are total: a lookup either finds a live value or not, and
/// a save always succeeds.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Returns the value for `key` if present and not expired.
    ///
    /// Expired entries are left in place for the janitor.
    async fn get(&self, key: &str) -> Option<String>;

    /// Inserts `item`, replacing any item stored under the same key.
    async fn save(&self, item: Item);
}

// == Memory Cache ==
/// In-memory [`Cache`] backed by a `HashMap`.
///
/// Lookups share the lock; saves and sweeps take it exclusively.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Item>>,
    stats: Arc<CacheStats>,
}

impl MemoryCache {
    // == Constructor ==
    /// Creates an empty cache with its own counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle to this cache's counters.
    pub fn stats(&self) -> Arc<CacheStats> {
        Arc::clone(&self.stats)
    }

    // == Evict Expired ==
    /// Removes every entry expired as of `now` under a single write lock.
    ///
    /// Returns the number of entries removed.
    pub async fn evict_expired(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();

        entries.retain(|_, item| !item.is_expired_at(now));

        let removed = before - entries.len();
        self.stats.set_total_entries(entries.len());
        self.stats.record_expired_evictions(removed);
        removed
    }

    /// Current number of entries, expired ones included until swept.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.read().await;

        match entries.get(key) {
            Some(item) if !item.is_expired() => {
                self.stats.record_hit();
                Some(item.value().to_string())
            }
            Some(_) => {
                debug!(key, "lookup hit an expired entry");
                self.stats.record_miss();
                None
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    async fn save(&self, item: Item) {
        let mut entries = self.entries.write().await;
        debug!(key = item.key(), "storing item");
        entries.insert(item.key().to_string(), item);
        self.stats.set_total_entries(entries.len());
    }
}
