//! Cache Statistics Module
//!
//! Tracks lookup hits, misses and janitor evictions.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use serde::Serialize;

// == Cache Stats ==
/// Live cache counters.
///
/// Lookups only hold the shared lock, so every counter is atomic.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    expired_evictions: AtomicU64,
    total_entries: AtomicUsize,
}

/// Point-in-time copy of [`CacheStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CacheStatsSnapshot {
    /// Number of successful lookups
    pub hits: u64,
    /// Number of lookups for absent or expired keys
    pub misses: u64,
    /// Entries removed by janitor sweeps since startup
    pub expired_evictions: u64,
    /// Entries currently held, expired ones included until swept
    pub total_entries: usize,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_expired_evictions(&self, count: usize) {
        self.expired_evictions
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Updates the entry gauge. Called while holding the store's write lock.
    pub fn set_total_entries(&self, count: usize) {
        self.total_entries.store(count, Ordering::Relaxed);
    }

    // == Snapshot ==
    pub fn snapshot(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            expired_evictions: self.expired_evictions.load(Ordering::Relaxed),
            total_entries: self.total_entries.load(Ordering::Relaxed),
        }
    }
}

impl CacheStatsSnapshot {
    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if no lookups have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = CacheStats::new().snapshot();
        assert_eq!(stats, CacheStatsSnapshot::default());
    }

    #[test]
    fn test_hit_rate_no_requests() {
        let stats = CacheStats::new();
        assert_eq!(stats.snapshot().hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let stats = CacheStats::new();
        stats.record_hit();
        stats.record_hit();
        stats.record_hit();
        stats.record_miss();
        assert_eq!(stats.snapshot().hit_rate(), 0.75);
    }

    #[test]
    fn test_record_expired_evictions_accumulates() {
        let stats = CacheStats::new();
        stats.record_expired_evictions(2);
        stats.record_expired_evictions(0);
        stats.record_expired_evictions(3);
        assert_eq!(stats.snapshot().expired_evictions, 5);
    }

    #[test]
    fn test_set_total_entries() {
        let stats = CacheStats::new();
        stats.set_total_entries(42);
        assert_eq!(stats.snapshot().total_entries, 42);
    }
}
