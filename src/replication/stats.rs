//! Replication counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Outcome counters for the replication pipeline, shared across its tasks.
#[derive(Debug, Default)]
pub struct ReplicationStats {
    enqueued: AtomicU64,
    dropped_handoff: AtomicU64,
    dropped_overflow: AtomicU64,
    replicated: AtomicU64,
    failed: AtomicU64,
}

/// Point-in-time copy of [`ReplicationStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReplicationStatsSnapshot {
    /// Items accepted by the hand-off
    pub enqueued: u64,
    /// Items refused because the hand-off was full or closed
    pub dropped_handoff: u64,
    /// Oldest items discarded to make room in the queue
    pub dropped_overflow: u64,
    /// Items the peer acknowledged with a success status
    pub replicated: u64,
    /// Items lost to transport errors or non-success responses
    pub failed: u64,
}

impl ReplicationStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_enqueued(&self) {
        self.enqueued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped_handoff(&self) {
        self.dropped_handoff.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped_overflow(&self) {
        self.dropped_overflow.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_replicated(&self) {
        self.replicated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ReplicationStatsSnapshot {
        ReplicationStatsSnapshot {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            dropped_handoff: self.dropped_handoff.load(Ordering::Relaxed),
            dropped_overflow: self.dropped_overflow.load(Ordering::Relaxed),
            replicated: self.replicated.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}
