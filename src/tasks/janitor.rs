//! Janitor Task
//!
//! Background task that periodically sweeps expired entries out of the cache.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::cache::MemoryCache;

/// Handle to the running sweep task.
///
/// The task runs until [`Janitor::stop`] is called. It does not perform a
/// final sweep on the way out.
#[derive(Debug)]
pub struct Janitor {
    stop_tx: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl Janitor {
    /// Spawns the sweep loop. The first sweep happens one `period` after start.
    ///
    /// # Panics
    /// Panics if `period` is zero.
    pub fn spawn(cache: Arc<MemoryCache>, period: Duration) -> Self {
        let (stop_tx, mut stop_rx) = oneshot::channel();

        let handle = tokio::spawn(async move {
            info!(?period, "starting janitor");

            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = cache.evict_expired(Utc::now()).await;
                        if removed > 0 {
                            info!(removed, "janitor evicted expired entries");
                        } else {
                            debug!("janitor found no expired entries");
                        }
                    }
                    _ = &mut stop_rx => break,
                }
            }

            info!("janitor stopped");
        });

        Self { stop_tx, handle }
    }

    /// Signals the loop to exit and waits for it.
    pub async fn stop(self) {
        // a closed receiver means the task is already gone
        let _ = self.stop_tx.send(());
        if let Err(err) = self.handle.await {
            warn!(error = %err, "janitor task ended abnormally");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{Cache, Item};
    use chrono::TimeDelta;

    #[tokio::test]
    async fn test_janitor_removes_expired_entries() {
        let cache = Arc::new(MemoryCache::new());
        cache
            .save(Item::new("a", "1", Some(Utc::now() + TimeDelta::milliseconds(50))))
            .await;

        let janitor = Janitor::spawn(Arc::clone(&cache), Duration::from_millis(20));
        assert_eq!(cache.get("a").await.as_deref(), Some("1"));

        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(cache.len().await, 0, "expired entry should have been swept");
        assert_eq!(cache.get("a").await, None);
        assert_eq!(cache.stats().snapshot().expired_evictions, 1);

        janitor.stop().await;
    }

    #[tokio::test]
    async fn test_janitor_preserves_valid_entries() {
        let cache = Arc::new(MemoryCache::new());
        cache
            .save(Item::new("long", "v", Some(Utc::now() + TimeDelta::hours(1))))
            .await;
        cache.save(Item::new("forever", "v", None)).await;

        let janitor = Janitor::spawn(Arc::clone(&cache), Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(cache.len().await, 2);
        assert_eq!(cache.get("long").await.as_deref(), Some("v"));

        janitor.stop().await;
    }

    #[tokio::test]
    async fn test_janitor_waits_a_full_period_before_first_sweep() {
        let cache = Arc::new(MemoryCache::new());
        cache
            .save(Item::new("old", "v", Some(Utc::now() - TimeDelta::seconds(1))))
            .await;

        let janitor = Janitor::spawn(Arc::clone(&cache), Duration::from_secs(3600));
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(cache.len().await, 1);
        janitor.stop().await;
    }

    #[tokio::test]
    async fn test_janitor_stop_joins_task() {
        let cache = Arc::new(MemoryCache::new());
        let janitor = Janitor::spawn(cache, Duration::from_secs(10));
        assert!(!janitor.is_finished());

        tokio::time::timeout(Duration::from_secs(1), janitor.stop())
            .await
            .expect("janitor should stop promptly");
    }
}
