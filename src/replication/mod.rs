//! Replication Module
//!
//! One-way, at-most-once forwarding of accepted writes from a primary to its
//! secondary.
//!
//! ```text
//! write path --try_send--> hand-off --> [drop-oldest buffer] --> Replicator --POST /store--> secondary
//! ```

mod queue;
mod replicator;
mod stats;

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{info, warn};

pub use queue::{
    DropOldestBuffer, ReplicationFeed, ReplicationQueue, ReplicationSender, DEFAULT_QUEUE_CAPACITY,
};
pub use replicator::{Replicator, DEFAULT_REPLICATION_TIMEOUT};
pub use stats::{ReplicationStats, ReplicationStatsSnapshot};

/// Settings for [`ReplicationPipeline::start`].
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Peer address, `host:port` or base URL
    pub peer: String,
    pub queue_capacity: usize,
    pub handoff_capacity: usize,
    pub request_timeout: Duration,
}

/// The queue worker and replicator running as a unit on a primary.
#[derive(Debug)]
pub struct ReplicationPipeline {
    sender: ReplicationSender,
    queue: ReplicationQueue,
    replicator: JoinHandle<()>,
    stats: Arc<ReplicationStats>,
}

impl ReplicationPipeline {
    /// Builds the outbound client and spawns both workers.
    pub fn start(config: &PipelineConfig) -> Result<Self, reqwest::Error> {
        let stats = Arc::new(ReplicationStats::new());
        let replicator = Replicator::new(&config.peer, config.request_timeout, Arc::clone(&stats))?;
        info!(endpoint = replicator.endpoint(), "starting replication pipeline");

        let (sender, feed, queue) = ReplicationQueue::spawn(
            config.queue_capacity,
            config.handoff_capacity,
            Arc::clone(&stats),
        );
        let replicator = tokio::spawn(replicator.run(feed));

        Ok(Self {
            sender,
            queue,
            replicator,
            stats,
        })
    }

    /// A write-path handle onto the queue.
    pub fn sender(&self) -> ReplicationSender {
        self.sender.clone()
    }

    pub fn stats(&self) -> Arc<ReplicationStats> {
        Arc::clone(&self.stats)
    }

    /// Closes intake, then gives the workers `grace` to forward what is left.
    ///
    /// Workers still running after `grace` are aborted; either way the
    /// outbound client is dropped with the replicator.
    pub async fn shutdown(self, grace: Duration) {
        let Self {
            sender,
            mut queue,
            mut replicator,
            ..
        } = self;

        drop(sender);
        queue.close();
        let mut queue_task = queue.into_task();

        let drained = tokio::time::timeout(grace, async {
            let _ = (&mut queue_task).await;
            let _ = (&mut replicator).await;
        })
        .await;

        if drained.is_err() {
            warn!(?grace, "replication not drained in time, abandoning queued items");
            queue_task.abort();
            replicator.abort();
            let _ = queue_task.await;
            let _ = replicator.await;
        }

        info!("replication pipeline stopped");
    }
}
