//! Node Lifecycle
//!
//! Wires the cache, janitor and (on a primary) the replication pipeline
//! together, and tears them down in order on shutdown.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::api::AppState;
use crate::cache::MemoryCache;
use crate::config::{Config, Role};
use crate::replication::ReplicationPipeline;
use crate::tasks::Janitor;

/// A running cache node.
#[derive(Debug)]
pub struct Node {
    role: Role,
    state: AppState,
    janitor: Janitor,
    pipeline: Option<ReplicationPipeline>,
    shutdown_grace: Duration,
}

impl Node {
    /// Builds the cache and spawns the background workers for `config`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(config: &Config) -> Result<Self, reqwest::Error> {
        let cache = Arc::new(MemoryCache::new());
        let janitor = Janitor::spawn(Arc::clone(&cache), config.janitor_interval);

        let pipeline = config
            .pipeline()
            .map(|settings| ReplicationPipeline::start(&settings))
            .transpose()?;

        let mut state = AppState::new(cache, config.role);
        if let Some(pipeline) = &pipeline {
            state = state.with_replication(pipeline.sender(), pipeline.stats());
        }

        info!(role = %config.role, replicating = pipeline.is_some(), "node started");

        Ok(Self {
            role: config.role,
            state,
            janitor,
            pipeline,
            shutdown_grace: config.shutdown_grace,
        })
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Handler state for the HTTP router.
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Stops the node's workers.
    ///
    /// Order: janitor first, then replication intake, then the replicator
    /// and its outbound client. Queued replication items are not flushed
    /// beyond the configured grace period.
    pub async fn shutdown(self) {
        info!("shutting down node");

        self.janitor.stop().await;

        // the node's own state holds a sender too
        drop(self.state);
        if let Some(pipeline) = self.pipeline {
            pipeline.shutdown(self.shutdown_grace).await;
        }

        info!("node stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secondary() -> Config {
        Config {
            listen_addr: ([127, 0, 0, 1], 0).into(),
            janitor_interval: Duration::from_millis(20),
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn test_secondary_node_has_no_replication() {
        let node = Node::start(&secondary()).unwrap();

        assert_eq!(node.role(), Role::Secondary);
        assert!(node.state().replication.is_none());

        node.shutdown().await;
    }

    #[tokio::test]
    async fn test_primary_node_shuts_down_promptly() {
        let config = Config {
            role: Role::Primary,
            replica_addr: Some("127.0.0.1:9".to_string()),
            ..secondary()
        };
        let node = Node::start(&config).unwrap();
        assert!(node.state().replication.is_some());

        tokio::time::timeout(Duration::from_secs(2), node.shutdown())
            .await
            .expect("shutdown should complete");
    }
}
