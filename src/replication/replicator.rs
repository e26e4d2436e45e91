//! Replicator
//!
//! Drains the replication queue and forwards each item to the secondary,
//! one request at a time, best effort.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info};

use crate::cache::Item;
use crate::error::ReplicationError;
use crate::expiry::format_wire;
use crate::replication::{ReplicationFeed, ReplicationStats};

/// Default timeout for a single outbound write.
pub const DEFAULT_REPLICATION_TIMEOUT: Duration = Duration::from_secs(1);

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const IDLE_TIMEOUT: Duration = Duration::from_secs(60);
const MAX_IDLE_PER_HOST: usize = 10;

/// Forwards items to a single peer over its `/store` endpoint.
///
/// Failures are logged and counted, never retried.
#[derive(Debug)]
pub struct Replicator {
    client: reqwest::Client,
    endpoint: String,
    stats: Arc<ReplicationStats>,
}

impl Replicator {
    /// Builds a replicator for `peer`, given as `host:port` or a base URL.
    pub fn new(
        peer: &str,
        timeout: Duration,
        stats: Arc<ReplicationStats>,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .pool_idle_timeout(IDLE_TIMEOUT)
            .pool_max_idle_per_host(MAX_IDLE_PER_HOST)
            .tcp_keepalive(IDLE_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            endpoint: store_endpoint(peer),
            stats,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Replicates items until `feed` ends, then drops the client and its
    /// pooled connections.
    pub async fn run(self, mut feed: ReplicationFeed) {
        info!(endpoint = %self.endpoint, "replicator started");

        while let Some(item) = feed.next().await {
            match self.replicate(&item).await {
                Ok(()) => {
                    self.stats.record_replicated();
                    debug!(key = item.key(), "replicated item to secondary");
                }
                Err(err) => {
                    self.stats.record_failed();
                    error!(
                        key = item.key(),
                        expires_at = ?item.expires_at(),
                        error = %err,
                        "unable to replicate item"
                    );
                }
            }
        }

        info!("replication feed closed, releasing client");
    }

    /// Issues one write for `item` to the peer.
    pub async fn replicate(&self, item: &Item) -> Result<(), ReplicationError> {
        let mut params = vec![
            ("key", item.key().to_string()),
            ("value", item.value().to_string()),
        ];
        if let Some(expires_at) = item.expires_at() {
            params.push(("expires_at", format_wire(expires_at)));
        }

        let response = self
            .client
            .post(&self.endpoint)
            .query(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReplicationError::Status(status));
        }
        Ok(())
    }
}

fn store_endpoint(peer: &str) -> String {
    let base = peer.trim_end_matches('/');
    if base.starts_with("http://") || base.starts_with("https://") {
        format!("{base}/store")
    } else {
        format!("http://{base}/store")
    }
}
