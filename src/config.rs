//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::replication::{PipelineConfig, DEFAULT_QUEUE_CAPACITY, DEFAULT_REPLICATION_TIMEOUT};

const DEFAULT_JANITOR_INTERVAL_SECS: u64 = 10;

// == Role ==
/// Whether this node forwards its writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Role {
    /// Accepts client writes and replicates them
    Primary,
    /// Serves reads and accepts forwarded writes
    #[default]
    Secondary,
}

impl FromStr for Role {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "primary" | "master" => Ok(Role::Primary),
            "secondary" | "slave" | "replica" => Ok(Role::Secondary),
            other => Err(ConfigError::UnknownRole(other.to_string())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Primary => f.write_str("primary"),
            Role::Secondary => f.write_str("secondary"),
        }
    }
}

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Node role
    pub role: Role,
    /// HTTP listen address
    pub listen_addr: SocketAddr,
    /// Secondary to replicate to, required on a primary
    pub replica_addr: Option<String>,
    /// Interval between janitor sweeps
    pub janitor_interval: Duration,
    /// Items held for the replicator before the oldest is dropped
    pub queue_capacity: usize,
    /// Items accepted from the write path before the newest is dropped
    pub handoff_capacity: usize,
    /// Timeout of a single replication request
    pub replication_timeout: Duration,
    /// Time granted to forward queued items at shutdown
    pub shutdown_grace: Duration,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `NODE_ROLE` - `primary` or `secondary` (default: secondary)
    /// - `LISTEN_ADDR` - Listen address (default: 0.0.0.0:8888)
    /// - `REPLICA_ADDR` - Secondary `host:port` or URL (no default)
    /// - `JANITOR_INTERVAL` - Sweep interval in seconds (default: 10)
    /// - `REPLICATION_QUEUE_CAPACITY` - Queue size (default: 1024)
    /// - `REPLICATION_HANDOFF_CAPACITY` - Hand-off size (default: 1024)
    /// - `REPLICATION_TIMEOUT_MS` - Per-request timeout (default: 1000)
    /// - `SHUTDOWN_GRACE_MS` - Replication drain time at shutdown (default: 0)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds a Config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let lookup = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let config = Self {
            role: lookup("NODE_ROLE")
                .map(|v| v.parse::<Role>())
                .transpose()?
                .unwrap_or(defaults.role),
            listen_addr: parse_var(&lookup, "LISTEN_ADDR")?.unwrap_or(defaults.listen_addr),
            replica_addr: lookup("REPLICA_ADDR").map(|v| v.trim().to_string()),
            janitor_interval: parse_var(&lookup, "JANITOR_INTERVAL")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.janitor_interval),
            queue_capacity: parse_var(&lookup, "REPLICATION_QUEUE_CAPACITY")?
                .unwrap_or(defaults.queue_capacity),
            handoff_capacity: parse_var(&lookup, "REPLICATION_HANDOFF_CAPACITY")?
                .unwrap_or(defaults.handoff_capacity),
            replication_timeout: parse_var(&lookup, "REPLICATION_TIMEOUT_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.replication_timeout),
            shutdown_grace: parse_var(&lookup, "SHUTDOWN_GRACE_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.shutdown_grace),
        };

        config.validate()?;
        Ok(config)
    }

    /// Checks cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.role == Role::Primary && self.replica_addr.is_none() {
            return Err(ConfigError::MissingReplica);
        }
        if self.janitor_interval.is_zero() {
            return Err(ConfigError::Zero("JANITOR_INTERVAL"));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::Zero("REPLICATION_QUEUE_CAPACITY"));
        }
        if self.handoff_capacity == 0 {
            return Err(ConfigError::Zero("REPLICATION_HANDOFF_CAPACITY"));
        }
        if self.replication_timeout.is_zero() {
            return Err(ConfigError::Zero("REPLICATION_TIMEOUT_MS"));
        }
        Ok(())
    }

    /// Replication settings when this node is a primary.
    pub fn pipeline(&self) -> Option<PipelineConfig> {
        match (self.role, &self.replica_addr) {
            (Role::Primary, Some(peer)) => Some(PipelineConfig {
                peer: peer.clone(),
                queue_capacity: self.queue_capacity,
                handoff_capacity: self.handoff_capacity,
                request_timeout: self.replication_timeout,
            }),
            _ => None,
        }
    }
}

fn parse_var<T, F>(lookup: &F, name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue { name, value })
        })
        .transpose()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            role: Role::default(),
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8888)),
            replica_addr: None,
            janitor_interval: Duration::from_secs(DEFAULT_JANITOR_INTERVAL_SECS),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            handoff_capacity: DEFAULT_QUEUE_CAPACITY,
            replication_timeout: DEFAULT_REPLICATION_TIMEOUT,
            shutdown_grace: Duration::ZERO,
        }
    }
}
