//! # Node Settings
//!
//! Runtime configuration loaded from `SC_*` environment variables, with
//! development-friendly defaults. Everything is resolved once at startup;
//! nothing reads the environment after that.

use anyhow::{bail, Result};
use sc_cluster::ClusterMode;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// Default HTTP bind address.
const DEFAULT_HOST: &str = "127.0.0.1";
/// Default HTTP port.
const DEFAULT_PORT: u16 = 9000;
/// Default minimum passphrase length. High-security deployments should
/// raise this to 32+.
const DEFAULT_MIN_PASSPHRASE_LEN: usize = 8;
/// Default cluster reconciliation interval, seconds.
const DEFAULT_SYNC_INTERVAL_SECS: u64 = 30;
/// Default peer health probe interval, seconds.
const DEFAULT_HEALTH_INTERVAL_SECS: u64 = 10;

/// Immutable node configuration.
#[derive(Debug, Clone)]
pub struct NodeSettings {
    /// HTTP bind host.
    pub host: String,
    /// HTTP bind port.
    pub port: u16,
    /// RocksDB data directory.
    pub data_dir: PathBuf,
    /// Path of the persisted encryption salt.
    pub salt_path: PathBuf,
    /// Minimum accepted `X-User-Key` length.
    pub min_passphrase_len: usize,
    /// Static API key; `None` disables the `X-API-Key` check.
    pub api_key: Option<String>,
    /// Whether cluster coordination runs at all.
    pub cluster_enabled: bool,
    /// Cluster operating mode.
    pub cluster_mode: ClusterMode,
    /// This node's cluster identifier ("host:port").
    pub node_id: String,
    /// Configured peer addresses ("host:port").
    pub cluster_nodes: Vec<String>,
    /// Reconciliation interval.
    pub sync_interval: Duration,
    /// Health probe interval.
    pub health_check_interval: Duration,
    /// Per-subscriber event queue capacity.
    pub event_queue_size: usize,
    /// SSE keep-alive interval.
    pub keepalive_interval: Duration,
}

impl Default for NodeSettings {
    fn default() -> Self {
        let port = DEFAULT_PORT;
        Self {
            host: DEFAULT_HOST.to_string(),
            port,
            data_dir: PathBuf::from("./data/configurations"),
            salt_path: PathBuf::from("./data/encryption.salt"),
            min_passphrase_len: DEFAULT_MIN_PASSPHRASE_LEN,
            api_key: None,
            cluster_enabled: false,
            cluster_mode: ClusterMode::Replica,
            node_id: format!("{DEFAULT_HOST}:{port}"),
            cluster_nodes: Vec::new(),
            sync_interval: Duration::from_secs(DEFAULT_SYNC_INTERVAL_SECS),
            health_check_interval: Duration::from_secs(DEFAULT_HEALTH_INTERVAL_SECS),
            event_queue_size: sc_events::DEFAULT_MAX_QUEUE_SIZE,
            keepalive_interval: Duration::from_secs(sc_events::DEFAULT_KEEPALIVE_SECS),
        }
    }
}

impl NodeSettings {
    /// Load settings from the environment.
    ///
    /// # Errors
    ///
    /// Fails on unparseable numeric variables or an unknown cluster mode.
    pub fn from_env() -> Result<Self> {
        let mut settings = Self::default();

        if let Ok(host) = std::env::var("SC_HOST") {
            settings.host = host;
        }
        if let Some(port) = parse_var("SC_PORT")? {
            settings.port = port;
        }
        if let Ok(dir) = std::env::var("SC_DATA_DIR") {
            settings.data_dir = PathBuf::from(dir);
        }
        if let Ok(path) = std::env::var("SC_SALT_FILE") {
            settings.salt_path = PathBuf::from(path);
        }
        if let Some(len) = parse_var("SC_MIN_USER_KEY_LENGTH")? {
            settings.min_passphrase_len = len;
        }
        if let Ok(key) = std::env::var("SC_API_KEY") {
            if !key.is_empty() {
                settings.api_key = Some(key);
            }
        }

        settings.cluster_enabled = bool_var("SC_CLUSTER_ENABLED");
        if let Ok(mode) = std::env::var("SC_CLUSTER_MODE") {
            settings.cluster_mode = match mode.to_lowercase().as_str() {
                "replica" => ClusterMode::Replica,
                "federated" => ClusterMode::Federated,
                other => bail!("Unknown cluster mode '{other}' (expected replica or federated)"),
            };
        }
        settings.node_id = std::env::var("SC_CLUSTER_NODE_ID")
            .unwrap_or_else(|_| format!("{}:{}", settings.host, settings.port));
        if let Ok(nodes) = std::env::var("SC_CLUSTER_NODES") {
            settings.cluster_nodes = nodes
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(secs) = parse_var::<u64>("SC_CLUSTER_SYNC_INTERVAL")? {
            settings.sync_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64>("SC_CLUSTER_HEALTH_INTERVAL")? {
            settings.health_check_interval = Duration::from_secs(secs);
        }
        if let Some(size) = parse_var("SC_EVENT_QUEUE_SIZE")? {
            settings.event_queue_size = size;
        }
        if let Some(secs) = parse_var::<u64>("SC_EVENT_KEEPALIVE_SECS")? {
            settings.keepalive_interval = Duration::from_secs(secs);
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Sanity-check the loaded values. A cluster with no configured peers
    /// is allowed but logged.
    ///
    /// # Errors
    ///
    /// Fails on a zero queue size, zero minimum passphrase length, or a
    /// zero cluster interval.
    pub fn validate(&self) -> Result<()> {
        if self.event_queue_size == 0 {
            bail!("SC_EVENT_QUEUE_SIZE must be at least 1");
        }
        if self.min_passphrase_len == 0 {
            bail!("SC_MIN_USER_KEY_LENGTH must be at least 1");
        }
        // The coordinator loops tick on these; a zero period is not a
        // valid interval.
        if self.sync_interval.is_zero() {
            bail!("SC_CLUSTER_SYNC_INTERVAL must be at least 1 second");
        }
        if self.health_check_interval.is_zero() {
            bail!("SC_CLUSTER_HEALTH_INTERVAL must be at least 1 second");
        }
        if self.cluster_enabled && self.cluster_nodes.is_empty() {
            warn!("Cluster enabled with no peers configured; running as a single-node cluster");
        }
        Ok(())
    }

    /// Socket address string to bind the HTTP server to.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => match raw.parse() {
            Ok(value) => Ok(Some(value)),
            Err(err) => bail!("Invalid {name}='{raw}': {err}"),
        },
        Err(_) => Ok(None),
    }
}

fn bool_var(name: &str) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}
