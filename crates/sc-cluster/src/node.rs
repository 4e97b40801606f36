//! # Node Registry
//!
//! Static registry of peer nodes, enumerated once from configuration at
//! startup. Membership never changes at runtime; the health-check loop is
//! the only writer and it only flips `is_healthy` / refreshes `last_seen`.

use crate::errors::ClusterError;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// Cluster operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusterMode {
    /// All nodes synchronize and store all configuration keys.
    Replica,
    /// Each node stores only its own keys; lookups are distributed.
    Federated,
}

impl ClusterMode {
    /// Wire name of this mode.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Replica => "replica",
            Self::Federated => "federated",
        }
    }
}

impl std::fmt::Display for ClusterMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata about a cluster peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    /// Unique node identifier, in the form "host:port".
    pub node_id: String,
    /// Hostname or IP address.
    pub host: String,
    /// TCP port of the node's HTTP API.
    pub port: u16,
    /// Timestamp of the last successful health check.
    pub last_seen: DateTime<Utc>,
    /// Whether the node is currently considered healthy.
    pub is_healthy: bool,
}

impl NodeInfo {
    /// Parse a "host:port" address into a node record, initially healthy.
    ///
    /// # Errors
    ///
    /// Returns `ClusterError::InvalidNodeAddress` on malformed input.
    pub fn parse(addr: &str) -> Result<Self, ClusterError> {
        let (host, port) = addr
            .rsplit_once(':')
            .ok_or_else(|| ClusterError::InvalidNodeAddress(addr.to_string()))?;
        if host.is_empty() {
            return Err(ClusterError::InvalidNodeAddress(addr.to_string()));
        }
        let port =
            u16::from_str(port).map_err(|_| ClusterError::InvalidNodeAddress(addr.to_string()))?;
        Ok(Self {
            node_id: format!("{host}:{port}"),
            host: host.to_string(),
            port,
            last_seen: Utc::now(),
            is_healthy: true,
        })
    }

    /// Base HTTP URL for this node.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

/// Registry of peers, keyed by node id. Self is excluded at construction.
pub struct NodeRegistry {
    nodes: RwLock<HashMap<String, NodeInfo>>,
}

impl NodeRegistry {
    /// Build the registry from configured peer addresses, skipping entries
    /// matching `self_id` and empty strings.
    ///
    /// # Errors
    ///
    /// Returns `ClusterError::InvalidNodeAddress` on the first malformed
    /// address.
    pub fn from_addresses(self_id: &str, addresses: &[String]) -> Result<Self, ClusterError> {
        let mut nodes = HashMap::new();
        for addr in addresses {
            if addr.is_empty() {
                continue;
            }
            let node = NodeInfo::parse(addr)?;
            if node.node_id != self_id {
                nodes.insert(node.node_id.clone(), node);
            }
        }
        Ok(Self {
            nodes: RwLock::new(nodes),
        })
    }

    /// Total number of registered peers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.read().len()
    }

    /// True when no peers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.read().is_empty()
    }

    /// Snapshot of every registered peer.
    #[must_use]
    pub fn all(&self) -> Vec<NodeInfo> {
        let mut nodes: Vec<_> = self.nodes.read().values().cloned().collect();
        nodes.sort_by(|a, b| a.node_id.cmp(&b.node_id));
        nodes
    }

    /// Snapshot of the peers currently marked healthy.
    #[must_use]
    pub fn healthy(&self) -> Vec<NodeInfo> {
        let mut nodes: Vec<_> = self
            .nodes
            .read()
            .values()
            .filter(|n| n.is_healthy)
            .cloned()
            .collect();
        nodes.sort_by(|a, b| a.node_id.cmp(&b.node_id));
        nodes
    }

    /// Number of healthy peers.
    #[must_use]
    pub fn healthy_count(&self) -> usize {
        self.nodes.read().values().filter(|n| n.is_healthy).count()
    }

    /// Record a health probe outcome. Successful probes refresh `last_seen`.
    pub fn set_health(&self, node_id: &str, is_healthy: bool) {
        let mut nodes = self.nodes.write();
        if let Some(node) = nodes.get_mut(node_id) {
            node.is_healthy = is_healthy;
            if is_healthy {
                node.last_seen = Utc::now();
            }
        }
    }
}
