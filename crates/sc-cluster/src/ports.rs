//! Outbound ports for the cluster coordinator.
//!
//! The coordinator is written against two interfaces: [`PeerTransport`], the
//! node-to-node wire (HTTP adapter in node-runtime, in-memory mock in the
//! test suite), and [`MetadataSource`], the local store's metadata view used
//! to seed reconciliation.

use crate::errors::ClusterError;
use crate::node::NodeInfo;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared_types::{ConfigValue, DecryptedEntry, EntrySummary};

/// A write to replicate to a peer. Carries the caller's passphrase alongside
/// (as a transport header, never inside the payload) so the receiving node
/// encrypts with its own locally-held key context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicatedWrite {
    pub key: String,
    pub environment: String,
    pub value: ConfigValue,
    pub category: Option<String>,
}

/// Outcome of pushing salt to a peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaltPushOutcome {
    /// Peer had no salt and stored ours.
    Created,
    /// Peer already held byte-identical salt.
    AlreadyPresent,
}

/// Node-to-node communication used by health checks, replication,
/// reconciliation, federated queries, and salt bootstrap.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    /// Lightweight liveness probe.
    async fn check_health(&self, node: &NodeInfo) -> Result<(), ClusterError>;

    /// Entry metadata for reconciliation; never carries values.
    async fn fetch_summaries(&self, node: &NodeInfo) -> Result<Vec<EntrySummary>, ClusterError>;

    /// Fetch a single entry from a peer (federated read).
    ///
    /// `Ok(None)` means the peer answered but does not hold the entry.
    async fn fetch_entry(
        &self,
        node: &NodeInfo,
        key: &str,
        environment: &str,
        passphrase: &str,
    ) -> Result<Option<DecryptedEntry>, ClusterError>;

    /// Fetch a filtered entry list from a peer (federated list).
    async fn fetch_entries(
        &self,
        node: &NodeInfo,
        category: Option<&str>,
        passphrase: &str,
    ) -> Result<Vec<DecryptedEntry>, ClusterError>;

    /// Replicate a create to a peer.
    async fn replicate_create(
        &self,
        node: &NodeInfo,
        write: &ReplicatedWrite,
        passphrase: &str,
    ) -> Result<(), ClusterError>;

    /// Replicate an update to a peer.
    async fn replicate_update(
        &self,
        node: &NodeInfo,
        write: &ReplicatedWrite,
        passphrase: &str,
    ) -> Result<(), ClusterError>;

    /// Replicate a delete to a peer.
    async fn replicate_delete(
        &self,
        node: &NodeInfo,
        key: &str,
        environment: &str,
        passphrase: &str,
    ) -> Result<(), ClusterError>;

    /// Fetch the peer's salt. `Ok(None)` means the peer has none yet.
    async fn fetch_salt(&self, node: &NodeInfo) -> Result<Option<Vec<u8>>, ClusterError>;

    /// Push salt material to a peer.
    ///
    /// # Errors
    ///
    /// `ClusterError::SaltConflict` if the peer holds different salt.
    async fn push_salt(
        &self,
        node: &NodeInfo,
        salt: &[u8],
    ) -> Result<SaltPushOutcome, ClusterError>;
}

/// Local metadata view, implemented over the encrypted store in node-runtime.
pub trait MetadataSource: Send + Sync {
    /// Summaries of every locally-stored entry.
    fn local_summaries(&self) -> Vec<EntrySummary>;
}
