//! In-memory cluster fixture.
//!
//! [`InMemoryCluster`] models a set of nodes, each with its own encrypted
//! store over a [`MemoryKvStore`], all sharing one salt. Its
//! [`ClusterTransport`] implements [`PeerTransport`] by operating on the
//! target node's store directly, with per-node reachability switches so
//! tests can take nodes down mid-flow.

use async_trait::async_trait;
use parking_lot::Mutex;
use sc_cluster::{
    ClusterError, MetadataSource, NodeInfo, PeerTransport, ReplicatedWrite, SaltPushOutcome,
};
use sc_store::{EncryptedStore, ListFilter, MemoryKvStore};
use shared_crypto::{KeyContextCache, Salt};
use shared_types::{DecryptedEntry, EntrySummary};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// One simulated node.
pub struct TestNode {
    pub node_id: String,
    pub store: Arc<EncryptedStore>,
    pub key_cache: Arc<KeyContextCache>,
}

impl TestNode {
    fn new(node_id: &str, salt: &Salt) -> Self {
        Self {
            node_id: node_id.to_string(),
            store: Arc::new(EncryptedStore::new(Arc::new(MemoryKvStore::new()))),
            key_cache: Arc::new(KeyContextCache::new(salt.clone())),
        }
    }
}

/// A set of nodes addressable through [`ClusterTransport`].
pub struct InMemoryCluster {
    pub salt: Salt,
    nodes: Mutex<HashMap<String, Arc<TestNode>>>,
    unreachable: Mutex<HashSet<String>>,
}

impl InMemoryCluster {
    #[must_use]
    pub fn new(node_ids: &[&str]) -> Arc<Self> {
        let salt = Salt::generate();
        let nodes = node_ids
            .iter()
            .map(|id| ((*id).to_string(), Arc::new(TestNode::new(id, &salt))))
            .collect();
        Arc::new(Self {
            salt,
            nodes: Mutex::new(nodes),
            unreachable: Mutex::new(HashSet::new()),
        })
    }

    #[must_use]
    pub fn node(&self, node_id: &str) -> Arc<TestNode> {
        Arc::clone(
            self.nodes
                .lock()
                .get(node_id)
                .unwrap_or_else(|| panic!("unknown test node {node_id}")),
        )
    }

    pub fn set_reachable(&self, node_id: &str, reachable: bool) {
        if reachable {
            self.unreachable.lock().remove(node_id);
        } else {
            self.unreachable.lock().insert(node_id.to_string());
        }
    }

    fn check(&self, node: &NodeInfo) -> Result<Arc<TestNode>, ClusterError> {
        if self.unreachable.lock().contains(&node.node_id) {
            return Err(ClusterError::PeerUnreachable {
                node_id: node.node_id.clone(),
                reason: "connection refused".into(),
            });
        }
        Ok(self.node(&node.node_id))
    }

    /// Transport view over this cluster.
    #[must_use]
    pub fn transport(self: &Arc<Self>) -> Arc<ClusterTransport> {
        Arc::new(ClusterTransport {
            cluster: Arc::clone(self),
        })
    }

    /// Metadata view over one node's store.
    #[must_use]
    pub fn metadata(&self, node_id: &str) -> Arc<NodeMetadata> {
        Arc::new(NodeMetadata {
            node: self.node(node_id),
        })
    }
}

/// [`PeerTransport`] routing calls to the in-memory nodes.
pub struct ClusterTransport {
    cluster: Arc<InMemoryCluster>,
}

#[async_trait]
impl PeerTransport for ClusterTransport {
    async fn check_health(&self, node: &NodeInfo) -> Result<(), ClusterError> {
        self.cluster.check(node).map(|_| ())
    }

    async fn fetch_summaries(&self, node: &NodeInfo) -> Result<Vec<EntrySummary>, ClusterError> {
        let target = self.cluster.check(node)?;
        target
            .store
            .list_summaries(None, None)
            .map_err(|e| ClusterError::MalformedResponse {
                node_id: node.node_id.clone(),
                reason: e.to_string(),
            })
    }

    async fn fetch_entry(
        &self,
        node: &NodeInfo,
        key: &str,
        environment: &str,
        passphrase: &str,
    ) -> Result<Option<DecryptedEntry>, ClusterError> {
        let target = self.cluster.check(node)?;
        let ctx = target.key_cache.get_or_derive(passphrase);
        match target.store.read(key, environment, &ctx, false) {
            Ok(entry) => Ok(Some(entry)),
            Err(shared_types::StoreError::NotFound { .. }) => Ok(None),
            Err(e) => Err(ClusterError::MalformedResponse {
                node_id: node.node_id.clone(),
                reason: e.to_string(),
            }),
        }
    }

    async fn fetch_entries(
        &self,
        node: &NodeInfo,
        category: Option<&str>,
        passphrase: &str,
    ) -> Result<Vec<DecryptedEntry>, ClusterError> {
        let target = self.cluster.check(node)?;
        let ctx = target.key_cache.get_or_derive(passphrase);
        let filter = ListFilter {
            category: category.map(String::from),
            environment: None,
            include_timestamps: false,
        };
        target
            .store
            .list(&filter, &ctx)
            .map_err(|e| ClusterError::MalformedResponse {
                node_id: node.node_id.clone(),
                reason: e.to_string(),
            })
    }

    async fn replicate_create(
        &self,
        node: &NodeInfo,
        write: &ReplicatedWrite,
        passphrase: &str,
    ) -> Result<(), ClusterError> {
        self.apply_upsert(node, write, passphrase)
    }

    async fn replicate_update(
        &self,
        node: &NodeInfo,
        write: &ReplicatedWrite,
        passphrase: &str,
    ) -> Result<(), ClusterError> {
        self.apply_upsert(node, write, passphrase)
    }

    async fn replicate_delete(
        &self,
        node: &NodeInfo,
        key: &str,
        environment: &str,
        _passphrase: &str,
    ) -> Result<(), ClusterError> {
        let target = self.cluster.check(node)?;
        match target.store.delete(key, environment) {
            Ok(()) | Err(shared_types::StoreError::NotFound { .. }) => Ok(()),
            Err(e) => Err(ClusterError::MalformedResponse {
                node_id: node.node_id.clone(),
                reason: e.to_string(),
            }),
        }
    }

    async fn fetch_salt(&self, node: &NodeInfo) -> Result<Option<Vec<u8>>, ClusterError> {
        let target = self.cluster.check(node)?;
        Ok(Some(target.key_cache.salt().as_bytes().to_vec()))
    }

    async fn push_salt(
        &self,
        node: &NodeInfo,
        salt: &[u8],
    ) -> Result<SaltPushOutcome, ClusterError> {
        let target = self.cluster.check(node)?;
        if target.key_cache.salt().as_bytes() == salt {
            Ok(SaltPushOutcome::AlreadyPresent)
        } else {
            Err(ClusterError::SaltConflict {
                node_id: node.node_id.clone(),
            })
        }
    }
}

impl ClusterTransport {
    fn apply_upsert(
        &self,
        node: &NodeInfo,
        write: &ReplicatedWrite,
        passphrase: &str,
    ) -> Result<(), ClusterError> {
        let target = self.cluster.check(node)?;
        let ctx = target.key_cache.get_or_derive(passphrase);
        target
            .store
            .upsert_replica(
                &write.key,
                &write.environment,
                &write.value,
                write.category.clone(),
                &ctx,
            )
            .map(|_| ())
            .map_err(|e| ClusterError::MalformedResponse {
                node_id: node.node_id.clone(),
                reason: e.to_string(),
            })
    }
}

/// [`MetadataSource`] over one test node.
pub struct NodeMetadata {
    node: Arc<TestNode>,
}

impl MetadataSource for NodeMetadata {
    fn local_summaries(&self) -> Vec<EntrySummary> {
        self.node.store.list_summaries(None, None).unwrap_or_default()
    }
}
