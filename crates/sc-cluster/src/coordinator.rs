//! # Cluster Coordinator
//!
//! Owns the background loops (peer health probing and, in REPLICA mode,
//! periodic reconciliation), best-effort write broadcast, and the federated
//! query paths. All peer I/O goes through the [`PeerTransport`] port.
//!
//! ## Lifecycle
//!
//! ```text
//! Stopped --start()--> Starting --> Running --stop()--> Stopping --> Stopped
//! ```
//!
//! `start` spawns the loops and returns; `stop` signals shutdown via a watch
//! channel and awaits the loop tasks. Both reject calls from the wrong state.

use crate::errors::ClusterError;
use crate::manifest::SyncManifest;
use crate::node::{ClusterMode, NodeInfo, NodeRegistry};
use crate::ports::{MetadataSource, PeerTransport, ReplicatedWrite};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use shared_types::DecryptedEntry;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Coordinator configuration, filled from node settings.
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    /// This node's identifier ("host:port").
    pub node_id: String,
    /// Operating mode.
    pub mode: ClusterMode,
    /// Interval between health probe rounds.
    pub health_check_interval: Duration,
    /// Interval between reconciliation cycles (REPLICA mode only).
    pub sync_interval: Duration,
}

/// Coordinator lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordinatorState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

impl CoordinatorState {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
        }
    }
}

/// Point-in-time cluster view, served by the status endpoint.
///
/// Peer counts and `nodes` cover the configured peers only; the reporting
/// node identifies itself through `node_id` and is never counted among
/// its own peers.
#[derive(Debug, Clone, Serialize)]
pub struct ClusterStatus {
    pub node_id: String,
    pub mode: ClusterMode,
    pub state: CoordinatorState,
    /// Configured peers, excluding this node.
    pub total_peers: usize,
    /// Peers whose last health probe succeeded, excluding this node.
    pub healthy_peers: usize,
    pub nodes: Vec<NodeInfo>,
    pub last_sync_time: Option<DateTime<Utc>>,
    pub manifest_entries: usize,
}

/// Outcome of one best-effort broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BroadcastOutcome {
    /// Peers that acknowledged the write.
    pub delivered: usize,
    /// Peers that failed; local state is already committed regardless.
    pub failed: usize,
}

#[derive(Clone, Copy)]
enum WriteKind {
    Create,
    Update,
}

/// Coordinates peer health, replication, and reconciliation for one node.
pub struct ClusterCoordinator<T: PeerTransport + 'static> {
    config: ClusterConfig,
    registry: Arc<NodeRegistry>,
    transport: Arc<T>,
    metadata: Arc<dyn MetadataSource>,
    state: RwLock<CoordinatorState>,
    manifest: Mutex<SyncManifest>,
    sync_in_progress: AtomicBool,
    last_sync_time: RwLock<Option<DateTime<Utc>>>,
    shutdown_tx: Mutex<Option<watch::Sender<bool>>>,
    handles: tokio::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl<T: PeerTransport + 'static> ClusterCoordinator<T> {
    #[must_use]
    pub fn new(
        config: ClusterConfig,
        registry: Arc<NodeRegistry>,
        transport: Arc<T>,
        metadata: Arc<dyn MetadataSource>,
    ) -> Self {
        info!(
            node_id = %config.node_id,
            mode = %config.mode,
            peers = registry.len(),
            "Initializing cluster coordinator"
        );
        Self {
            config,
            registry,
            transport,
            metadata,
            state: RwLock::new(CoordinatorState::Stopped),
            manifest: Mutex::new(SyncManifest::new()),
            sync_in_progress: AtomicBool::new(false),
            last_sync_time: RwLock::new(None),
            shutdown_tx: Mutex::new(None),
            handles: tokio::sync::Mutex::new(Vec::new()),
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> CoordinatorState {
        *self.state.read()
    }

    #[must_use]
    pub fn mode(&self) -> ClusterMode {
        self.config.mode
    }

    #[must_use]
    pub fn node_id(&self) -> &str {
        &self.config.node_id
    }

    #[must_use]
    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    /// Spawn the health loop (and the sync loop in REPLICA mode).
    ///
    /// # Errors
    ///
    /// `ClusterError::InvalidState` unless the coordinator is `Stopped`.
    pub async fn start(self: &Arc<Self>) -> Result<(), ClusterError> {
        self.transition(CoordinatorState::Stopped, CoordinatorState::Starting)?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        *self.shutdown_tx.lock() = Some(shutdown_tx);

        let mut handles = self.handles.lock().await;
        handles.push(tokio::spawn(Arc::clone(self).health_loop(shutdown_rx.clone())));
        if self.config.mode == ClusterMode::Replica {
            handles.push(tokio::spawn(Arc::clone(self).sync_loop(shutdown_rx)));
        }
        drop(handles);

        *self.state.write() = CoordinatorState::Running;
        info!(node_id = %self.config.node_id, "Cluster coordinator running");
        Ok(())
    }

    /// Signal shutdown and await the background loops.
    ///
    /// # Errors
    ///
    /// `ClusterError::InvalidState` unless the coordinator is `Running`.
    pub async fn stop(&self) -> Result<(), ClusterError> {
        self.transition(CoordinatorState::Running, CoordinatorState::Stopping)?;

        if let Some(tx) = self.shutdown_tx.lock().take() {
            let _ = tx.send(true);
        }
        let handles = std::mem::take(&mut *self.handles.lock().await);
        for handle in handles {
            if let Err(err) = handle.await {
                warn!(%err, "Coordinator task aborted during shutdown");
            }
        }

        *self.state.write() = CoordinatorState::Stopped;
        info!(node_id = %self.config.node_id, "Cluster coordinator stopped");
        Ok(())
    }

    fn transition(
        &self,
        expected: CoordinatorState,
        next: CoordinatorState,
    ) -> Result<(), ClusterError> {
        let mut state = self.state.write();
        if *state != expected {
            return Err(ClusterError::InvalidState {
                expected: expected.as_str(),
                actual: state.as_str(),
            });
        }
        *state = next;
        Ok(())
    }

    async fn health_loop(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.config.health_check_interval);
        // First tick fires immediately so peers get probed right after startup.
        loop {
            tokio::select! {
                _ = ticker.tick() => self.check_peers_once().await,
                _ = shutdown.changed() => {
                    debug!("Health loop shutting down");
                    return;
                }
            }
        }
    }

    async fn sync_loop(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.config.sync_interval);
        ticker.tick().await; // consume the immediate tick; first cycle runs after one interval
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_sync_cycle().await;
                }
                _ = shutdown.changed() => {
                    debug!("Sync loop shutting down");
                    return;
                }
            }
        }
    }

    /// Probe every registered peer once and record the outcomes.
    pub async fn check_peers_once(&self) {
        let peers = self.registry.all();
        let probes = peers.iter().map(|peer| {
            let transport = Arc::clone(&self.transport);
            async move { (peer, transport.check_health(peer).await) }
        });
        for (peer, outcome) in join_all(probes).await {
            let healthy = outcome.is_ok();
            if healthy != peer.is_healthy {
                if healthy {
                    info!(node_id = %peer.node_id, "Peer recovered");
                } else {
                    warn!(node_id = %peer.node_id, "Peer became unhealthy");
                }
            }
            self.registry.set_health(&peer.node_id, healthy);
        }
    }

    /// Run one reconciliation cycle: seed the manifest from local metadata,
    /// then merge summaries from every healthy peer last-writer-wins.
    ///
    /// Cycles never overlap; an in-flight cycle makes this a no-op.
    pub async fn run_sync_cycle(&self) {
        if self
            .sync_in_progress
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Sync already in progress, skipping cycle");
            return;
        }

        let local = self.metadata.local_summaries();
        let peers = self.registry.healthy();
        let fetches = peers.iter().map(|peer| {
            let transport = Arc::clone(&self.transport);
            async move { (peer.node_id.clone(), transport.fetch_summaries(peer).await) }
        });
        let results = join_all(fetches).await;

        let mut changed = 0;
        {
            let mut manifest = self.manifest.lock();
            manifest.seed(local);
            for (node_id, result) in results {
                match result {
                    Ok(summaries) => changed += manifest.merge(summaries),
                    Err(err) => warn!(node_id, %err, "Summary fetch failed during sync"),
                }
            }
        }

        *self.last_sync_time.write() = Some(Utc::now());
        self.sync_in_progress.store(false, Ordering::SeqCst);
        debug!(changed, "Reconciliation cycle complete");
    }

    /// Broadcast a create to all healthy peers, best-effort.
    pub async fn broadcast_create(
        &self,
        write: &ReplicatedWrite,
        passphrase: &str,
    ) -> BroadcastOutcome {
        self.broadcast(WriteKind::Create, write, passphrase).await
    }

    /// Broadcast an update to all healthy peers, best-effort.
    pub async fn broadcast_update(
        &self,
        write: &ReplicatedWrite,
        passphrase: &str,
    ) -> BroadcastOutcome {
        self.broadcast(WriteKind::Update, write, passphrase).await
    }

    /// Broadcast a delete to all healthy peers, best-effort.
    pub async fn broadcast_delete(
        &self,
        key: &str,
        environment: &str,
        passphrase: &str,
    ) -> BroadcastOutcome {
        let peers = self.registry.healthy();
        let sends = peers.iter().map(|peer| {
            let transport = Arc::clone(&self.transport);
            async move {
                (
                    peer.node_id.clone(),
                    transport
                        .replicate_delete(peer, key, environment, passphrase)
                        .await,
                )
            }
        });
        Self::tally(join_all(sends).await)
    }

    async fn broadcast(
        &self,
        kind: WriteKind,
        write: &ReplicatedWrite,
        passphrase: &str,
    ) -> BroadcastOutcome {
        let peers = self.registry.healthy();
        let sends = peers.iter().map(|peer| {
            let transport = Arc::clone(&self.transport);
            async move {
                let result = match kind {
                    WriteKind::Create => transport.replicate_create(peer, write, passphrase).await,
                    WriteKind::Update => transport.replicate_update(peer, write, passphrase).await,
                };
                (peer.node_id.clone(), result)
            }
        });
        Self::tally(join_all(sends).await)
    }

    fn tally(results: Vec<(String, Result<(), ClusterError>)>) -> BroadcastOutcome {
        let mut outcome = BroadcastOutcome::default();
        for (node_id, result) in results {
            match result {
                Ok(()) => outcome.delivered += 1,
                Err(err) => {
                    outcome.failed += 1;
                    // Replication is best-effort; reconciliation repairs gaps.
                    warn!(node_id, %err, "Replication to peer failed");
                }
            }
        }
        outcome
    }

    /// FEDERATED read path: ask healthy peers in turn, first hit wins.
    pub async fn federated_read(
        &self,
        key: &str,
        environment: &str,
        passphrase: &str,
    ) -> Option<DecryptedEntry> {
        for peer in self.registry.healthy() {
            match self
                .transport
                .fetch_entry(&peer, key, environment, passphrase)
                .await
            {
                Ok(Some(entry)) => {
                    debug!(node_id = %peer.node_id, key, "Federated read hit");
                    return Some(entry);
                }
                Ok(None) => {}
                Err(err) => {
                    warn!(node_id = %peer.node_id, %err, "Federated read failed");
                }
            }
        }
        None
    }

    /// FEDERATED list path: query all healthy peers and merge, keeping the
    /// first occurrence of each key.
    pub async fn federated_list(
        &self,
        category: Option<&str>,
        passphrase: &str,
    ) -> Vec<DecryptedEntry> {
        let peers = self.registry.healthy();
        let fetches = peers.iter().map(|peer| {
            let transport = Arc::clone(&self.transport);
            async move {
                (
                    peer.node_id.clone(),
                    transport.fetch_entries(peer, category, passphrase).await,
                )
            }
        });

        let mut merged = Vec::new();
        let mut seen = HashSet::new();
        for (node_id, result) in join_all(fetches).await {
            match result {
                Ok(entries) => {
                    for entry in entries {
                        if seen.insert(entry.key.clone()) {
                            merged.push(entry);
                        }
                    }
                }
                Err(err) => warn!(node_id, %err, "Federated list failed"),
            }
        }
        merged
    }

    /// Number of entries in the last-merged sync manifest.
    #[must_use]
    pub fn sync_manifest_len(&self) -> usize {
        self.manifest.lock().len()
    }

    /// Snapshot of cluster health and sync state.
    #[must_use]
    pub fn status(&self) -> ClusterStatus {
        ClusterStatus {
            node_id: self.config.node_id.clone(),
            mode: self.config.mode,
            state: self.state(),
            total_peers: self.registry.len(),
            healthy_peers: self.registry.healthy_count(),
            nodes: self.registry.all(),
            last_sync_time: *self.last_sync_time.read(),
            manifest_entries: self.sync_manifest_len(),
        }
    }
}
