//! # Application Context
//!
//! Everything the HTTP handlers need, wired once at startup and passed as
//! axum state. No globals; tests assemble their own context over in-memory
//! adapters.

use crate::adapters::HttpPeerTransport;
use crate::settings::NodeSettings;
use sc_cluster::ClusterCoordinator;
use sc_events::EventBus;
use sc_store::EncryptedStore;
use shared_crypto::KeyContextCache;
use std::sync::Arc;

/// Shared handler state.
#[derive(Clone)]
pub struct AppContext {
    pub settings: Arc<NodeSettings>,
    pub store: Arc<EncryptedStore>,
    pub key_cache: Arc<KeyContextCache>,
    pub events: Arc<EventBus>,
    /// Present only when clustering is enabled.
    pub coordinator: Option<Arc<ClusterCoordinator<HttpPeerTransport>>>,
}

impl AppContext {
    /// This node's cluster identifier.
    #[must_use]
    pub fn node_id(&self) -> &str {
        &self.settings.node_id
    }
}
