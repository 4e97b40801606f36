//! Metadata adapter bridging the coordinator's reconciliation loop to the
//! local encrypted store.

use sc_cluster::MetadataSource;
use sc_store::EncryptedStore;
use shared_types::EntrySummary;
use std::sync::Arc;
use tracing::warn;

/// [`MetadataSource`] over the local store.
pub struct StoreMetadataSource {
    store: Arc<EncryptedStore>,
}

impl StoreMetadataSource {
    #[must_use]
    pub fn new(store: Arc<EncryptedStore>) -> Self {
        Self { store }
    }
}

impl MetadataSource for StoreMetadataSource {
    fn local_summaries(&self) -> Vec<EntrySummary> {
        match self.store.list_summaries(None, None) {
            Ok(summaries) => summaries,
            Err(err) => {
                warn!(%err, "Failed to read local summaries for sync");
                Vec::new()
            }
        }
    }
}
