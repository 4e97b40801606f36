//! # Sync Manifest
//!
//! Reconciliation bookkeeping: a last-writer-wins view of entry metadata
//! across the cluster, keyed by (key, environment). Each sync cycle the
//! coordinator seeds the manifest from the local store's summaries, then
//! merges the metadata fetched from every healthy peer. The newer
//! `updated_at` wins; ties keep the already-merged side.
//!
//! The manifest holds metadata only. Values never cross this path.

use shared_types::EntrySummary;
use std::collections::HashMap;

/// LWW-merged view of cluster entry metadata.
#[derive(Debug, Default)]
pub struct SyncManifest {
    entries: HashMap<(String, String), EntrySummary>,
}

impl SyncManifest {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the manifest with the local store's current summaries.
    pub fn seed(&mut self, local: Vec<EntrySummary>) {
        self.entries = local
            .into_iter()
            .map(|s| ((s.key.clone(), s.environment.clone()), s))
            .collect();
    }

    /// Merge one peer's summaries, newest `updated_at` winning per
    /// (key, environment). Returns how many slots the peer's view changed.
    pub fn merge(&mut self, remote: Vec<EntrySummary>) -> usize {
        let mut changed = 0;
        for summary in remote {
            let slot = (summary.key.clone(), summary.environment.clone());
            match self.entries.get(&slot) {
                Some(existing) if existing.updated_at >= summary.updated_at => {}
                _ => {
                    self.entries.insert(slot, summary);
                    changed += 1;
                }
            }
        }
        changed
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up the merged metadata for one (key, environment) pair.
    #[must_use]
    pub fn get(&self, key: &str, environment: &str) -> Option<&EntrySummary> {
        self.entries
            .get(&(key.to_owned(), environment.to_owned()))
    }
}
