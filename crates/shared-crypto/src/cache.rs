//! # Key Context Cache
//!
//! Key derivation runs 480k PBKDF2 iterations, so deriving per request would
//! dominate request latency. This cache holds one [`EncryptionContext`] per
//! passphrase for the lifetime of the process, keyed by the SHA-256 digest of
//! the passphrase (the passphrase itself is never stored).

use crate::{EncryptionContext, Salt};
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Session-lifetime cache of derived encryption contexts.
pub struct KeyContextCache {
    salt: Salt,
    contexts: RwLock<HashMap<[u8; 32], Arc<EncryptionContext>>>,
}

impl KeyContextCache {
    /// Create a cache bound to the node's shared salt.
    #[must_use]
    pub fn new(salt: Salt) -> Self {
        Self {
            salt,
            contexts: RwLock::new(HashMap::new()),
        }
    }

    /// The shared salt this cache derives against.
    #[must_use]
    pub fn salt(&self) -> &Salt {
        &self.salt
    }

    /// Get the cached context for `passphrase`, deriving it on first use.
    ///
    /// Derivation happens outside the lock; two racing callers may both
    /// derive, with one result discarded. Contexts for the same passphrase
    /// are interchangeable, so that race is harmless.
    pub fn get_or_derive(&self, passphrase: &str) -> Arc<EncryptionContext> {
        let digest: [u8; 32] = Sha256::digest(passphrase.as_bytes()).into();

        if let Some(ctx) = self.contexts.read().get(&digest) {
            return Arc::clone(ctx);
        }

        debug!("Deriving new encryption context");
        let ctx = Arc::new(EncryptionContext::derive(&self.salt, passphrase));
        let mut contexts = self.contexts.write();
        Arc::clone(contexts.entry(digest).or_insert(ctx))
    }

    /// Number of cached contexts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.contexts.read().len()
    }

    /// True when no context has been derived yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contexts.read().is_empty()
    }
}
