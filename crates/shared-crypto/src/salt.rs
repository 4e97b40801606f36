//! # Shared Salt
//!
//! The 64-byte secret salt combined with a caller passphrase during key
//! derivation. Generated once (by exactly one node during cluster bootstrap,
//! or on first single-node startup) and persisted verbatim; every node must
//! hold byte-identical salt or cross-node decryption becomes impossible.

use crate::{CryptoError, SALT_LEN};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use tracing::info;

/// The cluster-wide secret salt.
#[derive(Clone, PartialEq, Eq)]
pub struct Salt([u8; SALT_LEN]);

impl Salt {
    /// Wrap existing salt material.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::InvalidSaltLength` if `bytes` is not exactly
    /// [`SALT_LEN`] bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let arr: [u8; SALT_LEN] =
            bytes
                .try_into()
                .map_err(|_| CryptoError::InvalidSaltLength {
                    expected: SALT_LEN,
                    actual: bytes.len(),
                })?;
        Ok(Self(arr))
    }

    /// Generate fresh random salt material.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Get the raw salt bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; SALT_LEN] {
        &self.0
    }

    /// Short hex fingerprint for logs. Derived from a digest so the salt
    /// material itself never appears.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.0);
        hex::encode(&digest[..4])
    }

    /// Load salt from `path`.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::SaltIo` on read failure and
    /// `CryptoError::InvalidSaltLength` if the file has the wrong size.
    pub fn load(path: &Path) -> Result<Self, CryptoError> {
        let bytes = fs::read(path).map_err(|e| CryptoError::SaltIo(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// Persist this salt to `path`, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::SaltIo` on write failure.
    pub fn persist(&self, path: &Path) -> Result<(), CryptoError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| CryptoError::SaltIo(e.to_string()))?;
            }
        }
        fs::write(path, self.0).map_err(|e| CryptoError::SaltIo(e.to_string()))
    }

    /// Load the salt from `path`, generating and persisting a fresh one on
    /// first startup.
    ///
    /// # Errors
    ///
    /// Propagates I/O and length errors from [`Salt::load`] / [`Salt::persist`].
    pub fn load_or_generate(path: &Path) -> Result<Self, CryptoError> {
        if path.exists() {
            Self::load(path)
        } else {
            let salt = Self::generate();
            salt.persist(path)?;
            info!(path = %path.display(), "Generated new encryption salt");
            Ok(salt)
        }
    }
}

// Manual Debug so salt bytes never leak into logs.
impl std::fmt::Debug for Salt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Salt(..)")
    }
}
