//! # Error Types
//!
//! Storage error taxonomy shared across subsystems.

use thiserror::Error;

/// Errors that can occur in the encrypted store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Malformed input (empty key/environment, oversized labels).
    #[error("Validation failed: {0}")]
    Validation(String),

    /// An entry with the same (key, environment) already exists.
    #[error("Configuration with key '{key}' already exists in environment '{environment}'")]
    DuplicateKey { key: String, environment: String },

    /// No entry found for (key, environment).
    #[error("Configuration with key '{key}' not found in environment '{environment}'")]
    NotFound { key: String, environment: String },

    /// Wrong passphrase or corrupted/tampered ciphertext.
    #[error("Decryption failed: {0}")]
    Decryption(String),

    /// The underlying key-value store failed.
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// A stored record could not be decoded.
    #[error("Corrupt record for key '{0}'")]
    CorruptRecord(String),
}
