//! Crypto error types.

use thiserror::Error;

/// Cryptographic operation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CryptoError {
    /// Encryption failed
    #[error("Encryption failed: {0}")]
    Encryption(String),

    /// Wrong key or corrupted/tampered ciphertext
    #[error("Decryption failed: {0}")]
    Decryption(String),

    /// Ciphertext is not valid base64 or is too short to hold a nonce
    #[error("Malformed ciphertext: {0}")]
    MalformedCiphertext(String),

    /// Salt material has the wrong length
    #[error("Invalid salt length: expected {expected}, got {actual}")]
    InvalidSaltLength {
        /// Expected salt length in bytes
        expected: usize,
        /// Actual salt length in bytes
        actual: usize,
    },

    /// Salt file could not be read or written
    #[error("Salt I/O error: {0}")]
    SaltIo(String),
}
