//! # Shared Crypto - Key Derivation and Authenticated Encryption
//!
//! Every configuration value is encrypted at rest with a key derived from two
//! components:
//!
//! - a **shared salt**: 64 random bytes generated once per cluster and held
//!   byte-identical on every node, and
//! - a **caller passphrase**: supplied per request, never persisted.
//!
//! ## Security Properties
//!
//! - **PBKDF2-HMAC-SHA256, 480k iterations**: deliberately slow derivation;
//!   callers cache one [`EncryptionContext`] per passphrase per session.
//! - **XChaCha20-Poly1305**: authenticated encryption, so a wrong passphrase
//!   or tampered ciphertext fails decryption instead of returning garbage.
//! - **Zeroization**: derived keys are wiped from memory on drop.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod cache;
pub mod context;
pub mod errors;
pub mod salt;

pub use cache::KeyContextCache;
pub use context::EncryptionContext;
pub use errors::CryptoError;
pub use salt::Salt;

/// Length of the shared salt in bytes.
pub const SALT_LEN: usize = 64;

/// PBKDF2 iteration count (OWASP recommendation for SHA-256, 2023+).
pub const KDF_ITERATIONS: u32 = 480_000;

/// Derived symmetric key length in bytes.
pub const KEY_LEN: usize = 32;
