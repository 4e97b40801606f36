//! # Encrypted Store Subsystem
//!
//! Persistent keyed storage for encrypted configuration entries. Values are
//! encrypted with a caller-supplied [`EncryptionContext`] before they reach
//! the storage backend and decrypted on the way out; the backend only ever
//! sees ciphertext.
//!
//! ## Architecture
//!
//! The store is written against the [`KeyValueStore`] outbound port. The
//! production adapter (RocksDB) lives in node-runtime; [`MemoryKvStore`]
//! backs unit and integration tests.
//!
//! ## Invariants
//!
//! - At most one entry per (key, environment); enforced by the record key
//!   layout plus a write lock that serializes mutations, so concurrent
//!   creates cannot race.
//! - `environment` is mandatory; key and environment are immutable after
//!   creation.
//!
//! All operations are synchronous and backend-bound; async callers offload
//! them with `tokio::task::spawn_blocking`.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod memory;
pub mod ports;
pub mod store;

pub use memory::MemoryKvStore;
pub use ports::{KvError, KeyValueStore};
pub use store::{EncryptedStore, ListFilter, StoreStatistics, UpsertOutcome};

pub use shared_crypto::EncryptionContext;
pub use shared_types::StoreError;
