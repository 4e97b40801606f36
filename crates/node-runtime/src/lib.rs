//! # SecureConf Node Runtime
//!
//! Composition root for a single node: production adapters (RocksDB
//! storage, HTTP peer transport), the axum HTTP surface, and the startup /
//! shutdown sequence. All domain logic lives in the library crates; this
//! crate only wires them together.
//!
//! ```text
//!                    ┌─────────────────────────────┐
//!                    │        HTTP handlers        │
//!                    └──────┬───────┬───────┬──────┘
//!                           │       │       │
//!                  ┌────────▼──┐ ┌──▼────┐ ┌▼──────────┐
//!                  │ sc-store  │ │sc-    │ │ sc-cluster│
//!                  │ (RocksDB) │ │events │ │ (reqwest) │
//!                  └───────────┘ └───────┘ └───────────┘
//! ```

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod adapters;
pub mod context;
pub mod error;
pub mod handlers;
pub mod settings;

pub use context::AppContext;
pub use error::ApiError;
pub use settings::NodeSettings;
