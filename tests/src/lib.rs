//! # SecureConf Test Suite
//!
//! Unified test crate containing cross-subsystem integration flows:
//!
//! ```text
//! tests/src/
//! ├── support/          # In-memory cluster fixture shared by the flows
//! └── integration/
//!     ├── store_flows.rs      # CRUD, encryption round-trips, statistics
//!     ├── event_flows.rs      # Subscription matching, backpressure, SSE bookkeeping
//!     ├── cluster_flows.rs    # Health fan-out, salt bootstrap, reconciliation
//!     └── http_federation.rs  # Federated reads over the real HTTP surface
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p sc-tests
//! cargo test -p sc-tests integration::cluster_flows
//! ```

#![allow(dead_code)]

pub mod integration;
pub mod support;
