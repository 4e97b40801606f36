//! # Cluster Coordinator Subsystem
//!
//! Coordinates a set of loosely-coupled SecureConf nodes. Not a consensus
//! protocol: no leader terms, no log replication, no quorums. Consistency
//! across nodes is eventual and best-effort.
//!
//! ## Modes
//!
//! - **REPLICA**: every node holds a full copy. Writes are applied locally,
//!   then broadcast best-effort to healthy peers; a periodic reconciliation
//!   loop pulls entry metadata from peers and merges it last-writer-wins.
//! - **FEDERATED**: each node holds only what it received locally. A local
//!   read miss queries healthy peers in turn; lists query all healthy peers
//!   and merge, de-duplicating by key.
//!
//! ## Salt Bootstrap
//!
//! On startup the coordinator distributes the cluster-wide encryption salt:
//! a node that holds it pushes to peers; a node without one fetches from any
//! peer; if no salt exists anywhere, the lexicographically smallest node id
//! generates it. This is a one-time convenience for distributing initial
//! secret material, not a distributed lock; see [`bootstrap`] for the known
//! concurrent-startup race.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod bootstrap;
pub mod coordinator;
pub mod errors;
pub mod manifest;
pub mod node;
pub mod ports;

pub use bootstrap::bootstrap_salt;
pub use coordinator::{
    BroadcastOutcome, ClusterConfig, ClusterCoordinator, ClusterStatus, CoordinatorState,
};
pub use errors::ClusterError;
pub use manifest::SyncManifest;
pub use node::{ClusterMode, NodeInfo, NodeRegistry};
pub use ports::{MetadataSource, PeerTransport, ReplicatedWrite, SaltPushOutcome};

/// Default grace period the elected salt generator waits before pushing,
/// giving slower peers time to come up.
pub const BOOTSTRAP_GRACE_SECS: u64 = 2;

/// Number of polls a non-elected node makes while waiting for the salt.
pub const BOOTSTRAP_RETRIES: u32 = 5;

/// Fixed backoff between salt polls.
pub const BOOTSTRAP_BACKOFF_SECS: u64 = 2;
