//! Cluster error types.

use thiserror::Error;

/// Errors raised by cluster coordination.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClusterError {
    /// Peer could not be reached or answered with a failure status.
    #[error("Peer '{node_id}' unreachable: {reason}")]
    PeerUnreachable { node_id: String, reason: String },

    /// Peer already holds a different salt; the cluster is misconfigured.
    #[error("Salt conflict: node '{node_id}' holds different salt material")]
    SaltConflict { node_id: String },

    /// No peer produced the salt within the retry budget. Encryption is
    /// unusable on this node until an operator intervenes.
    #[error("Salt bootstrap failed after {attempts} attempts; encryption unavailable")]
    SaltBootstrapFailed { attempts: u32 },

    /// Salt could not be read from or written to disk.
    #[error("Salt persistence error: {0}")]
    SaltPersistence(String),

    /// A peer address in the configuration could not be parsed.
    #[error("Invalid node address '{0}': expected host:port")]
    InvalidNodeAddress(String),

    /// The coordinator is not in a state that allows the operation.
    #[error("Coordinator is {actual}, expected {expected}")]
    InvalidState {
        expected: &'static str,
        actual: &'static str,
    },

    /// Peer returned a payload that could not be decoded.
    #[error("Malformed response from '{node_id}': {reason}")]
    MalformedResponse { node_id: String, reason: String },
}
