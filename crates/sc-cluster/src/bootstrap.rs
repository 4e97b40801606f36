//! # Salt Bootstrap
//!
//! Distributes the cluster-wide encryption salt at startup so every node
//! derives byte-identical keys from the same passphrase.
//!
//! The sequence:
//!
//! 1. A node that already holds salt pushes it to every peer.
//! 2. A node without salt asks each peer in turn and adopts the first answer.
//! 3. If no node holds salt, the lexicographically smallest node id is
//!    elected generator. The generator creates fresh material, persists it,
//!    waits a short grace period for slow peers, then pushes it out.
//!    Non-elected nodes poll with fixed backoff until the salt arrives or
//!    the retry budget runs out.
//!
//! The election is deterministic but unsynchronized: two nodes started
//! before either can observe the other may disagree on membership and both
//! generate. Conflicting salt is surfaced as [`ClusterError::SaltConflict`]
//! on the next push rather than silently overwritten; resolution is an
//! operator decision.

use crate::errors::ClusterError;
use crate::node::NodeInfo;
use crate::ports::PeerTransport;
use crate::{BOOTSTRAP_BACKOFF_SECS, BOOTSTRAP_GRACE_SECS, BOOTSTRAP_RETRIES};
use shared_crypto::Salt;
use std::time::Duration;
use tracing::{info, warn};

/// Resolve the cluster salt for this node.
///
/// `existing` is the locally persisted salt, if any. `persist` is called
/// exactly once when salt is adopted from a peer or freshly generated;
/// an already-held salt is not re-persisted.
///
/// # Errors
///
/// - `ClusterError::SaltConflict` if a peer holds different salt material.
/// - `ClusterError::SaltBootstrapFailed` if no peer produced the salt within
///   the retry budget.
/// - `ClusterError::SaltPersistence` if the adopted salt cannot be written.
pub async fn bootstrap_salt<T, F>(
    transport: &T,
    self_id: &str,
    peers: &[NodeInfo],
    existing: Option<Salt>,
    persist: F,
) -> Result<Salt, ClusterError>
where
    T: PeerTransport + ?Sized,
    F: Fn(&Salt) -> Result<(), ClusterError>,
{
    if let Some(salt) = existing {
        push_to_peers(transport, peers, &salt).await?;
        return Ok(salt);
    }

    if let Some(salt) = fetch_from_any(transport, peers).await? {
        persist(&salt)?;
        info!("Adopted cluster salt from a peer");
        return Ok(salt);
    }

    if is_elected_generator(self_id, peers) {
        let salt = Salt::generate();
        persist(&salt)?;
        info!(node_id = self_id, "Elected salt generator; distributing");
        // Grace period so peers still starting up can accept the push.
        tokio::time::sleep(Duration::from_secs(BOOTSTRAP_GRACE_SECS)).await;
        push_to_peers(transport, peers, &salt).await?;
        return Ok(salt);
    }

    poll_for_salt(transport, peers, persist).await
}

/// Election: the node whose id sorts strictly before every peer generates.
/// A peer sharing our id must never make both sides generate, so ties lose.
fn is_elected_generator(self_id: &str, peers: &[NodeInfo]) -> bool {
    peers.iter().all(|peer| self_id < peer.node_id.as_str())
}

/// Push salt to every peer. Unreachable peers are logged and skipped; a
/// conflicting peer aborts the bootstrap.
async fn push_to_peers<T>(transport: &T, peers: &[NodeInfo], salt: &Salt) -> Result<(), ClusterError>
where
    T: PeerTransport + ?Sized,
{
    for peer in peers {
        match transport.push_salt(peer, salt.as_bytes()).await {
            Ok(_) => {}
            Err(ClusterError::PeerUnreachable { node_id, reason }) => {
                warn!(node_id, reason, "Peer unreachable during salt push");
            }
            Err(err) => return Err(err),
        }
    }
    Ok(())
}

/// Ask each peer once for its salt; first answer wins.
async fn fetch_from_any<T>(
    transport: &T,
    peers: &[NodeInfo],
) -> Result<Option<Salt>, ClusterError>
where
    T: PeerTransport + ?Sized,
{
    for peer in peers {
        match transport.fetch_salt(peer).await {
            Ok(Some(bytes)) => {
                let salt =
                    Salt::from_bytes(&bytes).map_err(|e| ClusterError::MalformedResponse {
                        node_id: peer.node_id.clone(),
                        reason: e.to_string(),
                    })?;
                return Ok(Some(salt));
            }
            Ok(None) => {}
            Err(err) => {
                warn!(node_id = %peer.node_id, %err, "Salt fetch failed");
            }
        }
    }
    Ok(None)
}

/// Non-elected path: poll peers with fixed backoff until the generator's
/// push lands or the budget runs out.
async fn poll_for_salt<T, F>(
    transport: &T,
    peers: &[NodeInfo],
    persist: F,
) -> Result<Salt, ClusterError>
where
    T: PeerTransport + ?Sized,
    F: Fn(&Salt) -> Result<(), ClusterError>,
{
    for attempt in 1..=BOOTSTRAP_RETRIES {
        tokio::time::sleep(Duration::from_secs(BOOTSTRAP_BACKOFF_SECS)).await;
        if let Some(salt) = fetch_from_any(transport, peers).await? {
            persist(&salt)?;
            info!(attempt, "Received cluster salt from generator");
            return Ok(salt);
        }
    }
    Err(ClusterError::SaltBootstrapFailed {
        attempts: BOOTSTRAP_RETRIES,
    })
}
