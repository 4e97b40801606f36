//! # HTTP Peer Transport
//!
//! [`PeerTransport`] over the peers' own HTTP APIs. Replicated writes carry
//! an `X-Replicated-From` header naming the originating node; the receiving
//! handler applies them without re-broadcasting, which breaks the forwarding
//! loop. The caller's passphrase travels in `X-User-Key` so each node
//! encrypts with its own derived context.

use async_trait::async_trait;
use reqwest::StatusCode;
use sc_cluster::{ClusterError, NodeInfo, PeerTransport, ReplicatedWrite, SaltPushOutcome};
use serde_json::json;
use shared_types::{DecryptedEntry, EntrySummary};
use std::time::Duration;

/// Request timeout for peer calls.
const PEER_TIMEOUT_SECS: u64 = 10;

/// HTTP header carrying the caller passphrase.
pub const USER_KEY_HEADER: &str = "X-User-Key";
/// HTTP header carrying the static API key.
pub const API_KEY_HEADER: &str = "X-API-Key";
/// HTTP header marking a replicated write and naming its origin node.
pub const REPLICATED_FROM_HEADER: &str = "X-Replicated-From";
/// HTTP header marking a federated read issued by a peer. A node serving
/// such a request answers from its local store only; querying its own
/// peers here would let a missing key bounce between nodes forever.
pub const FEDERATED_QUERY_HEADER: &str = "X-Federated-Query";

/// Peer transport over reqwest.
pub struct HttpPeerTransport {
    client: reqwest::Client,
    node_id: String,
    api_key: Option<String>,
}

impl HttpPeerTransport {
    /// Build the transport for this node.
    ///
    /// # Errors
    ///
    /// `ClusterError::PeerUnreachable` if the underlying client cannot be
    /// constructed (invalid TLS setup).
    pub fn new(node_id: String, api_key: Option<String>) -> Result<Self, ClusterError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(PEER_TIMEOUT_SECS))
            .build()
            .map_err(|e| ClusterError::PeerUnreachable {
                node_id: node_id.clone(),
                reason: format!("HTTP client construction failed: {e}"),
            })?;
        Ok(Self {
            client,
            node_id,
            api_key,
        })
    }

    fn unreachable(node: &NodeInfo, err: &reqwest::Error) -> ClusterError {
        ClusterError::PeerUnreachable {
            node_id: node.node_id.clone(),
            reason: err.to_string(),
        }
    }

    fn bad_status(node: &NodeInfo, status: StatusCode) -> ClusterError {
        ClusterError::PeerUnreachable {
            node_id: node.node_id.clone(),
            reason: format!("unexpected status {status}"),
        }
    }

    fn malformed(node: &NodeInfo, err: &reqwest::Error) -> ClusterError {
        ClusterError::MalformedResponse {
            node_id: node.node_id.clone(),
            reason: err.to_string(),
        }
    }

    fn with_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => req.header(API_KEY_HEADER, key),
            None => req,
        }
    }

    fn replicated(&self, req: reqwest::RequestBuilder, passphrase: &str) -> reqwest::RequestBuilder {
        self.with_auth(req)
            .header(USER_KEY_HEADER, passphrase)
            .header(REPLICATED_FROM_HEADER, &self.node_id)
    }
}

#[async_trait]
impl PeerTransport for HttpPeerTransport {
    async fn check_health(&self, node: &NodeInfo) -> Result<(), ClusterError> {
        let response = self
            .client
            .get(format!("{}/health", node.base_url()))
            .send()
            .await
            .map_err(|e| Self::unreachable(node, &e))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::bad_status(node, response.status()))
        }
    }

    async fn fetch_summaries(&self, node: &NodeInfo) -> Result<Vec<EntrySummary>, ClusterError> {
        let response = self
            .with_auth(self.client.get(format!("{}/internal/configs", node.base_url())))
            .send()
            .await
            .map_err(|e| Self::unreachable(node, &e))?;
        if !response.status().is_success() {
            return Err(Self::bad_status(node, response.status()));
        }
        response.json().await.map_err(|e| Self::malformed(node, &e))
    }

    async fn fetch_entry(
        &self,
        node: &NodeInfo,
        key: &str,
        environment: &str,
        passphrase: &str,
    ) -> Result<Option<DecryptedEntry>, ClusterError> {
        let response = self
            .with_auth(
                self.client
                    .get(format!("{}/configs/{key}", node.base_url()))
                    .query(&[("environment", environment)]),
            )
            .header(USER_KEY_HEADER, passphrase)
            .header(FEDERATED_QUERY_HEADER, "1")
            .send()
            .await
            .map_err(|e| Self::unreachable(node, &e))?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => response
                .json()
                .await
                .map(Some)
                .map_err(|e| Self::malformed(node, &e)),
            status => Err(Self::bad_status(node, status)),
        }
    }

    async fn fetch_entries(
        &self,
        node: &NodeInfo,
        category: Option<&str>,
        passphrase: &str,
    ) -> Result<Vec<DecryptedEntry>, ClusterError> {
        let mut req = self.client.get(format!("{}/configs", node.base_url()));
        if let Some(category) = category {
            req = req.query(&[("category", category)]);
        }
        let response = self
            .with_auth(req)
            .header(USER_KEY_HEADER, passphrase)
            .header(FEDERATED_QUERY_HEADER, "1")
            .send()
            .await
            .map_err(|e| Self::unreachable(node, &e))?;
        if !response.status().is_success() {
            return Err(Self::bad_status(node, response.status()));
        }
        response.json().await.map_err(|e| Self::malformed(node, &e))
    }

    async fn replicate_create(
        &self,
        node: &NodeInfo,
        write: &ReplicatedWrite,
        passphrase: &str,
    ) -> Result<(), ClusterError> {
        let response = self
            .replicated(
                self.client.post(format!("{}/configs", node.base_url())),
                passphrase,
            )
            .json(&json!({
                "key": write.key,
                "environment": write.environment,
                "value": write.value,
                "category": write.category,
            }))
            .send()
            .await
            .map_err(|e| Self::unreachable(node, &e))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::bad_status(node, response.status()))
        }
    }

    async fn replicate_update(
        &self,
        node: &NodeInfo,
        write: &ReplicatedWrite,
        passphrase: &str,
    ) -> Result<(), ClusterError> {
        let response = self
            .replicated(
                self.client
                    .put(format!("{}/configs/{}", node.base_url(), write.key)),
                passphrase,
            )
            .json(&json!({
                "environment": write.environment,
                "value": write.value,
                "category": write.category,
            }))
            .send()
            .await
            .map_err(|e| Self::unreachable(node, &e))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::bad_status(node, response.status()))
        }
    }

    async fn replicate_delete(
        &self,
        node: &NodeInfo,
        key: &str,
        environment: &str,
        passphrase: &str,
    ) -> Result<(), ClusterError> {
        let response = self
            .replicated(
                self.client
                    .delete(format!("{}/configs/{key}", node.base_url()))
                    .query(&[("environment", environment)]),
                passphrase,
            )
            .send()
            .await
            .map_err(|e| Self::unreachable(node, &e))?;
        // A peer that never saw the entry answers 404; that is converged.
        if response.status().is_success() || response.status() == StatusCode::NOT_FOUND {
            Ok(())
        } else {
            Err(Self::bad_status(node, response.status()))
        }
    }

    async fn fetch_salt(&self, node: &NodeInfo) -> Result<Option<Vec<u8>>, ClusterError> {
        let response = self
            .with_auth(self.client.get(format!("{}/internal/salt", node.base_url())))
            .send()
            .await
            .map_err(|e| Self::unreachable(node, &e))?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let bytes = response
                    .bytes()
                    .await
                    .map_err(|e| Self::malformed(node, &e))?;
                Ok(Some(bytes.to_vec()))
            }
            status => Err(Self::bad_status(node, status)),
        }
    }

    async fn push_salt(
        &self,
        node: &NodeInfo,
        salt: &[u8],
    ) -> Result<SaltPushOutcome, ClusterError> {
        let response = self
            .with_auth(self.client.post(format!("{}/internal/salt", node.base_url())))
            .body(salt.to_vec())
            .send()
            .await
            .map_err(|e| Self::unreachable(node, &e))?;
        match response.status() {
            StatusCode::CREATED => Ok(SaltPushOutcome::Created),
            StatusCode::OK => Ok(SaltPushOutcome::AlreadyPresent),
            StatusCode::CONFLICT => Err(ClusterError::SaltConflict {
                node_id: node.node_id.clone(),
            }),
            status => Err(Self::bad_status(node, status)),
        }
    }
}
