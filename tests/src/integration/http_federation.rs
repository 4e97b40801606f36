//! # HTTP Federation Flows
//!
//! Two nodes served by axum, federated reads travelling through the real
//! peer transport. Peer-issued queries carry `X-Federated-Query` and must
//! be answered from the receiving node's local store only, so a key
//! missing everywhere settles in one hop instead of bouncing between
//! nodes.

#[cfg(test)]
mod tests {
    use node_runtime::adapters::{
        HttpPeerTransport, StoreMetadataSource, FEDERATED_QUERY_HEADER, USER_KEY_HEADER,
    };
    use node_runtime::{handlers, AppContext, NodeSettings};
    use sc_cluster::{ClusterConfig, ClusterCoordinator, ClusterMode, NodeRegistry};
    use sc_events::EventBus;
    use sc_store::{EncryptedStore, MemoryKvStore};
    use serde_json::json;
    use shared_crypto::{KeyContextCache, Salt};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::net::TcpListener;

    const PASSPHRASE: &str = "federation-secret";

    /// Serve a FEDERATED node on `listener` and return its context.
    fn spawn_node(
        salt: &Salt,
        listener: TcpListener,
        node_id: &str,
        peers: &[&str],
    ) -> AppContext {
        let peer_addresses: Vec<String> = peers.iter().map(|p| (*p).to_string()).collect();
        let settings = Arc::new(NodeSettings {
            node_id: node_id.to_string(),
            cluster_enabled: true,
            cluster_mode: ClusterMode::Federated,
            cluster_nodes: peer_addresses.clone(),
            ..NodeSettings::default()
        });
        let store = Arc::new(EncryptedStore::new(Arc::new(MemoryKvStore::new())));
        let registry =
            Arc::new(NodeRegistry::from_addresses(node_id, &peer_addresses).unwrap());
        let transport = Arc::new(HttpPeerTransport::new(node_id.to_string(), None).unwrap());
        let metadata = Arc::new(StoreMetadataSource::new(Arc::clone(&store)));
        let coordinator = Arc::new(ClusterCoordinator::new(
            ClusterConfig {
                node_id: node_id.to_string(),
                mode: ClusterMode::Federated,
                health_check_interval: Duration::from_secs(60),
                sync_interval: Duration::from_secs(60),
            },
            registry,
            transport,
            metadata,
        ));

        let ctx = AppContext {
            settings,
            store,
            key_cache: Arc::new(KeyContextCache::new(salt.clone())),
            events: Arc::new(EventBus::new()),
            coordinator: Some(coordinator),
        };
        let app = handlers::router(ctx.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        ctx
    }

    /// Bind two ephemeral listeners and serve a node on each, peered with
    /// one another. Returns `(node_a_url, node_a_ctx, node_b_ctx)`.
    async fn two_node_cluster() -> (String, AppContext, AppContext) {
        let listener_a = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let listener_b = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr_a = listener_a.local_addr().unwrap().to_string();
        let addr_b = listener_b.local_addr().unwrap().to_string();

        let salt = Salt::generate();
        let ctx_a = spawn_node(&salt, listener_a, &addr_a, &[&addr_b]);
        let ctx_b = spawn_node(&salt, listener_b, &addr_b, &[&addr_a]);
        (format!("http://{addr_a}"), ctx_a, ctx_b)
    }

    /// Store an entry directly on a node, bypassing its HTTP surface.
    fn seed(ctx: &AppContext, key: &str, value: &serde_json::Value) {
        let enc = ctx.key_cache.get_or_derive(PASSPHRASE);
        ctx.store
            .create(key, "production", value, None, &enc)
            .unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_federated_read_fetches_from_peer_over_http() {
        let (base_a, _ctx_a, ctx_b) = two_node_cluster().await;
        let value = json!({"host": "db.remote", "port": 5432});
        seed(&ctx_b, "remote_db", &value);

        let client = reqwest::Client::new();
        let response = client
            .get(format!("{base_a}/configs/remote_db"))
            .query(&[("environment", "production")])
            .header(USER_KEY_HEADER, PASSPHRASE)
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["key"], "remote_db");
        assert_eq!(body["value"], value);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_peer_issued_query_is_answered_locally() {
        let (base_a, ctx_a, ctx_b) = two_node_cluster().await;
        seed(&ctx_a, "local_only", &json!({"source": "a"}));
        seed(&ctx_b, "remote_only", &json!({"source": "b"}));

        let client = reqwest::Client::new();

        // A federated query for a key this node lacks must not fan out to
        // peers, even though the peer holds it.
        let response = client
            .get(format!("{base_a}/configs/remote_only"))
            .query(&[("environment", "production")])
            .header(USER_KEY_HEADER, PASSPHRASE)
            .header(FEDERATED_QUERY_HEADER, "1")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);

        // Same for listing: only local entries come back.
        let response = client
            .get(format!("{base_a}/configs"))
            .header(USER_KEY_HEADER, PASSPHRASE)
            .header(FEDERATED_QUERY_HEADER, "1")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let entries: Vec<serde_json::Value> = response.json().await.unwrap();
        let keys: Vec<&str> = entries.iter().filter_map(|e| e["key"].as_str()).collect();
        assert_eq!(keys, vec!["local_only"]);

        // Without the marker the same list merges the peer's entries.
        let response = client
            .get(format!("{base_a}/configs"))
            .header(USER_KEY_HEADER, PASSPHRASE)
            .send()
            .await
            .unwrap();
        let entries: Vec<serde_json::Value> = response.json().await.unwrap();
        let mut keys: Vec<&str> = entries.iter().filter_map(|e| e["key"].as_str()).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["local_only", "remote_only"]);
    }
}
