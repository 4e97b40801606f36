//! # Cluster Integration Flows
//!
//! Coordinator behavior exercised against the in-memory cluster fixture:
//! health probing and fan-out exclusion, best-effort replication,
//! reconciliation of missed writes, salt bootstrap, and federated reads.

#[cfg(test)]
mod tests {
    use crate::support::{ClusterTransport, InMemoryCluster};
    use parking_lot::Mutex;
    use sc_cluster::{
        bootstrap_salt, ClusterConfig, ClusterCoordinator, ClusterError, ClusterMode,
        CoordinatorState, NodeRegistry, ReplicatedWrite,
    };
    use serde_json::json;
    use shared_crypto::Salt;
    use std::sync::Arc;
    use std::time::Duration;

    const NODE_A: &str = "node-a:9000";
    const NODE_B: &str = "node-b:9000";
    const NODE_C: &str = "node-c:9000";
    const PASSPHRASE: &str = "cluster-secret";

    fn coordinator(
        cluster: &Arc<InMemoryCluster>,
        node_id: &str,
        mode: ClusterMode,
        peers: &[&str],
    ) -> Arc<ClusterCoordinator<ClusterTransport>> {
        let addresses: Vec<String> = peers.iter().map(|s| (*s).to_string()).collect();
        let registry = Arc::new(NodeRegistry::from_addresses(node_id, &addresses).unwrap());
        let config = ClusterConfig {
            node_id: node_id.to_string(),
            mode,
            health_check_interval: Duration::from_millis(50),
            sync_interval: Duration::from_millis(50),
        };
        Arc::new(ClusterCoordinator::new(
            config,
            registry,
            cluster.transport(),
            cluster.metadata(node_id),
        ))
    }

    fn write(key: &str, value: serde_json::Value) -> ReplicatedWrite {
        ReplicatedWrite {
            key: key.to_string(),
            environment: "production".to_string(),
            value,
            category: Some("infra".to_string()),
        }
    }

    #[tokio::test]
    async fn test_broadcast_reaches_all_healthy_peers() {
        let cluster = InMemoryCluster::new(&[NODE_A, NODE_B, NODE_C]);
        let coord = coordinator(&cluster, NODE_A, ClusterMode::Replica, &[NODE_B, NODE_C]);

        let outcome = coord
            .broadcast_create(&write("database", json!({"host": "db.internal"})), PASSPHRASE)
            .await;
        assert_eq!(outcome.delivered, 2);
        assert_eq!(outcome.failed, 0);

        for peer in [NODE_B, NODE_C] {
            let node = cluster.node(peer);
            let ctx = node.key_cache.get_or_derive(PASSPHRASE);
            let entry = node.store.read("database", "production", &ctx, false).unwrap();
            assert_eq!(entry.value, json!({"host": "db.internal"}));
        }
    }

    #[tokio::test]
    async fn test_health_probe_excludes_down_peer_until_rejoin() {
        let cluster = InMemoryCluster::new(&[NODE_A, NODE_B, NODE_C]);
        let coord = coordinator(&cluster, NODE_A, ClusterMode::Replica, &[NODE_B, NODE_C]);

        cluster.set_reachable(NODE_C, false);
        coord.check_peers_once().await;
        assert_eq!(coord.registry().healthy_count(), 1);

        let outcome = coord
            .broadcast_create(&write("cache", json!({"ttl": 60})), PASSPHRASE)
            .await;
        assert_eq!(outcome.delivered, 1);
        assert_eq!(outcome.failed, 0);

        let node_b = cluster.node(NODE_B);
        let ctx = node_b.key_cache.get_or_derive(PASSPHRASE);
        assert!(node_b.store.read("cache", "production", &ctx, false).is_ok());
        let node_c = cluster.node(NODE_C);
        let ctx = node_c.key_cache.get_or_derive(PASSPHRASE);
        assert!(node_c.store.read("cache", "production", &ctx, false).is_err());

        // Peer comes back: the next probe readmits it to the fan-out set.
        cluster.set_reachable(NODE_C, true);
        coord.check_peers_once().await;
        assert_eq!(coord.registry().healthy_count(), 2);

        let outcome = coord
            .broadcast_update(&write("cache", json!({"ttl": 120})), PASSPHRASE)
            .await;
        assert_eq!(outcome.delivered, 2);
        let node_c = cluster.node(NODE_C);
        let ctx = node_c.key_cache.get_or_derive(PASSPHRASE);
        let entry = node_c.store.read("cache", "production", &ctx, false).unwrap();
        assert_eq!(entry.value, json!({"ttl": 120}));
    }

    #[tokio::test]
    async fn test_sync_cycle_learns_missed_writes() {
        let cluster = InMemoryCluster::new(&[NODE_A, NODE_B]);
        let coord = coordinator(&cluster, NODE_A, ClusterMode::Replica, &[NODE_B]);
        coord.check_peers_once().await;

        // A write lands on node-b while node-a was not listening.
        let node_b = cluster.node(NODE_B);
        let ctx = node_b.key_cache.get_or_derive(PASSPHRASE);
        node_b
            .store
            .create("feature_flags", "staging", &json!({"beta": true}), None, &ctx)
            .unwrap();

        assert_eq!(coord.sync_manifest_len(), 0);
        coord.run_sync_cycle().await;
        assert_eq!(coord.sync_manifest_len(), 1);

        let status = coord.status();
        assert!(status.last_sync_time.is_some());
        assert_eq!(status.manifest_entries, 1);
    }

    #[tokio::test]
    async fn test_coordinator_lifecycle_with_background_loops() {
        let cluster = InMemoryCluster::new(&[NODE_A, NODE_B]);
        let coord = coordinator(&cluster, NODE_A, ClusterMode::Replica, &[NODE_B]);

        assert_eq!(coord.state(), CoordinatorState::Stopped);
        coord.start().await.unwrap();
        assert_eq!(coord.state(), CoordinatorState::Running);
        assert!(matches!(
            coord.start().await,
            Err(ClusterError::InvalidState { .. })
        ));

        // First health tick fires immediately.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(coord.registry().healthy_count(), 1);

        coord.stop().await.unwrap();
        assert_eq!(coord.state(), CoordinatorState::Stopped);
    }

    #[tokio::test]
    async fn test_salt_bootstrap_adopts_peer_salt() {
        let cluster = InMemoryCluster::new(&[NODE_A, NODE_B, NODE_C]);
        let registry =
            NodeRegistry::from_addresses(NODE_C, &[NODE_A.to_string(), NODE_B.to_string()])
                .unwrap();
        let transport = cluster.transport();

        let persisted = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&persisted);
        let salt = bootstrap_salt(transport.as_ref(), NODE_C, &registry.all(), None, move |s| {
            *sink.lock() = Some(s.clone());
            Ok(())
        })
        .await
        .unwrap();

        assert_eq!(salt.as_bytes(), cluster.salt.as_bytes());
        let stored = persisted.lock();
        assert_eq!(stored.as_ref().unwrap().as_bytes(), cluster.salt.as_bytes());
    }

    #[tokio::test(start_paused = true)]
    async fn test_salt_bootstrap_smallest_node_generates_when_alone() {
        let cluster = InMemoryCluster::new(&[NODE_A, NODE_B, NODE_C]);
        cluster.set_reachable(NODE_B, false);
        cluster.set_reachable(NODE_C, false);
        let registry =
            NodeRegistry::from_addresses(NODE_A, &[NODE_B.to_string(), NODE_C.to_string()])
                .unwrap();
        let transport = cluster.transport();

        let persisted = Arc::new(Mutex::new(None::<Salt>));
        let sink = Arc::clone(&persisted);
        let salt = bootstrap_salt(transport.as_ref(), NODE_A, &registry.all(), None, move |s| {
            *sink.lock() = Some(s.clone());
            Ok(())
        })
        .await
        .unwrap();

        // node-a sorts before its peers, so it generated fresh material.
        assert_ne!(salt.as_bytes(), cluster.salt.as_bytes());
        assert!(persisted.lock().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_salt_bootstrap_non_elected_node_fails_without_generator() {
        let cluster = InMemoryCluster::new(&[NODE_A, NODE_B, NODE_C]);
        cluster.set_reachable(NODE_A, false);
        cluster.set_reachable(NODE_B, false);
        let registry =
            NodeRegistry::from_addresses(NODE_C, &[NODE_A.to_string(), NODE_B.to_string()])
                .unwrap();
        let transport = cluster.transport();

        let result =
            bootstrap_salt(transport.as_ref(), NODE_C, &registry.all(), None, |_| Ok(())).await;
        assert!(matches!(
            result,
            Err(ClusterError::SaltBootstrapFailed { attempts: 5 })
        ));
    }

    #[tokio::test]
    async fn test_salt_bootstrap_rejects_conflicting_peer() {
        let cluster = InMemoryCluster::new(&[NODE_A, NODE_B]);
        let registry = NodeRegistry::from_addresses(NODE_A, &[NODE_B.to_string()]).unwrap();
        let transport = cluster.transport();

        let local = Salt::generate();
        let result = bootstrap_salt(
            transport.as_ref(),
            NODE_A,
            &registry.all(),
            Some(local),
            |_| Ok(()),
        )
        .await;
        assert!(matches!(result, Err(ClusterError::SaltConflict { .. })));
    }

    #[tokio::test]
    async fn test_federated_read_queries_peers_on_demand() {
        let cluster = InMemoryCluster::new(&[NODE_A, NODE_B, NODE_C]);
        let coord = coordinator(&cluster, NODE_A, ClusterMode::Federated, &[NODE_B, NODE_C]);
        coord.check_peers_once().await;

        let node_c = cluster.node(NODE_C);
        let ctx = node_c.key_cache.get_or_derive(PASSPHRASE);
        node_c
            .store
            .create("smtp", "production", &json!({"relay": "mail.internal"}), None, &ctx)
            .unwrap();

        let hit = coord.federated_read("smtp", "production", PASSPHRASE).await;
        assert_eq!(hit.unwrap().value, json!({"relay": "mail.internal"}));

        let miss = coord.federated_read("absent", "production", PASSPHRASE).await;
        assert!(miss.is_none());
    }

    #[tokio::test]
    async fn test_federated_list_merges_and_deduplicates() {
        let cluster = InMemoryCluster::new(&[NODE_A, NODE_B, NODE_C]);
        let coord = coordinator(&cluster, NODE_A, ClusterMode::Federated, &[NODE_B, NODE_C]);
        coord.check_peers_once().await;

        let node_b = cluster.node(NODE_B);
        let ctx_b = node_b.key_cache.get_or_derive(PASSPHRASE);
        node_b
            .store
            .create("shared", "production", &json!({"owner": "b"}), None, &ctx_b)
            .unwrap();
        node_b
            .store
            .create("only_b", "production", &json!(1), None, &ctx_b)
            .unwrap();

        let node_c = cluster.node(NODE_C);
        let ctx_c = node_c.key_cache.get_or_derive(PASSPHRASE);
        node_c
            .store
            .create("shared", "production", &json!({"owner": "c"}), None, &ctx_c)
            .unwrap();
        node_c
            .store
            .create("only_c", "production", &json!(2), None, &ctx_c)
            .unwrap();

        let merged = coord.federated_list(None, PASSPHRASE).await;
        let mut keys: Vec<_> = merged.iter().map(|e| e.key.as_str()).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["only_b", "only_c", "shared"]);

        // Peers are queried in node-id order, so node-b's copy wins the tie.
        let shared = merged.iter().find(|e| e.key == "shared").unwrap();
        assert_eq!(shared.value, json!({"owner": "b"}));
    }
}
