//! # SecureConf Node
//!
//! Startup sequence:
//!
//! 1. Install tracing (respects `RUST_LOG`).
//! 2. Load settings from `SC_*` environment variables.
//! 3. Resolve the encryption salt: cluster bootstrap when clustering is
//!    enabled, plain load-or-generate otherwise.
//! 4. Open the RocksDB store and build the shared context.
//! 5. Start the cluster coordinator (health + sync loops).
//! 6. Serve HTTP until Ctrl+C, then stop the coordinator.

use anyhow::{Context, Result};
use node_runtime::adapters::{HttpPeerTransport, RocksDbStore, StoreMetadataSource};
use node_runtime::context::AppContext;
use node_runtime::handlers;
use node_runtime::settings::NodeSettings;
use sc_cluster::{bootstrap_salt, ClusterConfig, ClusterCoordinator, ClusterError, NodeRegistry};
use sc_events::EventBus;
use sc_store::EncryptedStore;
use shared_crypto::{KeyContextCache, Salt};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = Arc::new(NodeSettings::from_env().context("Failed to load settings")?);
    info!(
        node_id = %settings.node_id,
        addr = %settings.bind_addr(),
        cluster_enabled = settings.cluster_enabled,
        "Starting SecureConf node"
    );

    let registry = Arc::new(
        NodeRegistry::from_addresses(&settings.node_id, &settings.cluster_nodes)
            .context("Invalid cluster node address")?,
    );
    let transport = Arc::new(
        HttpPeerTransport::new(settings.node_id.clone(), settings.api_key.clone())
            .context("Failed to build peer transport")?,
    );

    let salt = resolve_salt(&settings, &registry, &transport).await?;

    let kv = RocksDbStore::open(&settings.data_dir)
        .with_context(|| format!("Failed to open database at {}", settings.data_dir.display()))?;
    let store = Arc::new(EncryptedStore::new(Arc::new(kv)));
    let key_cache = Arc::new(KeyContextCache::new(salt));
    let events = Arc::new(EventBus::with_queue_size(settings.event_queue_size));

    let coordinator = if settings.cluster_enabled {
        let metadata = Arc::new(StoreMetadataSource::new(Arc::clone(&store)));
        let coordinator = Arc::new(ClusterCoordinator::new(
            ClusterConfig {
                node_id: settings.node_id.clone(),
                mode: settings.cluster_mode,
                health_check_interval: settings.health_check_interval,
                sync_interval: settings.sync_interval,
            },
            registry,
            transport,
            metadata,
        ));
        coordinator
            .start()
            .await
            .context("Failed to start cluster coordinator")?;
        Some(coordinator)
    } else {
        None
    };

    let ctx = AppContext {
        settings: Arc::clone(&settings),
        store,
        key_cache,
        events,
        coordinator: coordinator.clone(),
    };

    let listener = tokio::net::TcpListener::bind(settings.bind_addr())
        .await
        .with_context(|| format!("Failed to bind {}", settings.bind_addr()))?;
    info!(addr = %settings.bind_addr(), "HTTP server listening");

    let served = axum::serve(listener, handlers::router(ctx))
        .with_graceful_shutdown(shutdown_signal())
        .await;

    // Stop the coordinator loops whether the server exited cleanly or not.
    if let Some(coordinator) = coordinator {
        if let Err(err) = coordinator.stop().await {
            tracing::error!(%err, "Coordinator shutdown failed");
        }
    }
    served.context("HTTP server error")?;
    info!("Shutdown complete");
    Ok(())
}

/// Resolve the node's salt, coordinating with peers when clustering is on.
async fn resolve_salt(
    settings: &NodeSettings,
    registry: &NodeRegistry,
    transport: &HttpPeerTransport,
) -> Result<Salt> {
    if !settings.cluster_enabled {
        return Salt::load_or_generate(&settings.salt_path).context("Failed to load salt");
    }

    let existing = if settings.salt_path.exists() {
        Some(Salt::load(&settings.salt_path).context("Failed to load salt")?)
    } else {
        None
    };
    let salt_path = settings.salt_path.clone();
    let salt = bootstrap_salt(
        transport,
        &settings.node_id,
        &registry.all(),
        existing,
        move |salt: &Salt| {
            salt.persist(&salt_path)
                .map_err(|e| ClusterError::SaltPersistence(e.to_string()))
        },
    )
    .await
    .context("Cluster salt bootstrap failed")?;
    info!(fingerprint = %salt.fingerprint(), "Cluster salt resolved");
    Ok(salt)
}

async fn shutdown_signal() {
    // Serve until interrupted; a failed signal hook would hang shutdown, so
    // surface it loudly instead.
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(%err, "Failed to install Ctrl+C handler");
    }
    info!("Shutdown signal received");
}
