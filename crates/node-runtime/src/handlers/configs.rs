//! Configuration CRUD handlers.
//!
//! Every mutation follows the same shape: authenticate, run the store
//! operation on the blocking pool, then fire-and-forget the cluster
//! broadcast and the event-bus publish. The HTTP response never waits on
//! peers.
//!
//! Writes that arrived from a peer (marked by `X-Replicated-From`) are
//! applied as replica upserts and not re-broadcast, so a write settles in
//! one hop instead of ricocheting around the cluster. Reads a peer issued
//! during its own federated lookup (marked by `X-Federated-Query`) are
//! answered from the local store only, for the same reason.

use crate::context::AppContext;
use crate::error::ApiError;
use crate::handlers::auth::{
    check_api_key, is_federated_query, replicated_origin, require_context, require_passphrase,
};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use sc_cluster::{ClusterMode, ReplicatedWrite};
use sc_store::{ListFilter, StoreStatistics};
use serde::Deserialize;
use shared_types::{ConfigValue, DecryptedEntry, EventType, StoreError};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct CreateConfigRequest {
    pub key: String,
    pub environment: String,
    pub value: ConfigValue,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateConfigRequest {
    pub environment: String,
    pub value: ConfigValue,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EntryQuery {
    pub environment: String,
    #[serde(default)]
    pub include_timestamps: bool,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub environment: Option<String>,
    #[serde(default)]
    pub include_timestamps: bool,
}

/// `POST /configs`
pub async fn create_config(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Json(body): Json<CreateConfigRequest>,
) -> Result<(StatusCode, Json<DecryptedEntry>), ApiError> {
    check_api_key(&ctx, &headers)?;
    let enc = require_context(&ctx, &headers).await?;
    let passphrase = require_passphrase(&ctx, &headers)?;
    let origin = replicated_origin(&headers);

    let store = Arc::clone(&ctx.store);
    let (key, environment) = (body.key.clone(), body.environment.clone());
    let (value, category) = (body.value.clone(), body.category.clone());

    let entry = if origin.is_some() {
        // Replica path: a replayed create must not fail on an existing entry.
        run_store(move || {
            store
                .upsert_replica(&key, &environment, &value, category, &enc)
                .map(|(entry, _)| entry)
        })
        .await?
    } else {
        run_store(move || store.create(&key, &environment, &value, category, &enc)).await?
    };

    after_write(&ctx, EventType::Created, &body, &entry, origin, passphrase);
    Ok((StatusCode::CREATED, Json(entry)))
}

/// `GET /configs/{key}`
pub async fn get_config(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Path(key): Path<String>,
    Query(query): Query<EntryQuery>,
) -> Result<Json<DecryptedEntry>, ApiError> {
    check_api_key(&ctx, &headers)?;
    let enc = require_context(&ctx, &headers).await?;

    let store = Arc::clone(&ctx.store);
    let (store_key, environment) = (key.clone(), query.environment.clone());
    let include_timestamps = query.include_timestamps;
    let local = run_store_raw(move || {
        store.read(&store_key, &environment, &enc, include_timestamps)
    })
    .await?;

    match local {
        Ok(entry) => Ok(Json(entry)),
        Err(StoreError::NotFound { .. }) => {
            // FEDERATED mode falls back to peers on a local miss, unless
            // this request already is a peer's federated query (one hop).
            if let Some(coordinator) = federated(&ctx).filter(|_| !is_federated_query(&headers)) {
                let passphrase = require_passphrase(&ctx, &headers)?;
                if let Some(entry) = coordinator
                    .federated_read(&key, &query.environment, &passphrase)
                    .await
                {
                    return Ok(Json(entry));
                }
            }
            Err(StoreError::NotFound {
                key,
                environment: query.environment,
            }
            .into())
        }
        Err(err) => Err(err.into()),
    }
}

/// `GET /configs`
pub async fn list_configs(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<DecryptedEntry>>, ApiError> {
    check_api_key(&ctx, &headers)?;
    let enc = require_context(&ctx, &headers).await?;

    let store = Arc::clone(&ctx.store);
    let filter = ListFilter {
        category: query.category.clone(),
        environment: query.environment.clone(),
        include_timestamps: query.include_timestamps,
    };
    let mut entries = run_store(move || store.list(&filter, &enc)).await?;

    // FEDERATED mode merges peer results, local entries winning per key.
    // Peer-issued federated queries stay local for the same single-hop
    // reason as in `get_config`.
    if let Some(coordinator) = federated(&ctx).filter(|_| !is_federated_query(&headers)) {
        let passphrase = require_passphrase(&ctx, &headers)?;
        let remote = coordinator
            .federated_list(query.category.as_deref(), &passphrase)
            .await;
        let known: std::collections::HashSet<String> =
            entries.iter().map(|e| e.key.clone()).collect();
        entries.extend(remote.into_iter().filter(|e| !known.contains(&e.key)));
    }

    Ok(Json(entries))
}

/// `PUT /configs/{key}`
pub async fn update_config(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Path(key): Path<String>,
    Json(body): Json<UpdateConfigRequest>,
) -> Result<Json<DecryptedEntry>, ApiError> {
    check_api_key(&ctx, &headers)?;
    let enc = require_context(&ctx, &headers).await?;
    let passphrase = require_passphrase(&ctx, &headers)?;
    let origin = replicated_origin(&headers);

    let store = Arc::clone(&ctx.store);
    let (store_key, environment) = (key.clone(), body.environment.clone());
    let (value, category) = (body.value.clone(), body.category.clone());

    let entry = if origin.is_some() {
        run_store(move || {
            store
                .upsert_replica(&store_key, &environment, &value, category, &enc)
                .map(|(entry, _)| entry)
        })
        .await?
    } else {
        run_store(move || store.update(&store_key, &environment, &value, category, &enc)).await?
    };

    let request = CreateConfigRequest {
        key,
        environment: body.environment,
        value: body.value,
        category: body.category,
    };
    after_write(&ctx, EventType::Updated, &request, &entry, origin, passphrase);
    Ok(Json(entry))
}

/// `DELETE /configs/{key}`
pub async fn delete_config(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Path(key): Path<String>,
    Query(query): Query<EntryQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    check_api_key(&ctx, &headers)?;
    // The passphrase is validated even though deletion needs no decryption;
    // peers receiving the forwarded delete enforce the same policy.
    let passphrase = require_passphrase(&ctx, &headers)?;
    let origin = replicated_origin(&headers);

    let store = Arc::clone(&ctx.store);
    let (store_key, environment) = (key.clone(), query.environment.clone());
    run_store(move || store.delete(&store_key, &environment)).await?;

    let node_id = origin.clone().unwrap_or_else(|| ctx.node_id().to_string());
    ctx.events
        .publish(EventType::Deleted, &key, &query.environment, None, None, Some(node_id));

    if origin.is_none() {
        if let Some(coordinator) = replica(&ctx) {
            let environment = query.environment.clone();
            tokio::spawn(async move {
                coordinator
                    .broadcast_delete(&key, &environment, &passphrase)
                    .await;
            });
        }
    }

    Ok(Json(serde_json::json!({ "status": "deleted" })))
}

/// `GET /stats`
pub async fn store_stats(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
) -> Result<Json<StoreStatistics>, ApiError> {
    check_api_key(&ctx, &headers)?;
    let store = Arc::clone(&ctx.store);
    let stats = run_store(move || store.statistics()).await?;
    Ok(Json(stats))
}

/// Post-mutation fan-out: publish the change event and, for locally
/// originated writes in REPLICA mode, broadcast to peers.
fn after_write(
    ctx: &AppContext,
    event_type: EventType,
    request: &CreateConfigRequest,
    entry: &DecryptedEntry,
    origin: Option<String>,
    passphrase: String,
) {
    let node_id = origin
        .clone()
        .unwrap_or_else(|| ctx.node_id().to_string());
    ctx.events.publish(
        event_type,
        &entry.key,
        &entry.environment,
        entry.category.clone(),
        None,
        Some(node_id),
    );

    if origin.is_some() {
        return;
    }
    let Some(coordinator) = replica(ctx) else {
        return;
    };
    let write = ReplicatedWrite {
        key: request.key.clone(),
        environment: request.environment.clone(),
        value: request.value.clone(),
        category: request.category.clone(),
    };
    tokio::spawn(async move {
        match event_type {
            EventType::Created => coordinator.broadcast_create(&write, &passphrase).await,
            _ => coordinator.broadcast_update(&write, &passphrase).await,
        }
    });
}

fn replica(
    ctx: &AppContext,
) -> Option<Arc<sc_cluster::ClusterCoordinator<crate::adapters::HttpPeerTransport>>> {
    ctx.coordinator
        .as_ref()
        .filter(|c| c.mode() == ClusterMode::Replica)
        .map(Arc::clone)
}

fn federated(
    ctx: &AppContext,
) -> Option<Arc<sc_cluster::ClusterCoordinator<crate::adapters::HttpPeerTransport>>> {
    ctx.coordinator
        .as_ref()
        .filter(|c| c.mode() == ClusterMode::Federated)
        .map(Arc::clone)
}

/// Run a blocking store closure on the blocking pool, flattening errors.
async fn run_store<T, F>(op: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
{
    run_store_raw(op).await?.map_err(ApiError::from)
}

/// Same as [`run_store`] but keeps the `StoreError` for caller inspection.
async fn run_store_raw<T, F>(op: F) -> Result<Result<T, StoreError>, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
{
    tokio::task::spawn_blocking(op)
        .await
        .map_err(|e| ApiError::internal(format!("Store task failed: {e}")))
}
