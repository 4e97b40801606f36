//! Cluster status and node-to-node endpoints.
//!
//! `/internal/*` routes are the peer-facing side of the transport: entry
//! metadata for reconciliation and the salt exchange used during bootstrap.
//! They carry no plaintext values and no passphrases.

use crate::context::AppContext;
use crate::error::ApiError;
use crate::handlers::auth::check_api_key;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use shared_types::EntrySummary;
use std::sync::Arc;
use tracing::warn;

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub environment: Option<String>,
}

/// `GET /cluster/status`
pub async fn cluster_status(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    check_api_key(&ctx, &headers)?;
    match &ctx.coordinator {
        Some(coordinator) => {
            let status = coordinator.status();
            Ok(Json(json!({
                "enabled": true,
                "status": status,
            })))
        }
        None => Ok(Json(json!({
            "enabled": false,
            "node_id": ctx.node_id(),
        }))),
    }
}

/// `GET /internal/configs`: entry metadata for peer reconciliation.
pub async fn internal_summaries(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<Vec<EntrySummary>>, ApiError> {
    check_api_key(&ctx, &headers)?;
    let store = Arc::clone(&ctx.store);
    let summaries = tokio::task::spawn_blocking(move || {
        store.list_summaries(query.category.as_deref(), query.environment.as_deref())
    })
    .await
    .map_err(|e| ApiError::internal(format!("Store task failed: {e}")))??;
    Ok(Json(summaries))
}

/// `GET /internal/salt`: raw salt bytes for a bootstrapping peer.
pub async fn get_salt(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
) -> Result<Vec<u8>, ApiError> {
    check_api_key(&ctx, &headers)?;
    Ok(ctx.key_cache.salt().as_bytes().to_vec())
}

/// `POST /internal/salt`: a peer pushing salt material.
///
/// This node resolves its salt before it starts serving, so an incoming
/// push can only confirm (200) or conflict (409); the "adopted" case (201)
/// exists on the wire for nodes still bootstrapping.
pub async fn post_salt(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    check_api_key(&ctx, &headers)?;
    if body.as_ref() == ctx.key_cache.salt().as_bytes() {
        Ok((StatusCode::OK, Json(json!({ "status": "ok" }))))
    } else {
        warn!(
            node_id = ctx.node_id(),
            "Rejected salt push with conflicting material"
        );
        Err(ApiError::new(
            StatusCode::CONFLICT,
            "Node already holds different salt material",
        ))
    }
}
