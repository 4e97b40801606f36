//! HTTP surface of the node.
//!
//! The route table mirrors the public wire contract:
//!
//! | Route                      | Purpose                                |
//! |----------------------------|----------------------------------------|
//! | `POST/GET/PUT/DELETE /configs…` | encrypted CRUD                    |
//! | `GET /health`              | liveness, unauthenticated              |
//! | `GET /stats`               | store statistics                       |
//! | `GET /events…`             | SSE change stream + bus statistics     |
//! | `GET /cluster/status`      | coordinator view                       |
//! | `GET/POST /internal/…`     | peer-facing metadata and salt exchange |

pub mod auth;
pub mod cluster;
pub mod configs;
pub mod events;

use crate::context::AppContext;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;

/// Build the node's router over the shared context.
pub fn router(ctx: AppContext) -> Router {
    Router::new()
        .route(
            "/configs",
            post(configs::create_config).get(configs::list_configs),
        )
        .route(
            "/configs/:key",
            get(configs::get_config)
                .put(configs::update_config)
                .delete(configs::delete_config),
        )
        .route("/health", get(health))
        .route("/stats", get(configs::store_stats))
        .route("/events", get(events::stream_events))
        .route("/events/stats", get(events::event_stats))
        .route("/events/subscriptions", get(events::event_subscriptions))
        .route("/cluster/status", get(cluster::cluster_status))
        .route(
            "/internal/configs",
            get(cluster::internal_summaries),
        )
        .route("/internal/salt", get(cluster::get_salt).post(cluster::post_salt))
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

/// `GET /health`: liveness probe, also used by peers.
async fn health(
    axum::extract::State(ctx): axum::extract::State<AppContext>,
) -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "node_id": ctx.node_id(),
    }))
}
