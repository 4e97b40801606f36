//! Server-Sent Events transport for the change bus.
//!
//! Each connection gets its own subscription and bounded queue. The stream
//! opens with a `connected` event echoing the subscription id and filters,
//! then relays change events as they arrive; idle periods produce comment
//! keep-alives so proxies do not cut the connection. When the client goes
//! away the guard unsubscribes and records the disconnection.

use crate::context::AppContext;
use crate::error::ApiError;
use crate::handlers::auth::check_api_key;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::sse::{Event, Sse};
use axum::Json;
use futures::stream::Stream;
use sc_events::{BusStatsSnapshot, EventBus, SubscriptionFilter, SubscriptionId};
use serde::Deserialize;
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use shared_types::ChangeEvent;

#[derive(Debug, Deserialize)]
pub struct EventFilterQuery {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub environment: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

/// Unsubscribes when the SSE stream is dropped, however it ends.
struct SubscriptionGuard {
    bus: Arc<EventBus>,
    id: SubscriptionId,
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.bus.unsubscribe(self.id);
        self.bus.record_disconnection();
    }
}

struct StreamState {
    receiver: mpsc::Receiver<ChangeEvent>,
    bus: Arc<EventBus>,
    id: SubscriptionId,
    keepalive: Duration,
    opening: Option<Event>,
    _guard: SubscriptionGuard,
}

/// `GET /events`
pub async fn stream_events(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Query(query): Query<EventFilterQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    check_api_key(&ctx, &headers)?;

    let filter = SubscriptionFilter {
        key: query.key.clone(),
        environment: query.environment.clone(),
        category: query.category.clone(),
    };
    let (id, receiver) = ctx.events.subscribe(filter);

    let opening = json_event(
        "connected",
        &json!({
            "subscription_id": id,
            "node_id": ctx.node_id(),
            "filters": {
                "key": query.key,
                "environment": query.environment,
                "category": query.category,
            },
        }),
    );

    let state = StreamState {
        receiver,
        bus: Arc::clone(&ctx.events),
        id,
        keepalive: ctx.settings.keepalive_interval,
        opening: Some(opening),
        _guard: SubscriptionGuard {
            bus: Arc::clone(&ctx.events),
            id,
        },
    };

    let stream = futures::stream::unfold(state, |mut state| async move {
        if let Some(opening) = state.opening.take() {
            return Some((Ok(opening), state));
        }
        tokio::select! {
            received = state.receiver.recv() => match received {
                Some(change) => {
                    let event = json_event(change.event_type.as_str(), &change);
                    Some((Ok(event), state))
                }
                // Bus dropped the sender; the subscription is gone.
                None => None,
            },
            () = tokio::time::sleep(state.keepalive) => {
                state.bus.record_keepalive(state.id);
                Some((Ok(Event::default().comment("keep-alive")), state))
            }
        }
    });

    Ok(Sse::new(stream))
}

/// `GET /events/stats`
pub async fn event_stats(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
) -> Result<Json<BusStatsSnapshot>, ApiError> {
    check_api_key(&ctx, &headers)?;
    Ok(Json(ctx.events.stats()))
}

/// `GET /events/subscriptions`
pub async fn event_subscriptions(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    check_api_key(&ctx, &headers)?;
    let details = ctx.events.subscription_details();
    Ok(Json(json!({
        "active": details.len(),
        "subscriptions": details,
    })))
}

fn json_event<T: serde::Serialize>(name: &str, data: &T) -> Event {
    match serde_json::to_string(data) {
        Ok(payload) => Event::default().event(name).data(payload),
        Err(_) => Event::default().comment("serialization-error"),
    }
}
