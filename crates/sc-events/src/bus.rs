//! # Event Bus Core
//!
//! Subscription registry, filter indices, and non-blocking fan-out.
//!
//! ## Locking
//!
//! The registry (subscriptions plus indices) sits behind a `parking_lot`
//! `RwLock` held only for the duration of a lookup or mutation, never across
//! an await point. Delivery uses `try_send` on bounded `tokio::mpsc` queues,
//! so publishing from inside the lock cannot block.

use crate::filter::SubscriptionFilter;
use crate::stats::{BusStatistics, BusStatsSnapshot, SubscriptionDetail};
use crate::DEFAULT_MAX_QUEUE_SIZE;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use shared_types::{ChangeEvent, ConfigValue, EventType};
use std::collections::{HashMap, HashSet};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Identifier assigned to each subscription.
pub type SubscriptionId = Uuid;

struct SubscriptionEntry {
    filter: SubscriptionFilter,
    sender: mpsc::Sender<ChangeEvent>,
    created_at: DateTime<Utc>,
}

/// Registry plus per-dimension indices for candidate lookup.
#[derive(Default)]
struct Registry {
    subscriptions: HashMap<SubscriptionId, SubscriptionEntry>,
    by_key: HashMap<String, HashSet<SubscriptionId>>,
    by_environment: HashMap<String, HashSet<SubscriptionId>>,
    by_category: HashMap<String, HashSet<SubscriptionId>>,
    wildcard: HashSet<SubscriptionId>,
}

impl Registry {
    fn index(&mut self, id: SubscriptionId, filter: &SubscriptionFilter) {
        if let Some(key) = &filter.key {
            self.by_key.entry(key.clone()).or_default().insert(id);
        }
        if let Some(env) = &filter.environment {
            self.by_environment.entry(env.clone()).or_default().insert(id);
        }
        if let Some(cat) = &filter.category {
            self.by_category.entry(cat.clone()).or_default().insert(id);
        }
        if filter.is_wildcard() {
            self.wildcard.insert(id);
        }
    }

    fn unindex(&mut self, id: SubscriptionId, filter: &SubscriptionFilter) {
        if let Some(key) = &filter.key {
            if let Some(set) = self.by_key.get_mut(key) {
                set.remove(&id);
                if set.is_empty() {
                    self.by_key.remove(key);
                }
            }
        }
        if let Some(env) = &filter.environment {
            if let Some(set) = self.by_environment.get_mut(env) {
                set.remove(&id);
                if set.is_empty() {
                    self.by_environment.remove(env);
                }
            }
        }
        if let Some(cat) = &filter.category {
            if let Some(set) = self.by_category.get_mut(cat) {
                set.remove(&id);
                if set.is_empty() {
                    self.by_category.remove(cat);
                }
            }
        }
        self.wildcard.remove(&id);
    }

    /// Candidate set: wildcard subscriptions plus every subscription indexed
    /// under one of the event's attribute values. Candidates still pass
    /// through an exact filter check before delivery.
    fn candidates(&self, key: &str, environment: &str, category: Option<&str>) -> HashSet<SubscriptionId> {
        let mut out = self.wildcard.clone();
        if let Some(set) = self.by_key.get(key) {
            out.extend(set);
        }
        if let Some(set) = self.by_environment.get(environment) {
            out.extend(set);
        }
        if let Some(cat) = category {
            if let Some(set) = self.by_category.get(cat) {
                out.extend(set);
            }
        }
        out
    }
}

/// Routes configuration change events to filtered subscriber queues.
pub struct EventBus {
    max_queue_size: usize,
    registry: RwLock<Registry>,
    stats: Mutex<BusStatistics>,
}

impl EventBus {
    /// Create a bus with the default per-subscriber queue size.
    #[must_use]
    pub fn new() -> Self {
        Self::with_queue_size(DEFAULT_MAX_QUEUE_SIZE)
    }

    /// Create a bus with a specific per-subscriber queue size.
    #[must_use]
    pub fn with_queue_size(max_queue_size: usize) -> Self {
        Self {
            max_queue_size,
            registry: RwLock::new(Registry::default()),
            stats: Mutex::new(BusStatistics::default()),
        }
    }

    /// Per-subscriber queue capacity.
    #[must_use]
    pub fn max_queue_size(&self) -> usize {
        self.max_queue_size
    }

    /// Register a subscription and return its id plus the event queue.
    pub fn subscribe(
        &self,
        filter: SubscriptionFilter,
    ) -> (SubscriptionId, mpsc::Receiver<ChangeEvent>) {
        let id = Uuid::new_v4();
        let (sender, receiver) = mpsc::channel(self.max_queue_size);
        let created_at = Utc::now();

        {
            let mut registry = self.registry.write();
            registry.index(id, &filter);
            registry.subscriptions.insert(
                id,
                SubscriptionEntry {
                    filter: filter.clone(),
                    sender,
                    created_at,
                },
            );
        }

        {
            let mut stats = self.stats.lock();
            stats.total_subscriptions_created += 1;
            stats.active_subscriptions += 1;
            stats.last_subscription_created_at = Some(created_at);
            if let Some(key) = &filter.key {
                *stats.subscriptions_by_key.entry(key.clone()).or_insert(0) += 1;
            }
            if let Some(env) = &filter.environment {
                *stats
                    .subscriptions_by_environment
                    .entry(env.clone())
                    .or_insert(0) += 1;
            }
            if let Some(cat) = &filter.category {
                *stats
                    .subscriptions_by_category
                    .entry(cat.clone())
                    .or_insert(0) += 1;
            }
            if filter.is_wildcard() {
                stats.subscriptions_wildcard += 1;
            }
        }

        info!(
            subscription_id = %id,
            key = ?filter.key,
            environment = ?filter.environment,
            category = ?filter.category,
            "New event subscription"
        );
        (id, receiver)
    }

    /// Remove a subscription from the registry and all indices.
    ///
    /// Unknown ids are ignored (the transport may race a disconnect against
    /// an explicit unsubscribe).
    pub fn unsubscribe(&self, id: SubscriptionId) {
        let removed = {
            let mut registry = self.registry.write();
            let entry = registry.subscriptions.remove(&id);
            if let Some(entry) = &entry {
                let filter = entry.filter.clone();
                registry.unindex(id, &filter);
            }
            entry
        };

        let Some(entry) = removed else {
            return;
        };
        let duration = (Utc::now() - entry.created_at).num_milliseconds() as f64 / 1000.0;

        {
            let mut stats = self.stats.lock();
            stats.active_subscriptions = stats.active_subscriptions.saturating_sub(1);
            stats.record_closed_duration(duration);
            if let Some(key) = &entry.filter.key {
                if let Some(count) = stats.subscriptions_by_key.get_mut(key) {
                    *count = count.saturating_sub(1);
                }
            }
            if let Some(env) = &entry.filter.environment {
                if let Some(count) = stats.subscriptions_by_environment.get_mut(env) {
                    *count = count.saturating_sub(1);
                }
            }
            if let Some(cat) = &entry.filter.category {
                if let Some(count) = stats.subscriptions_by_category.get_mut(cat) {
                    *count = count.saturating_sub(1);
                }
            }
            if entry.filter.is_wildcard() {
                stats.subscriptions_wildcard = stats.subscriptions_wildcard.saturating_sub(1);
            }
        }

        info!(subscription_id = %id, duration_seconds = duration, "Event subscription removed");
    }

    /// Publish an event to every matching subscription.
    ///
    /// Returns (delivered, dropped) counts. A full queue drops the event for
    /// that subscriber only; publish never blocks on a slow consumer.
    pub fn publish(
        &self,
        event_type: EventType,
        key: &str,
        environment: &str,
        category: Option<String>,
        data: Option<ConfigValue>,
        node_id: Option<String>,
    ) -> (usize, usize) {
        let event = ChangeEvent::now(event_type, key, environment, category, node_id, data);

        let mut sent = 0usize;
        let mut dropped = 0usize;
        {
            let registry = self.registry.read();
            let candidates =
                registry.candidates(&event.key, &event.environment, event.category.as_deref());
            for id in candidates {
                let Some(entry) = registry.subscriptions.get(&id) else {
                    continue;
                };
                if !entry.filter.matches(
                    &event.key,
                    &event.environment,
                    event.category.as_deref(),
                ) {
                    continue;
                }
                match entry.sender.try_send(event.clone()) {
                    Ok(()) => sent += 1,
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        dropped += 1;
                        warn!(
                            subscription_id = %id,
                            event_type = %event.event_type,
                            key = %event.key,
                            environment = %event.environment,
                            "Subscriber queue full, dropping event"
                        );
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        // Receiver gone; the stream task will unsubscribe.
                        dropped += 1;
                    }
                }
            }
        }

        if sent > 0 || dropped > 0 {
            let mut stats = self.stats.lock();
            stats.total_events_sent += sent as u64;
            *stats.events_sent_by_type.entry(event_type).or_insert(0) += sent as u64;
            stats.events_dropped_queue_full += dropped as u64;
            stats.last_event_sent_at = Some(Utc::now());
        }

        debug!(
            event_type = %event_type,
            key,
            environment,
            sent,
            dropped,
            "Event published"
        );
        (sent, dropped)
    }

    /// Bookkeeping hook: transport sent a keep-alive on an idle stream.
    pub fn record_keepalive(&self, id: SubscriptionId) {
        self.stats.lock().keepalive_sent += 1;
        debug!(subscription_id = %id, "Keep-alive sent");
    }

    /// Bookkeeping hook: transport detected a client disconnect.
    pub fn record_disconnection(&self) {
        self.stats.lock().disconnections_detected += 1;
    }

    /// Number of active subscriptions.
    #[must_use]
    pub fn active_subscriptions(&self) -> usize {
        self.registry.read().subscriptions.len()
    }

    /// Read-only snapshot of the bus counters.
    #[must_use]
    pub fn stats(&self) -> BusStatsSnapshot {
        self.stats.lock().snapshot()
    }

    /// Per-subscription details: filters, age, and queue occupancy.
    #[must_use]
    pub fn subscription_details(&self) -> Vec<SubscriptionDetail> {
        let now = Utc::now();
        let registry = self.registry.read();
        registry
            .subscriptions
            .iter()
            .map(|(id, entry)| SubscriptionDetail {
                subscription_id: *id,
                filters: entry.filter.clone(),
                created_at: entry.created_at,
                duration_seconds: (now - entry.created_at).num_milliseconds() as f64 / 1000.0,
                queue_len: self.max_queue_size - entry.sender.capacity(),
                queue_capacity: self.max_queue_size,
            })
            .collect()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
