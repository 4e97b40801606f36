//! Event bus statistics.
//!
//! Mutable counters live in [`BusStatistics`]; read-only snapshots are
//! serialized for the stats endpoints.

use crate::filter::SubscriptionFilter;
use chrono::{DateTime, Utc};
use serde::Serialize;
use shared_types::EventType;
use std::collections::HashMap;

/// Running counters, updated by the bus under its stats lock.
#[derive(Debug, Default)]
pub(crate) struct BusStatistics {
    pub total_subscriptions_created: u64,
    pub active_subscriptions: u64,
    pub total_subscriptions_closed: u64,
    pub subscriptions_wildcard: u64,
    pub subscriptions_by_key: HashMap<String, u64>,
    pub subscriptions_by_environment: HashMap<String, u64>,
    pub subscriptions_by_category: HashMap<String, u64>,
    pub last_subscription_created_at: Option<DateTime<Utc>>,

    pub total_events_sent: u64,
    pub events_sent_by_type: HashMap<EventType, u64>,
    pub events_dropped_queue_full: u64,
    pub last_event_sent_at: Option<DateTime<Utc>>,

    pub keepalive_sent: u64,
    pub disconnections_detected: u64,

    /// Running average over closed subscriptions.
    pub average_subscription_duration_seconds: f64,
}

impl BusStatistics {
    /// Fold a finished subscription's lifetime into the running average.
    pub fn record_closed_duration(&mut self, duration_seconds: f64) {
        self.total_subscriptions_closed += 1;
        let closed = self.total_subscriptions_closed as f64;
        let total = self.average_subscription_duration_seconds * (closed - 1.0);
        self.average_subscription_duration_seconds = (total + duration_seconds) / closed;
    }

    pub fn snapshot(&self) -> BusStatsSnapshot {
        BusStatsSnapshot {
            subscriptions: SubscriptionStats {
                total_created: self.total_subscriptions_created,
                active: self.active_subscriptions,
                closed: self.total_subscriptions_closed,
                wildcard: self.subscriptions_wildcard,
                by_key: self.subscriptions_by_key.clone(),
                by_environment: self.subscriptions_by_environment.clone(),
                by_category: self.subscriptions_by_category.clone(),
                last_created_at: self.last_subscription_created_at,
            },
            events: EventStats {
                total_sent: self.total_events_sent,
                by_type: self
                    .events_sent_by_type
                    .iter()
                    .map(|(k, v)| (k.as_str().to_string(), *v))
                    .collect(),
                dropped_queue_full: self.events_dropped_queue_full,
                last_sent_at: self.last_event_sent_at,
            },
            connection_health: ConnectionHealthStats {
                keepalive_sent: self.keepalive_sent,
                disconnections_detected: self.disconnections_detected,
            },
            performance: PerformanceStats {
                average_subscription_duration_seconds: (self
                    .average_subscription_duration_seconds
                    * 100.0)
                    .round()
                    / 100.0,
            },
        }
    }
}

/// Read-only snapshot of the bus counters.
#[derive(Debug, Clone, Serialize)]
pub struct BusStatsSnapshot {
    pub subscriptions: SubscriptionStats,
    pub events: EventStats,
    pub connection_health: ConnectionHealthStats,
    pub performance: PerformanceStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionStats {
    pub total_created: u64,
    pub active: u64,
    pub closed: u64,
    pub wildcard: u64,
    pub by_key: HashMap<String, u64>,
    pub by_environment: HashMap<String, u64>,
    pub by_category: HashMap<String, u64>,
    pub last_created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventStats {
    pub total_sent: u64,
    pub by_type: HashMap<String, u64>,
    pub dropped_queue_full: u64,
    pub last_sent_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectionHealthStats {
    pub keepalive_sent: u64,
    pub disconnections_detected: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PerformanceStats {
    pub average_subscription_duration_seconds: f64,
}

/// Per-subscription view for the subscriptions endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionDetail {
    pub subscription_id: uuid::Uuid,
    pub filters: SubscriptionFilter,
    pub created_at: DateTime<Utc>,
    pub duration_seconds: f64,
    pub queue_len: usize,
    pub queue_capacity: usize,
}
