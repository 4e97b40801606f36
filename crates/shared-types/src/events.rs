//! # Change Events
//!
//! Immutable notifications emitted on every configuration mutation and
//! consumed by event-bus subscribers.

use crate::entities::ConfigValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The kind of configuration change an event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Created,
    Updated,
    Deleted,
    /// Emitted when an entry arrived via cluster reconciliation rather than
    /// a direct client write.
    Sync,
}

impl EventType {
    /// Wire name of this event type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
            Self::Sync => "sync",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A configuration change event.
///
/// Constructed once at publish time and delivered to every matching
/// subscription queue. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub event_type: EventType,
    pub key: String,
    pub environment: String,
    pub category: Option<String>,
    pub timestamp: DateTime<Utc>,
    /// Cluster node that originated the change, when known.
    pub node_id: Option<String>,
    /// Optional event payload (e.g. changed fields).
    pub data: Option<ConfigValue>,
}

impl ChangeEvent {
    /// Construct an event stamped with the current time.
    #[must_use]
    pub fn now(
        event_type: EventType,
        key: impl Into<String>,
        environment: impl Into<String>,
        category: Option<String>,
        node_id: Option<String>,
        data: Option<ConfigValue>,
    ) -> Self {
        Self {
            event_type,
            key: key.into(),
            environment: environment.into(),
            category,
            timestamp: Utc::now(),
            node_id,
            data,
        }
    }
}
