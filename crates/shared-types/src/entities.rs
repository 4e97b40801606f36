//! # Configuration Entities
//!
//! The persisted record, its metadata projection, and the decrypted view
//! returned to callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A configuration value.
///
/// Values may be objects, arrays, strings, numbers, or booleans; the JSON
/// sum type preserves that shape through the encryption round-trip.
pub type ConfigValue = serde_json::Value;

/// A persisted configuration entry.
///
/// The pair (key, environment) is unique; both are immutable after creation.
/// `encrypted_value` holds the authenticated ciphertext, base64-encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigEntry {
    /// Stable identifier, assigned on creation.
    pub id: Uuid,
    /// Configuration key.
    pub key: String,
    /// Environment label (e.g. "production"). Mandatory.
    pub environment: String,
    /// Optional free-form grouping label.
    pub category: Option<String>,
    /// Base64-encoded nonce-prefixed ciphertext.
    pub encrypted_value: String,
    /// Creation timestamp (UTC).
    pub created_at: DateTime<Utc>,
    /// Last-modification timestamp (UTC). Refreshed on every update.
    pub updated_at: DateTime<Utc>,
}

impl ConfigEntry {
    /// Project this entry to its reconciliation metadata.
    #[must_use]
    pub fn summary(&self) -> EntrySummary {
        EntrySummary {
            key: self.key.clone(),
            environment: self.environment.clone(),
            category: self.category.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Lightweight entry metadata exchanged during reconciliation.
///
/// Never carries a value, encrypted or otherwise; peers use it only for
/// bookkeeping (spot missing entries, compare timestamps).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntrySummary {
    pub key: String,
    pub environment: String,
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A configuration entry with its value decrypted.
///
/// Timestamps are skipped during serialization unless the caller asked for
/// them (`include_timestamps`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptedEntry {
    pub id: Uuid,
    pub key: String,
    pub environment: String,
    pub category: Option<String>,
    pub value: ConfigValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}
