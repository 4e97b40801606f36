//! # Shared Types Crate
//!
//! This crate contains the configuration data model, change-event types, and
//! the storage error taxonomy shared across subsystems.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-subsystem types are defined here.
//! - **Typed Values**: Configuration values are `serde_json::Value`, a tagged
//!   sum type, so type information survives the encryption round-trip.
//! - **No Globals**: Types carry their own context; nothing in this crate
//!   holds process-wide state.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod entities;
pub mod errors;
pub mod events;

pub use entities::{ConfigEntry, ConfigValue, DecryptedEntry, EntrySummary};
pub use errors::StoreError;
pub use events::{ChangeEvent, EventType};

/// Maximum length for configuration keys.
pub const MAX_KEY_LEN: usize = 255;

/// Maximum length for category and environment labels.
pub const MAX_LABEL_LEN: usize = 100;
