//! # Event Bus - Real-Time Configuration Change Notification
//!
//! Routes [`ChangeEvent`]s to filtered subscribers over bounded per-subscriber
//! queues.
//!
//! ```text
//! ┌──────────────┐                    ┌──────────────┐
//! │  Orchestrator│                    │ SSE endpoint │
//! │              │    publish()       │              │
//! │              │ ──────┐            │              │
//! └──────────────┘       │            └──────────────┘
//!                        ▼                    ↑
//!                  ┌──────────────┐          │
//!                  │  Event Bus   │          │
//!                  │              │ ─────────┘
//!                  └──────────────┘  subscribe(filter)
//! ```
//!
//! ## Delivery Semantics
//!
//! - A subscription's absent filter fields are wildcards; all present fields
//!   must equal the event's fields (AND semantics).
//! - Delivery per queue preserves publish order (FIFO).
//! - Publish never blocks: a full subscriber queue drops the event for that
//!   subscriber and increments the drop counter, leaving other subscribers
//!   unaffected.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod bus;
pub mod filter;
pub mod stats;

pub use bus::{EventBus, SubscriptionId};
pub use filter::SubscriptionFilter;
pub use stats::{BusStatsSnapshot, SubscriptionDetail};

pub use shared_types::{ChangeEvent, EventType};

/// Maximum events buffered per subscriber before drops begin.
pub const DEFAULT_MAX_QUEUE_SIZE: usize = 100;

/// Seconds of idle stream time before a keep-alive is emitted.
pub const DEFAULT_KEEPALIVE_SECS: u64 = 30;
