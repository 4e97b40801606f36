//! Cross-subsystem integration flows.

pub mod cluster_flows;
pub mod event_flows;
pub mod http_federation;
pub mod store_flows;
