//! Production adapters for the library crates' outbound ports.

pub mod http_transport;
pub mod metadata;
pub mod rocksdb_store;

pub use http_transport::{
    HttpPeerTransport, API_KEY_HEADER, FEDERATED_QUERY_HEADER, REPLICATED_FROM_HEADER,
    USER_KEY_HEADER,
};
pub use metadata::StoreMetadataSource;
pub use rocksdb_store::RocksDbStore;
