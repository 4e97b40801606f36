//! Outbound port for the storage backend.

use thiserror::Error;

/// Backend failure, opaque to the store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Key-value store error: {0}")]
pub struct KvError(pub String);

/// Key-value storage interface the encrypted store is written against.
///
/// Implementations must be safe for concurrent callers; the store serializes
/// mutations itself but reads run unlocked.
pub trait KeyValueStore: Send + Sync {
    /// Get the value stored under `key`, if any.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KvError>;

    /// Store `value` under `key`, replacing any existing value.
    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), KvError>;

    /// Delete the value under `key`. Deleting a missing key is not an error.
    fn delete(&self, key: &[u8]) -> Result<(), KvError>;

    /// All (key, value) pairs whose key starts with `prefix`, in key order.
    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, KvError>;
}
