//! # RocksDB Storage Adapter
//!
//! Production [`KeyValueStore`] implementation. Encrypted records are small
//! and the workload is read-heavy, so the tuning leans modest: Snappy
//! compression, a prefix iterator for scans, sync writes for durability.

use rocksdb::{Direction, IteratorMode, Options, WriteOptions, DB};
use sc_store::{KeyValueStore, KvError};
use std::path::Path;

/// RocksDB-backed key-value store.
pub struct RocksDbStore {
    db: DB,
    write_opts_sync: bool,
}

impl RocksDbStore {
    /// Open or create the database at `path`.
    ///
    /// # Errors
    ///
    /// `KvError` when RocksDB cannot open the directory.
    pub fn open(path: &Path) -> Result<Self, KvError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_compression_type(rocksdb::DBCompressionType::Snappy);

        let db = DB::open(&opts, path).map_err(|e| KvError(e.to_string()))?;
        Ok(Self {
            db,
            write_opts_sync: true,
        })
    }

    /// Open with fsync disabled. Test use only; crashes may lose writes.
    pub fn open_unsynced(path: &Path) -> Result<Self, KvError> {
        let mut store = Self::open(path)?;
        store.write_opts_sync = false;
        Ok(store)
    }

    fn write_options(&self) -> WriteOptions {
        let mut opts = WriteOptions::default();
        opts.set_sync(self.write_opts_sync);
        opts
    }
}

impl KeyValueStore for RocksDbStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KvError> {
        self.db.get(key).map_err(|e| KvError(e.to_string()))
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), KvError> {
        self.db
            .put_opt(key, value, &self.write_options())
            .map_err(|e| KvError(e.to_string()))
    }

    fn delete(&self, key: &[u8]) -> Result<(), KvError> {
        self.db
            .delete_opt(key, &self.write_options())
            .map_err(|e| KvError(e.to_string()))
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, KvError> {
        let iter = self
            .db
            .iterator(IteratorMode::From(prefix, Direction::Forward));
        let mut out = Vec::new();
        for item in iter {
            let (key, value) = item.map_err(|e| KvError(e.to_string()))?;
            if !key.starts_with(prefix) {
                break;
            }
            out.push((key.to_vec(), value.to_vec()));
        }
        Ok(out)
    }
}
