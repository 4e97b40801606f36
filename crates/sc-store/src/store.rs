//! # Encrypted Store
//!
//! CRUD operations over encrypted configuration entries, keyed by
//! (key, environment).
//!
//! ## Write Discipline
//!
//! All mutations take `write_lock` for the duration of the check-then-write
//! sequence. The uniqueness of (key, environment) is therefore enforced at
//! this layer, not in application logic above it; two concurrent creates for
//! the same pair cannot both succeed.
//!
//! ## Ciphertext Layout
//!
//! Values are serialized to JSON, encrypted with the caller's
//! [`EncryptionContext`], and stored base64-encoded inside the entry record.
//! The record itself (metadata plus ciphertext) is stored as JSON under the
//! key `cfg/{environment}\0{key}`.

use crate::ports::KeyValueStore;
use chrono::Utc;
use parking_lot::Mutex;
use shared_crypto::{CryptoError, EncryptionContext};
use shared_types::{
    ConfigEntry, ConfigValue, DecryptedEntry, EntrySummary, StoreError, MAX_KEY_LEN, MAX_LABEL_LEN,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Key prefix for configuration records.
const RECORD_PREFIX: &[u8] = b"cfg/";

/// Filters for [`EncryptedStore::list`].
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    /// Only entries with this category.
    pub category: Option<String>,
    /// Only entries in this environment.
    pub environment: Option<String>,
    /// Include created_at/updated_at in the results.
    pub include_timestamps: bool,
}

/// Whether an upsert created a new entry or replaced an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
}

/// Aggregate counts over the stored entries.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct StoreStatistics {
    pub total_keys: usize,
    pub total_categories: usize,
    pub total_environments: usize,
    pub keys_by_category: HashMap<String, usize>,
    pub keys_by_environment: HashMap<String, usize>,
}

/// Encrypted configuration store over a [`KeyValueStore`] backend.
pub struct EncryptedStore {
    kv: Arc<dyn KeyValueStore>,
    /// Serializes the check-then-write sequence of every mutation.
    write_lock: Mutex<()>,
}

impl EncryptedStore {
    /// Create a store over the given backend.
    #[must_use]
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            kv,
            write_lock: Mutex::new(()),
        }
    }

    /// Create a new entry.
    ///
    /// # Errors
    ///
    /// - `StoreError::Validation` for empty/oversized key or environment.
    /// - `StoreError::DuplicateKey` if (key, environment) already exists.
    pub fn create(
        &self,
        key: &str,
        environment: &str,
        value: &ConfigValue,
        category: Option<String>,
        ctx: &EncryptionContext,
    ) -> Result<DecryptedEntry, StoreError> {
        validate_key(key)?;
        validate_environment(environment)?;
        validate_category(category.as_deref())?;

        let encrypted_value = encrypt_value(value, ctx)?;
        let now = Utc::now();
        let entry = ConfigEntry {
            id: Uuid::new_v4(),
            key: key.to_string(),
            environment: environment.to_string(),
            category,
            encrypted_value,
            created_at: now,
            updated_at: now,
        };

        let record_key = record_key(environment, key);
        {
            let _guard = self.write_lock.lock();
            if self.get_record(&record_key)?.is_some() {
                return Err(StoreError::DuplicateKey {
                    key: key.to_string(),
                    environment: environment.to_string(),
                });
            }
            self.put_record(&record_key, &entry)?;
        }

        info!(key, environment, "Configuration created");
        Ok(decrypted_view(&entry, value.clone(), true))
    }

    /// Read an entry, decrypting its value.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if (key, environment) does not exist.
    /// - `StoreError::Decryption` for a wrong passphrase or tampered data.
    pub fn read(
        &self,
        key: &str,
        environment: &str,
        ctx: &EncryptionContext,
        include_timestamps: bool,
    ) -> Result<DecryptedEntry, StoreError> {
        let entry = self
            .get_record(&record_key(environment, key))?
            .ok_or_else(|| StoreError::NotFound {
                key: key.to_string(),
                environment: environment.to_string(),
            })?;

        let value = decrypt_value(&entry, ctx)?;
        Ok(decrypted_view(&entry, value, include_timestamps))
    }

    /// Replace an entry's value wholesale (values are never merged).
    ///
    /// Category changes only when explicitly provided; key and environment
    /// are immutable. `updated_at` is refreshed.
    ///
    /// # Errors
    ///
    /// `StoreError::NotFound` if (key, environment) does not exist.
    pub fn update(
        &self,
        key: &str,
        environment: &str,
        value: &ConfigValue,
        category: Option<String>,
        ctx: &EncryptionContext,
    ) -> Result<DecryptedEntry, StoreError> {
        validate_category(category.as_deref())?;
        let encrypted_value = encrypt_value(value, ctx)?;
        let record_key = record_key(environment, key);

        let entry = {
            let _guard = self.write_lock.lock();
            let mut entry =
                self.get_record(&record_key)?
                    .ok_or_else(|| StoreError::NotFound {
                        key: key.to_string(),
                        environment: environment.to_string(),
                    })?;

            entry.encrypted_value = encrypted_value;
            if let Some(category) = category {
                entry.category = Some(category);
            }
            entry.updated_at = Utc::now();
            self.put_record(&record_key, &entry)?;
            entry
        };

        info!(key, environment, "Configuration updated");
        Ok(decrypted_view(&entry, value.clone(), true))
    }

    /// Delete an entry permanently.
    ///
    /// # Errors
    ///
    /// `StoreError::NotFound` if (key, environment) does not exist.
    pub fn delete(&self, key: &str, environment: &str) -> Result<(), StoreError> {
        let record_key = record_key(environment, key);

        {
            let _guard = self.write_lock.lock();
            if self.get_record(&record_key)?.is_none() {
                return Err(StoreError::NotFound {
                    key: key.to_string(),
                    environment: environment.to_string(),
                });
            }
            self.kv
                .delete(&record_key)
                .map_err(|e| StoreError::Backend(e.to_string()))?;
        }

        info!(key, environment, "Configuration deleted");
        Ok(())
    }

    /// List entries matching the filter, values decrypted.
    ///
    /// # Errors
    ///
    /// `StoreError::Decryption` if any matching entry fails to decrypt with
    /// the caller's context.
    pub fn list(
        &self,
        filter: &ListFilter,
        ctx: &EncryptionContext,
    ) -> Result<Vec<DecryptedEntry>, StoreError> {
        let mut out = Vec::new();
        for entry in self.scan(filter.environment.as_deref())? {
            if let Some(category) = &filter.category {
                if entry.category.as_deref() != Some(category.as_str()) {
                    continue;
                }
            }
            let value = decrypt_value(&entry, ctx)?;
            out.push(decrypted_view(&entry, value, filter.include_timestamps));
        }
        Ok(out)
    }

    /// Metadata summaries for reconciliation: no values, no decryption.
    pub fn list_summaries(
        &self,
        category: Option<&str>,
        environment: Option<&str>,
    ) -> Result<Vec<EntrySummary>, StoreError> {
        let mut out = Vec::new();
        for entry in self.scan(environment)? {
            if let Some(category) = category {
                if entry.category.as_deref() != Some(category) {
                    continue;
                }
            }
            out.push(entry.summary());
        }
        Ok(out)
    }

    /// Create-or-replace an entry without raising `DuplicateKey`.
    ///
    /// This is the receiving side of a cluster broadcast: remote writes land
    /// here so a replayed create does not fail on an existing entry.
    pub fn upsert_replica(
        &self,
        key: &str,
        environment: &str,
        value: &ConfigValue,
        category: Option<String>,
        ctx: &EncryptionContext,
    ) -> Result<(DecryptedEntry, UpsertOutcome), StoreError> {
        validate_key(key)?;
        validate_environment(environment)?;
        validate_category(category.as_deref())?;

        let encrypted_value = encrypt_value(value, ctx)?;
        let record_key = record_key(environment, key);
        let now = Utc::now();

        let (entry, outcome) = {
            let _guard = self.write_lock.lock();
            match self.get_record(&record_key)? {
                Some(mut entry) => {
                    entry.encrypted_value = encrypted_value;
                    if let Some(category) = category {
                        entry.category = Some(category);
                    }
                    entry.updated_at = now;
                    self.put_record(&record_key, &entry)?;
                    (entry, UpsertOutcome::Updated)
                }
                None => {
                    let entry = ConfigEntry {
                        id: Uuid::new_v4(),
                        key: key.to_string(),
                        environment: environment.to_string(),
                        category,
                        encrypted_value,
                        created_at: now,
                        updated_at: now,
                    };
                    self.put_record(&record_key, &entry)?;
                    (entry, UpsertOutcome::Created)
                }
            }
        };

        debug!(key, environment, ?outcome, "Replica upsert applied");
        Ok((decrypted_view(&entry, value.clone(), true), outcome))
    }

    /// Aggregate counts by category and environment.
    ///
    /// Entries without a category count as `uncategorized`; without an
    /// environment label that bucket would be `unspecified`, but environment
    /// is mandatory here so it only appears for legacy records.
    pub fn statistics(&self) -> Result<StoreStatistics, StoreError> {
        let mut keys_by_category: HashMap<String, usize> = HashMap::new();
        let mut keys_by_environment: HashMap<String, usize> = HashMap::new();
        let mut total_keys = 0usize;

        for entry in self.scan(None)? {
            total_keys += 1;
            let category = entry.category.as_deref().unwrap_or("uncategorized");
            *keys_by_category.entry(category.to_string()).or_insert(0) += 1;
            let environment = if entry.environment.is_empty() {
                "unspecified"
            } else {
                entry.environment.as_str()
            };
            *keys_by_environment
                .entry(environment.to_string())
                .or_insert(0) += 1;
        }

        Ok(StoreStatistics {
            total_keys,
            total_categories: keys_by_category.len(),
            total_environments: keys_by_environment.len(),
            keys_by_category,
            keys_by_environment,
        })
    }

    fn scan(&self, environment: Option<&str>) -> Result<Vec<ConfigEntry>, StoreError> {
        let prefix = match environment {
            Some(env) => {
                let mut p = RECORD_PREFIX.to_vec();
                p.extend_from_slice(env.as_bytes());
                p.push(0);
                p
            }
            None => RECORD_PREFIX.to_vec(),
        };

        let rows = self
            .kv
            .scan_prefix(&prefix)
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        rows.into_iter()
            .map(|(k, v)| {
                serde_json::from_slice(&v)
                    .map_err(|_| StoreError::CorruptRecord(String::from_utf8_lossy(&k).into()))
            })
            .collect()
    }

    fn get_record(&self, record_key: &[u8]) -> Result<Option<ConfigEntry>, StoreError> {
        let bytes = self
            .kv
            .get(record_key)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        match bytes {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|_| StoreError::CorruptRecord(String::from_utf8_lossy(record_key).into())),
            None => Ok(None),
        }
    }

    fn put_record(&self, record_key: &[u8], entry: &ConfigEntry) -> Result<(), StoreError> {
        let bytes =
            serde_json::to_vec(entry).map_err(|e| StoreError::Backend(e.to_string()))?;
        self.kv
            .put(record_key, &bytes)
            .map_err(|e| StoreError::Backend(e.to_string()))
    }
}

fn record_key(environment: &str, key: &str) -> Vec<u8> {
    let mut out = RECORD_PREFIX.to_vec();
    out.extend_from_slice(environment.as_bytes());
    out.push(0);
    out.extend_from_slice(key.as_bytes());
    out
}

fn encrypt_value(value: &ConfigValue, ctx: &EncryptionContext) -> Result<String, StoreError> {
    let plaintext =
        serde_json::to_vec(value).map_err(|e| StoreError::Validation(e.to_string()))?;
    ctx.encrypt(&plaintext)
        .map_err(|e| StoreError::Backend(e.to_string()))
}

fn decrypt_value(entry: &ConfigEntry, ctx: &EncryptionContext) -> Result<ConfigValue, StoreError> {
    let plaintext = ctx.decrypt(&entry.encrypted_value).map_err(|e| match e {
        CryptoError::Decryption(msg) => StoreError::Decryption(msg),
        other => StoreError::Decryption(other.to_string()),
    })?;
    serde_json::from_slice(&plaintext).map_err(|_| StoreError::CorruptRecord(entry.key.clone()))
}

fn decrypted_view(entry: &ConfigEntry, value: ConfigValue, include_timestamps: bool) -> DecryptedEntry {
    DecryptedEntry {
        id: entry.id,
        key: entry.key.clone(),
        environment: entry.environment.clone(),
        category: entry.category.clone(),
        value,
        created_at: include_timestamps.then_some(entry.created_at),
        updated_at: include_timestamps.then_some(entry.updated_at),
    }
}

fn validate_key(key: &str) -> Result<(), StoreError> {
    if key.is_empty() {
        return Err(StoreError::Validation("key must not be empty".into()));
    }
    if key.len() > MAX_KEY_LEN {
        return Err(StoreError::Validation(format!(
            "key exceeds {MAX_KEY_LEN} characters"
        )));
    }
    if key.contains('\0') {
        return Err(StoreError::Validation("key must not contain NUL".into()));
    }
    Ok(())
}

fn validate_environment(environment: &str) -> Result<(), StoreError> {
    if environment.is_empty() {
        return Err(StoreError::Validation(
            "environment must not be empty".into(),
        ));
    }
    if environment.len() > MAX_LABEL_LEN {
        return Err(StoreError::Validation(format!(
            "environment exceeds {MAX_LABEL_LEN} characters"
        )));
    }
    if environment.contains('\0') {
        return Err(StoreError::Validation(
            "environment must not contain NUL".into(),
        ));
    }
    Ok(())
}

fn validate_category(category: Option<&str>) -> Result<(), StoreError> {
    if let Some(category) = category {
        if category.len() > MAX_LABEL_LEN {
            return Err(StoreError::Validation(format!(
                "category exceeds {MAX_LABEL_LEN} characters"
            )));
        }
    }
    Ok(())
}
