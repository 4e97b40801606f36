//! # Store Integration Flows
//!
//! The encrypted store exercised end to end: key derivation, encryption
//! round-trips across contexts, uniqueness, filtering, and statistics,
//! all over the in-memory backend.

#[cfg(test)]
mod tests {
    use sc_store::{EncryptedStore, ListFilter, MemoryKvStore};
    use serde_json::json;
    use shared_crypto::{EncryptionContext, KeyContextCache, Salt};
    use shared_types::StoreError;
    use std::sync::Arc;

    fn store() -> EncryptedStore {
        EncryptedStore::new(Arc::new(MemoryKvStore::new()))
    }

    #[test]
    fn test_full_crud_cycle() {
        let store = store();
        let ctx = EncryptionContext::derive(&Salt::generate(), "alice-secret");
        let value = json!({"host": "db.internal", "port": 5432, "tls": true});

        let created = store
            .create("database", "production", &value, Some("infra".into()), &ctx)
            .unwrap();
        assert_eq!(created.value, value);
        assert_eq!(created.environment, "production");

        let read = store.read("database", "production", &ctx, true).unwrap();
        assert_eq!(read.value, value);
        assert_eq!(read.id, created.id);
        assert!(read.created_at.is_some());

        let new_value = json!({"host": "db2.internal", "port": 5433});
        let updated = store
            .update("database", "production", &new_value, None, &ctx)
            .unwrap();
        // Values are replaced wholesale, never merged.
        assert_eq!(updated.value, new_value);
        assert!(updated.value.get("tls").is_none());
        assert_eq!(updated.category.as_deref(), Some("infra"));

        store.delete("database", "production").unwrap();
        assert!(matches!(
            store.read("database", "production", &ctx, false),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn test_duplicate_create_rejected_but_environments_are_separate() {
        let store = store();
        let ctx = EncryptionContext::derive(&Salt::generate(), "alice-secret");

        store
            .create("api", "production", &json!(1), None, &ctx)
            .unwrap();
        assert!(matches!(
            store.create("api", "production", &json!(2), None, &ctx),
            Err(StoreError::DuplicateKey { .. })
        ));

        // Same key in another environment is a distinct entry.
        store
            .create("api", "staging", &json!(2), None, &ctx)
            .unwrap();
        assert_eq!(
            store.read("api", "staging", &ctx, false).unwrap().value,
            json!(2)
        );
        assert_eq!(
            store.read("api", "production", &ctx, false).unwrap().value,
            json!(1)
        );
    }

    #[test]
    fn test_wrong_passphrase_cannot_decrypt() {
        let salt = Salt::generate();
        let store = store();
        let alice = EncryptionContext::derive(&salt, "alice-secret");
        let mallory = EncryptionContext::derive(&salt, "mallory-guess");

        store
            .create("token", "production", &json!("s3cr3t"), None, &alice)
            .unwrap();

        assert!(matches!(
            store.read("token", "production", &mallory, false),
            Err(StoreError::Decryption(_))
        ));
        // The right context still works afterwards.
        assert_eq!(
            store.read("token", "production", &alice, false).unwrap().value,
            json!("s3cr3t")
        );
    }

    #[test]
    fn test_same_passphrase_shares_cached_context() {
        let cache = KeyContextCache::new(Salt::generate());
        let first = cache.get_or_derive("alice-secret");
        let second = cache.get_or_derive("alice-secret");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);

        let store = store();
        store
            .create("db", "prod", &json!({"a": 1}), None, &first)
            .unwrap();
        assert_eq!(
            store.read("db", "prod", &second, false).unwrap().value,
            json!({"a": 1})
        );
    }

    #[test]
    fn test_list_filters_and_statistics() {
        let store = store();
        let ctx = EncryptionContext::derive(&Salt::generate(), "alice-secret");

        store
            .create("db", "prod", &json!(1), Some("infra".into()), &ctx)
            .unwrap();
        store
            .create("cache", "prod", &json!(2), Some("infra".into()), &ctx)
            .unwrap();
        store
            .create("theme", "dev", &json!(3), None, &ctx)
            .unwrap();

        let infra = store
            .list(
                &ListFilter {
                    category: Some("infra".into()),
                    ..ListFilter::default()
                },
                &ctx,
            )
            .unwrap();
        assert_eq!(infra.len(), 2);

        let prod = store
            .list(
                &ListFilter {
                    environment: Some("prod".into()),
                    ..ListFilter::default()
                },
                &ctx,
            )
            .unwrap();
        assert_eq!(prod.len(), 2);

        let stats = store.statistics().unwrap();
        assert_eq!(stats.total_keys, 3);
        assert_eq!(stats.keys_by_category.get("infra"), Some(&2));
        assert_eq!(stats.keys_by_category.get("uncategorized"), Some(&1));
        assert_eq!(stats.keys_by_environment.get("prod"), Some(&2));
        assert_eq!(stats.keys_by_environment.get("dev"), Some(&1));
    }

    #[test]
    fn test_value_shapes_survive_round_trip() {
        let store = store();
        let ctx = EncryptionContext::derive(&Salt::generate(), "alice-secret");

        let shapes = [
            json!({"nested": {"deep": [1, 2, 3]}}),
            json!(["a", "b"]),
            json!("plain string"),
            json!(42.5),
            json!(true),
        ];
        for (i, value) in shapes.iter().enumerate() {
            let key = format!("shape-{i}");
            store.create(&key, "dev", value, None, &ctx).unwrap();
            assert_eq!(&store.read(&key, "dev", &ctx, false).unwrap().value, value);
        }
    }
}
