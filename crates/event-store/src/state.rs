//! Materialized state store for entities that are not event-sourced.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::{EntityId, Result, Version, store::conflict};

/// The stored form of a state-based entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateRecord {
    pub id: EntityId,
    pub entity_type: String,
    /// Incremented on every write that changes `state`.
    pub version: Version,
    pub state: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

/// Storage for materialized entity records.
///
/// Records are keyed by `(entity_type, id)`. Writes carry the version the
/// caller loaded; a mismatch is reported as `ConcurrencyConflict`, the same
/// way the event store reports a stale stream.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Loads a record, returning None if it does not exist.
    async fn load(&self, entity_type: &str, id: &EntityId) -> Result<Option<StateRecord>>;

    /// Writes a record and returns its new version.
    ///
    /// `expected_version` is `Version::initial()` for a record that should
    /// not exist yet. Writing a state equal to the stored one is a no-op that
    /// returns the current version.
    async fn save(
        &self,
        entity_type: &str,
        id: &EntityId,
        expected_version: Version,
        state: serde_json::Value,
    ) -> Result<Version>;

    /// Deletes a record that is at `expected_version`.
    ///
    /// Deleting a record that never existed is a no-op when
    /// `expected_version` is `Version::initial()`.
    async fn delete(&self, entity_type: &str, id: &EntityId, expected_version: Version)
    -> Result<()>;
}

type RecordKey = (String, EntityId);

/// In-memory state store.
#[derive(Clone, Default)]
pub struct InMemoryStateStore {
    records: Arc<RwLock<HashMap<RecordKey, StateRecord>>>,
}

impl InMemoryStateStore {
    /// Creates a new empty in-memory state store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored records.
    pub async fn record_count(&self) -> usize {
        self.records.read().await.len()
    }
}

fn key(entity_type: &str, id: &EntityId) -> RecordKey {
    (entity_type.to_string(), id.clone())
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn load(&self, entity_type: &str, id: &EntityId) -> Result<Option<StateRecord>> {
        Ok(self.records.read().await.get(&key(entity_type, id)).cloned())
    }

    #[tracing::instrument(skip(self, state))]
    async fn save(
        &self,
        entity_type: &str,
        id: &EntityId,
        expected_version: Version,
        state: serde_json::Value,
    ) -> Result<Version> {
        let mut records = self.records.write().await;
        let key = key(entity_type, id);

        let current_version = records
            .get(&key)
            .map(|record| record.version)
            .unwrap_or_default();
        if current_version != expected_version {
            return Err(conflict(id, expected_version, current_version));
        }

        if let Some(existing) = records.get(&key)
            && existing.state == state
        {
            return Ok(existing.version);
        }

        let version = current_version.next();
        records.insert(
            key,
            StateRecord {
                id: id.clone(),
                entity_type: entity_type.to_string(),
                version,
                state,
                updated_at: Utc::now(),
            },
        );
        Ok(version)
    }

    #[tracing::instrument(skip(self))]
    async fn delete(
        &self,
        entity_type: &str,
        id: &EntityId,
        expected_version: Version,
    ) -> Result<()> {
        let mut records = self.records.write().await;
        let key = key(entity_type, id);

        let current_version = records
            .get(&key)
            .map(|record| record.version)
            .unwrap_or_default();
        if current_version != expected_version {
            return Err(conflict(id, expected_version, current_version));
        }

        records.remove(&key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StoreError;
    use serde_json::json;

    #[tokio::test]
    async fn save_new_record_starts_at_version_one() {
        let store = InMemoryStateStore::new();
        let id = EntityId::from("customer-1");

        let version = store
            .save("Customer", &id, Version::initial(), json!({"name": "Ada"}))
            .await
            .unwrap();
        assert_eq!(version, Version::first());

        let record = store.load("Customer", &id).await.unwrap().unwrap();
        assert_eq!(record.version, Version::first());
        assert_eq!(record.state["name"], "Ada");
    }

    #[tokio::test]
    async fn stale_write_is_a_conflict() {
        let store = InMemoryStateStore::new();
        let id = EntityId::from("customer-1");

        store
            .save("Customer", &id, Version::initial(), json!({"name": "Ada"}))
            .await
            .unwrap();
        store
            .save("Customer", &id, Version::first(), json!({"name": "Grace"}))
            .await
            .unwrap();

        let result = store
            .save("Customer", &id, Version::first(), json!({"name": "Edsger"}))
            .await;
        assert!(matches!(
            result,
            Err(StoreError::ConcurrencyConflict { .. })
        ));

        let record = store.load("Customer", &id).await.unwrap().unwrap();
        assert_eq!(record.state["name"], "Grace");
        assert_eq!(record.version, Version::new(2));
    }

    #[tokio::test]
    async fn unchanged_write_keeps_version() {
        let store = InMemoryStateStore::new();
        let id = EntityId::from("customer-1");

        store
            .save("Customer", &id, Version::initial(), json!({"name": "Ada"}))
            .await
            .unwrap();
        let version = store
            .save("Customer", &id, Version::first(), json!({"name": "Ada"}))
            .await
            .unwrap();
        assert_eq!(version, Version::first());
    }

    #[tokio::test]
    async fn records_are_scoped_by_entity_type() {
        let store = InMemoryStateStore::new();
        let id = EntityId::from("shared-1");

        store
            .save("Customer", &id, Version::initial(), json!({"kind": "customer"}))
            .await
            .unwrap();

        assert!(store.load("Supplier", &id).await.unwrap().is_none());
        store
            .save("Supplier", &id, Version::initial(), json!({"kind": "supplier"}))
            .await
            .unwrap();
        assert_eq!(store.record_count().await, 2);
    }

    #[tokio::test]
    async fn delete_checks_version() {
        let store = InMemoryStateStore::new();
        let id = EntityId::from("customer-1");

        store
            .save("Customer", &id, Version::initial(), json!({"name": "Ada"}))
            .await
            .unwrap();

        let stale = store.delete("Customer", &id, Version::initial()).await;
        assert!(stale.unwrap_err().is_concurrency_conflict());

        store.delete("Customer", &id, Version::first()).await.unwrap();
        assert!(store.load("Customer", &id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_of_missing_record_is_noop() {
        let store = InMemoryStateStore::new();
        store
            .delete("Customer", &EntityId::from("ghost"), Version::initial())
            .await
            .unwrap();
    }
}
