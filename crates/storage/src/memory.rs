//! In-process `ManifestStore` backed by a shared ordered map.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::condition::WriteCondition;
use crate::error::StorageError;
use crate::record::ManifestRecord;
use crate::traits::ManifestStore;

/// In-memory store. Clones share the same underlying map.
///
/// The write condition is checked and the record written under a single
/// write-lock acquisition, which gives the same atomicity a conditional
/// expression gives on a remote store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Arc<RwLock<BTreeMap<String, ManifestRecord>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: impl IntoIterator<Item = ManifestRecord>) -> Self {
        let map = records
            .into_iter()
            .map(|r| (r.manifest_id.clone(), r))
            .collect();
        Self {
            records: Arc::new(RwLock::new(map)),
        }
    }
}

fn poisoned<T>(_: T) -> StorageError {
    StorageError::Backend("memory store lock poisoned".to_string())
}

#[async_trait]
impl ManifestStore for MemoryStore {
    async fn conditional_upsert(
        &self,
        record: ManifestRecord,
        condition: &WriteCondition,
    ) -> Result<ManifestRecord, StorageError> {
        let mut records = self.records.write().map_err(poisoned)?;
        if !condition.holds(records.get(&record.manifest_id)) {
            return Err(StorageError::ConditionFailed {
                manifest_id: record.manifest_id,
            });
        }
        records.insert(record.manifest_id.clone(), record.clone());
        Ok(record)
    }

    async fn get(&self, manifest_id: &str) -> Result<ManifestRecord, StorageError> {
        let records = self.records.read().map_err(poisoned)?;
        records
            .get(manifest_id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound {
                manifest_id: manifest_id.to_string(),
            })
    }

    async fn scan(&self) -> Result<Vec<ManifestRecord>, StorageError> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records.values().cloned().collect())
    }

    async fn delete(&self, manifest_id: &str) -> Result<(), StorageError> {
        let mut records = self.records.write().map_err(poisoned)?;
        records
            .remove(manifest_id)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound {
                manifest_id: manifest_id.to_string(),
            })
    }

    async fn delete_all(&self) -> Result<usize, StorageError> {
        let mut records = self.records.write().map_err(poisoned)?;
        let removed = records.len();
        records.clear();
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{ManifestStats, ManifestStatus};

    fn record(id: &str) -> ManifestRecord {
        ManifestRecord {
            manifest_id: id.to_string(),
            collection_id: "c___1".to_string(),
            provider_id: Some("prov".to_string()),
            status: ManifestStatus::Running,
            execution_ref: "exec-a".to_string(),
            stats: ManifestStats::new(1, 0, 0),
            percent_complete: 0.0,
            acknowledgment_sent: false,
            acknowledgment_body: None,
            created_at: 0,
            updated_at: 0,
            duration_ms: 0,
        }
    }

    #[tokio::test]
    async fn clones_share_state() {
        let a = MemoryStore::new();
        let b = a.clone();
        a.conditional_upsert(record("x.PDR"), &WriteCondition::Always)
            .await
            .unwrap();
        assert_eq!(b.get("x.PDR").await.unwrap().manifest_id, "x.PDR");
    }

    #[tokio::test]
    async fn seeded_store_scans_in_key_order() {
        let store = MemoryStore::with_records(vec![record("b.PDR"), record("a.PDR")]);
        let ids: Vec<_> = store
            .scan()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.manifest_id)
            .collect();
        assert_eq!(ids, vec!["a.PDR", "b.PDR"]);
    }
}
