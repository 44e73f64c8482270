//! In-memory asset registry

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::{StoreError, StoreResult};
use crate::key::AssetKey;
use crate::record::{AssetRecord, LockState};
use crate::registry::AssetRegistry;

/// In-memory asset registry
///
/// Each conditional write holds the write lock across compare and swap.
#[derive(Default)]
pub struct InMemoryAssetRegistry {
    records: RwLock<HashMap<AssetKey, AssetRecord>>,
}

impl InMemoryAssetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked assets
    pub fn len(&self) -> usize {
        self.records.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of every record
    pub fn all(&self) -> Vec<AssetRecord> {
        self.records.read().unwrap().values().cloned().collect()
    }
}

fn check_expected(current: &AssetRecord, expected: &LockState) -> StoreResult<()> {
    if current.lock_state() != *expected {
        return Err(StoreError::StateChanged(current.key.to_string()));
    }
    Ok(())
}

#[async_trait]
impl AssetRegistry for InMemoryAssetRegistry {
    async fn get(&self, key: &AssetKey) -> StoreResult<Option<AssetRecord>> {
        Ok(self.records.read().unwrap().get(key).cloned())
    }

    async fn create(&self, record: &AssetRecord) -> StoreResult<()> {
        let mut records = self.records.write().unwrap();
        if records.contains_key(&record.key) {
            return Err(StoreError::AlreadyTracked(record.key.to_string()));
        }
        records.insert(record.key.clone(), record.clone());
        Ok(())
    }

    async fn update(&self, record: &AssetRecord, expected: &LockState) -> StoreResult<()> {
        let mut records = self.records.write().unwrap();
        let current = records
            .get(&record.key)
            .ok_or_else(|| StoreError::NotFound(record.key.to_string()))?;
        check_expected(current, expected)?;
        records.insert(record.key.clone(), record.clone());
        Ok(())
    }

    async fn relocate(
        &self,
        from: &AssetKey,
        to: &AssetKey,
        expected: &LockState,
    ) -> StoreResult<AssetRecord> {
        let mut records = self.records.write().unwrap();
        if records.contains_key(to) {
            return Err(StoreError::AlreadyTracked(to.to_string()));
        }
        let current = records
            .get(from)
            .ok_or_else(|| StoreError::NotFound(from.to_string()))?;
        check_expected(current, expected)?;

        let mut moved = records
            .remove(from)
            .ok_or_else(|| StoreError::NotFound(from.to_string()))?;
        moved.rekey(to.clone());
        records.insert(to.clone(), moved.clone());
        Ok(moved)
    }

    async fn remove(&self, key: &AssetKey, expected: &LockState) -> StoreResult<AssetRecord> {
        let mut records = self.records.write().unwrap();
        let current = records
            .get(key)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
        check_expected(current, expected)?;
        records
            .remove(key)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    async fn list_prefix(&self, container: &str, prefix: &str) -> StoreResult<Vec<AssetRecord>> {
        let records = self.records.read().unwrap();
        let mut found: Vec<AssetRecord> = records
            .values()
            .filter(|r| r.key.container == container && r.prefix == prefix)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(found)
    }
}
