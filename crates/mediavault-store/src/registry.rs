//! Asset registry: lifecycle state of every tracked object

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::key::AssetKey;
use crate::record::{AssetRecord, LockState};

/// Tracks asset lifecycle state
///
/// Every mutation except `create` is conditioned on the lock state the
/// caller last read. A mismatch returns `StoreError::StateChanged` and
/// leaves the stored record untouched.
#[async_trait]
pub trait AssetRegistry: Send + Sync {
    /// Fetch the record for a key, if tracked
    async fn get(&self, key: &AssetKey) -> StoreResult<Option<AssetRecord>>;

    /// Insert a record for an untracked key
    ///
    /// Returns `StoreError::AlreadyTracked` if the key already has a record.
    async fn create(&self, record: &AssetRecord) -> StoreResult<()>;

    /// Replace a record whose lock state still equals `expected`
    async fn update(&self, record: &AssetRecord, expected: &LockState) -> StoreResult<()>;

    /// Move a record to a new key
    ///
    /// Fails with `AlreadyTracked` if `to` is tracked and `StateChanged` if the
    /// source no longer matches `expected`. Returns the re-keyed record.
    async fn relocate(
        &self,
        from: &AssetKey,
        to: &AssetKey,
        expected: &LockState,
    ) -> StoreResult<AssetRecord>;

    /// Remove a record whose lock state still equals `expected`
    async fn remove(&self, key: &AssetKey, expected: &LockState) -> StoreResult<AssetRecord>;

    /// Records whose folder is exactly `prefix`
    async fn list_prefix(&self, container: &str, prefix: &str) -> StoreResult<Vec<AssetRecord>>;
}
