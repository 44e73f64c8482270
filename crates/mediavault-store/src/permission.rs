//! Folder permission records

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StoreResult;

/// Group identifiers, kept ordered so stored and returned sets are stable
pub type GroupSet = BTreeSet<String>;

/// Groups granted access to one folder of a container
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionRecord {
    pub container: String,
    pub prefix: String,
    pub groups: GroupSet,
}

/// Keyed storage of folder grants
///
/// Pure storage: no defaulting and no authorization decisions.
#[async_trait]
pub trait PermissionStore: Send + Sync {
    /// Point lookup of a folder's grant
    async fn get(&self, container: &str, prefix: &str) -> StoreResult<Option<GroupSet>>;

    /// Overwrite a folder's grant
    async fn put(&self, container: &str, prefix: &str, groups: &GroupSet) -> StoreResult<()>;

    /// Insert a grant only if the folder has none; returns whether it was written
    async fn put_if_absent(
        &self,
        container: &str,
        prefix: &str,
        groups: &GroupSet,
    ) -> StoreResult<bool>;

    /// Remove a folder's grant (idempotent)
    async fn delete(&self, container: &str, prefix: &str) -> StoreResult<()>;

    /// All grants in a container whose folder starts with `prefix_filter`
    async fn list(&self, container: &str, prefix_filter: &str)
    -> StoreResult<Vec<PermissionRecord>>;
}
