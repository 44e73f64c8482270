//! In-memory permission store

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::permission::{GroupSet, PermissionRecord, PermissionStore};

/// In-memory permission store
#[derive(Default)]
pub struct InMemoryPermissionStore {
    /// (container, prefix) -> groups
    grants: RwLock<HashMap<(String, String), GroupSet>>,
}

impl InMemoryPermissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded grants
    pub fn grant_count(&self) -> usize {
        self.grants.read().unwrap().len()
    }
}

fn grant_key(container: &str, prefix: &str) -> (String, String) {
    (container.to_string(), prefix.to_string())
}

#[async_trait]
impl PermissionStore for InMemoryPermissionStore {
    async fn get(&self, container: &str, prefix: &str) -> StoreResult<Option<GroupSet>> {
        let grants = self.grants.read().unwrap();
        Ok(grants.get(&grant_key(container, prefix)).cloned())
    }

    async fn put(&self, container: &str, prefix: &str, groups: &GroupSet) -> StoreResult<()> {
        self.grants
            .write()
            .unwrap()
            .insert(grant_key(container, prefix), groups.clone());
        Ok(())
    }

    async fn put_if_absent(
        &self,
        container: &str,
        prefix: &str,
        groups: &GroupSet,
    ) -> StoreResult<bool> {
        let mut grants = self.grants.write().unwrap();
        let key = grant_key(container, prefix);
        if grants.contains_key(&key) {
            return Ok(false);
        }
        grants.insert(key, groups.clone());
        Ok(true)
    }

    async fn delete(&self, container: &str, prefix: &str) -> StoreResult<()> {
        self.grants
            .write()
            .unwrap()
            .remove(&grant_key(container, prefix));
        Ok(())
    }

    async fn list(
        &self,
        container: &str,
        prefix_filter: &str,
    ) -> StoreResult<Vec<PermissionRecord>> {
        let grants = self.grants.read().unwrap();
        let mut records: Vec<PermissionRecord> = grants
            .iter()
            .filter(|((c, p), _)| c == container && p.starts_with(prefix_filter))
            .map(|((c, p), groups)| PermissionRecord {
                container: c.clone(),
                prefix: p.clone(),
                groups: groups.clone(),
            })
            .collect();
        records.sort_by(|a, b| a.prefix.cmp(&b.prefix));
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn groups(names: &[&str]) -> GroupSet {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let store = InMemoryPermissionStore::new();
        store
            .put("media", "shows/", &groups(&["editors"]))
            .await
            .unwrap();

        assert_eq!(
            store.get("media", "shows/").await.unwrap(),
            Some(groups(&["editors"]))
        );
        assert_eq!(store.get("media", "movies/").await.unwrap(), None);
        assert_eq!(store.get("other", "shows/").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let store = InMemoryPermissionStore::new();
        store
            .put("media", "shows/", &groups(&["editors", "admin"]))
            .await
            .unwrap();
        store
            .put("media", "shows/", &groups(&["colorists"]))
            .await
            .unwrap();

        assert_eq!(
            store.get("media", "shows/").await.unwrap(),
            Some(groups(&["colorists"]))
        );
    }

    #[tokio::test]
    async fn test_put_if_absent_keeps_existing() {
        let store = InMemoryPermissionStore::new();
        assert!(
            store
                .put_if_absent("media", "shows/", &groups(&["editors"]))
                .await
                .unwrap()
        );
        assert!(
            !store
                .put_if_absent("media", "shows/", &groups(&["interns"]))
                .await
                .unwrap()
        );
        assert_eq!(
            store.get("media", "shows/").await.unwrap(),
            Some(groups(&["editors"]))
        );
    }

    #[tokio::test]
    async fn test_delete_idempotent() {
        let store = InMemoryPermissionStore::new();
        store.delete("media", "shows/").await.unwrap();

        store.put("media", "shows/", &groups(&["a"])).await.unwrap();
        store.delete("media", "shows/").await.unwrap();
        assert_eq!(store.grant_count(), 0);
    }

    #[tokio::test]
    async fn test_list_by_prefix() {
        let store = InMemoryPermissionStore::new();
        store.put("media", "shows/", &groups(&["a"])).await.unwrap();
        store
            .put("media", "shows/ep1/", &groups(&["a"]))
            .await
            .unwrap();
        store.put("media", "movies/", &groups(&["b"])).await.unwrap();
        store.put("other", "shows/", &groups(&["c"])).await.unwrap();

        let listed = store.list("media", "shows/").await.unwrap();
        let prefixes: Vec<&str> = listed.iter().map(|r| r.prefix.as_str()).collect();
        assert_eq!(prefixes, vec!["shows/", "shows/ep1/"]);

        assert_eq!(store.list("media", "").await.unwrap().len(), 3);
    }
}
