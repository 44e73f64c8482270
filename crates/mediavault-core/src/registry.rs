//! Registry access shared by the coordinators
//!
//! Wraps the raw [`AssetRegistry`] with upstream bounds, a single retry on
//! reads, error mapping, and best-effort publication of every applied write.

use std::sync::Arc;
use std::time::Duration;

use mediavault_store::{AssetKey, AssetRecord, AssetRegistry, LockState, StoreError};
use tracing::{debug, warn};

use crate::error::{CoreError, CoreResult};
use crate::sink::MutationSink;
use crate::upstream::{bounded, read_with_retry};

/// Upper bound on read-decide-write attempts for one key
pub const MAX_TRANSITION_ATTEMPTS: usize = 3;

/// Outcome of a conditional write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Write {
    Applied,
    /// Another writer got there first; re-read and decide again
    Lost,
}

/// Outcome of a conditional re-key
#[derive(Debug, Clone, PartialEq)]
pub enum Relocation {
    Moved(AssetRecord),
    DestinationTracked,
    Lost,
}

#[derive(Clone)]
pub struct Registry {
    store: Arc<dyn AssetRegistry>,
    sink: Arc<dyn MutationSink>,
    timeout: Duration,
}

impl Registry {
    pub fn new(
        store: Arc<dyn AssetRegistry>,
        sink: Arc<dyn MutationSink>,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            sink,
            timeout,
        }
    }

    pub async fn get(&self, key: &AssetKey) -> CoreResult<Option<AssetRecord>> {
        read_with_retry(self.timeout, "registry get", || async move {
            self.store.get(key).await.map_err(CoreError::from)
        })
        .await
    }

    pub async fn list_prefix(&self, container: &str, prefix: &str) -> CoreResult<Vec<AssetRecord>> {
        read_with_retry(self.timeout, "registry list", || async move {
            self.store.list_prefix(container, prefix).await.map_err(CoreError::from)
        })
        .await
    }

    /// Insert if absent
    pub async fn create(&self, record: &AssetRecord) -> CoreResult<Write> {
        let result = bounded(self.timeout, "registry create", async {
            Ok::<_, CoreError>(self.store.create(record).await)
        })
        .await?;

        match result {
            Ok(()) => {
                self.publish_upsert(record).await;
                Ok(Write::Applied)
            }
            Err(StoreError::AlreadyTracked(_)) => Ok(Write::Lost),
            Err(e) => Err(e.into()),
        }
    }

    /// Replace `record` if its stored lock state is still `expected`
    pub async fn update(&self, record: &AssetRecord, expected: &LockState) -> CoreResult<Write> {
        let result = bounded(self.timeout, "registry update", async {
            Ok::<_, CoreError>(self.store.update(record, expected).await)
        })
        .await?;

        match result {
            Ok(()) => {
                self.publish_upsert(record).await;
                Ok(Write::Applied)
            }
            Err(StoreError::StateChanged(_)) | Err(StoreError::NotFound(_)) => {
                debug!("Lost update race on {}", record.key);
                Ok(Write::Lost)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Re-key `from` to `to` if the source is unchanged and `to` is untracked
    pub async fn relocate(
        &self,
        from: &AssetKey,
        to: &AssetKey,
        expected: &LockState,
    ) -> CoreResult<Relocation> {
        let result = bounded(self.timeout, "registry relocate", async {
            Ok::<_, CoreError>(self.store.relocate(from, to, expected).await)
        })
        .await?;

        match result {
            Ok(moved) => {
                self.publish_remove(from).await;
                self.publish_upsert(&moved).await;
                Ok(Relocation::Moved(moved))
            }
            Err(StoreError::AlreadyTracked(_)) => Ok(Relocation::DestinationTracked),
            Err(StoreError::StateChanged(_)) | Err(StoreError::NotFound(_)) => {
                debug!("Lost relocate race on {}", from);
                Ok(Relocation::Lost)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Remove if the stored lock state is still `expected`
    pub async fn remove(&self, key: &AssetKey, expected: &LockState) -> CoreResult<Write> {
        let result = bounded(self.timeout, "registry remove", async {
            Ok::<_, CoreError>(self.store.remove(key, expected).await)
        })
        .await?;

        match result {
            Ok(_) => {
                self.publish_remove(key).await;
                Ok(Write::Applied)
            }
            Err(StoreError::StateChanged(_)) | Err(StoreError::NotFound(_)) => {
                debug!("Lost remove race on {}", key);
                Ok(Write::Lost)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn publish_upsert(&self, record: &AssetRecord) {
        let summary = record.summary();
        if let Err(e) = bounded(self.timeout, "sink upsert", self.sink.upsert(&summary)).await {
            warn!("Failed to publish upsert of {}: {}", record.key, e);
        }
    }

    async fn publish_remove(&self, key: &AssetKey) {
        if let Err(e) = bounded(self.timeout, "sink remove", self.sink.remove(key)).await {
            warn!("Failed to publish removal of {}: {}", key, e);
        }
    }
}
