//! Store error types

use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Asset not tracked: {0}")]
    NotFound(String),

    #[error("Asset already tracked: {0}")]
    AlreadyTracked(String),

    /// The record's lock state no longer matches what the caller read
    #[error("Asset state changed concurrently: {0}")]
    StateChanged(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[cfg(feature = "sqlite")]
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl StoreError {
    /// Whether the caller may retry the same request unchanged
    pub fn is_retryable(&self) -> bool {
        match self {
            StoreError::Storage(_) => true,
            #[cfg(feature = "sqlite")]
            StoreError::Database(_) => true,
            _ => false,
        }
    }
}
