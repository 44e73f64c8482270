//! Core error types

use mediavault_store::StoreError;
use thiserror::Error;

pub type CoreResult<T> = Result<T, CoreError>;

/// Outcome kinds surfaced to callers
///
/// `PermissionDenied` and `StateConflict` are expected, user-facing answers.
/// Only `UpstreamUnavailable` is worth retrying.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("State conflict: {0}")]
    StateConflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Malformed input: {0}")]
    MalformedInput(String),
}

impl CoreError {
    /// Stable machine-readable discriminator
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::PermissionDenied(_) => "PermissionDenied",
            CoreError::StateConflict(_) => "StateConflict",
            CoreError::NotFound(_) => "NotFound",
            CoreError::UpstreamUnavailable(_) => "UpstreamUnavailable",
            CoreError::MalformedInput(_) => "MalformedInput",
        }
    }

    /// Human-readable reason without the kind prefix
    pub fn reason(&self) -> &str {
        match self {
            CoreError::PermissionDenied(r)
            | CoreError::StateConflict(r)
            | CoreError::NotFound(r)
            | CoreError::UpstreamUnavailable(r)
            | CoreError::MalformedInput(r) => r,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::UpstreamUnavailable(_))
    }
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(key) => CoreError::NotFound(format!("{key} is not tracked")),
            StoreError::AlreadyTracked(key) => {
                CoreError::StateConflict(format!("{key} is already tracked"))
            }
            StoreError::StateChanged(key) => {
                CoreError::StateConflict(format!("{key} changed concurrently"))
            }
            other => CoreError::UpstreamUnavailable(other.to_string()),
        }
    }
}
