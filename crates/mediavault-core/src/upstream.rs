//! Bounded calls to external collaborators

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::error::{CoreError, CoreResult};

/// Run an external call under a deadline; a timeout is retryable
pub(crate) async fn bounded<T, F>(limit: Duration, what: &str, call: F) -> CoreResult<T>
where
    F: Future<Output = CoreResult<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(CoreError::UpstreamUnavailable(format!(
            "{what} timed out after {limit:?}"
        ))),
    }
}

/// Bounded idempotent read, retried once on a retryable failure
pub(crate) async fn read_with_retry<T, F, Fut>(limit: Duration, what: &str, mut read: F) -> CoreResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = CoreResult<T>>,
{
    match bounded(limit, what, read()).await {
        Err(e) if e.is_retryable() => {
            debug!("Retrying {} after: {}", what, e);
            bounded(limit, what, read()).await
        }
        other => other,
    }
}
