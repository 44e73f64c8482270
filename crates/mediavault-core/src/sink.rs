//! Change publication to downstream consumers

use async_trait::async_trait;
use mediavault_store::{AssetKey, AssetSummary};
use serde_json::json;

use crate::error::{CoreError, CoreResult};

/// Receives a copy of every registry change
///
/// Delivery is best-effort: a failed publish is logged by the caller and the
/// registry write stands. Both calls must be idempotent.
#[async_trait]
pub trait MutationSink: Send + Sync {
    async fn upsert(&self, summary: &AssetSummary) -> CoreResult<()>;

    async fn remove(&self, key: &AssetKey) -> CoreResult<()>;
}

/// Discards every change
#[derive(Default)]
pub struct NoopSink;

#[async_trait]
impl MutationSink for NoopSink {
    async fn upsert(&self, _summary: &AssetSummary) -> CoreResult<()> {
        Ok(())
    }

    async fn remove(&self, _key: &AssetKey) -> CoreResult<()> {
        Ok(())
    }
}

/// Posts changes as JSON to `{base}/upsert` and `{base}/remove`
pub struct HttpMutationSink {
    client: reqwest::Client,
    base_url: String,
}

impl HttpMutationSink {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn post(&self, path: &str, body: serde_json::Value) -> CoreResult<()> {
        self.client
            .post(format!("{}/{path}", self.base_url))
            .json(&body)
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(|e| CoreError::UpstreamUnavailable(format!("mutation sink: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl MutationSink for HttpMutationSink {
    async fn upsert(&self, summary: &AssetSummary) -> CoreResult<()> {
        self.post("upsert", json!({ "input": summary })).await
    }

    async fn remove(&self, key: &AssetKey) -> CoreResult<()> {
        self.post(
            "remove",
            json!({ "input": { "container": key.container, "key": key.key } }),
        )
        .await
    }
}
