//! S3-compatible object store (AWS S3, Minio, etc.)

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_s3::presigning::PresigningConfig;
use chrono::{DateTime, Utc};

use crate::error::{CoreError, CoreResult};
use crate::object_store::{CorsRule, ObjectHead, ObjectStore, PresignedUrl};

/// User metadata key carrying the uploader of a folder marker
const OWNER_METADATA_KEY: &str = "owner";

pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    /// Create from existing AWS SDK client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Create with explicit endpoint and static credentials
    ///
    /// Path-style addressing is forced when an endpoint is given, which is
    /// what Minio and most S3-compatible services expect.
    pub fn with_credentials(
        endpoint: Option<&str>,
        region: &str,
        access_key: &str,
        secret_key: &str,
    ) -> Self {
        let creds = aws_sdk_s3::config::Credentials::new(
            access_key,
            secret_key,
            None,
            None,
            "mediavault",
        );

        let mut builder = aws_sdk_s3::Config::builder()
            .region(aws_sdk_s3::config::Region::new(region.to_string()))
            .credentials_provider(creds)
            .behavior_version(aws_sdk_s3::config::BehaviorVersion::latest());
        if let Some(endpoint) = endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Self::new(Client::from_conf(builder.build()))
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn head_object(&self, container: &str, key: &str) -> CoreResult<Option<ObjectHead>> {
        match self
            .client
            .head_object()
            .bucket(container)
            .key(key)
            .send()
            .await
        {
            Ok(head) => Ok(Some(ObjectHead {
                size_bytes: head.content_length().unwrap_or(0).max(0) as u64,
                last_modified: head
                    .last_modified()
                    .and_then(|t| DateTime::<Utc>::from_timestamp(t.secs(), t.subsec_nanos())),
                owner: head
                    .metadata()
                    .and_then(|m| m.get(OWNER_METADATA_KEY))
                    .cloned(),
            })),
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(upstream("S3 HEAD", e)),
        }
    }

    async fn presign_get(
        &self,
        container: &str,
        key: &str,
        ttl: Duration,
    ) -> CoreResult<PresignedUrl> {
        let presigning = PresigningConfig::expires_in(ttl)
            .map_err(|e| CoreError::MalformedInput(format!("read URL lifetime: {e}")))?;

        let request = self
            .client
            .get_object()
            .bucket(container)
            .key(key)
            .response_content_disposition("attachment")
            .presigned(presigning)
            .await
            .map_err(|e| upstream("S3 presign", e))?;

        Ok(PresignedUrl {
            url: request.uri().to_string(),
            expires_in_secs: ttl.as_secs(),
        })
    }

    async fn list_containers(&self) -> CoreResult<Vec<String>> {
        let response = self
            .client
            .list_buckets()
            .send()
            .await
            .map_err(|e| upstream("S3 LIST BUCKETS", e))?;

        Ok(response
            .buckets()
            .iter()
            .filter_map(|b| b.name().map(str::to_string))
            .collect())
    }

    async fn cors_rules(&self, container: &str) -> CoreResult<Vec<CorsRule>> {
        match self.client.get_bucket_cors().bucket(container).send().await {
            Ok(response) => Ok(response
                .cors_rules()
                .iter()
                .map(|rule| CorsRule {
                    allowed_headers: rule.allowed_headers().to_vec(),
                    allowed_methods: rule.allowed_methods().to_vec(),
                    allowed_origins: rule.allowed_origins().to_vec(),
                })
                .collect()),
            Err(e) if e.code() == Some("NoSuchCORSConfiguration") => Ok(Vec::new()),
            Err(e) => Err(upstream("S3 GET CORS", e)),
        }
    }
}

fn upstream<E: std::fmt::Display>(what: &str, err: E) -> CoreError {
    CoreError::UpstreamUnavailable(format!("{what} failed: {err}"))
}

fn is_not_found<E>(err: &SdkError<E>) -> bool {
    matches!(err, SdkError::ServiceError(e) if e.raw().status().as_u16() == 404)
}
