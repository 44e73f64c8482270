//! Object store seam: existence checks, read URLs, container catalog

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreResult;

/// Metadata returned by a HEAD on an object
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectHead {
    pub size_bytes: u64,
    pub last_modified: Option<DateTime<Utc>>,
    /// `owner` user metadata, set by the uploader on folder markers
    pub owner: Option<String>,
}

/// One CORS rule of a container
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorsRule {
    pub allowed_headers: Vec<String>,
    pub allowed_methods: Vec<String>,
    pub allowed_origins: Vec<String>,
}

impl CorsRule {
    /// Browser uploads need any header and origin plus `PUT` and `HEAD`
    pub fn permits_browser_uploads(&self) -> bool {
        let has = |list: &[String], want: &str| list.iter().any(|v| v.eq_ignore_ascii_case(want));
        has(&self.allowed_headers, "*")
            && has(&self.allowed_origins, "*")
            && has(&self.allowed_methods, "PUT")
            && has(&self.allowed_methods, "HEAD")
    }
}

/// Time-limited read URL
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignedUrl {
    pub url: String,
    pub expires_in_secs: u64,
}

/// External object storage
///
/// The core never reads or writes object bodies; it only asks whether
/// objects exist and hands out read URLs.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// HEAD an object; `None` if it does not exist
    async fn head_object(&self, container: &str, key: &str) -> CoreResult<Option<ObjectHead>>;

    /// Presigned GET URL, served as an attachment
    async fn presign_get(&self, container: &str, key: &str, ttl: Duration)
    -> CoreResult<PresignedUrl>;

    async fn list_containers(&self) -> CoreResult<Vec<String>>;

    /// CORS rules of a container; empty if none are configured
    async fn cors_rules(&self, container: &str) -> CoreResult<Vec<CorsRule>>;
}
