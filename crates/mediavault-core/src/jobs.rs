//! Enrichment jobs and remote command execution

use async_trait::async_trait;
use mediavault_store::TechnicalMetadata;
use serde::{Deserialize, Serialize};

use crate::error::CoreResult;

/// Lifecycle of an enrichment job
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Submitted,
    Progressing,
    Complete,
    Canceled,
    Error,
}

/// Everything the core needs from a finished enrichment job
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDetails {
    pub status: JobStatus,
    /// `s3://container/key` of the source object
    pub input: String,
    pub output_paths: Vec<String>,
    #[serde(default)]
    pub technical: Option<TechnicalMetadata>,
}

/// Transcoding and thumbnail generation
#[async_trait]
pub trait EnrichmentDispatcher: Send + Sync {
    /// Submit a job; `profile` is passed through untouched
    async fn submit_job(
        &self,
        input: &str,
        output_targets: &[String],
        profile: &serde_json::Value,
    ) -> CoreResult<String>;

    async fn get_job(&self, job_id: &str) -> CoreResult<JobDetails>;
}

/// Final status of a remote command
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum CommandStatus {
    Pending,
    InProgress,
    Success,
    Cancelled,
    TimedOut,
    Failed,
}

impl CommandStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, CommandStatus::Success)
    }
}

/// Runs tier-migration scripts on a storage host
#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    /// Start a script on `target_host`; returns the command id
    async fn send_command(&self, target_host: &str, script: &str) -> CoreResult<String>;

    /// Standard output of a finished command
    async fn fetch_output(&self, command_id: &str, target_host: &str) -> CoreResult<String>;
}
