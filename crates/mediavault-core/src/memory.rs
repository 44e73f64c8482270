//! In-memory collaborators for tests and single-process deployments

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use mediavault_store::{AssetKey, AssetSummary};

use crate::error::{CoreError, CoreResult};
use crate::jobs::{EnrichmentDispatcher, JobDetails, RemoteExecutor};
use crate::object_store::{CorsRule, ObjectHead, ObjectStore, PresignedUrl};
use crate::sink::MutationSink;

/// Object store holding only object heads
#[derive(Default)]
pub struct InMemoryObjectStore {
    containers: Mutex<BTreeMap<String, Vec<CorsRule>>>,
    objects: Mutex<HashMap<AssetKey, ObjectHead>>,
    unavailable: AtomicBool,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_container(&self, name: &str, cors: Vec<CorsRule>) {
        self.containers.lock().unwrap().insert(name.to_string(), cors);
    }

    pub fn put_object(&self, container: &str, key: &str, size_bytes: u64) {
        self.put_object_with_owner(container, key, size_bytes, None);
    }

    pub fn put_object_with_owner(
        &self,
        container: &str,
        key: &str,
        size_bytes: u64,
        owner: Option<&str>,
    ) {
        self.objects.lock().unwrap().insert(
            AssetKey::new(container, key),
            ObjectHead {
                size_bytes,
                last_modified: Some(chrono::Utc::now()),
                owner: owner.map(str::to_string),
            },
        );
    }

    pub fn remove_object(&self, container: &str, key: &str) {
        self.objects
            .lock()
            .unwrap()
            .remove(&AssetKey::new(container, key));
    }

    /// Make every call fail as if the store were unreachable
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> CoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CoreError::UpstreamUnavailable("object store offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn head_object(&self, container: &str, key: &str) -> CoreResult<Option<ObjectHead>> {
        self.check_available()?;
        Ok(self
            .objects
            .lock()
            .unwrap()
            .get(&AssetKey::new(container, key))
            .cloned())
    }

    async fn presign_get(
        &self,
        container: &str,
        key: &str,
        ttl: Duration,
    ) -> CoreResult<PresignedUrl> {
        self.check_available()?;
        Ok(PresignedUrl {
            url: format!("memory://{container}/{key}?expires={}", ttl.as_secs()),
            expires_in_secs: ttl.as_secs(),
        })
    }

    async fn list_containers(&self) -> CoreResult<Vec<String>> {
        self.check_available()?;
        Ok(self.containers.lock().unwrap().keys().cloned().collect())
    }

    async fn cors_rules(&self, container: &str) -> CoreResult<Vec<CorsRule>> {
        self.check_available()?;
        self.containers
            .lock()
            .unwrap()
            .get(container)
            .cloned()
            .ok_or_else(|| CoreError::NotFound(format!("container '{container}'")))
    }
}

/// A job submission as received by [`InMemoryEnrichmentDispatcher`]
#[derive(Clone, Debug, PartialEq)]
pub struct SubmittedJob {
    pub job_id: String,
    pub input: String,
    pub output_targets: Vec<String>,
    pub profile: serde_json::Value,
}

/// Enrichment dispatcher that records submissions; job results are seeded by tests
#[derive(Default)]
pub struct InMemoryEnrichmentDispatcher {
    next_id: AtomicU64,
    submitted: Mutex<Vec<SubmittedJob>>,
    jobs: Mutex<HashMap<String, JobDetails>>,
    reject_submissions: AtomicBool,
}

impl InMemoryEnrichmentDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submitted(&self) -> Vec<SubmittedJob> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn set_job(&self, job_id: &str, details: JobDetails) {
        self.jobs
            .lock()
            .unwrap()
            .insert(job_id.to_string(), details);
    }

    pub fn reject_submissions(&self, reject: bool) {
        self.reject_submissions.store(reject, Ordering::SeqCst);
    }
}

#[async_trait]
impl EnrichmentDispatcher for InMemoryEnrichmentDispatcher {
    async fn submit_job(
        &self,
        input: &str,
        output_targets: &[String],
        profile: &serde_json::Value,
    ) -> CoreResult<String> {
        if self.reject_submissions.load(Ordering::SeqCst) {
            return Err(CoreError::UpstreamUnavailable("enrichment queue full".into()));
        }
        let job_id = format!("job-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.submitted.lock().unwrap().push(SubmittedJob {
            job_id: job_id.clone(),
            input: input.to_string(),
            output_targets: output_targets.to_vec(),
            profile: profile.clone(),
        });
        Ok(job_id)
    }

    async fn get_job(&self, job_id: &str) -> CoreResult<JobDetails> {
        self.jobs
            .lock()
            .unwrap()
            .get(job_id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound(format!("job '{job_id}'")))
    }
}

/// A command as received by [`InMemoryRemoteExecutor`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentCommand {
    pub command_id: String,
    pub target_host: String,
    pub script: String,
}

/// Remote executor that records commands; outputs are seeded by tests
#[derive(Default)]
pub struct InMemoryRemoteExecutor {
    next_id: AtomicU64,
    sent: Mutex<Vec<SentCommand>>,
    outputs: Mutex<HashMap<String, String>>,
}

impl InMemoryRemoteExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<SentCommand> {
        self.sent.lock().unwrap().clone()
    }

    pub fn set_output(&self, command_id: &str, output: &str) {
        self.outputs
            .lock()
            .unwrap()
            .insert(command_id.to_string(), output.to_string());
    }
}

#[async_trait]
impl RemoteExecutor for InMemoryRemoteExecutor {
    async fn send_command(&self, target_host: &str, script: &str) -> CoreResult<String> {
        let command_id = format!("cmd-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.sent.lock().unwrap().push(SentCommand {
            command_id: command_id.clone(),
            target_host: target_host.to_string(),
            script: script.to_string(),
        });
        Ok(command_id)
    }

    async fn fetch_output(&self, command_id: &str, _target_host: &str) -> CoreResult<String> {
        self.outputs
            .lock()
            .unwrap()
            .get(command_id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound(format!("command '{command_id}'")))
    }
}

/// Sink that keeps every published change for inspection
#[derive(Default)]
pub struct RecordingSink {
    upserts: Mutex<Vec<AssetSummary>>,
    removals: Mutex<Vec<AssetKey>>,
    failing: AtomicBool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upserts(&self) -> Vec<AssetSummary> {
        self.upserts.lock().unwrap().clone()
    }

    pub fn removals(&self) -> Vec<AssetKey> {
        self.removals.lock().unwrap().clone()
    }

    /// Reject every publish from now on
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> CoreResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(CoreError::UpstreamUnavailable("sink offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl MutationSink for RecordingSink {
    async fn upsert(&self, summary: &AssetSummary) -> CoreResult<()> {
        self.check()?;
        self.upserts.lock().unwrap().push(summary.clone());
        Ok(())
    }

    async fn remove(&self, key: &AssetKey) -> CoreResult<()> {
        self.check()?;
        self.removals.lock().unwrap().push(key.clone());
        Ok(())
    }
}
