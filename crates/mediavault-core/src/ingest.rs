//! Reactions to object-store and enrichment notifications

use std::sync::Arc;

use chrono::{DateTime, Utc};
use mediavault_store::{AssetKey, AssetRecord, ROOT_PREFIX, TechnicalMetadata, Tier};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::authority::PermissionAuthority;
use crate::config::CoreConfig;
use crate::error::{CoreError, CoreResult};
use crate::identity::IdentityProvider;
use crate::jobs::{EnrichmentDispatcher, JobStatus};
use crate::object_store::ObjectStore;
use crate::registry::{MAX_TRANSITION_ATTEMPTS, Registry, Write};
use crate::upstream::{bounded, read_with_retry};

const THUMBNAIL_MARKER: &str = "_thumbnail";
const PROXY_MARKER: &str = "_proxy";

/// An object was written to the store
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectEvent {
    pub container: String,
    pub key: String,
    #[serde(default)]
    pub size_bytes: u64,
    pub event_time: DateTime<Utc>,
    /// Falls back to the object's `owner` metadata when absent
    #[serde(default)]
    pub uploader: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IngestAction {
    Created,
    Refreshed,
    FolderObserved,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestOutcome {
    pub key: AssetKey,
    pub action: IngestAction,
    pub grant_created: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrichment_job: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrichment_error: Option<String>,
}

pub struct IngestReconciler {
    registry: Registry,
    authority: Arc<PermissionAuthority>,
    objects: Arc<dyn ObjectStore>,
    identity: Arc<dyn IdentityProvider>,
    enrichment: Arc<dyn EnrichmentDispatcher>,
    config: CoreConfig,
}

impl IngestReconciler {
    pub fn new(
        registry: Registry,
        authority: Arc<PermissionAuthority>,
        objects: Arc<dyn ObjectStore>,
        identity: Arc<dyn IdentityProvider>,
        enrichment: Arc<dyn EnrichmentDispatcher>,
        config: CoreConfig,
    ) -> Self {
        Self {
            registry,
            authority,
            objects,
            identity,
            enrichment,
            config,
        }
    }

    /// Track a new or modified object and queue its enrichment
    pub async fn object_created(&self, event: &ObjectEvent) -> CoreResult<IngestOutcome> {
        let key = event_key(&event.container, &event.key)?;

        if key.is_folder_marker() {
            let group = self.uploader_group(&key, event.uploader.as_deref()).await?;
            let grant_created = self
                .authority
                .ensure_default_grant(&key.container, &key.key, group.as_deref())
                .await?;
            return Ok(IngestOutcome {
                key,
                action: IngestAction::FolderObserved,
                grant_created,
                enrichment_job: None,
                enrichment_error: None,
            });
        }

        let (record, action) = self.track(&key, event).await?;

        let prefix = key.prefix();
        let grant_created = if prefix == ROOT_PREFIX {
            false
        } else {
            let group = self.uploader_group(&key, event.uploader.as_deref()).await?;
            self.authority
                .ensure_default_grant(&key.container, &prefix, group.as_deref())
                .await?
        };

        let mut outcome = IngestOutcome {
            key,
            action,
            grant_created,
            enrichment_job: None,
            enrichment_error: None,
        };
        match self.submit_enrichment(&record).await {
            Ok(job_id) => outcome.enrichment_job = Some(job_id),
            Err(e) => {
                warn!("Enrichment submit for {} failed: {}", record.key, e);
                outcome.enrichment_error = Some(e.to_string());
            }
        }
        Ok(outcome)
    }

    async fn track(&self, key: &AssetKey, event: &ObjectEvent) -> CoreResult<(AssetRecord, IngestAction)> {
        for _ in 0..MAX_TRANSITION_ATTEMPTS {
            match self.registry.get(key).await? {
                None => {
                    let record = AssetRecord::new(key.clone(), event.size_bytes, event.event_time);
                    if self.registry.create(&record).await? == Write::Applied {
                        info!("Tracking new asset {}", key);
                        return Ok((record, IngestAction::Created));
                    }
                }
                Some(record) => {
                    // Status and editor stay as they are
                    let expected = record.lock_state();
                    let mut next = record;
                    next.size_bytes = event.size_bytes;
                    next.modified_at = event.event_time;
                    if self.registry.update(&next, &expected).await? == Write::Applied {
                        debug!("Refreshed {}", key);
                        return Ok((next, IngestAction::Refreshed));
                    }
                }
            }
        }
        Err(CoreError::StateConflict(format!(
            "{key} is changing concurrently, try again"
        )))
    }

    async fn submit_enrichment(&self, record: &AssetRecord) -> CoreResult<String> {
        let asset_id = record
            .asset_id
            .ok_or_else(|| CoreError::MalformedInput(format!("{} has no asset id", record.key)))?;
        let enrichment = &self.config.enrichment;
        let output = format!(
            "s3://{}/{}/{}/",
            enrichment.output_container,
            enrichment.output_prefix.trim_matches('/'),
            asset_id
        );

        let job_id = bounded(
            self.config.upstream_timeout(),
            "enrichment submit",
            self.enrichment
                .submit_job(&record.key.storage_uri(), &[output], &enrichment.profile),
        )
        .await?;
        info!("Submitted enrichment job {} for {}", job_id, record.key);
        Ok(job_id)
    }

    /// Primary group of whoever wrote `key`, if it can be determined
    async fn uploader_group(&self, key: &AssetKey, uploader: Option<&str>) -> CoreResult<Option<String>> {
        let uploader = match uploader {
            Some(user) => Some(user.to_string()),
            None => read_with_retry(self.config.upstream_timeout(), "object head", || {
                self.objects.head_object(&key.container, &key.key)
            })
            .await?
            .and_then(|head| head.owner),
        };
        let Some(user) = uploader else {
            debug!("No uploader known for {}", key);
            return Ok(None);
        };

        match read_with_retry(self.config.upstream_timeout(), "group lookup", || {
            self.identity.groups_for_user(&user)
        })
        .await
        {
            Ok(groups) => Ok(groups.into_iter().next()),
            Err(CoreError::NotFound(_)) => {
                warn!("Uploader {} of {} is unknown to the directory", user, key);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// An object was removed; a removed folder marker takes its grant with it
    ///
    /// Asset records are only ever removed by an authorized delete, so
    /// removal of an ordinary object changes nothing. Returns whether a
    /// grant was revoked.
    pub async fn object_removed(&self, container: &str, key: &str) -> CoreResult<bool> {
        let key = event_key(container, key)?;
        if !key.is_folder_marker() {
            debug!("Ignoring removal of {}", key);
            return Ok(false);
        }
        self.authority.revoke_folder(&key.container, &key.key).await?;
        Ok(true)
    }

    /// Store an enrichment job's results on its asset
    ///
    /// Returns `None` when the job has not completed.
    pub async fn enrichment_completed(&self, job_id: &str) -> CoreResult<Option<AssetRecord>> {
        if job_id.trim().is_empty() {
            return Err(CoreError::MalformedInput("job id is required".into()));
        }
        let job = read_with_retry(self.config.upstream_timeout(), "enrichment lookup", || {
            self.enrichment.get_job(job_id)
        })
        .await?;
        if job.status != JobStatus::Complete {
            debug!("Ignoring enrichment job {} in status {:?}", job_id, job.status);
            return Ok(None);
        }

        let key = AssetKey::from_storage_uri(&job.input).ok_or_else(|| {
            CoreError::MalformedInput(format!("job input '{}' is not an object URI", job.input))
        })?;

        let mut technical = job.technical.unwrap_or_default();
        technical.thumbnail_location = find_output(&job.output_paths, THUMBNAIL_MARKER);
        technical.proxy_location = find_output(&job.output_paths, PROXY_MARKER);

        for _ in 0..MAX_TRANSITION_ATTEMPTS {
            let record = self
                .registry
                .get(&key)
                .await?
                .ok_or_else(|| CoreError::NotFound(format!("{key} is not tracked")))?;
            let expected = record.lock_state();
            let next = enriched(record, technical.clone());
            if self.registry.update(&next, &expected).await? == Write::Applied {
                info!("Stored enrichment results of job {} on {}", job_id, key);
                return Ok(Some(next));
            }
        }
        Err(CoreError::StateConflict(format!(
            "{key} is changing concurrently, try again"
        )))
    }
}

/// Finished enrichment leaves the asset hot and unlocked
fn enriched(mut record: AssetRecord, technical: TechnicalMetadata) -> AssetRecord {
    record.technical = Some(technical);
    record.tier = Tier::Hot;
    record.editor = None;
    record
}

fn find_output(paths: &[String], marker: &str) -> Option<String> {
    paths.iter().find(|p| p.contains(marker)).cloned()
}

fn event_key(container: &str, key: &str) -> CoreResult<AssetKey> {
    if container.trim().is_empty() {
        return Err(CoreError::MalformedInput("container is required".into()));
    }
    if key.is_empty() || key == ROOT_PREFIX {
        return Err(CoreError::MalformedInput("key is required".into()));
    }
    Ok(AssetKey::new(container, key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{DirectoryUser, StaticDirectory};
    use crate::jobs::JobDetails;
    use crate::memory::{InMemoryEnrichmentDispatcher, InMemoryObjectStore, RecordingSink};
    use mediavault_store::{AssetStatus, GroupSet, InMemoryAssetRegistry, InMemoryPermissionStore};
    use std::time::Duration;

    struct Fixture {
        ingest: IngestReconciler,
        registry: Registry,
        authority: Arc<PermissionAuthority>,
        objects: Arc<InMemoryObjectStore>,
        enrichment: Arc<InMemoryEnrichmentDispatcher>,
    }

    fn fixture() -> Fixture {
        let mut config = CoreConfig::default();
        config.enrichment.profile = serde_json::json!({ "queue": "default" });
        let registry = Registry::new(
            Arc::new(InMemoryAssetRegistry::new()),
            Arc::new(RecordingSink::new()),
            Duration::from_secs(1),
        );
        let authority = Arc::new(PermissionAuthority::new(
            Arc::new(InMemoryPermissionStore::new()),
            &config,
        ));
        let objects = Arc::new(InMemoryObjectStore::new());
        let directory = Arc::new(StaticDirectory::new(vec![DirectoryUser {
            token: "t-alice".into(),
            username: "alice".into(),
            groups: vec!["editors".into(), "colorists".into()],
        }]));
        let enrichment = Arc::new(InMemoryEnrichmentDispatcher::new());

        Fixture {
            ingest: IngestReconciler::new(
                registry.clone(),
                authority.clone(),
                objects.clone(),
                directory,
                enrichment.clone(),
                config,
            ),
            registry,
            authority,
            objects,
            enrichment,
        }
    }

    fn event(key: &str, size: u64, uploader: Option<&str>) -> ObjectEvent {
        ObjectEvent {
            container: "media".into(),
            key: key.into(),
            size_bytes: size,
            event_time: Utc::now(),
            uploader: uploader.map(str::to_string),
        }
    }

    fn groups(names: &[&str]) -> GroupSet {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_new_object_is_tracked_granted_and_enriched() {
        let f = fixture();
        let outcome = f
            .ingest
            .object_created(&event("shows/ep1.mov", 500, Some("alice")))
            .await
            .unwrap();
        assert_eq!(outcome.action, IngestAction::Created);
        assert!(outcome.grant_created);

        let record = f.registry.get(&outcome.key).await.unwrap().unwrap();
        assert_eq!(record.status(), AssetStatus::Available);
        assert_eq!(record.prefix, "shows/");
        assert_eq!(record.size_bytes, 500);

        let admin = groups(&["admin"]);
        assert_eq!(
            f.authority.get_grant(&admin, "media", "shows/").await.unwrap(),
            groups(&["admin", "editors"])
        );

        let submitted = f.enrichment.submitted();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].input, "s3://media/shows/ep1.mov");
        assert_eq!(
            submitted[0].output_targets,
            vec![format!(
                "s3://mediavault-derived/private/assets/{}/",
                record.asset_id.unwrap()
            )]
        );
        assert_eq!(submitted[0].profile["queue"], "default");
    }

    #[tokio::test]
    async fn test_modified_object_keeps_lock() {
        let f = fixture();
        let first = f
            .ingest
            .object_created(&event("shows/ep1.mov", 500, Some("alice")))
            .await
            .unwrap();
        let record = f.registry.get(&first.key).await.unwrap().unwrap();
        let mut held = record.clone();
        held.check_out("alice", Utc::now());
        f.registry.update(&held, &record.lock_state()).await.unwrap();

        let outcome = f
            .ingest
            .object_created(&event("shows/ep1.mov", 900, Some("alice")))
            .await
            .unwrap();
        assert_eq!(outcome.action, IngestAction::Refreshed);
        assert!(!outcome.grant_created);

        let stored = f.registry.get(&first.key).await.unwrap().unwrap();
        assert_eq!(stored.size_bytes, 900);
        assert!(stored.is_held_by("alice"));
        assert_eq!(stored.asset_id, record.asset_id);
    }

    #[tokio::test]
    async fn test_root_objects_get_no_grant() {
        let f = fixture();
        let outcome = f
            .ingest
            .object_created(&event("loose.mov", 1, Some("alice")))
            .await
            .unwrap();
        assert!(!outcome.grant_created);
        assert!(f.authority.is_allowed(&groups(&["anyone"]), "media", "/").await.unwrap());
    }

    #[tokio::test]
    async fn test_enrichment_failure_is_not_fatal() {
        let f = fixture();
        f.enrichment.reject_submissions(true);
        let outcome = f
            .ingest
            .object_created(&event("shows/ep1.mov", 1, Some("alice")))
            .await
            .unwrap();
        assert!(outcome.enrichment_error.is_some());
        assert!(f.registry.get(&outcome.key).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_folder_marker_uses_owner_metadata() {
        let f = fixture();
        f.objects
            .put_object_with_owner("media", "projects/", 0, Some("alice"));

        let outcome = f
            .ingest
            .object_created(&event("projects/", 0, None))
            .await
            .unwrap();
        assert_eq!(outcome.action, IngestAction::FolderObserved);
        assert!(outcome.grant_created);
        assert!(f.registry.get(&outcome.key).await.unwrap().is_none());
        assert!(f.enrichment.submitted().is_empty());

        let admin = groups(&["admin"]);
        assert_eq!(
            f.authority.get_grant(&admin, "media", "projects/").await.unwrap(),
            groups(&["admin", "editors"])
        );

        assert!(f.ingest.object_removed("media", "projects/").await.unwrap());
        assert!(matches!(
            f.authority.get_grant(&admin, "media", "projects/").await,
            Err(CoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_uploader_gets_admin_only_grant() {
        let f = fixture();
        f.ingest
            .object_created(&event("shows/ep1.mov", 1, Some("mallory")))
            .await
            .unwrap();
        let admin = groups(&["admin"]);
        assert_eq!(
            f.authority.get_grant(&admin, "media", "shows/").await.unwrap(),
            groups(&["admin"])
        );
    }

    #[tokio::test]
    async fn test_object_removal_keeps_record() {
        let f = fixture();
        let outcome = f
            .ingest
            .object_created(&event("shows/ep1.mov", 1, Some("alice")))
            .await
            .unwrap();
        assert!(!f.ingest.object_removed("media", "shows/ep1.mov").await.unwrap());
        assert!(f.registry.get(&outcome.key).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_enrichment_completion() {
        let f = fixture();
        let outcome = f
            .ingest
            .object_created(&event("shows/ep1.mov", 1, Some("alice")))
            .await
            .unwrap();
        let job_id = outcome.enrichment_job.unwrap();

        let record = f.registry.get(&outcome.key).await.unwrap().unwrap();
        let mut moved = record.clone();
        moved.tier = Tier::Archival;
        moved.check_out("alice", Utc::now());
        f.registry.update(&moved, &record.lock_state()).await.unwrap();

        f.enrichment.set_job(
            &job_id,
            JobDetails {
                status: JobStatus::Progressing,
                input: "s3://media/shows/ep1.mov".into(),
                output_paths: Vec::new(),
                technical: None,
            },
        );
        assert!(f.ingest.enrichment_completed(&job_id).await.unwrap().is_none());

        f.enrichment.set_job(
            &job_id,
            JobDetails {
                status: JobStatus::Complete,
                input: "s3://media/shows/ep1.mov".into(),
                output_paths: vec![
                    "s3://out/private/assets/x/ep1_proxy.mp4".into(),
                    "s3://out/private/assets/x/ep1_thumbnail.0000000.jpg".into(),
                ],
                technical: Some(TechnicalMetadata {
                    video_codec: Some("ProRes".into()),
                    frame_rate: Some(24.0),
                    ..Default::default()
                }),
            },
        );
        let updated = f.ingest.enrichment_completed(&job_id).await.unwrap().unwrap();
        assert_eq!(updated.status(), AssetStatus::Available);
        assert!(updated.editor.is_none());
        let technical = updated.technical.unwrap();
        assert_eq!(technical.video_codec.as_deref(), Some("ProRes"));
        assert_eq!(
            technical.thumbnail_location.as_deref(),
            Some("s3://out/private/assets/x/ep1_thumbnail.0000000.jpg")
        );
        assert_eq!(
            technical.proxy_location.as_deref(),
            Some("s3://out/private/assets/x/ep1_proxy.mp4")
        );
    }

    #[tokio::test]
    async fn test_enrichment_completion_for_untracked_asset() {
        let f = fixture();
        f.enrichment.set_job(
            "job-7",
            JobDetails {
                status: JobStatus::Complete,
                input: "s3://media/shows/gone.mov".into(),
                output_paths: Vec::new(),
                technical: None,
            },
        );
        assert!(matches!(
            f.ingest.enrichment_completed("job-7").await,
            Err(CoreError::NotFound(_))
        ));
    }
}
