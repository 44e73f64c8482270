//! Check-out / check-in state machine
//!
//! | State         | Meaning                                   |
//! |---------------|-------------------------------------------|
//! | `UNTRACKED`   | no registry record                        |
//! | `AVAILABLE`   | hot tier, nobody editing                  |
//! | `ARCHIVED`    | archival tier, nobody editing             |
//! | `CHECKED_OUT` | held for editing by `editUser`            |
//!
//! Every operation checks the caller's access to the asset's folder before
//! looking at its state. Writes are conditioned on the lock state that was
//! read; a lost race is re-read and decided again.

use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use mediavault_store::{AssetKey, AssetRecord, AssetSummary};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::authority::PermissionAuthority;
use crate::config::CoreConfig;
use crate::error::{CoreError, CoreResult};
use crate::identity::Identity;
use crate::object_store::{ObjectHead, ObjectStore, PresignedUrl};
use crate::registry::{MAX_TRANSITION_ATTEMPTS, Registry, Relocation, Write};
use crate::upstream::read_with_retry;

pub const CHECKED_OUT_BY_OTHER: &str = "checked out by another user";
pub const ALREADY_CHECKED_OUT: &str = "already checked out";
pub const EXISTS_UNTRACKED: &str = "exists untracked, contact admin";
pub const DELETE_UNTRACKED: &str = "cannot delete untracked asset";
pub const DESTINATION_CONFLICT: &str = "destination conflict, would overwrite";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CheckOutMode {
    ReadOnly,
    Edit,
}

/// Read access handed out on check-out
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckOut {
    pub url: PresignedUrl,
    /// Record after the check-out; absent for read-only access to an untracked object
    pub asset: Option<AssetSummary>,
}

/// What the caller should do about a check-in
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "kebab-case")]
pub enum CheckInDecision {
    /// Upload may go ahead; ingest will record it
    Proceed,
    /// The caller's edit lock was released
    Released { asset: AssetSummary },
    /// The object is tracked and not held; ask before overwriting
    ConfirmOverwrite { asset: AssetSummary },
}

/// One source/destination pair of a rename or move
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelocateItem {
    pub source: AssetKey,
    pub destination: AssetKey,
}

impl RelocateItem {
    /// Items moving each key under `new_prefix`, keeping file names
    pub fn under_prefix(keys: &[AssetKey], new_prefix: &str) -> Vec<Self> {
        keys.iter()
            .map(|source| Self {
                source: source.clone(),
                destination: source.moved_under(new_prefix),
            })
            .collect()
    }
}

/// Per-item result of a rename or move batch
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelocateVerdict {
    pub source: AssetKey,
    pub destination: AssetKey,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl RelocateVerdict {
    fn new(item: RelocateItem, result: CoreResult<()>) -> Self {
        let (success, kind, reason) = match result {
            Ok(()) => (true, None, None),
            Err(e) => (false, Some(e.kind().to_string()), Some(e.reason().to_string())),
        };
        Self {
            source: item.source,
            destination: item.destination,
            success,
            kind,
            reason,
        }
    }
}

/// Administrative operations reachable through the routing layer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdminOperation {
    CheckIn,
    CheckOut,
    Delete,
    Lock,
    Unlock,
}

impl FromStr for AdminOperation {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "check-in" | "checkin" => Ok(Self::CheckIn),
            "check-out" | "checkout" => Ok(Self::CheckOut),
            "delete" => Ok(Self::Delete),
            "lock" => Ok(Self::Lock),
            "unlock" => Ok(Self::Unlock),
            other => Err(CoreError::MalformedInput(format!(
                "unknown admin operation '{other}'"
            ))),
        }
    }
}

pub struct LifecycleCoordinator {
    registry: Registry,
    authority: Arc<PermissionAuthority>,
    objects: Arc<dyn ObjectStore>,
    config: CoreConfig,
}

impl LifecycleCoordinator {
    pub fn new(
        registry: Registry,
        authority: Arc<PermissionAuthority>,
        objects: Arc<dyn ObjectStore>,
        config: CoreConfig,
    ) -> Self {
        Self {
            registry,
            authority,
            objects,
            config,
        }
    }

    /// Hand out a read URL, taking the edit lock in `Edit` mode
    pub async fn check_out(
        &self,
        identity: &Identity,
        key: &AssetKey,
        mode: CheckOutMode,
    ) -> CoreResult<CheckOut> {
        validate_caller(identity)?;
        validate_object_key(key)?;
        self.authority
            .authorize(identity, &key.container, &key.prefix())
            .await?;

        // The lock is only taken once the URL is in hand
        let (url, asset) = match mode {
            CheckOutMode::ReadOnly => {
                let asset = self.read_only_target(key).await?;
                (self.presign(key).await?, asset)
            }
            CheckOutMode::Edit => {
                let url = self.presign(key).await?;
                (url, Some(self.take_edit_lock(identity, key).await?))
            }
        };

        Ok(CheckOut { url, asset })
    }

    async fn presign(&self, key: &AssetKey) -> CoreResult<PresignedUrl> {
        let ttl = self.config.read_url_ttl();
        read_with_retry(self.config.upstream_timeout(), "presign", || {
            self.objects.presign_get(&key.container, &key.key, ttl)
        })
        .await
    }

    async fn read_only_target(&self, key: &AssetKey) -> CoreResult<Option<AssetSummary>> {
        if let Some(record) = self.registry.get(key).await? {
            return Ok(Some(record.summary()));
        }
        match self.head(key).await? {
            Some(_) => Ok(None),
            None => Err(CoreError::NotFound(format!("{key} does not exist"))),
        }
    }

    async fn take_edit_lock(&self, identity: &Identity, key: &AssetKey) -> CoreResult<AssetSummary> {
        let user = identity.username.as_str();
        for _ in 0..MAX_TRANSITION_ATTEMPTS {
            let now = Utc::now();
            match self.registry.get(key).await? {
                None => {
                    let head = self
                        .head(key)
                        .await?
                        .ok_or_else(|| CoreError::NotFound(format!("{key} does not exist")))?;
                    let mut record = AssetRecord::new(key.clone(), head.size_bytes, now);
                    record.check_out(user, now);
                    if self.registry.create(&record).await? == Write::Applied {
                        info!("{} checked out untracked {}", user, key);
                        return Ok(record.summary());
                    }
                }
                Some(record) if record.is_held_by(user) => return Ok(record.summary()),
                Some(record) if record.is_checked_out() => {
                    debug!("{} refused check-out of {}: held by another user", user, key);
                    return Err(CoreError::StateConflict(CHECKED_OUT_BY_OTHER.into()));
                }
                Some(record) => {
                    let expected = record.lock_state();
                    let mut next = record;
                    next.check_out(user, now);
                    if self.registry.update(&next, &expected).await? == Write::Applied {
                        info!("{} checked out {}", user, key);
                        return Ok(next.summary());
                    }
                }
            }
        }
        Err(contended(key))
    }

    /// Decide whether an upload to `key` may go ahead
    pub async fn check_in(
        &self,
        identity: &Identity,
        key: &AssetKey,
        confirm_overwrite: bool,
    ) -> CoreResult<CheckInDecision> {
        validate_caller(identity)?;
        validate_object_key(key)?;
        self.authority
            .authorize(identity, &key.container, &key.prefix())
            .await?;

        let user = identity.username.as_str();
        for _ in 0..MAX_TRANSITION_ATTEMPTS {
            match self.registry.get(key).await? {
                None => {
                    if self.head(key).await?.is_some() {
                        debug!("{} refused check-in of {}: untracked object present", user, key);
                        return Err(CoreError::StateConflict(EXISTS_UNTRACKED.into()));
                    }
                    return Ok(CheckInDecision::Proceed);
                }
                Some(record) if record.is_held_by(user) => {
                    let expected = record.lock_state();
                    let mut next = record;
                    next.check_in(Utc::now());
                    if self.registry.update(&next, &expected).await? == Write::Applied {
                        info!("{} checked in {}", user, key);
                        return Ok(CheckInDecision::Released {
                            asset: next.summary(),
                        });
                    }
                }
                Some(record) if record.is_checked_out() => {
                    debug!("{} refused check-in of {}: held by another user", user, key);
                    return Err(CoreError::StateConflict(ALREADY_CHECKED_OUT.into()));
                }
                Some(_) if confirm_overwrite => return Ok(CheckInDecision::Proceed),
                Some(record) => {
                    return Ok(CheckInDecision::ConfirmOverwrite {
                        asset: record.summary(),
                    });
                }
            }
        }
        Err(contended(key))
    }

    /// Remove the record of a tracked asset
    pub async fn delete(&self, identity: &Identity, key: &AssetKey) -> CoreResult<AssetSummary> {
        validate_caller(identity)?;
        validate_object_key(key)?;
        self.authority
            .authorize(identity, &key.container, &key.prefix())
            .await?;

        let user = identity.username.as_str();
        for _ in 0..MAX_TRANSITION_ATTEMPTS {
            let record = self
                .registry
                .get(key)
                .await?
                .ok_or_else(|| CoreError::StateConflict(DELETE_UNTRACKED.into()))?;
            if record.is_checked_out() && !record.is_held_by(user) {
                debug!("{} refused delete of {}: held by another user", user, key);
                return Err(CoreError::StateConflict(CHECKED_OUT_BY_OTHER.into()));
            }
            if self.registry.remove(key, &record.lock_state()).await? == Write::Applied {
                info!("{} deleted {}", user, key);
                return Ok(record.summary());
            }
        }
        Err(contended(key))
    }

    /// Rename or move a batch; each item succeeds or fails on its own
    pub async fn relocate(
        &self,
        identity: &Identity,
        items: Vec<RelocateItem>,
    ) -> CoreResult<Vec<RelocateVerdict>> {
        validate_caller(identity)?;
        if items.is_empty() {
            return Err(CoreError::MalformedInput("nothing to move".into()));
        }

        let mut verdicts = Vec::with_capacity(items.len());
        for item in items {
            let result = self.relocate_one(identity, &item).await;
            if let Err(e) = &result {
                debug!("Move {} -> {} refused: {}", item.source, item.destination, e);
            }
            verdicts.push(RelocateVerdict::new(item, result));
        }
        Ok(verdicts)
    }

    async fn relocate_one(&self, identity: &Identity, item: &RelocateItem) -> CoreResult<()> {
        let (source, destination) = (&item.source, &item.destination);
        validate_object_key(source)?;
        validate_object_key(destination)?;
        if source.container != destination.container {
            return Err(CoreError::MalformedInput(
                "cannot move between containers".into(),
            ));
        }
        if source == destination {
            return Err(CoreError::MalformedInput(format!(
                "{source} is already at its destination"
            )));
        }
        self.authority
            .authorize(identity, &source.container, &source.prefix())
            .await?;
        self.authority
            .authorize(identity, &destination.container, &destination.prefix())
            .await?;

        let user = identity.username.as_str();
        for _ in 0..MAX_TRANSITION_ATTEMPTS {
            let record = self
                .registry
                .get(source)
                .await?
                .ok_or_else(|| CoreError::NotFound(format!("{source} is not tracked")))?;
            if record.is_checked_out() && !record.is_held_by(user) {
                return Err(CoreError::StateConflict(CHECKED_OUT_BY_OTHER.into()));
            }
            if self.registry.get(destination).await?.is_some() {
                return Err(CoreError::StateConflict(DESTINATION_CONFLICT.into()));
            }

            match self
                .registry
                .relocate(source, destination, &record.lock_state())
                .await?
            {
                Relocation::Moved(_) => {
                    info!("{} moved {} -> {}", user, source, destination);
                    return Ok(());
                }
                Relocation::DestinationTracked => {
                    return Err(CoreError::StateConflict(DESTINATION_CONFLICT.into()));
                }
                Relocation::Lost => {}
            }
        }
        Err(contended(source))
    }

    /// Records directly inside `prefix`
    pub async fn list_assets(
        &self,
        identity: &Identity,
        container: &str,
        prefix: &str,
    ) -> CoreResult<Vec<AssetSummary>> {
        validate_caller(identity)?;
        self.authority.authorize(identity, container, prefix).await?;

        let mut records = self.registry.list_prefix(container, prefix).await?;
        records.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(records.iter().map(AssetRecord::summary).collect())
    }

    /// Administrative hook; currently accepts the operation and does nothing
    pub async fn admin_operation(
        &self,
        identity: &Identity,
        operation: AdminOperation,
    ) -> CoreResult<serde_json::Value> {
        self.authority.require_admin(identity)?;
        debug!("{} invoked admin operation {:?}", identity.username, operation);
        Ok(serde_json::json!({}))
    }

    async fn head(&self, key: &AssetKey) -> CoreResult<Option<ObjectHead>> {
        read_with_retry(self.config.upstream_timeout(), "object head", || {
            self.objects.head_object(&key.container, &key.key)
        })
        .await
    }
}

fn contended(key: &AssetKey) -> CoreError {
    CoreError::StateConflict(format!("{key} is changing concurrently, try again"))
}

pub(crate) fn validate_caller(identity: &Identity) -> CoreResult<()> {
    if identity.username.trim().is_empty() {
        return Err(CoreError::MalformedInput("user is required".into()));
    }
    Ok(())
}

pub(crate) fn validate_object_key(key: &AssetKey) -> CoreResult<()> {
    if key.container.trim().is_empty() {
        return Err(CoreError::MalformedInput("container is required".into()));
    }
    if key.key.is_empty() {
        return Err(CoreError::MalformedInput("key is required".into()));
    }
    if key.is_folder_marker() {
        return Err(CoreError::MalformedInput(format!(
            "'{}' names a folder, not an object",
            key.key
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{InMemoryObjectStore, RecordingSink};
    use mediavault_store::{
        AssetStatus, GroupSet, InMemoryAssetRegistry, InMemoryPermissionStore, Tier,
    };
    use std::time::Duration;

    struct Fixture {
        lifecycle: LifecycleCoordinator,
        registry: Registry,
        objects: Arc<InMemoryObjectStore>,
        authority: Arc<PermissionAuthority>,
    }

    async fn fixture() -> Fixture {
        let config = CoreConfig::default();
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
        let admin: GroupSet = ["admin".to_string()].into();
        let editors: GroupSet = ["editors".to_string()].into();
        authority
            .set_grant(&admin, "media", "shows/", &editors)
            .await
            .unwrap();

        Fixture {
            lifecycle: LifecycleCoordinator::new(
                registry.clone(),
                authority.clone(),
                objects.clone(),
                config,
            ),
            registry,
            objects,
            authority,
        }
    }

    fn editor(name: &str) -> Identity {
        Identity::new(name, ["editors"])
    }

    async fn track(f: &Fixture, key: &AssetKey) -> AssetRecord {
        f.objects.put_object(&key.container, &key.key, 100);
        let record = AssetRecord::new(key.clone(), 100, Utc::now());
        f.registry.create(&record).await.unwrap();
        record
    }

    #[tokio::test]
    async fn test_edit_check_out_and_idempotent_repeat() {
        let f = fixture().await;
        let key = AssetKey::new("media", "shows/ep1.mov");
        track(&f, &key).await;

        let out = f
            .lifecycle
            .check_out(&editor("alice"), &key, CheckOutMode::Edit)
            .await
            .unwrap();
        let asset = out.asset.unwrap();
        assert_eq!(asset.status, AssetStatus::CheckedOut);
        assert_eq!(asset.edit_user.as_deref(), Some("alice"));
        assert_eq!(out.url.expires_in_secs, 300);

        let again = f
            .lifecycle
            .check_out(&editor("alice"), &key, CheckOutMode::Edit)
            .await
            .unwrap();
        assert_eq!(again.asset.unwrap().edit_user.as_deref(), Some("alice"));

        let err = f
            .lifecycle
            .check_out(&editor("bob"), &key, CheckOutMode::Edit)
            .await
            .unwrap_err();
        assert_eq!(err, CoreError::StateConflict(CHECKED_OUT_BY_OTHER.into()));
    }

    #[tokio::test]
    async fn test_failed_check_out_takes_no_lock() {
        let f = fixture().await;
        let tracked = AssetKey::new("media", "shows/ep1.mov");
        track(&f, &tracked).await;
        let untracked = AssetKey::new("media", "shows/ep2.mov");
        f.objects.put_object("media", "shows/ep2.mov", 10);
        f.objects.set_unavailable(true);

        for key in [&tracked, &untracked] {
            let err = f
                .lifecycle
                .check_out(&editor("alice"), key, CheckOutMode::Edit)
                .await
                .unwrap_err();
            assert!(matches!(err, CoreError::UpstreamUnavailable(_)));
        }

        let stored = f.registry.get(&tracked).await.unwrap().unwrap();
        assert_eq!(stored.editor, None);
        assert_eq!(stored.summary().status, AssetStatus::Available);
        assert!(f.registry.get(&untracked).await.unwrap().is_none());

        // Once the store is back, another editor can take the lock
        f.objects.set_unavailable(false);
        let out = f
            .lifecycle
            .check_out(&editor("bob"), &tracked, CheckOutMode::Edit)
            .await
            .unwrap();
        assert_eq!(out.asset.unwrap().edit_user.as_deref(), Some("bob"));
    }

    #[tokio::test]
    async fn test_read_only_check_out_leaves_state() {
        let f = fixture().await;
        let key = AssetKey::new("media", "shows/ep1.mov");
        track(&f, &key).await;
        f.lifecycle
            .check_out(&editor("alice"), &key, CheckOutMode::Edit)
            .await
            .unwrap();

        let out = f
            .lifecycle
            .check_out(&editor("bob"), &key, CheckOutMode::ReadOnly)
            .await
            .unwrap();
        assert_eq!(out.asset.unwrap().edit_user.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn test_edit_check_out_of_untracked_object() {
        let f = fixture().await;
        let key = AssetKey::new("media", "shows/raw.mov");
        f.objects.put_object("media", "shows/raw.mov", 42);

        let out = f
            .lifecycle
            .check_out(&editor("alice"), &key, CheckOutMode::Edit)
            .await
            .unwrap();
        let asset = out.asset.unwrap();
        assert_eq!(asset.size_bytes, 42);
        assert_eq!(asset.status, AssetStatus::CheckedOut);

        let missing = AssetKey::new("media", "shows/ghost.mov");
        assert!(matches!(
            f.lifecycle
                .check_out(&editor("alice"), &missing, CheckOutMode::Edit)
                .await,
            Err(CoreError::NotFound(_))
        ));
        assert!(f.registry.get(&missing).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_permission_checked_before_state() {
        let f = fixture().await;
        let key = AssetKey::new("media", "films/cut.mov");
        let err = f
            .lifecycle
            .check_out(&editor("alice"), &key, CheckOutMode::Edit)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::PermissionDenied(_)));
    }

    #[tokio::test]
    async fn test_check_in_transitions() {
        let f = fixture().await;

        let fresh = AssetKey::new("media", "shows/new.mov");
        assert_eq!(
            f.lifecycle.check_in(&editor("alice"), &fresh, false).await.unwrap(),
            CheckInDecision::Proceed
        );

        f.objects.put_object("media", "shows/stray.mov", 1);
        let stray = AssetKey::new("media", "shows/stray.mov");
        assert_eq!(
            f.lifecycle.check_in(&editor("alice"), &stray, false).await.unwrap_err(),
            CoreError::StateConflict(EXISTS_UNTRACKED.into())
        );

        let key = AssetKey::new("media", "shows/ep1.mov");
        track(&f, &key).await;
        assert!(matches!(
            f.lifecycle.check_in(&editor("alice"), &key, false).await.unwrap(),
            CheckInDecision::ConfirmOverwrite { .. }
        ));
        assert_eq!(
            f.lifecycle.check_in(&editor("alice"), &key, true).await.unwrap(),
            CheckInDecision::Proceed
        );

        f.lifecycle
            .check_out(&editor("alice"), &key, CheckOutMode::Edit)
            .await
            .unwrap();
        assert_eq!(
            f.lifecycle.check_in(&editor("bob"), &key, false).await.unwrap_err(),
            CoreError::StateConflict(ALREADY_CHECKED_OUT.into())
        );
        match f.lifecycle.check_in(&editor("alice"), &key, false).await.unwrap() {
            CheckInDecision::Released { asset } => {
                assert_eq!(asset.status, AssetStatus::Available);
                assert!(asset.edit_user.is_none());
            }
            other => panic!("expected release, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_check_in_of_archived_checkout_lands_hot() {
        let f = fixture().await;
        let key = AssetKey::new("media", "shows/old.mov");
        let record = track(&f, &key).await;
        let mut archived = record.clone();
        archived.tier = Tier::Archival;
        f.registry.update(&archived, &record.lock_state()).await.unwrap();

        f.lifecycle
            .check_out(&editor("alice"), &key, CheckOutMode::Edit)
            .await
            .unwrap();
        f.lifecycle.check_in(&editor("alice"), &key, false).await.unwrap();

        let stored = f.registry.get(&key).await.unwrap().unwrap();
        assert_eq!(stored.status(), AssetStatus::Available);
    }

    #[tokio::test]
    async fn test_delete_rules() {
        let f = fixture().await;
        let key = AssetKey::new("media", "shows/ep1.mov");

        assert_eq!(
            f.lifecycle.delete(&editor("alice"), &key).await.unwrap_err(),
            CoreError::StateConflict(DELETE_UNTRACKED.into())
        );

        track(&f, &key).await;
        f.lifecycle
            .check_out(&editor("alice"), &key, CheckOutMode::Edit)
            .await
            .unwrap();
        assert_eq!(
            f.lifecycle.delete(&editor("bob"), &key).await.unwrap_err(),
            CoreError::StateConflict(CHECKED_OUT_BY_OTHER.into())
        );
        assert!(f.registry.get(&key).await.unwrap().unwrap().is_held_by("alice"));

        f.lifecycle.delete(&editor("alice"), &key).await.unwrap();
        assert!(f.registry.get(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_relocate_batch_is_per_item() {
        let f = fixture().await;
        let admin: GroupSet = ["admin".to_string()].into();
        let editors: GroupSet = ["editors".to_string()].into();
        f.authority
            .set_grant(&admin, "media", "archive/", &editors)
            .await
            .unwrap();

        let keys: Vec<AssetKey> = ["shows/a.mov", "shows/b.mov", "shows/c.mov"]
            .iter()
            .map(|k| AssetKey::new("media", *k))
            .collect();
        for key in &keys {
            track(&f, key).await;
        }
        track(&f, &AssetKey::new("media", "archive/b.mov")).await;

        let verdicts = f
            .lifecycle
            .relocate(&editor("alice"), RelocateItem::under_prefix(&keys, "archive/"))
            .await
            .unwrap();

        assert!(verdicts[0].success);
        assert!(!verdicts[1].success);
        assert_eq!(verdicts[1].kind.as_deref(), Some("StateConflict"));
        assert_eq!(verdicts[1].reason.as_deref(), Some(DESTINATION_CONFLICT));
        assert!(verdicts[2].success);

        assert!(f.registry.get(&keys[1]).await.unwrap().is_some());
        let moved = f
            .registry
            .get(&AssetKey::new("media", "archive/a.mov"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(moved.prefix, "archive/");
    }

    #[tokio::test]
    async fn test_relocate_requires_destination_access() {
        let f = fixture().await;
        let source = AssetKey::new("media", "shows/a.mov");
        track(&f, &source).await;

        let verdicts = f
            .lifecycle
            .relocate(
                &editor("alice"),
                vec![RelocateItem {
                    source: source.clone(),
                    destination: AssetKey::new("media", "secret/a.mov"),
                }],
            )
            .await
            .unwrap();
        assert_eq!(verdicts[0].kind.as_deref(), Some("PermissionDenied"));
        assert!(f.registry.get(&source).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_relocate_untracked_source() {
        let f = fixture().await;
        let verdicts = f
            .lifecycle
            .relocate(
                &editor("alice"),
                vec![RelocateItem {
                    source: AssetKey::new("media", "shows/none.mov"),
                    destination: AssetKey::new("media", "shows/other.mov"),
                }],
            )
            .await
            .unwrap();
        assert_eq!(verdicts[0].kind.as_deref(), Some("NotFound"));

        assert!(matches!(
            f.lifecycle.relocate(&editor("alice"), Vec::new()).await,
            Err(CoreError::MalformedInput(_))
        ));
    }

    #[tokio::test]
    async fn test_list_assets() {
        let f = fixture().await;
        track(&f, &AssetKey::new("media", "shows/b.mov")).await;
        track(&f, &AssetKey::new("media", "shows/a.mov")).await;
        track(&f, &AssetKey::new("media", "shows/ep1/c.mov")).await;

        let listed = f
            .lifecycle
            .list_assets(&editor("alice"), "media", "shows/")
            .await
            .unwrap();
        let keys: Vec<&str> = listed.iter().map(|a| a.key.as_str()).collect();
        assert_eq!(keys, vec!["shows/a.mov", "shows/b.mov"]);

        assert!(matches!(
            f.lifecycle
                .list_assets(&editor("alice"), "media", "films/")
                .await,
            Err(CoreError::PermissionDenied(_))
        ));
    }

    #[tokio::test]
    async fn test_admin_operation_is_gated_noop() {
        let f = fixture().await;
        let op: AdminOperation = "lock".parse().unwrap();
        assert!(matches!(
            f.lifecycle.admin_operation(&editor("alice"), op).await,
            Err(CoreError::PermissionDenied(_))
        ));
        let root = Identity::new("root", ["admin"]);
        assert_eq!(
            f.lifecycle.admin_operation(&root, op).await.unwrap(),
            serde_json::json!({})
        );
        assert!("explode".parse::<AdminOperation>().is_err());
    }

    #[tokio::test]
    async fn test_rejects_folder_keys() {
        let f = fixture().await;
        let err = f
            .lifecycle
            .delete(&editor("alice"), &AssetKey::new("media", "shows/"))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::MalformedInput(_)));
    }
}
