//! Hierarchical folder permission authority
//!
//! Grants are looked up by exact folder path; a grant on a parent folder says
//! nothing about its children. The container root is open until someone
//! records a grant for it, every other folder is closed until then.

use std::sync::Arc;
use std::time::Duration;

use mediavault_store::{GroupSet, PermissionStore, ROOT_PREFIX, is_direct_child};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::CoreConfig;
use crate::error::{CoreError, CoreResult};
use crate::identity::Identity;
use crate::upstream::{bounded, read_with_retry};

/// Result of looking up a folder's grant
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GrantLookup {
    Recorded(GroupSet),
    Unrecorded,
}

/// A folder visible to the caller, with its grant
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderGrant {
    pub prefix: String,
    pub groups: GroupSet,
}

/// Pure access decision for one folder
pub fn decide(user_groups: &GroupSet, path: &str, lookup: &GrantLookup) -> bool {
    match lookup {
        GrantLookup::Unrecorded => path == ROOT_PREFIX,
        GrantLookup::Recorded(groups) => !groups.is_disjoint(user_groups),
    }
}

pub struct PermissionAuthority {
    store: Arc<dyn PermissionStore>,
    admin_group: String,
    timeout: Duration,
}

impl PermissionAuthority {
    pub fn new(store: Arc<dyn PermissionStore>, config: &CoreConfig) -> Self {
        Self {
            store,
            admin_group: config.admin_group.clone(),
            timeout: config.upstream_timeout(),
        }
    }

    pub fn admin_group(&self) -> &str {
        &self.admin_group
    }

    pub fn is_admin(&self, groups: &GroupSet) -> bool {
        groups.contains(&self.admin_group)
    }

    /// `PermissionDenied` unless `identity` holds the administrative group
    pub fn require_admin(&self, identity: &Identity) -> CoreResult<()> {
        if self.is_admin(&identity.groups) {
            return Ok(());
        }
        debug!("{} is not an administrator", identity.username);
        Err(CoreError::PermissionDenied(
            "administrator access required".into(),
        ))
    }

    pub async fn lookup(&self, container: &str, path: &str) -> CoreResult<GrantLookup> {
        validate_path(container, path)?;
        let groups = read_with_retry(self.timeout, "permission get", || async move {
            self.store.get(container, path).await.map_err(CoreError::from)
        })
        .await?;

        Ok(match groups {
            Some(groups) => GrantLookup::Recorded(groups),
            None => GrantLookup::Unrecorded,
        })
    }

    pub async fn is_allowed(
        &self,
        user_groups: &GroupSet,
        container: &str,
        path: &str,
    ) -> CoreResult<bool> {
        let lookup = self.lookup(container, path).await?;
        Ok(decide(user_groups, path, &lookup))
    }

    /// `PermissionDenied` unless `identity` may act on `path`
    pub async fn authorize(&self, identity: &Identity, container: &str, path: &str) -> CoreResult<()> {
        if self.is_allowed(&identity.groups, container, path).await? {
            return Ok(());
        }
        debug!(
            "Denied {} on {}:{}",
            identity.username, container, path
        );
        Err(CoreError::PermissionDenied(format!(
            "no access to {container}:{path}"
        )))
    }

    /// Overwrite a folder's grant (administrators only)
    pub async fn set_grant(
        &self,
        requester_groups: &GroupSet,
        container: &str,
        path: &str,
        new_groups: &GroupSet,
    ) -> CoreResult<()> {
        validate_path(container, path)?;
        if new_groups.is_empty() || new_groups.iter().any(|g| g.trim().is_empty()) {
            return Err(CoreError::MalformedInput(
                "grant must name at least one group".into(),
            ));
        }
        if !self.is_admin(requester_groups) {
            return Err(CoreError::PermissionDenied(
                "administrator access required".into(),
            ));
        }

        bounded(self.timeout, "permission put", async {
            self.store.put(container, path, new_groups).await.map_err(CoreError::from)
        })
        .await?;
        info!("Set grant on {}:{} to {:?}", container, path, new_groups);
        Ok(())
    }

    /// Read a folder's grant (administrators only)
    pub async fn get_grant(
        &self,
        requester_groups: &GroupSet,
        container: &str,
        path: &str,
    ) -> CoreResult<GroupSet> {
        if !self.is_admin(requester_groups) {
            return Err(CoreError::PermissionDenied(
                "administrator access required".into(),
            ));
        }
        match self.lookup(container, path).await? {
            GrantLookup::Recorded(groups) => Ok(groups),
            GrantLookup::Unrecorded => Err(CoreError::NotFound(format!(
                "no grant recorded for {container}:{path}"
            ))),
        }
    }

    /// Folders exactly one level below `parent` that `user_groups` may enter
    pub async fn visible_folders(
        &self,
        user_groups: &GroupSet,
        container: &str,
        parent: &str,
    ) -> CoreResult<Vec<FolderGrant>> {
        validate_path(container, parent)?;
        let filter = if parent == ROOT_PREFIX { "" } else { parent };
        let records = read_with_retry(self.timeout, "permission list", || async move {
            self.store.list(container, filter).await.map_err(CoreError::from)
        })
        .await?;

        let mut folders: Vec<FolderGrant> = records
            .into_iter()
            .filter(|r| is_direct_child(parent, &r.prefix))
            .filter(|r| !r.groups.is_disjoint(user_groups))
            .map(|r| FolderGrant {
                prefix: r.prefix,
                groups: r.groups,
            })
            .collect();
        folders.sort_by(|a, b| a.prefix.cmp(&b.prefix));
        Ok(folders)
    }

    /// Grant given to a newly observed folder
    pub fn default_grant(&self, uploader_group: Option<&str>) -> GroupSet {
        let mut groups = GroupSet::new();
        groups.insert(self.admin_group.clone());
        if let Some(group) = uploader_group.filter(|g| !g.is_empty()) {
            groups.insert(group.to_string());
        }
        groups
    }

    /// Record the default grant for `path` unless one exists
    ///
    /// The root is never given a grant implicitly. Returns whether a grant
    /// was written.
    pub async fn ensure_default_grant(
        &self,
        container: &str,
        path: &str,
        uploader_group: Option<&str>,
    ) -> CoreResult<bool> {
        validate_path(container, path)?;
        if path == ROOT_PREFIX {
            return Ok(false);
        }

        let groups = self.default_grant(uploader_group);
        let written = bounded(self.timeout, "permission put", async {
            self.store.put_if_absent(container, path, &groups).await.map_err(CoreError::from)
        })
        .await?;
        if written {
            info!("Created default grant on {}:{} for {:?}", container, path, groups);
        }
        Ok(written)
    }

    /// Drop the grant of a removed folder
    pub async fn revoke_folder(&self, container: &str, path: &str) -> CoreResult<()> {
        validate_path(container, path)?;
        bounded(self.timeout, "permission delete", async {
            self.store.delete(container, path).await.map_err(CoreError::from)
        })
        .await?;
        info!("Revoked grant on {}:{}", container, path);
        Ok(())
    }
}

fn validate_path(container: &str, path: &str) -> CoreResult<()> {
    if container.trim().is_empty() {
        return Err(CoreError::MalformedInput("container is required".into()));
    }
    if path != ROOT_PREFIX && (path.is_empty() || !path.ends_with('/')) {
        return Err(CoreError::MalformedInput(format!(
            "'{path}' is not a folder path"
        )));
    }
    Ok(())
}
