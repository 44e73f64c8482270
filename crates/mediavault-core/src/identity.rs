//! Caller identity and the identity provider seam

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use mediavault_store::GroupSet;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::upstream::read_with_retry;

/// An authenticated caller with its current group memberships
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub username: String,
    pub groups: GroupSet,
}

impl Identity {
    pub fn new<I, S>(username: impl Into<String>, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            username: username.into(),
            groups: groups.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_member(&self, group: &str) -> bool {
        self.groups.contains(group)
    }
}

/// Resolves bearer credentials and group memberships
///
/// Memberships are looked up per request and never cached by the core.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Identity behind a bearer token, or `None` if the token is unknown
    async fn resolve(&self, bearer: &str) -> CoreResult<Option<Identity>>;

    /// A user's groups, primary group first
    async fn groups_for_user(&self, username: &str) -> CoreResult<Vec<String>>;

    /// Every group known to the directory
    async fn list_groups(&self) -> CoreResult<Vec<String>>;
}

/// One configured directory user
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DirectoryUser {
    pub token: String,
    pub username: String,
    #[serde(default)]
    pub groups: Vec<String>,
}

/// Static, configuration-driven directory
#[derive(Default)]
pub struct StaticDirectory {
    users: Vec<DirectoryUser>,
    by_token: HashMap<String, usize>,
}

impl StaticDirectory {
    pub fn new(users: Vec<DirectoryUser>) -> Self {
        let by_token = users
            .iter()
            .enumerate()
            .map(|(idx, u)| (u.token.clone(), idx))
            .collect();
        Self { users, by_token }
    }
}

#[async_trait]
impl IdentityProvider for StaticDirectory {
    async fn resolve(&self, bearer: &str) -> CoreResult<Option<Identity>> {
        Ok(self
            .by_token
            .get(bearer)
            .map(|&idx| &self.users[idx])
            .map(|u| Identity::new(u.username.clone(), u.groups.iter().cloned())))
    }

    async fn groups_for_user(&self, username: &str) -> CoreResult<Vec<String>> {
        self.users
            .iter()
            .find(|u| u.username == username)
            .map(|u| u.groups.clone())
            .ok_or_else(|| CoreError::NotFound(format!("user '{username}'")))
    }

    async fn list_groups(&self) -> CoreResult<Vec<String>> {
        let mut groups: Vec<String> = self
            .users
            .iter()
            .flat_map(|u| u.groups.iter().cloned())
            .collect();
        groups.sort();
        groups.dedup();
        Ok(groups)
    }
}

/// Groups an administrator may assign; empty for everyone else
pub async fn assignable_groups(
    provider: &dyn IdentityProvider,
    requester: &Identity,
    admin_group: &str,
    limit: Duration,
) -> CoreResult<Vec<String>> {
    if !requester.is_member(admin_group) {
        return Ok(Vec::new());
    }
    read_with_retry(limit, "group listing", || provider.list_groups()).await
}

/// Bounded bearer lookup
pub async fn resolve_bearer(
    provider: &dyn IdentityProvider,
    bearer: &str,
    limit: Duration,
) -> CoreResult<Option<Identity>> {
    read_with_retry(limit, "identity lookup", || provider.resolve(bearer)).await
}
