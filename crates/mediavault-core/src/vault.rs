//! Wiring of the coordinators over one set of collaborators

use std::sync::Arc;

use mediavault_store::{AssetRegistry, PermissionStore};

use crate::authority::PermissionAuthority;
use crate::catalog::ContainerCatalog;
use crate::config::CoreConfig;
use crate::error::CoreResult;
use crate::identity::{self, Identity, IdentityProvider};
use crate::ingest::IngestReconciler;
use crate::jobs::{EnrichmentDispatcher, RemoteExecutor};
use crate::lifecycle::LifecycleCoordinator;
use crate::object_store::ObjectStore;
use crate::registry::Registry;
use crate::sink::MutationSink;
use crate::tiering::TieringCoordinator;

/// Everything the core talks to
#[derive(Clone)]
pub struct Collaborators {
    pub assets: Arc<dyn AssetRegistry>,
    pub permissions: Arc<dyn PermissionStore>,
    pub objects: Arc<dyn ObjectStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub enrichment: Arc<dyn EnrichmentDispatcher>,
    pub executor: Arc<dyn RemoteExecutor>,
    pub sink: Arc<dyn MutationSink>,
}

/// The assembled core
pub struct MediaVault {
    pub config: CoreConfig,
    pub identity: Arc<dyn IdentityProvider>,
    pub authority: Arc<PermissionAuthority>,
    pub lifecycle: LifecycleCoordinator,
    pub tiering: TieringCoordinator,
    pub ingest: IngestReconciler,
    pub catalog: ContainerCatalog,
}

impl MediaVault {
    pub fn new(config: CoreConfig, parts: Collaborators) -> Self {
        let timeout = config.upstream_timeout();
        let registry = Registry::new(parts.assets, parts.sink, timeout);
        let authority = Arc::new(PermissionAuthority::new(parts.permissions, &config));

        Self {
            lifecycle: LifecycleCoordinator::new(
                registry.clone(),
                authority.clone(),
                parts.objects.clone(),
                config.clone(),
            ),
            tiering: TieringCoordinator::new(
                registry.clone(),
                authority.clone(),
                parts.executor,
                config.clone(),
            ),
            ingest: IngestReconciler::new(
                registry,
                authority.clone(),
                parts.objects.clone(),
                parts.identity.clone(),
                parts.enrichment,
                config.clone(),
            ),
            catalog: ContainerCatalog::new(parts.objects, timeout),
            identity: parts.identity,
            authority,
            config,
        }
    }

    /// Caller behind a bearer token, under the upstream deadline
    pub async fn resolve_caller(&self, bearer: &str) -> CoreResult<Option<Identity>> {
        identity::resolve_bearer(self.identity.as_ref(), bearer, self.config.upstream_timeout())
            .await
    }

    /// Groups `requester` may hand out in grants
    pub async fn assignable_groups(&self, requester: &Identity) -> CoreResult<Vec<String>> {
        identity::assignable_groups(
            self.identity.as_ref(),
            requester,
            self.authority.admin_group(),
            self.config.upstream_timeout(),
        )
        .await
    }
}
