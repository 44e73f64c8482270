use std::sync::Arc;

use anyhow::Context;
use mediavault_core::memory::{
    InMemoryEnrichmentDispatcher, InMemoryObjectStore, InMemoryRemoteExecutor,
};
use mediavault_core::{
    Collaborators, HttpMutationSink, MediaVault, MutationSink, NoopSink, ObjectStore,
    StaticDirectory,
};
use mediavault_store::{
    AssetRegistry, InMemoryAssetRegistry, InMemoryPermissionStore, PermissionStore,
};

use crate::config::Config;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub vault: Arc<MediaVault>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Build every collaborator from configuration
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        let (assets, permissions) = stores(config)?;

        let sink: Arc<dyn MutationSink> = match &config.sink.url {
            Some(url) => {
                tracing::info!("Publishing changes to {}", url);
                Arc::new(HttpMutationSink::new(url.clone()))
            }
            None => Arc::new(NoopSink),
        };

        let parts = Collaborators {
            assets,
            permissions,
            objects: object_store(config)?,
            identity: Arc::new(StaticDirectory::new(config.identity.users.clone())),
            // Job runners are reached through their own queues; in-process
            // recorders stand in until one is configured
            enrichment: Arc::new(InMemoryEnrichmentDispatcher::new()),
            executor: Arc::new(InMemoryRemoteExecutor::new()),
            sink,
        };

        Ok(Self::from_parts(config.clone(), parts))
    }

    /// Assemble state over caller-provided collaborators
    pub fn from_parts(config: Config, parts: Collaborators) -> Self {
        Self {
            vault: Arc::new(MediaVault::new(config.core.clone(), parts)),
            config: Arc::new(config),
        }
    }
}

fn stores(config: &Config) -> anyhow::Result<(Arc<dyn AssetRegistry>, Arc<dyn PermissionStore>)> {
    match config.storage.backend.as_str() {
        "memory" => Ok((
            Arc::new(InMemoryAssetRegistry::new()),
            Arc::new(InMemoryPermissionStore::new()),
        )),
        #[cfg(feature = "sqlite")]
        "sqlite" => {
            let path = &config.storage.sqlite_path;
            tracing::info!("Using SQLite stores at {}", path);
            Ok((
                Arc::new(
                    mediavault_store::SqliteAssetRegistry::open(path)
                        .context("opening asset registry")?,
                ),
                Arc::new(
                    mediavault_store::SqlitePermissionStore::open(path)
                        .context("opening permission store")?,
                ),
            ))
        }
        other => anyhow::bail!("Unsupported storage backend: {other}"),
    }
}

fn object_store(config: &Config) -> anyhow::Result<Arc<dyn ObjectStore>> {
    let settings = &config.object_store;
    match settings.backend.as_str() {
        "memory" => Ok(Arc::new(InMemoryObjectStore::new())),
        #[cfg(feature = "s3")]
        "s3" => {
            let access_key = settings
                .access_key
                .as_deref()
                .context("object_store.access_key is required for s3")?;
            let secret_key = settings
                .secret_key
                .as_deref()
                .context("object_store.secret_key is required for s3")?;
            Ok(Arc::new(mediavault_core::S3ObjectStore::with_credentials(
                settings.endpoint.as_deref(),
                &settings.region,
                access_key,
                secret_key,
            )))
        }
        other => anyhow::bail!("Unsupported object store backend: {other}"),
    }
}
