//! Shared harness for core integration tests

#![allow(dead_code)]

use std::sync::Arc;

use mediavault_core::memory::{
    InMemoryEnrichmentDispatcher, InMemoryObjectStore, InMemoryRemoteExecutor, RecordingSink,
};
use mediavault_core::{
    Collaborators, CoreConfig, DirectoryUser, GroupSet, Identity, MediaVault, StaticDirectory,
};
use mediavault_store::{InMemoryAssetRegistry, InMemoryPermissionStore};

pub const CONTAINER: &str = "media";

pub struct Harness {
    pub vault: MediaVault,
    pub assets: Arc<InMemoryAssetRegistry>,
    pub objects: Arc<InMemoryObjectStore>,
    pub enrichment: Arc<InMemoryEnrichmentDispatcher>,
    pub executor: Arc<InMemoryRemoteExecutor>,
    pub sink: Arc<RecordingSink>,
}

impl Harness {
    /// Core over in-memory collaborators, with `shows/` granted to editors
    pub async fn new() -> Self {
        let assets = Arc::new(InMemoryAssetRegistry::new());
        let objects = Arc::new(InMemoryObjectStore::new());
        let enrichment = Arc::new(InMemoryEnrichmentDispatcher::new());
        let executor = Arc::new(InMemoryRemoteExecutor::new());
        let sink = Arc::new(RecordingSink::new());
        let directory = Arc::new(StaticDirectory::new(vec![
            user("alice", &["editors"]),
            user("bob", &["editors"]),
            user("root", &["admin"]),
        ]));

        let vault = MediaVault::new(
            CoreConfig::default(),
            Collaborators {
                assets: assets.clone(),
                permissions: Arc::new(InMemoryPermissionStore::new()),
                objects: objects.clone(),
                identity: directory,
                enrichment: enrichment.clone(),
                executor: executor.clone(),
                sink: sink.clone(),
            },
        );

        vault
            .authority
            .set_grant(&groups(&["admin"]), CONTAINER, "shows/", &groups(&["editors"]))
            .await
            .unwrap();

        Self {
            vault,
            assets,
            objects,
            enrichment,
            executor,
            sink,
        }
    }
}

fn user(name: &str, groups: &[&str]) -> DirectoryUser {
    DirectoryUser {
        token: format!("t-{name}"),
        username: name.to_string(),
        groups: groups.iter().map(|g| g.to_string()).collect(),
    }
}

pub fn groups(names: &[&str]) -> GroupSet {
    names.iter().map(|s| s.to_string()).collect()
}

pub fn editor(name: &str) -> Identity {
    Identity::new(name, ["editors"])
}
