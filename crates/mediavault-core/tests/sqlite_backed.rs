//! Lifecycle over SQLite-backed stores

#![cfg(feature = "sqlite")]

use std::sync::Arc;

use chrono::Utc;
use mediavault_core::memory::{
    InMemoryEnrichmentDispatcher, InMemoryObjectStore, InMemoryRemoteExecutor,
};
use mediavault_core::{
    AssetKey, AssetStatus, CheckOutMode, Collaborators, CoreConfig, CoreError, GroupSet, Identity,
    MediaVault, NoopSink, ObjectEvent, StaticDirectory,
};
use mediavault_store::{SqliteAssetRegistry, SqlitePermissionStore};

fn open_vault(path: &str) -> MediaVault {
    MediaVault::new(
        CoreConfig::default(),
        Collaborators {
            assets: Arc::new(SqliteAssetRegistry::open(path).unwrap()),
            permissions: Arc::new(SqlitePermissionStore::open(path).unwrap()),
            objects: Arc::new(InMemoryObjectStore::new()),
            identity: Arc::new(StaticDirectory::default()),
            enrichment: Arc::new(InMemoryEnrichmentDispatcher::new()),
            executor: Arc::new(InMemoryRemoteExecutor::new()),
            sink: Arc::new(NoopSink),
        },
    )
}

#[tokio::test]
async fn test_check_out_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mediavault.db");
    let path = path.to_str().unwrap();
    let key = AssetKey::new("media", "shows/ep1.mov");
    let admin: GroupSet = ["admin".to_string()].into();
    let editors: GroupSet = ["editors".to_string()].into();

    {
        let vault = open_vault(path);
        vault
            .authority
            .set_grant(&admin, "media", "shows/", &editors)
            .await
            .unwrap();
        vault
            .ingest
            .object_created(&ObjectEvent {
                container: "media".into(),
                key: key.key.clone(),
                size_bytes: 10,
                event_time: Utc::now(),
                uploader: None,
            })
            .await
            .unwrap();
        vault
            .lifecycle
            .check_out(&Identity::new("alice", ["editors"]), &key, CheckOutMode::Edit)
            .await
            .unwrap();
    }

    let vault = open_vault(path);
    let err = vault
        .lifecycle
        .check_out(&Identity::new("bob", ["editors"]), &key, CheckOutMode::Edit)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::StateConflict(_)));

    let listed = vault
        .lifecycle
        .list_assets(&Identity::new("bob", ["editors"]), "media", "shows/")
        .await
        .unwrap();
    assert_eq!(listed[0].status, AssetStatus::CheckedOut);
    assert_eq!(listed[0].edit_user.as_deref(), Some("alice"));
}
