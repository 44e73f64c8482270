use std::net::SocketAddr;
use std::sync::Arc;

use mediavault_core::memory::{
    InMemoryEnrichmentDispatcher, InMemoryObjectStore, InMemoryRemoteExecutor, RecordingSink,
};
use mediavault_core::{Collaborators, DirectoryUser, IdentityProvider, StaticDirectory};
use mediavault_server::config::Config;
use mediavault_store::{InMemoryAssetRegistry, InMemoryPermissionStore};
use tokio::net::TcpListener;

pub const ADMIN_TOKEN: &str = "t-root";
pub const ALICE_TOKEN: &str = "t-alice";
pub const BOB_TOKEN: &str = "t-bob";

pub struct TestServer {
    pub url: String,
    #[allow(dead_code)]
    pub addr: SocketAddr,
    #[allow(dead_code)]
    pub objects: Arc<InMemoryObjectStore>,
    #[allow(dead_code)]
    pub executor: Arc<InMemoryRemoteExecutor>,
    #[allow(dead_code)]
    pub sink: Arc<RecordingSink>,
}

impl TestServer {
    pub async fn start() -> Self {
        let directory = Arc::new(StaticDirectory::new(vec![
            user(ADMIN_TOKEN, "root", &["admin"]),
            user(ALICE_TOKEN, "alice", &["editors"]),
            user(BOB_TOKEN, "bob", &["editors"]),
        ]));
        Self::with_directory(directory, Config::default()).await
    }

    /// Server over a custom identity provider and config
    pub async fn with_directory(identity: Arc<dyn IdentityProvider>, config: Config) -> Self {
        let config = Config {
            port: 0, // OS assigns port
            ..config
        };

        let objects = Arc::new(InMemoryObjectStore::new());
        let executor = Arc::new(InMemoryRemoteExecutor::new());
        let sink = Arc::new(RecordingSink::new());
        let parts = Collaborators {
            assets: Arc::new(InMemoryAssetRegistry::new()),
            permissions: Arc::new(InMemoryPermissionStore::new()),
            objects: objects.clone(),
            identity,
            enrichment: Arc::new(InMemoryEnrichmentDispatcher::new()),
            executor: executor.clone(),
            sink: sink.clone(),
        };

        let state = mediavault_server::state::AppState::from_parts(config, parts);
        let app = mediavault_server::routes::router(state);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Give server a moment to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        Self {
            url: format!("http://{addr}"),
            addr,
            objects,
            executor,
            sink,
        }
    }
}

fn user(token: &str, name: &str, groups: &[&str]) -> DirectoryUser {
    DirectoryUser {
        token: token.into(),
        username: name.into(),
        groups: groups.iter().map(|g| g.to_string()).collect(),
    }
}
