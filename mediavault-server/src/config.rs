use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use mediavault_core::{CoreConfig, DirectoryUser};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub core: CoreConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub object_store: ObjectStoreConfig,

    #[serde(default)]
    pub sink: SinkConfig,

    #[serde(default)]
    pub identity: IdentityConfig,

    #[serde(default)]
    pub events: EventsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_backend")]
    pub backend: String, // "memory", "sqlite"
    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ObjectStoreConfig {
    #[serde(default = "default_backend")]
    pub backend: String, // "memory", "s3"
    pub endpoint: Option<String>,
    #[serde(default = "default_region")]
    pub region: String,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct SinkConfig {
    /// Base URL receiving change notifications; none disables publication
    pub url: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct IdentityConfig {
    #[serde(default)]
    pub users: Vec<DirectoryUser>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct EventsConfig {
    /// Shared secret expected in `X-Event-Token` on event webhooks
    pub token: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            core: CoreConfig::default(),
            storage: StorageConfig::default(),
            object_store: ObjectStoreConfig::default(),
            sink: SinkConfig::default(),
            identity: IdentityConfig::default(),
            events: EventsConfig::default(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            sqlite_path: default_sqlite_path(),
        }
    }
}

impl Default for ObjectStoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            endpoint: None,
            region: default_region(),
            access_key: None,
            secret_key: None,
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    7230
}
fn default_backend() -> String {
    "memory".into()
}
fn default_sqlite_path() -> String {
    "mediavault.db".into()
}
fn default_region() -> String {
    "us-east-1".into()
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let config: Config = Figment::new()
            .merge(Toml::file("mediavault-server.toml"))
            .merge(Env::prefixed("MEDIAVAULT_").split("__"))
            .extract()?;
        Ok(config)
    }
}
