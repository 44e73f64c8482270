//! Core configuration, passed to every component at construction

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Group allowed to administer folder grants; always part of default grants
    #[serde(default = "default_admin_group")]
    pub admin_group: String,

    /// Lifetime of read URLs issued on check-out
    #[serde(default = "default_read_url_ttl_secs")]
    pub read_url_ttl_secs: u64,

    /// Bound on every call to an external collaborator
    #[serde(default = "default_upstream_timeout_ms")]
    pub upstream_timeout_ms: u64,

    #[serde(default)]
    pub tiering: TieringConfig,

    #[serde(default)]
    pub enrichment: EnrichmentConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TieringConfig {
    /// Script run on the target host to move files between tiers
    #[serde(default = "default_tiering_script")]
    pub script: String,
    /// Mount point of the archival tier on the target host
    #[serde(default = "default_archival_mount")]
    pub archival_mount: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    /// Container receiving thumbnails and proxies
    #[serde(default = "default_output_container")]
    pub output_container: String,
    #[serde(default = "default_output_prefix")]
    pub output_prefix: String,
    /// Opaque job settings handed to the enrichment dispatcher as-is
    #[serde(default)]
    pub profile: serde_json::Value,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            admin_group: default_admin_group(),
            read_url_ttl_secs: default_read_url_ttl_secs(),
            upstream_timeout_ms: default_upstream_timeout_ms(),
            tiering: TieringConfig::default(),
            enrichment: EnrichmentConfig::default(),
        }
    }
}

impl Default for TieringConfig {
    fn default() -> Self {
        Self {
            script: default_tiering_script(),
            archival_mount: default_archival_mount(),
        }
    }
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            output_container: default_output_container(),
            output_prefix: default_output_prefix(),
            profile: serde_json::Value::Null,
        }
    }
}

impl CoreConfig {
    pub fn read_url_ttl(&self) -> Duration {
        Duration::from_secs(self.read_url_ttl_secs)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_millis(self.upstream_timeout_ms)
    }
}

fn default_admin_group() -> String {
    "admin".into()
}
fn default_read_url_ttl_secs() -> u64 {
    300
}
fn default_upstream_timeout_ms() -> u64 {
    5_000
}
fn default_tiering_script() -> String {
    "MoveMedia.ps1".into()
}
fn default_archival_mount() -> String {
    "/mnt/archive".into()
}
fn default_output_container() -> String {
    "mediavault-derived".into()
}
fn default_output_prefix() -> String {
    "private/assets".into()
}
