//! Asset lifecycle records

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StoreError;
use crate::key::AssetKey;

/// Storage tier an asset currently resides in
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Hot,
    Archival,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Hot => "hot",
            Tier::Archival => "archival",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hot" => Ok(Tier::Hot),
            "archival" => Ok(Tier::Archival),
            other => Err(StoreError::Storage(format!("unknown tier '{other}'"))),
        }
    }
}

/// Lifecycle status as seen by clients
///
/// Derived from tier and editor, so `CheckedOut` holds exactly when an
/// editor is recorded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssetStatus {
    Available,
    Archived,
    CheckedOut,
}

/// The part of a record every conditional write is keyed on
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LockState {
    pub tier: Tier,
    pub editor: Option<String>,
}

/// Technical metadata produced by the enrichment pipeline
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnicalMetadata {
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
    pub file_format: Option<String>,
    pub duration_secs: Option<f64>,
    pub frame_rate: Option<f64>,
    pub frame_count: Option<u64>,
    pub audio_tracks: Option<u32>,
    pub video_tracks: Option<u32>,
    pub thumbnail_location: Option<String>,
    pub proxy_location: Option<String>,
}

/// A tracked asset
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetRecord {
    pub key: AssetKey,
    /// Assigned once at creation, never changed
    pub asset_id: Option<Uuid>,
    pub tier: Tier,
    pub editor: Option<String>,
    pub prefix: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub size_bytes: u64,
    pub technical: Option<TechnicalMetadata>,
}

impl AssetRecord {
    /// Fresh hot-tier record with a newly generated asset id
    pub fn new(key: AssetKey, size_bytes: u64, at: DateTime<Utc>) -> Self {
        let prefix = key.prefix();
        Self {
            key,
            asset_id: Some(Uuid::new_v4()),
            tier: Tier::Hot,
            editor: None,
            prefix,
            created_at: at,
            modified_at: at,
            size_bytes,
            technical: None,
        }
    }

    pub fn status(&self) -> AssetStatus {
        match (&self.editor, self.tier) {
            (Some(_), _) => AssetStatus::CheckedOut,
            (None, Tier::Hot) => AssetStatus::Available,
            (None, Tier::Archival) => AssetStatus::Archived,
        }
    }

    pub fn lock_state(&self) -> LockState {
        LockState {
            tier: self.tier,
            editor: self.editor.clone(),
        }
    }

    pub fn is_checked_out(&self) -> bool {
        self.editor.is_some()
    }

    pub fn is_held_by(&self, user: &str) -> bool {
        self.editor.as_deref() == Some(user)
    }

    pub fn check_out(&mut self, user: &str, at: DateTime<Utc>) {
        self.editor = Some(user.to_string());
        self.modified_at = at;
    }

    /// Release the edit lock; a checked-in upload lands in the hot tier
    pub fn check_in(&mut self, at: DateTime<Utc>) {
        self.editor = None;
        self.tier = Tier::Hot;
        self.modified_at = at;
    }

    /// Point the record at a new key, re-deriving its folder
    pub fn rekey(&mut self, to: AssetKey) {
        self.prefix = to.prefix();
        self.key = to;
    }

    pub fn summary(&self) -> AssetSummary {
        AssetSummary {
            container: self.key.container.clone(),
            key: self.key.key.clone(),
            asset_id: self.asset_id,
            status: self.status(),
            edit_user: self.editor.clone(),
            prefix: self.prefix.clone(),
            creation_time: self.created_at,
            last_modified_time: self.modified_at,
            size_bytes: self.size_bytes,
            technical: self.technical.clone(),
        }
    }
}

/// Flat, client-facing view of a record carrying the full field set
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetSummary {
    pub container: String,
    pub key: String,
    pub asset_id: Option<Uuid>,
    pub status: AssetStatus,
    pub edit_user: Option<String>,
    pub prefix: String,
    pub creation_time: DateTime<Utc>,
    pub last_modified_time: DateTime<Utc>,
    pub size_bytes: u64,
    pub technical: Option<TechnicalMetadata>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> AssetRecord {
        AssetRecord::new(AssetKey::new("media", "shows/clip.mov"), 42, Utc::now())
    }

    #[test]
    fn test_new_record_is_available() {
        let rec = record();
        assert_eq!(rec.status(), AssetStatus::Available);
        assert_eq!(rec.prefix, "shows/");
        assert!(rec.asset_id.is_some());
        assert!(rec.editor.is_none());
    }

    #[test]
    fn test_status_follows_editor() {
        let mut rec = record();
        rec.tier = Tier::Archival;
        assert_eq!(rec.status(), AssetStatus::Archived);

        rec.check_out("alice", Utc::now());
        assert_eq!(rec.status(), AssetStatus::CheckedOut);
        assert!(rec.is_held_by("alice"));
        assert!(!rec.is_held_by("bob"));

        rec.check_in(Utc::now());
        assert_eq!(rec.status(), AssetStatus::Available);
        assert!(rec.editor.is_none());
    }

    #[test]
    fn test_rekey_updates_prefix() {
        let mut rec = record();
        rec.rekey(AssetKey::new("media", "archive/2024/clip.mov"));
        assert_eq!(rec.prefix, "archive/2024/");
        assert_eq!(rec.key.key, "archive/2024/clip.mov");
    }

    #[test]
    fn test_tier_parse() {
        assert_eq!("hot".parse::<Tier>().unwrap(), Tier::Hot);
        assert_eq!("archival".parse::<Tier>().unwrap(), Tier::Archival);
        assert!("glacier".parse::<Tier>().is_err());
    }
}
