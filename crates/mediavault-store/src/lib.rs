//! mediavault-store: Durable state for the mediavault lifecycle core
//!
//! Two keyed stores with no decision logic of their own:
//!
//! - [`AssetRegistry`]: (container, object key) → lifecycle record, with
//!   conditional writes keyed on the record's lock state
//! - [`PermissionStore`]: (container, folder prefix) → granted groups
//!
//! ## Features
//!
//! | Feature  | Description                    |
//! |----------|--------------------------------|
//! | (none)   | In-memory backends only        |
//! | `sqlite` | SQLite persistence             |
//!
//! ## Example
//!
//! ```rust,ignore
//! use mediavault_store::{AssetKey, AssetRecord, AssetRegistry, InMemoryAssetRegistry};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = InMemoryAssetRegistry::new();
//!
//!     let record = AssetRecord::new(AssetKey::new("media", "shows/ep1.mov"), 1024, chrono::Utc::now());
//!     registry.create(&record).await?;
//!
//!     // Check out, conditioned on the state we just wrote
//!     let mut held = record.clone();
//!     held.check_out("alice", chrono::Utc::now());
//!     registry.update(&held, &record.lock_state()).await?;
//!
//!     Ok(())
//! }
//! ```

mod error;
mod key;
mod permission;
mod record;
mod registry;

pub mod memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

// Re-exports
pub use error::{StoreError, StoreResult};
pub use key::{
    AssetKey, ROOT_PREFIX, STORAGE_URI_SCHEME, derive_prefix, is_direct_child, is_folder_marker,
};
pub use permission::{GroupSet, PermissionRecord, PermissionStore};
pub use record::{AssetRecord, AssetStatus, AssetSummary, LockState, TechnicalMetadata, Tier};
pub use registry::AssetRegistry;

pub use memory::{InMemoryAssetRegistry, InMemoryPermissionStore};

#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteAssetRegistry, SqlitePermissionStore};
