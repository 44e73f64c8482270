//! mediavault-core: Asset lifecycle state machine and folder permission authority
//!
//! Decides whether every mutating request on a media asset is legal right now,
//! given the asset's recorded state, the caller, and the grant on the folder
//! holding the asset. Object storage, enrichment jobs, remote execution, and
//! identity are consumed through traits.
//!
//! - [`PermissionAuthority`]: exact-match folder grants, open root
//! - [`LifecycleCoordinator`]: check-out, check-in, delete, rename/move
//! - [`TieringCoordinator`]: hot/archival migration dispatch and reconciliation
//! - [`IngestReconciler`]: object-store and enrichment notifications
//!
//! ## Features
//!
//! | Feature  | Description                              |
//! |----------|------------------------------------------|
//! | (none)   | In-memory stores and collaborators       |
//! | `sqlite` | SQLite-backed stores                     |
//! | `s3`     | S3-compatible [`ObjectStore`]            |

pub mod authority;
pub mod catalog;
pub mod config;
pub mod error;
pub mod identity;
pub mod ingest;
pub mod jobs;
pub mod lifecycle;
pub mod memory;
pub mod object_store;
pub mod registry;
pub mod sink;
pub mod tiering;
mod upstream;
mod vault;

#[cfg(feature = "s3")]
pub mod s3;

pub use authority::{FolderGrant, GrantLookup, PermissionAuthority, decide};
pub use catalog::{CatalogCheck, ContainerCatalog};
pub use config::{CoreConfig, EnrichmentConfig, TieringConfig};
pub use error::{CoreError, CoreResult};
pub use identity::{
    DirectoryUser, Identity, IdentityProvider, StaticDirectory, assignable_groups, resolve_bearer,
};
pub use ingest::{IngestAction, IngestOutcome, IngestReconciler, ObjectEvent};
pub use jobs::{CommandStatus, EnrichmentDispatcher, JobDetails, JobStatus, RemoteExecutor};
pub use lifecycle::{
    AdminOperation, CheckInDecision, CheckOut, CheckOutMode, LifecycleCoordinator, RelocateItem,
    RelocateVerdict,
};
pub use object_store::{CorsRule, ObjectHead, ObjectStore, PresignedUrl};
pub use registry::{MAX_TRANSITION_ATTEMPTS, Registry};
pub use sink::{HttpMutationSink, MutationSink, NoopSink};
pub use tiering::{
    TieringCoordinator, TieringDispatch, TieringItem, TieringItemStatus, TieringReconciliation,
    TieringRequest,
};
pub use vault::{Collaborators, MediaVault};

#[cfg(feature = "s3")]
pub use s3::S3ObjectStore;

// Store types callers need alongside the core
pub use mediavault_store::{
    AssetKey, AssetRecord, AssetStatus, AssetSummary, GroupSet, TechnicalMetadata, Tier,
};
