//! In-memory implementations for tests and single-process deployments

mod permission;
mod registry;

pub use permission::InMemoryPermissionStore;
pub use registry::InMemoryAssetRegistry;
