//! SQLite persistence backends

mod permission;
mod registry;
mod schema;

pub use permission::SqlitePermissionStore;
pub use registry::SqliteAssetRegistry;
pub use schema::{SCHEMA_VERSION, init_schema};
