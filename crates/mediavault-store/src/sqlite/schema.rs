//! SQLite schema definitions

use crate::error::StoreResult;
use rusqlite::Connection;

pub const SCHEMA_VERSION: u32 = 1;

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        r#"
        -- Schema version tracking
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );

        -- Tracked assets
        CREATE TABLE IF NOT EXISTS assets (
            container TEXT NOT NULL,
            object_key TEXT NOT NULL,
            asset_id TEXT,                         -- UUID, immutable once set
            tier TEXT NOT NULL,                    -- "hot" | "archival"
            edit_user TEXT,                        -- NULL unless checked out
            prefix TEXT NOT NULL,
            created_at TEXT NOT NULL,              -- RFC 3339
            modified_at TEXT NOT NULL,             -- RFC 3339
            size_bytes INTEGER NOT NULL,
            technical TEXT,                        -- JSON TechnicalMetadata
            PRIMARY KEY (container, object_key)
        );

        CREATE INDEX IF NOT EXISTS idx_assets_prefix
            ON assets(container, prefix);

        -- Folder grants
        CREATE TABLE IF NOT EXISTS folder_permissions (
            container TEXT NOT NULL,
            prefix TEXT NOT NULL,
            groups TEXT NOT NULL,                  -- JSON array, sorted
            PRIMARY KEY (container, prefix)
        );
    "#,
    )?;

    conn.execute(
        "INSERT OR REPLACE INTO schema_version (version) VALUES (?)",
        [SCHEMA_VERSION],
    )?;

    Ok(())
}

/// Check schema version
#[cfg(test)]
pub fn check_version(conn: &Connection) -> StoreResult<u32> {
    let version: u32 = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .unwrap_or(0);
    Ok(version)
}
