//! SQLite permission store

use std::sync::Mutex;

use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension};

use super::schema::init_schema;
use crate::error::{StoreError, StoreResult};
use crate::permission::{GroupSet, PermissionRecord, PermissionStore};

/// SQLite-backed permission store
pub struct SqlitePermissionStore {
    conn: Mutex<Connection>,
}

impl SqlitePermissionStore {
    /// Open or create a database at the given path
    pub fn open(path: &str) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory database (for testing)
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

fn encode_groups(groups: &GroupSet) -> StoreResult<String> {
    serde_json::to_string(groups).map_err(|e| StoreError::Storage(e.to_string()))
}

fn decode_groups(json: &str) -> StoreResult<GroupSet> {
    serde_json::from_str(json).map_err(|e| StoreError::Storage(format!("invalid groups: {e}")))
}

/// Escape LIKE wildcards so folder names match literally
fn like_prefix(prefix: &str) -> String {
    let escaped = prefix
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("{escaped}%")
}

#[async_trait]
impl PermissionStore for SqlitePermissionStore {
    async fn get(&self, container: &str, prefix: &str) -> StoreResult<Option<GroupSet>> {
        let conn = self.conn.lock().unwrap();

        let json: Option<String> = conn
            .query_row(
                "SELECT groups FROM folder_permissions WHERE container = ? AND prefix = ?",
                (container, prefix),
                |row| row.get(0),
            )
            .optional()?;

        json.as_deref().map(decode_groups).transpose()
    }

    async fn put(&self, container: &str, prefix: &str, groups: &GroupSet) -> StoreResult<()> {
        let json = encode_groups(groups)?;
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "INSERT OR REPLACE INTO folder_permissions (container, prefix, groups) VALUES (?, ?, ?)",
            (container, prefix, &json),
        )?;

        Ok(())
    }

    async fn put_if_absent(
        &self,
        container: &str,
        prefix: &str,
        groups: &GroupSet,
    ) -> StoreResult<bool> {
        let json = encode_groups(groups)?;
        let conn = self.conn.lock().unwrap();

        let inserted = conn.execute(
            r#"INSERT INTO folder_permissions (container, prefix, groups) VALUES (?, ?, ?)
               ON CONFLICT (container, prefix) DO NOTHING"#,
            (container, prefix, &json),
        )?;

        Ok(inserted == 1)
    }

    async fn delete(&self, container: &str, prefix: &str) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "DELETE FROM folder_permissions WHERE container = ? AND prefix = ?",
            (container, prefix),
        )?;
        Ok(())
    }

    async fn list(
        &self,
        container: &str,
        prefix_filter: &str,
    ) -> StoreResult<Vec<PermissionRecord>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn.prepare(
            r#"SELECT prefix, groups FROM folder_permissions
               WHERE container = ? AND prefix LIKE ? ESCAPE '\'
               ORDER BY prefix"#,
        )?;
        let rows = stmt
            .query_map((container, like_prefix(prefix_filter)), |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(prefix, json)| {
                Ok(PermissionRecord {
                    container: container.to_string(),
                    prefix,
                    groups: decode_groups(&json)?,
                })
            })
            .collect()
    }
}
