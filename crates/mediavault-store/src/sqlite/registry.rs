//! SQLite asset registry

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use uuid::Uuid;

use super::schema::init_schema;
use crate::error::{StoreError, StoreResult};
use crate::key::AssetKey;
use crate::record::{AssetRecord, LockState, TechnicalMetadata};
use crate::registry::AssetRegistry;

const SELECT_COLUMNS: &str = "container, object_key, asset_id, tier, edit_user, prefix, \
     created_at, modified_at, size_bytes, technical";

/// SQLite-backed asset registry
///
/// Conditional writes compare the `tier` and `edit_user` columns inside
/// the `UPDATE`/`DELETE` statement itself.
pub struct SqliteAssetRegistry {
    conn: Mutex<Connection>,
}

impl SqliteAssetRegistry {
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

/// Column values as stored, before parsing
struct AssetRow {
    container: String,
    object_key: String,
    asset_id: Option<String>,
    tier: String,
    edit_user: Option<String>,
    prefix: String,
    created_at: String,
    modified_at: String,
    size_bytes: i64,
    technical: Option<String>,
}

impl AssetRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            container: row.get(0)?,
            object_key: row.get(1)?,
            asset_id: row.get(2)?,
            tier: row.get(3)?,
            edit_user: row.get(4)?,
            prefix: row.get(5)?,
            created_at: row.get(6)?,
            modified_at: row.get(7)?,
            size_bytes: row.get(8)?,
            technical: row.get(9)?,
        })
    }

    fn into_record(self) -> StoreResult<AssetRecord> {
        let asset_id = self
            .asset_id
            .map(|id| Uuid::parse_str(&id))
            .transpose()
            .map_err(|e| StoreError::Storage(format!("invalid asset id: {e}")))?;
        let technical = self
            .technical
            .map(|json| serde_json::from_str::<TechnicalMetadata>(&json))
            .transpose()
            .map_err(|e| StoreError::Storage(format!("invalid technical metadata: {e}")))?;

        Ok(AssetRecord {
            key: AssetKey::new(self.container, self.object_key),
            asset_id,
            tier: self.tier.parse()?,
            editor: self.edit_user,
            prefix: self.prefix,
            created_at: parse_time(&self.created_at)?,
            modified_at: parse_time(&self.modified_at)?,
            size_bytes: self.size_bytes.max(0) as u64,
            technical,
        })
    }
}

fn parse_time(value: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::Storage(format!("invalid timestamp '{value}': {e}")))
}

fn technical_json(record: &AssetRecord) -> StoreResult<Option<String>> {
    record
        .technical
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| StoreError::Storage(e.to_string()))
}

fn select_one(conn: &Connection, key: &AssetKey) -> StoreResult<Option<AssetRecord>> {
    let sql = format!("SELECT {SELECT_COLUMNS} FROM assets WHERE container = ? AND object_key = ?");
    let row = conn
        .query_row(&sql, (&key.container, &key.key), AssetRow::from_row)
        .optional()?;
    row.map(AssetRow::into_record).transpose()
}

/// Explain why a conditional statement touched no rows
fn miss_reason(conn: &Connection, key: &AssetKey) -> StoreError {
    match select_one(conn, key) {
        Ok(Some(_)) => StoreError::StateChanged(key.to_string()),
        Ok(None) => StoreError::NotFound(key.to_string()),
        Err(e) => e,
    }
}

#[async_trait]
impl AssetRegistry for SqliteAssetRegistry {
    async fn get(&self, key: &AssetKey) -> StoreResult<Option<AssetRecord>> {
        let conn = self.conn.lock().unwrap();
        select_one(&conn, key)
    }

    async fn create(&self, record: &AssetRecord) -> StoreResult<()> {
        let technical = technical_json(record)?;
        let conn = self.conn.lock().unwrap();

        let inserted = conn.execute(
            r#"INSERT INTO assets
               (container, object_key, asset_id, tier, edit_user, prefix,
                created_at, modified_at, size_bytes, technical)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT (container, object_key) DO NOTHING"#,
            params![
                record.key.container,
                record.key.key,
                record.asset_id.map(|id| id.to_string()),
                record.tier.as_str(),
                record.editor,
                record.prefix,
                record.created_at.to_rfc3339(),
                record.modified_at.to_rfc3339(),
                record.size_bytes as i64,
                technical,
            ],
        )?;

        if inserted == 0 {
            return Err(StoreError::AlreadyTracked(record.key.to_string()));
        }
        Ok(())
    }

    async fn update(&self, record: &AssetRecord, expected: &LockState) -> StoreResult<()> {
        let technical = technical_json(record)?;
        let conn = self.conn.lock().unwrap();

        let updated = conn.execute(
            r#"UPDATE assets
               SET asset_id = ?, tier = ?, edit_user = ?, prefix = ?, created_at = ?,
                   modified_at = ?, size_bytes = ?, technical = ?
               WHERE container = ? AND object_key = ? AND tier = ? AND edit_user IS ?"#,
            params![
                record.asset_id.map(|id| id.to_string()),
                record.tier.as_str(),
                record.editor,
                record.prefix,
                record.created_at.to_rfc3339(),
                record.modified_at.to_rfc3339(),
                record.size_bytes as i64,
                technical,
                record.key.container,
                record.key.key,
                expected.tier.as_str(),
                expected.editor,
            ],
        )?;

        if updated == 0 {
            return Err(miss_reason(&conn, &record.key));
        }
        Ok(())
    }

    async fn relocate(
        &self,
        from: &AssetKey,
        to: &AssetKey,
        expected: &LockState,
    ) -> StoreResult<AssetRecord> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        if select_one(&tx, to)?.is_some() {
            return Err(StoreError::AlreadyTracked(to.to_string()));
        }

        let updated = tx.execute(
            r#"UPDATE assets SET object_key = ?, prefix = ?
               WHERE container = ? AND object_key = ? AND tier = ? AND edit_user IS ?"#,
            params![
                to.key,
                to.prefix(),
                from.container,
                from.key,
                expected.tier.as_str(),
                expected.editor,
            ],
        )?;
        if updated == 0 {
            return Err(miss_reason(&tx, from));
        }

        let moved = select_one(&tx, to)?.ok_or_else(|| StoreError::NotFound(to.to_string()))?;
        tx.commit()?;
        Ok(moved)
    }

    async fn remove(&self, key: &AssetKey, expected: &LockState) -> StoreResult<AssetRecord> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let current = select_one(&tx, key)?.ok_or_else(|| StoreError::NotFound(key.to_string()))?;
        let deleted = tx.execute(
            "DELETE FROM assets WHERE container = ? AND object_key = ? AND tier = ? AND edit_user IS ?",
            params![key.container, key.key, expected.tier.as_str(), expected.editor],
        )?;
        if deleted == 0 {
            return Err(StoreError::StateChanged(key.to_string()));
        }

        tx.commit()?;
        Ok(current)
    }

    async fn list_prefix(&self, container: &str, prefix: &str) -> StoreResult<Vec<AssetRecord>> {
        let conn = self.conn.lock().unwrap();
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM assets WHERE container = ? AND prefix = ? ORDER BY object_key"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map((container, prefix), AssetRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(AssetRow::into_record).collect()
    }
}
