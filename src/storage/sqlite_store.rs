use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::rusqlite::{params, OpenFlags, OptionalExtension};
use r2d2_sqlite::SqliteConnectionManager;

use crate::errors::StoreError;
use crate::storage::area::{PreferenceStore, StorageArea};

/// SQLite-based preference store. One table, partitioned by namespace.
pub struct SqlitePreferenceStore {
    pool: Pool<SqliteConnectionManager>,
}

impl SqlitePreferenceStore {
    /// Opens (or creates) the database at `path` and ensures the schema exists.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let manager = SqliteConnectionManager::file(path.as_ref())
            .with_flags(
                OpenFlags::SQLITE_OPEN_READ_WRITE
                    | OpenFlags::SQLITE_OPEN_CREATE
                    | OpenFlags::SQLITE_OPEN_URI,
            )
            .with_init(|c| {
                c.busy_timeout(Duration::from_millis(500))?;
                c.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
                c.execute_batch(
                    "CREATE TABLE IF NOT EXISTS preferences (
                        namespace TEXT NOT NULL,
                        key TEXT NOT NULL,
                        value TEXT NOT NULL,
                        updated_at INTEGER NOT NULL DEFAULT (strftime('%s','now')),
                        PRIMARY KEY(namespace, key)
                    );",
                )?;
                Ok(())
            });

        let pool = Pool::builder()
            .max_size(4)
            .connection_timeout(Duration::from_secs(5))
            .build(manager)?;

        Ok(Self { pool })
    }
}

impl PreferenceStore for SqlitePreferenceStore {
    fn area(&self, namespace: &str) -> Result<Arc<dyn StorageArea>, StoreError> {
        Ok(Arc::new(SqliteArea {
            pool: self.pool.clone(),
            namespace: namespace.to_string(),
        }))
    }
}

struct SqliteArea {
    pool: Pool<SqliteConnectionManager>,
    namespace: String,
}

impl SqliteArea {
    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, StoreError> {
        Ok(self.pool.get()?)
    }
}

impl StorageArea for SqliteArea {
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        let conn = self.conn()?;
        Ok(conn
            .query_row(
                "SELECT value FROM preferences WHERE namespace=?1 AND key=?2",
                params![self.namespace, key],
                |row| row.get::<_, String>(0),
            )
            .optional()?)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO preferences(namespace,key,value) VALUES (?1,?2,?3)
             ON CONFLICT(namespace,key) DO UPDATE
             SET value=excluded.value, updated_at=strftime('%s','now')",
            params![self.namespace, key, value],
        )?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "DELETE FROM preferences WHERE namespace=?1 AND key=?2",
            params![self.namespace, key],
        )?;
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM preferences WHERE namespace=?1", params![self.namespace])?;
        Ok(())
    }

    fn len(&self) -> usize {
        let conn = match self.conn() {
            Ok(c) => c,
            Err(_) => return 0,
        };
        conn.query_row::<u32, _, _>(
            "SELECT COUNT(*) FROM preferences WHERE namespace=?1",
            params![self.namespace],
            |row| row.get(0),
        )
        .unwrap_or(0) as usize
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT key FROM preferences WHERE namespace=?1 ORDER BY key")?;
        let rows = stmt.query_map(params![self.namespace], |row| row.get::<_, String>(0))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn items_with_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT key, value FROM preferences
             WHERE namespace=?1 AND substr(key, 1, length(?2)) = ?2
             ORDER BY key",
        )?;
        let rows = stmt.query_map(params![self.namespace, prefix], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}
