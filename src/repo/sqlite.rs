use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result, anyhow};
use rusqlite::{Connection, OptionalExtension, params};
use time::OffsetDateTime;

use super::BlobStore;
use crate::config::default_db_path;

pub struct SqliteBlobStore {
    conn: Mutex<Connection>,
}

impl SqliteBlobStore {
    pub fn open_default() -> Result<Self> {
        let path = default_db_path()?;
        Self::open(path)
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create db dir {}", parent.display()))?;
        }
        let conn =
            Connection::open(path).with_context(|| format!("failed to open db {}", path.display()))?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory db")?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl BlobStore for SqliteBlobStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| anyhow!("sqlite connection lock poisoned"))?;
        conn.query_row(
            "SELECT value FROM blobs WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()
        .with_context(|| format!("failed to read blob {key}"))
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| anyhow!("sqlite connection lock poisoned"))?;
        conn.execute(
            "INSERT INTO blobs (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, OffsetDateTime::now_utc().unix_timestamp()],
        )
        .with_context(|| format!("failed to write blob {key}"))?;
        Ok(())
    }
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
PRAGMA journal_mode=WAL;
CREATE TABLE IF NOT EXISTS blobs (
  key TEXT PRIMARY KEY,
  value TEXT NOT NULL,
  updated_at INTEGER NOT NULL
);
"#,
    )
    .context("failed to initialize schema")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_store_survives_reopen() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        {
            let store = SqliteBlobStore::open(tmp.path()).unwrap();
            assert!(store.get("k").unwrap().is_none());
            store.put("k", "first").unwrap();
            store.put("k", "second").unwrap();
        }
        let reopened = SqliteBlobStore::open(tmp.path()).unwrap();
        assert_eq!(reopened.get("k").unwrap().as_deref(), Some("second"));
    }

    #[test]
    fn keys_are_independent() {
        let store = SqliteBlobStore::open_in_memory().unwrap();
        store.put("a", "1").unwrap();
        store.put("b", "2").unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));
        assert_eq!(store.get("b").unwrap().as_deref(), Some("2"));
    }

    #[test]
    fn writes_stamp_unix_seconds() {
        let store = SqliteBlobStore::open_in_memory().unwrap();
        let before = OffsetDateTime::now_utc().unix_timestamp();
        store.put("k", "v").unwrap();
        let after = OffsetDateTime::now_utc().unix_timestamp();

        let conn = store.conn.lock().unwrap();
        let stamped: i64 = conn
            .query_row("SELECT updated_at FROM blobs WHERE key = 'k'", [], |row| row.get(0))
            .unwrap();
        assert!((before..=after).contains(&stamped));
    }
}
