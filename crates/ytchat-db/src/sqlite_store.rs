use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};
use ytchat_common::{Error, Result};

use crate::kv::KeyValueStore;

/// SQLite-backed key-value store. Each key holds one JSON document.
pub struct SqliteKvStore {
    conn: Mutex<Connection>,
}

impl SqliteKvStore {
    pub fn open(db_path: &Path) -> Result<Self> {
        info!("opening key-value store at {}", db_path.display());
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(db_path)
            .map_err(|e| Error::Database(format!("failed to open database: {e}")))?;

        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(|e| Error::Database(format!("failed to set pragmas: {e}")))?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::Database(format!("failed to open in-memory database: {e}")))?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        self.lock()?
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS kv_entries (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL,
                    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
                );",
            )
            .map_err(|e| Error::Database(format!("migration failed: {e}")))?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::Database("connection lock poisoned".to_string()))
    }
}

#[async_trait]
impl KeyValueStore for SqliteKvStore {
    async fn get(&self, keys: &[&str]) -> Result<HashMap<String, Value>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT value FROM kv_entries WHERE key = ?1")
            .map_err(|e| Error::Database(format!("failed to prepare lookup: {e}")))?;

        let mut values = HashMap::new();
        for key in keys {
            let raw: Option<String> = stmt
                .query_row(params![key], |row| row.get(0))
                .optional()
                .map_err(|e| Error::Database(format!("failed to read key '{key}': {e}")))?;

            if let Some(raw) = raw {
                let value = serde_json::from_str(&raw).map_err(|e| {
                    warn!("undecodable value for key '{}': {e}", key);
                    Error::Database(format!("corrupt value for key '{key}': {e}"))
                })?;
                values.insert(key.to_string(), value);
            }
        }
        Ok(values)
    }

    async fn set(&self, entries: HashMap<String, Value>) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| Error::Database(format!("failed to begin transaction: {e}")))?;

        for (key, value) in &entries {
            tx.execute(
                "INSERT INTO kv_entries (key, value)
                 VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET
                   value = excluded.value,
                   updated_at = datetime('now')",
                params![key, value.to_string()],
            )
            .map_err(|e| Error::Database(format!("failed to write key '{key}': {e}")))?;
        }

        tx.commit()
            .map_err(|e| Error::Database(format!("failed to commit: {e}")))?;
        debug!("wrote {} key(s)", entries.len());
        Ok(())
    }

    async fn remove(&self, keys: &[&str]) -> Result<()> {
        let conn = self.lock()?;
        for key in keys {
            conn.execute("DELETE FROM kv_entries WHERE key = ?1", params![key])
                .map_err(|e| Error::Database(format!("failed to remove key '{key}': {e}")))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::SqliteKvStore;
    use crate::kv::KeyValueStore;
    use serde_json::json;
    use ytchat_common::Error;

    #[tokio::test]
    async fn set_and_get_round_trip() {
        let store = SqliteKvStore::in_memory().expect("in-memory store should open");

        store
            .set_one("conversations", json!({"a": {"id": "a"}}))
            .await
            .expect("write should succeed");

        let value = store.get_one("conversations").await.unwrap();
        assert_eq!(value, Some(json!({"a": {"id": "a"}})));
        assert!(store.get_one("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn set_overwrites_existing_key() {
        let store = SqliteKvStore::in_memory().expect("in-memory store should open");
        store.set_one("k", json!(1)).await.unwrap();
        store.set_one("k", json!(2)).await.unwrap();

        assert_eq!(store.get_one("k").await.unwrap(), Some(json!(2)));
    }

    #[tokio::test]
    async fn remove_deletes_rows() {
        let store = SqliteKvStore::in_memory().expect("in-memory store should open");
        store.set_one("a", json!("x")).await.unwrap();
        store.set_one("b", json!("y")).await.unwrap();

        store.remove(&["a"]).await.unwrap();

        let values = store.get(&["a", "b"]).await.unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values["b"], json!("y"));
    }

    #[tokio::test]
    async fn undecodable_value_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ytchat.db");
        let store = SqliteKvStore::open(&path).expect("file store should open");
        store.set_one("conversations", json!({})).await.unwrap();
        store.set_one("active", json!("conv-1")).await.unwrap();

        rusqlite::Connection::open(&path)
            .unwrap()
            .execute(
                "UPDATE kv_entries SET value = '{\"truncated' WHERE key = 'conversations'",
                [],
            )
            .unwrap();

        let err = store.get(&["active", "conversations"]).await.unwrap_err();
        assert!(matches!(err, Error::Database(ref msg) if msg.contains("conversations")));
        assert_eq!(store.get_one("active").await.unwrap(), Some(json!("conv-1")));
    }

    #[tokio::test]
    async fn data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("ytchat.db");

        {
            let store = SqliteKvStore::open(&path).expect("file store should open");
            store.set_one("active", json!("conv-1")).await.unwrap();
        }

        let store = SqliteKvStore::open(&path).expect("file store should reopen");
        assert_eq!(store.get_one("active").await.unwrap(), Some(json!("conv-1")));
    }
}
