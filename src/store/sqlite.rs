use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::task;
use tracing::debug;

use super::{KeyValueStore, entry_size};

/// SQLite-backed key-value store
pub struct SqliteStore {
    /// Path to the SQLite database file
    db_path: PathBuf,
    /// Byte budget for all keys and values, unlimited when `None`
    quota: Option<usize>,
}

impl SqliteStore {
    /// Open (or create) a store at the given path
    pub fn new(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();

        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory: {}", parent.display()))?;
        }

        let store = Self {
            db_path,
            quota: None,
        };
        store.init_schema()?;

        Ok(store)
    }

    /// Open the store at the default location (~/.autobrowse/storage.db)
    pub fn default_location() -> Result<Self> {
        Self::new(Self::default_path()?)
    }

    pub fn default_path() -> Result<PathBuf> {
        let home = std::env::var("HOME").context("HOME environment variable not set")?;
        Ok(PathBuf::from(home).join(".autobrowse").join("storage.db"))
    }

    /// Reject writes that would grow the stored keys and values past `bytes`
    pub fn with_quota(mut self, bytes: usize) -> Self {
        self.quota = Some(bytes);
        self
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn init_schema(&self) -> Result<()> {
        let conn = Connection::open(&self.db_path)
            .with_context(|| format!("failed to open database: {}", self.db_path.display()))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )
        .context("failed to create kv_store table")?;

        debug!(path = %self.db_path.display(), "initialized SQLite store");

        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let key = key.to_string();
        let db_path = self.db_path.clone();

        task::spawn_blocking(move || -> Result<Option<Value>> {
            let conn = Connection::open(&db_path)?;
            let raw: Option<String> = conn
                .query_row("SELECT value FROM kv_store WHERE key = ?1", [&key], |row| {
                    row.get(0)
                })
                .optional()?;

            match raw {
                Some(raw) => {
                    let value = serde_json::from_str(&raw)
                        .with_context(|| format!("corrupt value for key {}", key))?;
                    Ok(Some(value))
                }
                None => Ok(None),
            }
        })
        .await
        .context("spawn_blocking failed")?
    }

    async fn set(&self, key: &str, value: &Value) -> Result<bool> {
        let key = key.to_string();
        let serialized = serde_json::to_string(value)?;
        let db_path = self.db_path.clone();
        let quota = self.quota;

        task::spawn_blocking(move || {
            let conn = Connection::open(&db_path)?;

            if let Some(quota) = quota {
                let others: i64 = conn.query_row(
                    "SELECT COALESCE(SUM(LENGTH(key) + LENGTH(value)), 0)
                     FROM kv_store WHERE key != ?1",
                    [&key],
                    |row| row.get(0),
                )?;
                let needed = others as usize + entry_size(&key, &serialized);
                if needed > quota {
                    debug!(key = %key, needed, quota, "sqlite store quota exceeded");
                    return Ok(false);
                }
            }

            conn.execute(
                "INSERT OR REPLACE INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![key, serialized, Utc::now().to_rfc3339()],
            )?;

            Ok::<_, anyhow::Error>(true)
        })
        .await
        .context("spawn_blocking failed")?
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let key = key.to_string();
        let db_path = self.db_path.clone();

        task::spawn_blocking(move || {
            let conn = Connection::open(&db_path)?;
            conn.execute("DELETE FROM kv_store WHERE key = ?1", [&key])?;
            Ok::<_, anyhow::Error>(())
        })
        .await
        .context("spawn_blocking failed")??;

        Ok(())
    }

    async fn flush(&self) -> Result<()> {
        let db_path = self.db_path.clone();

        task::spawn_blocking(move || {
            let conn = Connection::open(&db_path)?;
            let removed = conn.execute("DELETE FROM kv_store", [])?;
            debug!(removed, "flushed SQLite store");
            Ok::<_, anyhow::Error>(())
        })
        .await
        .context("spawn_blocking failed")??;

        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let db_path = self.db_path.clone();

        task::spawn_blocking(move || -> Result<Vec<String>> {
            let conn = Connection::open(&db_path)?;
            let mut stmt = conn.prepare("SELECT key FROM kv_store ORDER BY key")?;
            let keys = stmt
                .query_map([], |row| row.get(0))?
                .collect::<Result<Vec<String>, _>>()?;
            Ok(keys)
        })
        .await
        .context("spawn_blocking failed")?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_values_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("storage.db");

        let store = SqliteStore::new(&path).unwrap();
        assert_eq!(store.path(), path.as_path());
        assert!(store.set("autogrowOffset", &json!(7)).await.unwrap());
        assert!(
            store
                .set("autogrowStorage", &json!([{"items": [1, 2]}]))
                .await
                .unwrap()
        );
        drop(store);

        let reopened = SqliteStore::new(&path).unwrap();
        assert_eq!(reopened.get("autogrowOffset").await.unwrap(), Some(json!(7)));
        assert_eq!(
            reopened.get("autogrowStorage").await.unwrap(),
            Some(json!([{"items": [1, 2]}]))
        );
        assert_eq!(
            reopened.keys().await.unwrap(),
            vec!["autogrowOffset".to_string(), "autogrowStorage".to_string()]
        );
    }

    #[tokio::test]
    async fn test_remove_and_flush() {
        let dir = tempdir().unwrap();
        let store = SqliteStore::new(dir.path().join("storage.db")).unwrap();

        store.set("a", &json!(1)).await.unwrap();
        store.set("b", &json!(2)).await.unwrap();
        store.remove("a").await.unwrap();
        assert!(store.get("a").await.unwrap().is_none());
        assert_eq!(store.get("b").await.unwrap(), Some(json!(2)));

        store.flush().await.unwrap();
        assert!(store.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_quota_rejects_oversized_write() {
        let dir = tempdir().unwrap();
        let store = SqliteStore::new(dir.path().join("storage.db"))
            .unwrap()
            .with_quota(16);

        assert!(store.set("small", &json!("ok")).await.unwrap());
        assert!(
            !store
                .set("large", &json!("this value does not fit"))
                .await
                .unwrap()
        );
        assert!(store.get("large").await.unwrap().is_none());
        assert_eq!(store.get("small").await.unwrap(), Some(json!("ok")));
    }
}
