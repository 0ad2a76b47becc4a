mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Durable key-value storage that survives a reload
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a value, `None` if the key was never set
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Write a value.
    ///
    /// Returns `Ok(false)` when the store is full and the write was dropped;
    /// the previous value, if any, is kept.
    async fn set(&self, key: &str, value: &Value) -> Result<bool>;

    /// Remove a key
    async fn remove(&self, key: &str) -> Result<()>;

    /// Remove every key
    async fn flush(&self) -> Result<()>;

    /// List stored keys in ascending order
    async fn keys(&self) -> Result<Vec<String>>;
}

/// Bytes a key/value pair counts against a store quota
pub(crate) fn entry_size(key: &str, serialized: &str) -> usize {
    key.len() + serialized.len()
}
