use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;
use ytchat_common::Result;

/// Whole-value key-value persistence.
///
/// Values are replaced wholesale on `set`; there are no partial updates.
/// Keys that are absent from the store are simply missing from the map
/// returned by `get`.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, keys: &[&str]) -> Result<HashMap<String, Value>>;

    async fn set(&self, entries: HashMap<String, Value>) -> Result<()>;

    async fn remove(&self, keys: &[&str]) -> Result<()>;

    /// Convenience wrapper for a single key.
    async fn get_one(&self, key: &str) -> Result<Option<Value>> {
        let mut values = self.get(&[key]).await?;
        Ok(values.remove(key))
    }

    /// Convenience wrapper for a single key.
    async fn set_one(&self, key: &str, value: Value) -> Result<()> {
        self.set(HashMap::from([(key.to_string(), value)])).await
    }
}

/// Volatile store, useful for tests and one-shot sessions.
#[derive(Default)]
pub struct MemoryKvStore {
    entries: RwLock<HashMap<String, Value>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKvStore {
    async fn get(&self, keys: &[&str]) -> Result<HashMap<String, Value>> {
        let entries = self.entries.read().await;
        Ok(keys
            .iter()
            .filter_map(|k| entries.get(*k).map(|v| (k.to_string(), v.clone())))
            .collect())
    }

    async fn set(&self, entries: HashMap<String, Value>) -> Result<()> {
        self.entries.write().await.extend(entries);
        Ok(())
    }

    async fn remove(&self, keys: &[&str]) -> Result<()> {
        let mut entries = self.entries.write().await;
        for key in keys {
            entries.remove(*key);
        }
        Ok(())
    }
}
