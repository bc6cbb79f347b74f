//! In-memory key-value store.

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{KvStore, Result};

/// Volatile store, useful for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.read().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.entries.write().insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().remove(key);
        Ok(())
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .entries
            .read()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.entries.read().contains_key(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_remove() {
        let store = MemoryStore::new();
        assert!(store.is_empty());

        store.set("a", vec![1, 2, 3]).await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), Some(vec![1, 2, 3]));
        assert!(store.contains("a").await.unwrap());

        store.remove("a").await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), None);
        store.remove("a").await.unwrap();
    }

    #[tokio::test]
    async fn test_keys_by_prefix() {
        let store = MemoryStore::new();
        store.set("_file-b", vec![]).await.unwrap();
        store.set("_file-a", vec![]).await.unwrap();
        store.set("_workspace/index", vec![]).await.unwrap();

        assert_eq!(store.keys("_file-").await.unwrap(), vec!["_file-a", "_file-b"]);
        assert_eq!(store.len(), 3);
    }
}
