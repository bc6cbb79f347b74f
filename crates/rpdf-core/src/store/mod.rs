//! Persistence: a string-keyed byte store and the content store on top of it.

mod content;
mod fs;
mod memory;

pub use content::{ContentHash, ContentStore, SourceFile};
pub use fs::FsStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::StoreError;

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Durable key-value storage with string keys and byte values.
///
/// Keys use `/` as a hierarchy separator (`_workspace/<id>/items`).
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read a value, `None` if the key is absent.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Write a value, replacing any previous one.
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()>;

    /// Remove a key. Removing an absent key is not an error.
    async fn remove(&self, key: &str) -> Result<()>;

    /// All keys starting with `prefix`, sorted.
    async fn keys(&self, prefix: &str) -> Result<Vec<String>>;

    async fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }
}

/// Read and deserialize a JSON value.
pub async fn get_json<T: DeserializeOwned>(store: &dyn KvStore, key: &str) -> Result<Option<T>> {
    match store.get(key).await? {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

/// Serialize and write a JSON value.
pub async fn set_json<T: Serialize + Sync>(store: &dyn KvStore, key: &str, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec(value)?;
    store.set(key, bytes).await
}

/// Key layout of the persisted state.
pub mod keys {
    use super::ContentHash;

    /// Prefix shared by all blob keys.
    pub const FILE_PREFIX: &str = "_file-";

    /// Suffix of the metadata key stored next to each blob.
    pub const META_SUFFIX: &str = ".meta";

    pub fn file(hash: &ContentHash) -> String {
        format!("{}{}", FILE_PREFIX, hash)
    }

    pub fn file_meta(hash: &ContentHash) -> String {
        format!("{}{}{}", FILE_PREFIX, hash, META_SUFFIX)
    }

    /// Global list of workspace ids.
    pub fn workspace_index() -> String {
        "_workspace/index".to_string()
    }

    pub fn workspace_files_index(id: &str) -> String {
        format!("_workspace/{}/files_index", id)
    }

    pub fn workspace_items(id: &str) -> String {
        format!("_workspace/{}/items", id)
    }

    pub fn workspace_info(id: &str) -> String {
        format!("_workspace/{}/info", id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_json_helpers() {
        let store = MemoryStore::new();

        set_json(&store, "_workspace/index", &vec!["a".to_string(), "b".to_string()])
            .await
            .unwrap();

        let ids: Option<Vec<String>> = get_json(&store, "_workspace/index").await.unwrap();
        assert_eq!(ids, Some(vec!["a".to_string(), "b".to_string()]));

        let missing: Option<Vec<String>> = get_json(&store, "_workspace/other").await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_get_json_rejects_garbage() {
        let store = MemoryStore::new();
        store.set("_workspace/index", b"not json".to_vec()).await.unwrap();

        let result: Result<Option<Vec<String>>> = get_json(&store, "_workspace/index").await;
        assert!(matches!(result, Err(StoreError::Serialization(_))));
    }

    #[test]
    fn test_key_layout() {
        let hash = ContentHash::of(b"x");
        assert_eq!(keys::file(&hash), format!("_file-{}", hash));
        assert_eq!(keys::file_meta(&hash), format!("_file-{}.meta", hash));
        assert_eq!(keys::workspace_files_index("w1"), "_workspace/w1/files_index");
        assert_eq!(keys::workspace_items("w1"), "_workspace/w1/items");
        assert_eq!(keys::workspace_info("w1"), "_workspace/w1/info");
    }
}
