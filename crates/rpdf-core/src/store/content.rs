//! Content-addressed file storage.
//!
//! Uploaded files are stored once under the SHA-256 hash of their bytes,
//! no matter how many workspaces reference them. The store does not count
//! references itself: callers decide when a blob may be deleted (see
//! `WorkspaceManager::is_referenced`).

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use super::{KvStore, Result, get_json, keys, set_json};
use crate::error::StoreError;

/// SHA-256 digest of a file's bytes, as 64 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentHash(String);

impl ContentHash {
    /// Hash arbitrary bytes.
    pub fn of(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Self(format!("{:x}", hasher.finalize()))
    }

    /// Parse a hex digest.
    pub fn parse(s: &str) -> Result<Self> {
        let valid = s.len() == 64
            && s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if valid {
            Ok(Self(s.to_string()))
        } else {
            Err(StoreError::InvalidHash(s.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form for display.
    pub fn short(&self) -> &str {
        &self.0[..12]
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ContentHash {
    type Error = StoreError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<ContentHash> for String {
    fn from(hash: ContentHash) -> Self {
        hash.0
    }
}

/// An uploaded source file: its name and raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub name: String,
    pub data: Vec<u8>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    pub fn hash(&self) -> ContentHash {
        ContentHash::of(&self.data)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct FileMeta {
    name: String,
}

/// Deduplicated blob storage shared by all workspaces.
#[derive(Clone)]
pub struct ContentStore {
    kv: Arc<dyn KvStore>,
}

impl ContentStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// Store a file and return its hash.
    ///
    /// Storing bytes that are already present is a no-op; the name of the
    /// first upload is kept.
    pub async fn put(&self, file: &SourceFile) -> Result<ContentHash> {
        let hash = file.hash();
        self.put_hashed(&hash, file).await?;
        Ok(hash)
    }

    /// Store a file whose hash the caller already computed.
    pub(crate) async fn put_hashed(&self, hash: &ContentHash, file: &SourceFile) -> Result<()> {
        if self.contains(hash).await? {
            debug!("File {} already stored", hash.short());
            return Ok(());
        }

        set_json(self.kv.as_ref(), &keys::file_meta(hash), &FileMeta { name: file.name.clone() })
            .await?;
        self.kv.set(&keys::file(hash), file.data.clone()).await?;

        debug!("Stored file {} ({} bytes) as {}", file.name, file.data.len(), hash.short());
        Ok(())
    }

    /// Fetch a stored file, `None` if the hash is unknown.
    pub async fn get(&self, hash: &ContentHash) -> Result<Option<SourceFile>> {
        let Some(data) = self.kv.get(&keys::file(hash)).await? else {
            return Ok(None);
        };

        let name = get_json::<FileMeta>(self.kv.as_ref(), &keys::file_meta(hash))
            .await?
            .map(|meta| meta.name)
            .unwrap_or_else(|| hash.short().to_string());

        Ok(Some(SourceFile { name, data }))
    }

    pub async fn contains(&self, hash: &ContentHash) -> Result<bool> {
        self.kv.contains(&keys::file(hash)).await
    }

    /// Remove a blob unconditionally.
    pub async fn delete(&self, hash: &ContentHash) -> Result<()> {
        self.kv.remove(&keys::file(hash)).await?;
        self.kv.remove(&keys::file_meta(hash)).await?;
        debug!("Deleted file {}", hash.short());
        Ok(())
    }

    /// Hashes of every stored blob.
    pub async fn hashes(&self) -> Result<Vec<ContentHash>> {
        let mut hashes = Vec::new();
        for key in self.kv.keys(keys::FILE_PREFIX).await? {
            if key.ends_with(keys::META_SUFFIX) {
                continue;
            }
            if let Ok(hash) = ContentHash::parse(&key[keys::FILE_PREFIX.len()..]) {
                hashes.push(hash);
            }
        }
        Ok(hashes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn store() -> (Arc<MemoryStore>, ContentStore) {
        let kv = Arc::new(MemoryStore::new());
        let content = ContentStore::new(kv.clone());
        (kv, content)
    }

    #[test]
    fn test_hash_is_sha256_hex() {
        let hash = ContentHash::of(b"hello world");
        assert_eq!(
            hash.as_str(),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
        assert_eq!(hash.short(), "b94d27b9934d");
    }

    #[test]
    fn test_parse_hash() {
        let hash = ContentHash::of(b"x");
        assert_eq!(ContentHash::parse(hash.as_str()).unwrap(), hash);
        assert!(ContentHash::parse("abc").is_err());
        assert!(ContentHash::parse(&hash.as_str().to_uppercase()).is_err());

        let decoded: std::result::Result<ContentHash, _> = serde_json::from_str("\"zz\"");
        assert!(decoded.is_err());
    }

    #[tokio::test]
    async fn test_put_deduplicates() {
        let (kv, content) = store();

        let first = content.put(&SourceFile::new("a.pdf", b"same bytes".to_vec())).await.unwrap();
        let second = content.put(&SourceFile::new("b.pdf", b"same bytes".to_vec())).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(content.hashes().await.unwrap(), vec![first.clone()]);
        // Blob plus its metadata
        assert_eq!(kv.len(), 2);

        let stored = content.get(&first).await.unwrap().unwrap();
        assert_eq!(stored.name, "a.pdf");
        assert_eq!(stored.data, b"same bytes");
    }

    #[tokio::test]
    async fn test_get_unknown_hash() {
        let (_, content) = store();
        let hash = ContentHash::of(b"never stored");

        assert!(content.get(&hash).await.unwrap().is_none());
        assert!(!content.contains(&hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete() {
        let (kv, content) = store();
        let hash = content.put(&SourceFile::new("a.png", vec![1, 2, 3])).await.unwrap();

        content.delete(&hash).await.unwrap();

        assert!(!content.contains(&hash).await.unwrap());
        assert!(kv.is_empty());
    }
}
