//! Filesystem-backed key-value store.
//!
//! Every key maps to one file below the root directory, with `/` in keys
//! becoming directory separators:
//!
//! ```text
//! <root>/
//!   _file-3a7bd3e2...            blob bytes
//!   _file-3a7bd3e2....meta       blob metadata
//!   _workspace/
//!     index
//!     w1/
//!       files_index
//!       items
//!       info
//! ```

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::trace;

use super::{KvStore, Result};
use crate::error::StoreError;

/// Suffix of the temporary files used for atomic writes.
const TMP_SUFFIX: &str = ".rpdf-tmp";

/// Store persisting every key as a file under a root directory.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Create a store rooted at `root`. The directory is created lazily.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() || key.ends_with(TMP_SUFFIX) || key.contains('\\') {
            return Err(StoreError::InvalidKey(key.to_string()));
        }

        let mut path = self.root.clone();
        for component in key.split('/') {
            if component.is_empty() || component == "." || component == ".." {
                return Err(StoreError::InvalidKey(key.to_string()));
            }
            path.push(component);
        }
        Ok(path)
    }

    async fn collect_keys(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut pending = vec![(self.root.clone(), String::new())];

        while let Some((dir, key_prefix)) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };

            while let Some(entry) = entries.next_entry().await? {
                let name = entry.file_name().to_string_lossy().into_owned();
                let key = format!("{}{}", key_prefix, name);

                if entry.file_type().await?.is_dir() {
                    pending.push((entry.path(), format!("{}/", key)));
                } else if !name.ends_with(TMP_SUFFIX) && key.starts_with(prefix) {
                    keys.push(key);
                }
            }
        }

        keys.sort();
        Ok(keys)
    }
}

#[async_trait]
impl KvStore for FsStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match fs::read(&path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut tmp = path.clone().into_os_string();
        tmp.push(TMP_SUFFIX);
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, &value).await?;
        fs::rename(&tmp, &path).await?;

        trace!("Wrote {} bytes to {}", value.len(), key);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>> {
        self.collect_keys(prefix).await
    }

    async fn contains(&self, key: &str) -> Result<bool> {
        let path = self.path_for(key)?;
        Ok(fs::try_exists(&path).await?)
    }
}
