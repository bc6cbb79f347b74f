//! The persisted list of workspace ids and cross-workspace reference checks.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use crate::error::StoreError;
use crate::store::{ContentHash, KvStore, get_json, keys, set_json};

type Result<T> = std::result::Result<T, StoreError>;

/// Handle on `_workspace/index`.
///
/// Clones share one lock so read-modify-write cycles on the index do not
/// interleave within a process.
#[derive(Clone)]
pub(crate) struct WorkspaceIndex {
    kv: Arc<dyn KvStore>,
    lock: Arc<Mutex<()>>,
}

impl WorkspaceIndex {
    pub(crate) fn new(kv: Arc<dyn KvStore>) -> Self {
        Self {
            kv,
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub(crate) async fn ids(&self) -> Result<Vec<String>> {
        Ok(get_json(self.kv.as_ref(), &keys::workspace_index())
            .await?
            .unwrap_or_default())
    }

    /// Add an id, keeping insertion order. No-op if already present.
    pub(crate) async fn insert(&self, id: &str) -> Result<()> {
        let _guard = self.lock.lock().await;

        let mut ids = self.ids().await?;
        if ids.iter().any(|known| known == id) {
            return Ok(());
        }
        ids.push(id.to_string());
        set_json(self.kv.as_ref(), &keys::workspace_index(), &ids).await?;

        debug!("Registered workspace {}", id);
        Ok(())
    }

    /// Remove an id, returning whether it was present.
    pub(crate) async fn remove(&self, id: &str) -> Result<bool> {
        let _guard = self.lock.lock().await;

        let mut ids = self.ids().await?;
        let before = ids.len();
        ids.retain(|known| known != id);
        if ids.len() == before {
            return Ok(false);
        }
        set_json(self.kv.as_ref(), &keys::workspace_index(), &ids).await?;
        Ok(true)
    }

    /// Persisted hash list of one workspace, empty if none was saved.
    pub(crate) async fn hash_list(&self, id: &str) -> Result<Vec<ContentHash>> {
        Ok(get_json(self.kv.as_ref(), &keys::workspace_files_index(id))
            .await?
            .unwrap_or_default())
    }

    /// Whether any indexed workspace outside `excluding` lists `hash`.
    pub(crate) async fn is_referenced(&self, hash: &ContentHash, excluding: &[&str]) -> Result<bool> {
        for id in self.ids().await? {
            if excluding.contains(&id.as_str()) {
                continue;
            }
            if self.hash_list(&id).await?.contains(hash) {
                debug!("File {} still referenced by workspace {}", hash.short(), id);
                return Ok(true);
            }
        }
        Ok(false)
    }
}
