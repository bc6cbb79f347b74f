//! Owner of all workspaces sharing one store.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use super::index::WorkspaceIndex;
use super::instance::Workspace;
use crate::error::{Result, WorkspaceError};
use crate::models::config::{RpdfConfig, WorkspaceDefaults};
use crate::store::{ContentHash, ContentStore, FsStore, KvStore, MemoryStore, keys};

const MAX_ID_LEN: usize = 128;

/// Name taken by the id list under `_workspace/`.
const RESERVED_ID: &str = "index";

/// Check that an id is usable as a key component.
pub fn validate_id(id: &str) -> std::result::Result<(), WorkspaceError> {
    let valid = !id.is_empty()
        && id.len() <= MAX_ID_LEN
        && id != RESERVED_ID
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    if valid {
        Ok(())
    } else {
        Err(WorkspaceError::InvalidId(id.to_string()))
    }
}

/// Creates workspaces and keeps one shared instance per id.
///
/// Also answers the questions that span workspaces: whether a stored file is
/// still in use, and which files can be collected.
pub struct WorkspaceManager {
    kv: Arc<dyn KvStore>,
    content: ContentStore,
    index: WorkspaceIndex,
    defaults: WorkspaceDefaults,
    thumbnail_size: u32,
    workspaces: Mutex<HashMap<String, Arc<Workspace>>>,
}

impl WorkspaceManager {
    pub fn new(kv: Arc<dyn KvStore>, config: &RpdfConfig) -> Self {
        Self {
            content: ContentStore::new(kv.clone()),
            index: WorkspaceIndex::new(kv.clone()),
            kv,
            defaults: config.workspace.clone(),
            thumbnail_size: config.thumbnails.max_size,
            workspaces: Mutex::new(HashMap::new()),
        }
    }

    /// Manager over the filesystem store in `storage.data_dir`.
    pub fn open(config: &RpdfConfig) -> Self {
        debug!("Opening store at {}", config.storage.data_dir.display());
        Self::new(Arc::new(FsStore::new(&config.storage.data_dir)), config)
    }

    /// Manager over a fresh in-memory store.
    pub fn in_memory(config: &RpdfConfig) -> Self {
        Self::new(Arc::new(MemoryStore::new()), config)
    }

    pub fn content(&self) -> &ContentStore {
        &self.content
    }

    /// The workspace with this id, created on first request.
    ///
    /// Repeated calls return the same instance. No storage access happens
    /// here; items load on the first `get_items`.
    pub fn get(&self, id: &str) -> Result<Arc<Workspace>> {
        validate_id(id)?;

        let mut workspaces = self.workspaces.lock();
        let workspace = workspaces.entry(id.to_string()).or_insert_with(|| {
            debug!("Creating workspace handle {}", id);
            Arc::new(Workspace::new(
                id.to_string(),
                self.kv.clone(),
                self.index.clone(),
                self.defaults.clone(),
                self.thumbnail_size,
            ))
        });
        Ok(workspace.clone())
    }

    /// Handles for every persisted workspace.
    pub async fn restore(&self) -> Result<Vec<Arc<Workspace>>> {
        let mut restored = Vec::new();
        for id in self.index.ids().await? {
            match self.get(&id) {
                Ok(workspace) => restored.push(workspace),
                Err(e) => debug!("Ignoring indexed workspace {:?}: {}", id, e),
            }
        }
        Ok(restored)
    }

    /// Ids of persisted workspaces followed by those only known in memory.
    pub async fn list(&self) -> Result<Vec<String>> {
        let mut ids = self.index.ids().await?;
        let mut unsaved: Vec<String> = self
            .workspaces
            .lock()
            .keys()
            .filter(|id| !ids.contains(id))
            .cloned()
            .collect();
        unsaved.sort();
        ids.extend(unsaved);
        Ok(ids)
    }

    /// Whether any workspace other than `excluding` lists this file.
    pub async fn is_referenced(&self, hash: &ContentHash, excluding: &[&str]) -> Result<bool> {
        Ok(self.index.is_referenced(hash, excluding).await?)
    }

    /// Delete a workspace and every file only it used.
    ///
    /// Handles obtained before the call stop working; `get` afterwards
    /// returns a fresh, empty workspace. Returns the evicted file hashes.
    pub async fn remove(&self, id: &str) -> Result<Vec<ContentHash>> {
        validate_id(id)?;

        let handle = self.workspaces.lock().remove(id);
        if let Some(workspace) = handle {
            workspace.retire().await;
        }
        self.index.remove(id).await?;

        let hashes = self.index.hash_list(id).await?;
        self.kv.remove(&keys::workspace_items(id)).await?;
        self.kv.remove(&keys::workspace_files_index(id)).await?;
        self.kv.remove(&keys::workspace_info(id)).await?;

        let mut evicted = Vec::new();
        for hash in hashes {
            if self.index.is_referenced(&hash, &[]).await? {
                continue;
            }
            self.content.delete(&hash).await?;
            evicted.push(hash);
        }

        info!("Removed workspace {} ({} files evicted)", id, evicted.len());
        Ok(evicted)
    }

    /// Delete every stored file that no workspace lists.
    pub async fn collect_garbage(&self) -> Result<Vec<ContentHash>> {
        let mut evicted = Vec::new();
        for hash in self.content.hashes().await? {
            if self.index.is_referenced(&hash, &[]).await? {
                continue;
            }
            self.content.delete(&hash).await?;
            evicted.push(hash);
        }

        info!("Garbage collection evicted {} files", evicted.len());
        Ok(evicted)
    }
}
