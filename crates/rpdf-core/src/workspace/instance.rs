//! A single workspace: one persisted, ordered arrangement of pages.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::index::WorkspaceIndex;
use crate::document::{SourceDocument, Thumbnail, compose_to_bytes};
use crate::error::{Result, RpdfError, WorkspaceError};
use crate::models::config::WorkspaceDefaults;
use crate::models::item::{CompactItem, PageItem, PageRef, WorkspaceInfo, assign_ids, hash_list};
use crate::store::{ContentHash, ContentStore, KvStore, SourceFile, get_json, keys, set_json};

/// Mutable state, guarded by the workspace lock.
#[derive(Default)]
struct State {
    /// `None` until the items were loaded or saved once.
    items: Option<Vec<PageItem>>,
    /// Documents opened by this instance, by content hash.
    documents: HashMap<ContentHash, Arc<SourceDocument>>,
}

/// One workspace.
///
/// Obtained from [`WorkspaceManager::get`](super::WorkspaceManager::get),
/// which hands out a single shared instance per id. Operations on one
/// instance are serialized.
pub struct Workspace {
    id: String,
    kv: Arc<dyn KvStore>,
    content: ContentStore,
    index: WorkspaceIndex,
    defaults: WorkspaceDefaults,
    thumbnail_size: u32,
    ready: AtomicBool,
    removed: AtomicBool,
    state: Mutex<State>,
}

impl Workspace {
    pub(crate) fn new(
        id: String,
        kv: Arc<dyn KvStore>,
        index: WorkspaceIndex,
        defaults: WorkspaceDefaults,
        thumbnail_size: u32,
    ) -> Self {
        Self {
            id,
            content: ContentStore::new(kv.clone()),
            kv,
            index,
            defaults,
            thumbnail_size,
            ready: AtomicBool::new(false),
            removed: AtomicBool::new(false),
            state: Mutex::new(State::default()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Whether the items have been loaded (or saved) by this instance.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Mark this instance as deleted. Later operations fail with `Removed`.
    ///
    /// Waits for any running operation, so nothing is written after return.
    pub(crate) async fn retire(&self) {
        let mut state = self.state.lock().await;
        self.removed.store(true, Ordering::Release);
        self.ready.store(false, Ordering::Release);
        *state = State::default();
    }

    fn ensure_live(&self) -> Result<()> {
        if self.removed.load(Ordering::Acquire) {
            return Err(WorkspaceError::Removed(self.id.clone()).into());
        }
        Ok(())
    }

    /// Current items, restoring them from storage on first use.
    pub async fn get_items(&self) -> Result<Vec<PageItem>> {
        let mut state = self.state.lock().await;
        self.load(&mut state).await
    }

    /// Replace and persist the item list.
    ///
    /// Files referenced by the list that are not stored yet are written to
    /// the content store; files no longer used by any workspace are evicted.
    /// Returns the stored list with canonical ids.
    pub async fn set_items(&self, items: Vec<PageItem>) -> Result<Vec<PageItem>> {
        let mut state = self.state.lock().await;
        self.store(&mut state, items).await
    }

    /// Decode a file and return one unselected item per page.
    ///
    /// Nothing is persisted until the items are saved.
    pub async fn import(&self, name: &str, data: Vec<u8>) -> Result<Vec<PageItem>> {
        let mut state = self.state.lock().await;
        let document = self.open_file(&mut state, SourceFile::new(name, data))?;
        Ok(document.pages(self.thumbnail_size))
    }

    /// Import a file and append its pages to the arrangement.
    pub async fn append_file(&self, name: &str, data: Vec<u8>) -> Result<Vec<PageItem>> {
        let mut state = self.state.lock().await;

        let mut items = self.load(&mut state).await?;
        let document = self.open_file(&mut state, SourceFile::new(name, data))?;
        items.extend(document.pages(self.thumbnail_size));

        self.store(&mut state, items).await
    }

    /// Apply an arrangement function to the loaded items and save the result.
    pub async fn update<F, E>(&self, f: F) -> Result<Vec<PageItem>>
    where
        F: FnOnce(&[PageItem]) -> std::result::Result<Vec<PageItem>, E>,
        E: Into<RpdfError>,
    {
        let mut state = self.state.lock().await;
        self.ensure_live()?;
        let current = state
            .items
            .as_deref()
            .ok_or_else(|| WorkspaceError::NotReady(self.id.clone()))?;

        let updated = f(current).map_err(|e| -> RpdfError { e.into() })?;
        self.store(&mut state, updated).await
    }

    /// Saved metadata, or the configured defaults.
    pub async fn get_info(&self) -> Result<WorkspaceInfo> {
        let info = get_json(self.kv.as_ref(), &keys::workspace_info(&self.id)).await?;
        Ok(info.unwrap_or_else(|| WorkspaceInfo {
            name: self.defaults.default_name.clone(),
            export_file_name: self.defaults.default_export_file_name.clone(),
        }))
    }

    pub async fn set_info(&self, info: &WorkspaceInfo) -> Result<()> {
        let _state = self.state.lock().await;
        self.ensure_live()?;
        self.index.insert(&self.id).await?;
        set_json(self.kv.as_ref(), &keys::workspace_info(&self.id), info).await?;
        Ok(())
    }

    /// Compose the arrangement into a PDF.
    pub async fn export(&self, selected_only: bool) -> Result<Vec<u8>> {
        let mut state = self.state.lock().await;
        let items = self.ready_items(&state)?;

        let refs: Vec<PageRef> = items
            .iter()
            .filter(|item| !selected_only || item.selected)
            .map(|item| item.page.clone())
            .collect();
        if refs.is_empty() {
            return Err(WorkspaceError::NothingToExport.into());
        }

        let mut documents = Vec::with_capacity(refs.len());
        for page in &refs {
            documents.push(self.document(&mut state, &page.hash).await?);
        }
        let pages: Vec<(&SourceDocument, u32)> = documents
            .iter()
            .zip(&refs)
            .map(|(document, page)| (document.as_ref(), page.page))
            .collect();

        Ok(compose_to_bytes(&pages)?)
    }

    /// Render the page at `position` as a PNG image.
    pub async fn page_image(&self, position: usize, max_size: u32) -> Result<Thumbnail> {
        let mut state = self.state.lock().await;
        let items = self.ready_items(&state)?;

        let page = items
            .get(position)
            .map(|item| item.page.clone())
            .ok_or(WorkspaceError::PositionOutOfRange {
                position,
                len: items.len(),
            })?;

        let document = self.document(&mut state, &page.hash).await?;
        Ok(document.thumbnail(page.page, max_size)?)
    }

    fn ready_items(&self, state: &State) -> Result<Vec<PageItem>> {
        self.ensure_live()?;
        state
            .items
            .clone()
            .ok_or_else(|| WorkspaceError::NotReady(self.id.clone()).into())
    }

    fn open_file(&self, state: &mut State, file: SourceFile) -> Result<Arc<SourceDocument>> {
        let document = Arc::new(SourceDocument::open(file)?);
        state
            .documents
            .insert(document.hash().clone(), document.clone());
        Ok(document)
    }

    /// An opened document, decoding it from the content store if needed.
    async fn document(&self, state: &mut State, hash: &ContentHash) -> Result<Arc<SourceDocument>> {
        if let Some(document) = state.documents.get(hash) {
            return Ok(document.clone());
        }

        let file = self
            .content
            .get(hash)
            .await?
            .ok_or_else(|| WorkspaceError::MissingFile(hash.to_string()))?;
        self.open_file(state, file)
    }

    async fn load(&self, state: &mut State) -> Result<Vec<PageItem>> {
        self.ensure_live()?;
        if let Some(items) = &state.items {
            return Ok(items.clone());
        }

        let items = self.reconstruct(state).await?;
        state.items = Some(items.clone());
        self.ready.store(true, Ordering::Release);
        Ok(items)
    }

    /// Rebuild the display items from the persisted compact items.
    async fn reconstruct(&self, state: &mut State) -> Result<Vec<PageItem>> {
        let compact: Vec<CompactItem> = get_json(self.kv.as_ref(), &keys::workspace_items(&self.id))
            .await?
            .unwrap_or_default();
        if compact.is_empty() {
            debug!("Workspace {} has no saved items", self.id);
            return Ok(Vec::new());
        }

        let mut available: HashMap<PageRef, PageItem> = HashMap::new();
        for hash in self.index.hash_list(&self.id).await? {
            // Absent blobs are skipped; their pages fail below as Reconstruction
            let document = match self.document(state, &hash).await {
                Ok(document) => document,
                Err(RpdfError::Workspace(WorkspaceError::MissingFile(_))) => {
                    warn!("File {} of workspace {} is not stored", hash.short(), self.id);
                    continue;
                }
                Err(e) => return Err(e),
            };
            for item in document.pages(self.thumbnail_size) {
                available.insert(item.page.clone(), item);
            }
        }

        let mut items = Vec::with_capacity(compact.len());
        for entry in &compact {
            let page = entry.page_ref();
            let mut item = available
                .get(&page)
                .cloned()
                .ok_or_else(|| WorkspaceError::Reconstruction {
                    hash: page.hash.to_string(),
                    page: page.page,
                })?;
            item.selected = entry.selected;
            items.push(item);
        }
        assign_ids(&mut items);

        info!("Restored {} items of workspace {}", items.len(), self.id);
        Ok(items)
    }

    async fn store(&self, state: &mut State, mut items: Vec<PageItem>) -> Result<Vec<PageItem>> {
        self.ensure_live()?;
        self.index.insert(&self.id).await?;

        let hashes = hash_list(&items);
        for hash in &hashes {
            if self.content.contains(hash).await? {
                continue;
            }
            let document = state
                .documents
                .get(hash)
                .ok_or_else(|| WorkspaceError::MissingFile(hash.to_string()))?;
            self.content.put_hashed(hash, document.file()).await?;
        }

        assign_ids(&mut items);
        let compact: Vec<CompactItem> = items
            .iter()
            .enumerate()
            .map(|(position, item)| item.to_compact(position))
            .collect();
        set_json(self.kv.as_ref(), &keys::workspace_items(&self.id), &compact).await?;

        let previous = self.index.hash_list(&self.id).await?;
        set_json(self.kv.as_ref(), &keys::workspace_files_index(&self.id), &hashes).await?;

        for hash in previous.iter().filter(|hash| !hashes.contains(hash)) {
            self.evict(hash).await;
        }

        info!("Saved {} items of workspace {}", items.len(), self.id);
        state.items = Some(items.clone());
        self.ready.store(true, Ordering::Release);
        Ok(items)
    }

    /// Delete a file unless another workspace still uses it. Failures are
    /// logged only.
    async fn evict(&self, hash: &ContentHash) {
        let result = async {
            if self.index.is_referenced(hash, &[self.id.as_str()]).await? {
                return Ok(false);
            }
            self.content.delete(hash).await?;
            Ok::<_, crate::StoreError>(true)
        }
        .await;

        match result {
            Ok(true) => info!("Evicted file {} from workspace {}", hash.short(), self.id),
            Ok(false) => {}
            Err(e) => warn!("Failed to evict file {}: {}", hash.short(), e),
        }
    }
}
