//! Core library for rpdf, a visual PDF page reorganizer.
//!
//! This crate provides:
//! - Content-addressed, deduplicated file storage shared by all workspaces
//! - Workspaces: persisted, ordered page arrangements with reconstruction
//! - Document decoding (PDF and raster images), thumbnails and recomposition

pub mod error;
pub mod models;
pub mod store;
pub mod document;
pub mod workspace;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{DocumentError, RpdfError, Result, StoreError, WorkspaceError};
pub use models::config::RpdfConfig;
pub use models::item::{CompactItem, PageItem, PageRef, WorkspaceInfo};
pub use store::{ContentHash, ContentStore, FsStore, KvStore, MemoryStore, SourceFile};
pub use document::{SourceDocument, SourceKind, Thumbnail, compose, compose_to_bytes};
pub use workspace::{Workspace, WorkspaceManager, arrange};
