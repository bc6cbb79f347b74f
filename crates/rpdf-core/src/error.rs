//! Error types for the rpdf-core library.

use thiserror::Error;

/// Main error type for the rpdf library.
#[derive(Error, Debug)]
pub enum RpdfError {
    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Document decoding or composition error.
    #[error("document error: {0}")]
    Document(#[from] DocumentError),

    /// Workspace error.
    #[error("workspace error: {0}")]
    Workspace(#[from] WorkspaceError),
}

/// Errors raised by the key-value and content stores.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored value could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The key cannot be mapped onto the backend.
    #[error("invalid key: {0:?}")]
    InvalidKey(String),

    /// A string is not a valid content hash.
    #[error("invalid content hash: {0:?}")]
    InvalidHash(String),
}

/// Errors related to decoding and composing documents.
#[derive(Error, Debug)]
pub enum DocumentError {
    /// Failed to open/parse the PDF.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// The PDF is encrypted and cannot be opened.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// The file is neither a PDF nor a supported raster image.
    #[error("unsupported input: {0}")]
    UnsupportedInput(String),

    /// Page number outside of the document.
    #[error("invalid page number {page} (document has {count} pages)")]
    InvalidPage { page: u32, count: u32 },

    /// Building the output document failed.
    #[error("failed to compose document: {0}")]
    Compose(String),

    /// Thumbnail generation failed.
    #[error("failed to render thumbnail: {0}")]
    Thumbnail(String),
}

/// Errors related to workspaces and their page arrangement.
#[derive(Error, Debug)]
pub enum WorkspaceError {
    /// The workspace items have not been loaded yet.
    #[error("workspace {0:?} is not ready, items are still loading")]
    NotReady(String),

    /// Workspace ids must be non-empty `[A-Za-z0-9_-]` strings.
    #[error("invalid workspace id: {0:?}")]
    InvalidId(String),

    /// A position does not exist in the item list.
    #[error("position {position} is out of range (workspace has {len} items)")]
    PositionOutOfRange { position: usize, len: usize },

    /// No item with this id exists.
    #[error("no item with id {0:?}")]
    ItemNotFound(String),

    /// An item references a file whose bytes are neither stored nor opened.
    #[error("file {0} is not available")]
    MissingFile(String),

    /// Persisted items reference pages that no stored file provides.
    #[error("failed to restore workspace items: page {page} of file {hash} not found")]
    Reconstruction { hash: String, page: u32 },

    /// The workspace was deleted; the handle can no longer be used.
    #[error("workspace {0:?} has been removed")]
    Removed(String),

    /// Export was requested for an empty page list.
    #[error("there are no pages to export")]
    NothingToExport,
}

/// Result type for the rpdf library.
pub type Result<T> = std::result::Result<T, RpdfError>;
