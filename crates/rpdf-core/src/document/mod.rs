//! Document processing: decoding uploads, thumbnails and recomposition.

mod composer;
mod decoder;
mod thumbnail;

pub use composer::{compose, compose_to_bytes};
pub use decoder::{SourceDocument, SourceKind};
pub use thumbnail::Thumbnail;

use crate::error::DocumentError;

/// Result type for document operations.
pub type Result<T> = std::result::Result<T, DocumentError>;

/// Raster formats accepted as single-page documents.
pub const SUPPORTED_IMAGE_FORMATS: &[image::ImageFormat] = &[
    image::ImageFormat::Png,
    image::ImageFormat::Jpeg,
    image::ImageFormat::Gif,
    image::ImageFormat::WebP,
    image::ImageFormat::Bmp,
    image::ImageFormat::Tiff,
];
