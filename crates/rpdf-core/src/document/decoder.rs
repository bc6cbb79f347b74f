//! Opening uploaded files as page sources.
//!
//! PDFs are parsed with lopdf. Raster images are decoded with `image` and
//! wrapped into a single-page PDF so that every source can be composed the
//! same way.

use std::fmt;

use image::{ColorType, DynamicImage, GenericImageView, ImageFormat};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};
use tracing::{debug, warn};

use super::thumbnail::{self, Thumbnail};
use super::{Result, SUPPORTED_IMAGE_FORMATS};
use crate::error::DocumentError;
use crate::models::item::{PageItem, PageRef};
use crate::store::{ContentHash, SourceFile};

/// Page size used when a page has no usable MediaBox (US Letter, points).
const DEFAULT_PAGE_SIZE: (f32, f32) = (612.0, 792.0);

/// Guard against cyclic page trees.
const MAX_TREE_DEPTH: usize = 32;

/// PDF readers accept the header anywhere in the first KiB.
const PDF_HEADER_WINDOW: usize = 1024;

/// Kind of an uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Pdf,
    Image(ImageFormat),
}

impl SourceKind {
    /// Sniff the kind of a file from its content.
    pub fn detect(data: &[u8]) -> Result<Self> {
        let window = &data[..data.len().min(PDF_HEADER_WINDOW)];
        if window.windows(5).any(|w| w == b"%PDF-") {
            return Ok(SourceKind::Pdf);
        }

        match image::guess_format(data) {
            Ok(format) if SUPPORTED_IMAGE_FORMATS.contains(&format) => Ok(SourceKind::Image(format)),
            Ok(format) => Err(DocumentError::UnsupportedInput(format!(
                "{:?} images are not supported",
                format
            ))),
            Err(_) => Err(DocumentError::UnsupportedInput(
                "not a PDF or a supported image".to_string(),
            )),
        }
    }
}

/// An opened source file, ready for thumbnails and composition.
#[derive(Clone)]
pub struct SourceDocument {
    hash: ContentHash,
    file: SourceFile,
    kind: SourceKind,
    pdf: Document,
    raster: Option<DynamicImage>,
}

impl fmt::Debug for SourceDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceDocument")
            .field("hash", &self.hash)
            .field("name", &self.file.name)
            .field("kind", &self.kind)
            .field("pages", &self.page_count())
            .finish()
    }
}

impl SourceDocument {
    /// Decode a file into a page source.
    pub fn open(file: SourceFile) -> Result<Self> {
        let hash = file.hash();
        let kind = SourceKind::detect(&file.data)?;

        let (pdf, raster) = match kind {
            SourceKind::Pdf => (load_pdf(&file.data)?, None),
            SourceKind::Image(format) => {
                let image = image::load_from_memory_with_format(&file.data, format)
                    .map_err(|e| DocumentError::UnsupportedInput(e.to_string()))?;
                (image_to_pdf(&image, &file.data, format), Some(image))
            }
        };

        let doc = Self {
            hash,
            file,
            kind,
            pdf,
            raster,
        };
        debug!(
            "Opened {} ({:?}, {} pages) as {}",
            doc.file.name,
            doc.kind,
            doc.page_count(),
            doc.hash.short()
        );
        Ok(doc)
    }

    pub fn hash(&self) -> &ContentHash {
        &self.hash
    }

    pub fn name(&self) -> &str {
        &self.file.name
    }

    pub fn file(&self) -> &SourceFile {
        &self.file
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    /// Number of pages in the document.
    pub fn page_count(&self) -> u32 {
        self.pdf.get_pages().len() as u32
    }

    pub(crate) fn pdf(&self) -> &Document {
        &self.pdf
    }

    /// Object id of a 1-indexed page.
    pub(crate) fn page_id(&self, page: u32) -> Result<ObjectId> {
        self.pdf
            .get_pages()
            .get(&page)
            .copied()
            .ok_or(DocumentError::InvalidPage {
                page,
                count: self.page_count(),
            })
    }

    /// Page size in points, rotation applied.
    pub fn page_size(&self, page: u32) -> Result<(f32, f32)> {
        let page_id = self.page_id(page)?;
        Ok(page_size(&self.pdf, page_id))
    }

    /// Render a thumbnail no larger than `max_size` pixels on either side.
    pub fn thumbnail(&self, page: u32, max_size: u32) -> Result<Thumbnail> {
        let page_id = self.page_id(page)?;
        match &self.raster {
            Some(image) => Thumbnail::from_image(image, max_size),
            None => thumbnail::render_pdf_page(&self.pdf, page_id, max_size),
        }
    }

    /// One unselected item per page, in document order.
    ///
    /// A page whose thumbnail fails to render gets no thumbnail.
    pub fn pages(&self, max_size: u32) -> Vec<PageItem> {
        (1..=self.page_count())
            .map(|page| {
                let thumbnail = match self.thumbnail(page, max_size) {
                    Ok(thumbnail) => Some(thumbnail),
                    Err(e) => {
                        warn!("No thumbnail for page {} of {}: {}", page, self.file.name, e);
                        None
                    }
                };
                PageItem::new(PageRef::new(self.hash.clone(), page), &self.file.name, thumbnail)
            })
            .collect()
    }
}

fn load_pdf(data: &[u8]) -> Result<Document> {
    let mut doc = Document::load_mem(data).map_err(|e| DocumentError::Parse(e.to_string()))?;

    // Documents protected only by an owner password open with an empty user password
    if doc.is_encrypted() {
        if doc.decrypt("").is_err() {
            return Err(DocumentError::Encrypted);
        }
        debug!("Decrypted PDF with empty password");
    }

    if doc.get_pages().is_empty() {
        return Err(DocumentError::NoPages);
    }

    Ok(doc)
}

/// Wrap a raster image into a one-page PDF, one point per pixel.
fn image_to_pdf(image: &DynamicImage, raw: &[u8], format: ImageFormat) -> Document {
    let (width, height) = image.dimensions();

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let image_dict = |color_space: &str| {
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => color_space,
            "BitsPerComponent" => 8,
        }
    };

    // JPEG data can be embedded as is, everything else becomes raw RGB
    let image_stream = match (format, image.color()) {
        (ImageFormat::Jpeg, ColorType::Rgb8) | (ImageFormat::Jpeg, ColorType::L8) => {
            let color_space = if image.color() == ColorType::L8 {
                "DeviceGray"
            } else {
                "DeviceRGB"
            };
            let mut dict = image_dict(color_space);
            dict.set("Filter", "DCTDecode");
            Stream::new(dict, raw.to_vec())
        }
        _ => Stream::new(image_dict("DeviceRGB"), image.to_rgb8().into_raw()),
    };
    let image_id = doc.add_object(image_stream);

    let content = format!("q\n{} 0 0 {} 0 0 cm\n/Im0 Do\nQ\n", width, height);
    let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(width as i64),
            Object::Integer(height as i64),
        ],
        "Contents" => content_id,
        "Resources" => dictionary! {
            "XObject" => dictionary! { "Im0" => image_id },
        },
    });

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => 1,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    doc
}

/// Look up a page attribute, following the page tree for inheritable keys.
pub(crate) fn inherited_attribute(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut node_id = page_id;

    for _ in 0..MAX_TREE_DEPTH {
        let dict = doc.get_object(node_id).ok()?.as_dict().ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(value.clone());
        }
        node_id = dict.get(b"Parent").ok()?.as_reference().ok()?;
    }

    None
}

/// Page size in points from the MediaBox, swapped for quarter rotations.
pub(crate) fn page_size(doc: &Document, page_id: ObjectId) -> (f32, f32) {
    let size = inherited_attribute(doc, page_id, b"MediaBox")
        .and_then(|media_box| {
            let (_, media_box) = doc.dereference(&media_box).ok()?;
            let values: Vec<f32> = media_box
                .as_array()
                .ok()?
                .iter()
                .filter_map(|v| v.as_float().ok())
                .collect();
            match values.as_slice() {
                [x0, y0, x1, y1] => Some(((x1 - x0).abs(), (y1 - y0).abs())),
                _ => None,
            }
        })
        .filter(|(w, h)| *w > 0.0 && *h > 0.0)
        .unwrap_or(DEFAULT_PAGE_SIZE);

    let rotate = inherited_attribute(doc, page_id, b"Rotate")
        .and_then(|r| r.as_i64().ok())
        .unwrap_or(0);

    if rotate.rem_euclid(180) == 90 {
        (size.1, size.0)
    } else {
        size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{sample_jpeg, sample_pdf, sample_png};

    #[test]
    fn test_detect_kinds() {
        assert_eq!(SourceKind::detect(&sample_pdf(1)).unwrap(), SourceKind::Pdf);
        assert_eq!(
            SourceKind::detect(&sample_png(4, 4)).unwrap(),
            SourceKind::Image(ImageFormat::Png)
        );
        assert!(matches!(
            SourceKind::detect(b"just some text"),
            Err(DocumentError::UnsupportedInput(_))
        ));
    }

    #[test]
    fn test_open_pdf() {
        let doc = SourceDocument::open(SourceFile::new("three.pdf", sample_pdf(3))).unwrap();

        assert_eq!(doc.kind(), SourceKind::Pdf);
        assert_eq!(doc.page_count(), 3);
        assert_eq!(doc.name(), "three.pdf");
        assert_eq!(doc.hash(), &ContentHash::of(&sample_pdf(3)));
        assert_eq!(doc.page_size(1).unwrap(), (200.0, 300.0));
    }

    #[test]
    fn test_open_garbage_pdf() {
        let result = SourceDocument::open(SourceFile::new("bad.pdf", b"%PDF-1.5\nnope".to_vec()));
        assert!(matches!(result, Err(DocumentError::Parse(_))));
    }

    #[test]
    fn test_open_image_as_single_page() {
        let doc = SourceDocument::open(SourceFile::new("photo.png", sample_png(40, 20))).unwrap();

        assert_eq!(doc.kind(), SourceKind::Image(ImageFormat::Png));
        assert_eq!(doc.page_count(), 1);
        assert_eq!(doc.page_size(1).unwrap(), (40.0, 20.0));
    }

    #[test]
    fn test_jpeg_is_embedded_as_dct() {
        let doc = SourceDocument::open(SourceFile::new("photo.jpg", sample_jpeg(16, 16))).unwrap();

        let has_dct = doc.pdf().objects.values().any(|obj| {
            obj.as_stream()
                .ok()
                .and_then(|s| s.dict.get(b"Filter").ok())
                .and_then(|f| f.as_name().ok())
                == Some(b"DCTDecode".as_slice())
        });
        assert!(has_dct);
    }

    #[test]
    fn test_invalid_page() {
        let doc = SourceDocument::open(SourceFile::new("two.pdf", sample_pdf(2))).unwrap();

        assert!(matches!(
            doc.thumbnail(3, 100),
            Err(DocumentError::InvalidPage { page: 3, count: 2 })
        ));
        assert!(matches!(doc.page_id(0), Err(DocumentError::InvalidPage { .. })));
    }

    #[test]
    fn test_pages_items() {
        let doc = SourceDocument::open(SourceFile::new("three.pdf", sample_pdf(3))).unwrap();
        let items = doc.pages(64);

        assert_eq!(items.len(), 3);
        for (i, item) in items.iter().enumerate() {
            assert_eq!(item.page.page, i as u32 + 1);
            assert_eq!(&item.page.hash, doc.hash());
            assert!(item.thumbnail.is_some());
        }
        assert_eq!(items[1].title, "three.pdf ⋅ 2");
    }

    #[test]
    fn test_inherited_media_box() {
        // sample_pdf puts the MediaBox on the Pages node only
        let doc = SourceDocument::open(SourceFile::new("three.pdf", sample_pdf(3))).unwrap();
        let page_id = doc.page_id(2).unwrap();

        let page = doc.pdf().get_object(page_id).unwrap().as_dict().unwrap();
        assert!(page.get(b"MediaBox").is_err());
        assert!(inherited_attribute(doc.pdf(), page_id, b"MediaBox").is_some());
    }
}
