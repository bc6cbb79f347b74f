//! Page thumbnails.
//!
//! Raster sources are downscaled directly. PDF pages are not rasterized:
//! a page that carries an embedded image (typical for scans) is represented
//! by that image, any other page by a blank sheet with the page's proportions.

use std::io::Cursor;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use image::{DynamicImage, ImageBuffer, ImageFormat, Luma, Rgb, RgbImage};
use lopdf::{Document, Object, ObjectId, Stream};
use tracing::trace;

use super::Result;
use super::decoder::{inherited_attribute, page_size};
use crate::error::DocumentError;

const SHEET_COLOR: Rgb<u8> = Rgb([255, 255, 255]);
const EDGE_COLOR: Rgb<u8> = Rgb([200, 200, 200]);

/// A PNG-encoded page preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    pub width: u32,
    pub height: u32,
    pub png: Vec<u8>,
}

impl Thumbnail {
    /// Downscale an image to fit in a `max_size` square and encode it.
    pub fn from_image(image: &DynamicImage, max_size: u32) -> Result<Self> {
        if max_size == 0 {
            return Err(DocumentError::Thumbnail("size must be positive".to_string()));
        }

        let scaled = if image.width() > max_size || image.height() > max_size {
            image.thumbnail(max_size, max_size)
        } else {
            image.clone()
        };
        let scaled = DynamicImage::ImageRgba8(scaled.to_rgba8());

        let mut png = Vec::new();
        scaled
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| DocumentError::Thumbnail(e.to_string()))?;

        Ok(Self {
            width: scaled.width(),
            height: scaled.height(),
            png,
        })
    }

    /// A blank sheet with the proportions of a `width` x `height` page.
    pub fn blank_page(width: f32, height: f32, max_size: u32) -> Result<Self> {
        if max_size == 0 {
            return Err(DocumentError::Thumbnail("size must be positive".to_string()));
        }

        let scale = max_size as f32 / width.max(height);
        let w = ((width * scale).round() as u32).clamp(1, max_size);
        let h = ((height * scale).round() as u32).clamp(1, max_size);

        let sheet = RgbImage::from_fn(w, h, |x, y| {
            if x == 0 || y == 0 || x == w - 1 || y == h - 1 {
                EDGE_COLOR
            } else {
                SHEET_COLOR
            }
        });

        Self::from_image(&DynamicImage::ImageRgb8(sheet), max_size)
    }

    /// `data:` URL for embedding the thumbnail in HTML.
    pub fn data_url(&self) -> String {
        format!("data:image/png;base64,{}", STANDARD.encode(&self.png))
    }
}

/// Thumbnail of one PDF page.
pub(crate) fn render_pdf_page(doc: &Document, page_id: ObjectId, max_size: u32) -> Result<Thumbnail> {
    match first_page_image(doc, page_id) {
        Some(image) => {
            trace!("Using embedded image of {:?} as thumbnail", page_id);
            Thumbnail::from_image(&image, max_size)
        }
        None => {
            let (width, height) = page_size(doc, page_id);
            Thumbnail::blank_page(width, height, max_size)
        }
    }
}

/// First decodable image XObject in the page's (possibly inherited) resources.
fn first_page_image(doc: &Document, page_id: ObjectId) -> Option<DynamicImage> {
    let resources = inherited_attribute(doc, page_id, b"Resources")?;
    let (_, resources) = doc.dereference(&resources).ok()?;
    let xobjects = resources.as_dict().ok()?.get(b"XObject").ok()?;
    let (_, xobjects) = doc.dereference(xobjects).ok()?;

    xobjects.as_dict().ok()?.iter().find_map(|(_, obj)| {
        let (_, obj) = doc.dereference(obj).ok()?;
        match obj {
            Object::Stream(stream) => decode_image_xobject(doc, stream),
            _ => None,
        }
    })
}

fn decode_image_xobject(doc: &Document, stream: &Stream) -> Option<DynamicImage> {
    let dict = &stream.dict;
    if dict.get(b"Subtype").ok()?.as_name().ok()? != b"Image" {
        return None;
    }

    let width = dict.get(b"Width").ok()?.as_i64().ok()? as u32;
    let height = dict.get(b"Height").ok()?.as_i64().ok()? as u32;

    let filter = dict.get(b"Filter").ok().and_then(|f| match f {
        Object::Name(name) => Some(name.as_slice()),
        Object::Array(filters) => filters.last().and_then(|o| o.as_name().ok()),
        _ => None,
    });

    match filter {
        Some(b"DCTDecode") => {
            return image::load_from_memory_with_format(&stream.content, ImageFormat::Jpeg).ok();
        }
        Some(b"JPXDecode") | Some(b"CCITTFaxDecode") | Some(b"JBIG2Decode") => {
            trace!("Skipping image with unsupported filter {:?}", filter);
            return None;
        }
        _ => {}
    }

    let bits = dict
        .get(b"BitsPerComponent")
        .ok()
        .and_then(|b| b.as_i64().ok())
        .unwrap_or(8);
    if bits != 8 {
        return None;
    }

    let color_space = dict.get(b"ColorSpace").ok().and_then(|cs| {
        let (_, cs) = doc.dereference(cs).ok()?;
        match cs {
            Object::Name(name) => Some(name.clone()),
            Object::Array(parts) => parts.first().and_then(|o| o.as_name().ok()).map(<[u8]>::to_vec),
            _ => None,
        }
    })?;

    let data = stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone());
    let pixels = (width as usize) * (height as usize);

    match color_space.as_slice() {
        b"DeviceRGB" if data.len() >= pixels * 3 => {
            ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, data[..pixels * 3].to_vec())
                .map(DynamicImage::ImageRgb8)
        }
        b"DeviceGray" if data.len() >= pixels => {
            ImageBuffer::<Luma<u8>, _>::from_raw(width, height, data[..pixels].to_vec())
                .map(DynamicImage::ImageLuma8)
        }
        _ => None,
    }
}
