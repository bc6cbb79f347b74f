//! Fixtures shared by unit tests.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use lopdf::{Dictionary, Document, Object, Stream, dictionary};

/// A PDF with `pages` pages of 200x300 points, each printing its number.
///
/// The MediaBox and font resources live on the Pages node and are inherited.
pub fn sample_pdf(pages: u32) -> Vec<u8> {
    sample_pdf_with_label("Page", pages)
}

/// Like [`sample_pdf`], with a custom label so distinct files hash differently.
pub fn sample_pdf_with_label(label: &str, pages: u32) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let mut kids = Vec::new();
    for number in 1..=pages {
        let content = format!("BT /F1 24 Tf 40 150 Td ({} {}) Tj ET", label, number);
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(200),
                Object::Integer(300),
            ],
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut data = Vec::new();
    doc.save_to(&mut data).expect("sample PDF should serialize");
    data
}

fn sample_image(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 7 % 256) as u8, (y * 13 % 256) as u8, 128])
    }))
}

/// A PNG image with a simple gradient.
pub fn sample_png(width: u32, height: u32) -> Vec<u8> {
    let mut data = Vec::new();
    sample_image(width, height)
        .write_to(&mut Cursor::new(&mut data), ImageFormat::Png)
        .expect("sample PNG should encode");
    data
}

/// A JPEG image with a simple gradient.
pub fn sample_jpeg(width: u32, height: u32) -> Vec<u8> {
    let mut data = Vec::new();
    sample_image(width, height)
        .write_to(&mut Cursor::new(&mut data), ImageFormat::Jpeg)
        .expect("sample JPEG should encode");
    data
}
