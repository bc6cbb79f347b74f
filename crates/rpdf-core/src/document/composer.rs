//! Recomposing pages of several source documents into one PDF.

use std::collections::{BTreeMap, HashMap, HashSet};

use lopdf::{Document, Object, ObjectId, dictionary};
use tracing::{debug, info};

use super::decoder::inherited_attribute;
use super::{Result, SourceDocument};
use crate::error::DocumentError;
use crate::store::ContentHash;

/// Attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: &[&[u8]] = &[b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Build a document from `(source, page)` pairs, in order.
///
/// A page listed more than once is copied as often as it is listed.
pub fn compose(pages: &[(&SourceDocument, u32)]) -> Result<Document> {
    if pages.is_empty() {
        return Err(DocumentError::Compose("no pages to compose".to_string()));
    }

    let mut out = Document::with_version("1.5");
    let pages_root_id = out.new_object_id();

    let mut page_maps: HashMap<&ContentHash, BTreeMap<u32, ObjectId>> = HashMap::new();
    for (source, _) in pages {
        if page_maps.contains_key(source.hash()) {
            continue;
        }
        let page_map = import_source(&mut out, source)?;
        page_maps.insert(source.hash(), page_map);
    }

    let mut used: HashSet<ObjectId> = HashSet::new();
    let mut kids = Vec::with_capacity(pages.len());

    for (source, page) in pages {
        let page_id = page_maps
            .get(source.hash())
            .and_then(|map| map.get(page))
            .copied()
            .ok_or(DocumentError::InvalidPage {
                page: *page,
                count: source.page_count(),
            })?;

        let page_id = if used.insert(page_id) {
            page_id
        } else {
            let copy = out
                .get_object(page_id)
                .map_err(|e| DocumentError::Compose(e.to_string()))?
                .clone();
            out.add_object(copy)
        };

        out.get_object_mut(page_id)
            .and_then(Object::as_dict_mut)
            .map_err(|e| DocumentError::Compose(e.to_string()))?
            .set("Parent", pages_root_id);
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    out.objects.insert(
        pages_root_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );

    let catalog_id = out.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_root_id,
    });
    out.trailer.set("Root", catalog_id);

    let pruned = out.prune_objects();
    out.renumber_objects();
    out.compress();

    debug!("Composed {} pages, pruned {} unused objects", count, pruned.len());
    Ok(out)
}

/// Compose and serialize to PDF bytes.
pub fn compose_to_bytes(pages: &[(&SourceDocument, u32)]) -> Result<Vec<u8>> {
    let mut doc = compose(pages)?;
    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| DocumentError::Compose(e.to_string()))?;

    info!("Exported {} pages ({} bytes)", pages.len(), bytes.len());
    Ok(bytes)
}

/// Copy every object of a source into `out`, returning its page numbers
/// mapped to their new object ids.
fn import_source(out: &mut Document, source: &SourceDocument) -> Result<BTreeMap<u32, ObjectId>> {
    let mut doc = source.pdf().clone();
    flatten_inherited(&mut doc);

    doc.renumber_objects_with(out.max_id + 1);
    out.max_id = doc.max_id;

    let page_map = doc.get_pages();
    out.objects.extend(doc.objects);

    debug!("Imported {} pages of {}", page_map.len(), source.name());
    Ok(page_map)
}

/// Copy inherited attributes onto each page so pages can be re-parented.
fn flatten_inherited(doc: &mut Document) {
    let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();

    for page_id in page_ids {
        let inherited: Vec<(&[u8], Object)> = INHERITABLE
            .iter()
            .filter_map(|key| inherited_attribute(doc, page_id, key).map(|value| (*key, value)))
            .collect();

        if let Ok(page) = doc.get_object_mut(page_id).and_then(Object::as_dict_mut) {
            for (key, value) in inherited {
                if !page.has(key) {
                    page.set(key.to_vec(), value);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::decoder::page_size;
    use crate::store::SourceFile;
    use crate::test_support::{sample_pdf_with_label, sample_png};
    use pretty_assertions::assert_eq;

    fn open(name: &str, data: Vec<u8>) -> SourceDocument {
        SourceDocument::open(SourceFile::new(name, data)).unwrap()
    }

    /// Text drawn on each page of a composed document, in page order.
    fn page_labels(doc: &Document) -> Vec<String> {
        doc.get_pages()
            .into_values()
            .map(|page_id| {
                let content = doc.get_page_content(page_id).unwrap();
                let text = String::from_utf8_lossy(&content).to_string();
                let start = text.find('(').unwrap() + 1;
                let end = text.find(')').unwrap();
                text[start..end].to_string()
            })
            .collect()
    }

    #[test]
    fn test_compose_keeps_requested_order() {
        let source = open("abc.pdf", sample_pdf_with_label("P", 3));

        let doc = compose(&[(&source, 2), (&source, 3), (&source, 1)]).unwrap();

        assert_eq!(page_labels(&doc), vec!["P 2", "P 3", "P 1"]);
    }

    #[test]
    fn test_compose_interleaves_sources() {
        let a = open("a.pdf", sample_pdf_with_label("A", 2));
        let b = open("b.pdf", sample_pdf_with_label("B", 2));

        let doc = compose(&[(&a, 1), (&b, 2), (&a, 2), (&b, 1)]).unwrap();

        assert_eq!(page_labels(&doc), vec!["A 1", "B 2", "A 2", "B 1"]);
    }

    #[test]
    fn test_compose_duplicates_pages() {
        let source = open("a.pdf", sample_pdf_with_label("A", 2));

        let doc = compose(&[(&source, 1), (&source, 1), (&source, 2)]).unwrap();

        assert_eq!(page_labels(&doc), vec!["A 1", "A 1", "A 2"]);
        let ids: HashSet<ObjectId> = doc.get_pages().into_values().collect();
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn test_compose_flattens_inherited_attributes() {
        let source = open("a.pdf", sample_pdf_with_label("A", 2));
        let doc = compose(&[(&source, 2)]).unwrap();

        let page_id = doc.get_pages()[&1];
        let page = doc.get_object(page_id).unwrap().as_dict().unwrap();
        assert!(page.has(b"MediaBox"));
        assert!(page.has(b"Resources"));
        assert_eq!(page_size(&doc, page_id), (200.0, 300.0));
    }

    #[test]
    fn test_compose_mixes_images_and_pdfs() {
        let pdf = open("a.pdf", sample_pdf_with_label("A", 1));
        let png = open("photo.png", sample_png(30, 10));

        let bytes = compose_to_bytes(&[(&png, 1), (&pdf, 1)]).unwrap();
        let reopened = open("out.pdf", bytes);

        assert_eq!(reopened.page_count(), 2);
        assert_eq!(reopened.page_size(1).unwrap(), (30.0, 10.0));
        assert_eq!(reopened.page_size(2).unwrap(), (200.0, 300.0));
    }

    #[test]
    fn test_compose_drops_unused_pages() {
        let source = open("a.pdf", sample_pdf_with_label("A", 3));

        let bytes = compose_to_bytes(&[(&source, 3)]).unwrap();
        let reopened = open("out.pdf", bytes);

        assert_eq!(reopened.page_count(), 1);
        assert_eq!(page_labels(reopened.pdf()), vec!["A 3"]);
    }

    #[test]
    fn test_compose_invalid_page() {
        let source = open("a.pdf", sample_pdf_with_label("A", 2));

        let result = compose(&[(&source, 1), (&source, 5)]);
        assert!(matches!(
            result,
            Err(DocumentError::InvalidPage { page: 5, count: 2 })
        ));
    }

    #[test]
    fn test_compose_empty() {
        assert!(matches!(compose(&[]), Err(DocumentError::Compose(_))));
    }
}
