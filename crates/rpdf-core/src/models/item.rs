//! Workspace item models: persisted compact items and expanded page items.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::document::Thumbnail;
use crate::store::ContentHash;

/// Reference to one page of a stored file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageRef {
    /// Content hash of the source file.
    pub hash: ContentHash,
    /// Page number (1-indexed).
    pub page: u32,
}

impl PageRef {
    pub fn new(hash: ContentHash, page: u32) -> Self {
        Self { hash, page }
    }

    /// Base item id for this page, `<hash>-<page>`.
    pub fn base_id(&self) -> String {
        format!("{}-{}", self.hash, self.page)
    }
}

/// Minimal persisted form of a workspace item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompactItem {
    pub selected: bool,
    pub file_hash: ContentHash,
    pub page_number: u32,
    /// Position in the arrangement.
    pub dnd_index: usize,
}

impl CompactItem {
    pub fn page_ref(&self) -> PageRef {
        PageRef::new(self.file_hash.clone(), self.page_number)
    }
}

/// A page as shown in the arrangement grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageItem {
    /// Unique id within one arrangement.
    pub id: String,
    /// Human readable title, `<file name> ⋅ <page>`.
    pub title: String,
    /// Rendered thumbnail, regenerated on every load.
    #[serde(skip)]
    pub thumbnail: Option<Thumbnail>,
    pub selected: bool,
    pub page: PageRef,
}

impl PageItem {
    /// Create an unselected item for a page of the named file.
    pub fn new(page: PageRef, file_name: &str, thumbnail: Option<Thumbnail>) -> Self {
        Self {
            id: page.base_id(),
            title: format!("{} ⋅ {}", file_name, page.page),
            thumbnail,
            selected: false,
            page,
        }
    }

    /// Compact form of this item at the given position.
    pub fn to_compact(&self, position: usize) -> CompactItem {
        CompactItem {
            selected: self.selected,
            file_hash: self.page.hash.clone(),
            page_number: self.page.page,
            dnd_index: position,
        }
    }
}

/// Give every item a canonical id.
///
/// The first occurrence of a page keeps `<hash>-<page>`, later occurrences of
/// the same page get `<hash>-<page>~<k>` with `k` counting from 2.
pub fn assign_ids(items: &mut [PageItem]) {
    let mut seen: HashMap<PageRef, usize> = HashMap::new();

    for item in items.iter_mut() {
        let count = seen.entry(item.page.clone()).or_insert(0);
        *count += 1;

        item.id = if *count == 1 {
            item.page.base_id()
        } else {
            format!("{}~{}", item.page.base_id(), count)
        };
    }
}

/// Distinct file hashes of an item list, in first-appearance order.
pub fn hash_list(items: &[PageItem]) -> Vec<ContentHash> {
    let mut hashes: Vec<ContentHash> = Vec::new();
    for item in items {
        if !hashes.contains(&item.page.hash) {
            hashes.push(item.page.hash.clone());
        }
    }
    hashes
}

/// Persisted workspace metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceInfo {
    /// Display name.
    pub name: String,
    /// File name used when exporting.
    pub export_file_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(hash: &ContentHash, page: u32) -> PageItem {
        PageItem::new(PageRef::new(hash.clone(), page), "scan.pdf", None)
    }

    #[test]
    fn test_page_item_id_and_title() {
        let hash = ContentHash::of(b"file");
        let item = item(&hash, 3);

        assert_eq!(item.id, format!("{}-3", hash));
        assert_eq!(item.title, "scan.pdf ⋅ 3");
        assert!(!item.selected);
    }

    #[test]
    fn test_assign_ids_disambiguates_repeats() {
        let hash = ContentHash::of(b"file");
        let mut items = vec![item(&hash, 1), item(&hash, 2), item(&hash, 1), item(&hash, 1)];

        assign_ids(&mut items);

        assert_eq!(items[0].id, format!("{}-1", hash));
        assert_eq!(items[1].id, format!("{}-2", hash));
        assert_eq!(items[2].id, format!("{}-1~2", hash));
        assert_eq!(items[3].id, format!("{}-1~3", hash));
    }

    #[test]
    fn test_hash_list_is_distinct_in_order() {
        let a = ContentHash::of(b"a");
        let b = ContentHash::of(b"b");
        let items = vec![item(&b, 1), item(&a, 1), item(&b, 2)];

        assert_eq!(hash_list(&items), vec![b, a]);
    }

    #[test]
    fn test_compact_item_wire_format() {
        let hash = ContentHash::of(b"a");
        let mut page = item(&hash, 2);
        page.selected = true;

        let json = serde_json::to_value(page.to_compact(4)).unwrap();

        assert_eq!(json["selected"], true);
        assert_eq!(json["fileHash"], hash.as_str());
        assert_eq!(json["pageNumber"], 2);
        assert_eq!(json["dndIndex"], 4);
    }
}
