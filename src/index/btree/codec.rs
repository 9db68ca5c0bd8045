//! Node Codec: on-disk layout of index header pages, node pages and free
//! pages.
//!
//! All integers are little-endian. Every page written here carries a CRC32
//! in its [`PageHeader`], verified on decode.
//!
//! # Index header (page 0)
//! ```text
//! Offset  Size  Field
//! 0       5     PageHeader (IndexHeader)
//! 5       4     magic
//! 9       4     page_count
//! 13      4     root page id (INVALID = empty tree)
//! 17      4     height
//! 21      4     num_attrs
//! 25      4     attr_type
//! 29      4     max_keys
//! 33      4     free list head
//! ```
//!
//! # Node page
//! ```text
//! 0       5     PageHeader (BTreeInternal | BTreeLeaf)
//! 5       4     key_count
//! 9       4     parent
//! 13      4     left sibling
//! 17      4     right sibling
//! 21      ...   slots
//!   internal: (child u32 ‖ key i32 × num_attrs) × key_count, then last child u32
//!   leaf:     (rid page u32 ‖ rid slot u32 ‖ key i32 × num_attrs) × key_count
//! ```
//!
//! # Free page
//! ```text
//! 0       5     PageHeader (Free)
//! 5       4     next free page
//! ```

use crate::common::config::{MIN_FANOUT, PAGE_SIZE};
use crate::common::{Error, PageId, Result, Rid};
use crate::index::key::{AttrType, Key};
use crate::storage::page::{Page, PageHeader, PageType};

use super::node::{NodeKind, Payload, TreeNode};

const MAGIC: u32 = u32::from_le_bytes(*b"BPIX");

const OFFSET_MAGIC: usize = PageHeader::SIZE;
const OFFSET_PAGE_COUNT: usize = OFFSET_MAGIC + 4;
const OFFSET_ROOT: usize = OFFSET_PAGE_COUNT + 4;
const OFFSET_HEIGHT: usize = OFFSET_ROOT + 4;
const OFFSET_NUM_ATTRS: usize = OFFSET_HEIGHT + 4;
const OFFSET_ATTR_TYPE: usize = OFFSET_NUM_ATTRS + 4;
const OFFSET_MAX_KEYS: usize = OFFSET_ATTR_TYPE + 4;
const OFFSET_FREE_HEAD: usize = OFFSET_MAX_KEYS + 4;

const OFFSET_KEY_COUNT: usize = PageHeader::SIZE;
const OFFSET_PARENT: usize = OFFSET_KEY_COUNT + 4;
const OFFSET_LEFT: usize = OFFSET_PARENT + 4;
const OFFSET_RIGHT: usize = OFFSET_LEFT + 4;
/// Start of the slot array in a node page.
pub const OFFSET_SLOTS: usize = OFFSET_RIGHT + 4;

const OFFSET_NEXT_FREE: usize = PageHeader::SIZE;

/// Bytes per leaf slot: RID then key.
pub fn leaf_stride(num_attrs: usize) -> usize {
    8 + 4 * num_attrs
}

/// Bytes per internal slot: child then key.
pub fn internal_stride(num_attrs: usize) -> usize {
    4 + 4 * num_attrs
}

/// Largest order whose nodes fit in one page.
///
/// Leaf slots are the wider ones, so they decide; internal nodes also need
/// room for their trailing child, which the leaf bound already leaves.
pub fn max_keys_for(num_attrs: usize) -> usize {
    (PAGE_SIZE - OFFSET_SLOTS - 4) / leaf_stride(num_attrs)
}

/// Metadata stored in page 0 of every index file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexHeader {
    /// Pages in the file, header page included.
    pub page_count: u32,
    pub root: PageId,
    /// Levels from root to leaf; 0 for an empty tree.
    pub height: u32,
    pub num_attrs: usize,
    pub attr_type: AttrType,
    /// Order of the tree (`MAX_KEYS`).
    pub max_keys: usize,
    /// First page of the free list.
    pub free_head: PageId,
}

impl IndexHeader {
    /// Header of a freshly created, empty index.
    pub fn new(num_attrs: usize, attr_type: AttrType, max_keys: usize) -> Self {
        Self {
            page_count: 1,
            root: PageId::INVALID,
            height: 0,
            num_attrs,
            attr_type,
            max_keys,
            free_head: PageId::INVALID,
        }
    }

    pub fn encode(&self, page: &mut Page) {
        page.reset();
        page.set_header(&PageHeader::new(PageType::IndexHeader));
        page.put_u32(OFFSET_MAGIC, MAGIC);
        page.put_u32(OFFSET_PAGE_COUNT, self.page_count);
        page.put_u32(OFFSET_ROOT, self.root.0);
        page.put_u32(OFFSET_HEIGHT, self.height);
        page.put_u32(OFFSET_NUM_ATTRS, self.num_attrs as u32);
        page.put_u32(OFFSET_ATTR_TYPE, u32::from(self.attr_type.to_u8()));
        page.put_u32(OFFSET_MAX_KEYS, self.max_keys as u32);
        page.put_u32(OFFSET_FREE_HEAD, self.free_head.0);
        page.update_checksum();
    }

    pub fn decode(page: &Page) -> Result<Self> {
        const HEADER_PAGE: u32 = 0;
        verify(HEADER_PAGE, page, &[PageType::IndexHeader])?;

        if page.get_u32(OFFSET_MAGIC) != MAGIC {
            return Err(Error::corrupted(HEADER_PAGE, "not an index file"));
        }
        let attr_type = u8::try_from(page.get_u32(OFFSET_ATTR_TYPE))
            .ok()
            .and_then(AttrType::from_u8)
            .ok_or_else(|| Error::corrupted(HEADER_PAGE, "unknown attribute type"))?;

        let header = Self {
            page_count: page.get_u32(OFFSET_PAGE_COUNT),
            root: PageId::new(page.get_u32(OFFSET_ROOT)),
            height: page.get_u32(OFFSET_HEIGHT),
            num_attrs: page.get_u32(OFFSET_NUM_ATTRS) as usize,
            attr_type,
            max_keys: page.get_u32(OFFSET_MAX_KEYS) as usize,
            free_head: PageId::new(page.get_u32(OFFSET_FREE_HEAD)),
        };

        if header.num_attrs == 0 || header.num_attrs * 4 > PAGE_SIZE {
            return Err(Error::corrupted(HEADER_PAGE, "key geometry does not fit a page"));
        }
        let limit = max_keys_for(header.num_attrs);
        if !(MIN_FANOUT..=limit).contains(&header.max_keys) {
            return Err(Error::corrupted(
                HEADER_PAGE,
                format!("order {} outside {MIN_FANOUT}..={limit}", header.max_keys),
            ));
        }
        Ok(header)
    }
}

/// Serialize a node into `page`.
///
/// # Panics
/// Panics if the node does not fit, which only an over-full node that
/// skipped its split can cause.
pub fn encode_node(node: &TreeNode, num_attrs: usize, page: &mut Page) {
    let count = node.len();
    assert!(
        count <= max_keys_for(num_attrs),
        "{} holds {} keys, more than a page can store",
        node.page_id,
        count
    );

    page.reset();
    let page_type = match node.kind() {
        NodeKind::Internal => PageType::BTreeInternal,
        NodeKind::Leaf => PageType::BTreeLeaf,
    };
    page.set_header(&PageHeader::new(page_type));
    page.put_u32(OFFSET_KEY_COUNT, count as u32);
    page.put_u32(OFFSET_PARENT, node.parent.0);
    page.put_u32(OFFSET_LEFT, node.left.0);
    page.put_u32(OFFSET_RIGHT, node.right.0);

    match &node.payload {
        Payload::Children(children) => {
            let stride = internal_stride(num_attrs);
            for (i, key) in node.keys.iter().enumerate() {
                let slot = OFFSET_SLOTS + i * stride;
                page.put_u32(slot, children[i].0);
                put_key(page, slot + 4, key);
            }
            page.put_u32(OFFSET_SLOTS + count * stride, children[count].0);
        }
        Payload::Rids(rids) => {
            let stride = leaf_stride(num_attrs);
            for (i, (key, rid)) in node.keys.iter().zip(rids).enumerate() {
                let slot = OFFSET_SLOTS + i * stride;
                page.put_u32(slot, rid.page_id.0);
                page.put_u32(slot + 4, rid.slot_id);
                put_key(page, slot + 8, key);
            }
        }
    }

    page.update_checksum();
}

/// Deserialize the node stored in `page`.
pub fn decode_node(page_id: PageId, page: &Page, num_attrs: usize) -> Result<TreeNode> {
    let page_type = verify(page_id.0, page, &[PageType::BTreeInternal, PageType::BTreeLeaf])?;

    let count = page.get_u32(OFFSET_KEY_COUNT) as usize;
    if count > max_keys_for(num_attrs) {
        return Err(Error::corrupted(page_id.0, format!("key count {count} overflows page")));
    }

    let mut keys = Vec::with_capacity(count + 1);
    let payload = if page_type == PageType::BTreeInternal {
        let stride = internal_stride(num_attrs);
        let mut children = Vec::with_capacity(count + 2);
        for i in 0..count {
            let slot = OFFSET_SLOTS + i * stride;
            children.push(PageId::new(page.get_u32(slot)));
            keys.push(get_key(page, slot + 4, num_attrs));
        }
        children.push(PageId::new(page.get_u32(OFFSET_SLOTS + count * stride)));
        Payload::Children(children)
    } else {
        let stride = leaf_stride(num_attrs);
        let mut rids = Vec::with_capacity(count + 1);
        for i in 0..count {
            let slot = OFFSET_SLOTS + i * stride;
            rids.push(Rid::new(PageId::new(page.get_u32(slot)), page.get_u32(slot + 4)));
            keys.push(get_key(page, slot + 8, num_attrs));
        }
        Payload::Rids(rids)
    };

    Ok(TreeNode {
        page_id,
        parent: PageId::new(page.get_u32(OFFSET_PARENT)),
        left: PageId::new(page.get_u32(OFFSET_LEFT)),
        right: PageId::new(page.get_u32(OFFSET_RIGHT)),
        keys,
        payload,
    })
}

/// Turn `page` into a free-list entry pointing at `next`.
pub fn encode_free_page(next: PageId, page: &mut Page) {
    page.reset();
    page.set_header(&PageHeader::new(PageType::Free));
    page.put_u32(OFFSET_NEXT_FREE, next.0);
    page.update_checksum();
}

/// Successor of a free-list entry.
pub fn decode_free_page(page_id: PageId, page: &Page) -> Result<PageId> {
    verify(page_id.0, page, &[PageType::Free])?;
    Ok(PageId::new(page.get_u32(OFFSET_NEXT_FREE)))
}

fn verify(page_id: u32, page: &Page, expected: &[PageType]) -> Result<PageType> {
    if !page.verify_checksum() {
        return Err(Error::corrupted(page_id, "checksum mismatch"));
    }
    let page_type = page.header().page_type;
    if !expected.contains(&page_type) {
        return Err(Error::corrupted(
            page_id,
            format!("unexpected page type {page_type:?}"),
        ));
    }
    Ok(page_type)
}

fn put_key(page: &mut Page, offset: usize, key: &Key) {
    for (i, &value) in key.values().iter().enumerate() {
        page.put_i32(offset + 4 * i, value);
    }
}

fn get_key(page: &Page, offset: usize, num_attrs: usize) -> Key {
    Key::new((0..num_attrs).map(|i| page.get_i32(offset + 4 * i)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_leaf() -> TreeNode {
        let mut node = TreeNode::new(PageId::new(3), NodeKind::Leaf);
        node.parent = PageId::new(1);
        node.right = PageId::new(4);
        node.insert_entry(0, Key::from([-5, 7]), Rid::new(PageId::new(10), 2));
        node.insert_entry(1, Key::from([8, i32::MAX]), Rid::new(PageId::new(11), 0));
        node
    }

    #[test]
    fn test_max_keys_fits_page() {
        for num_attrs in [1, 2, 5, 32] {
            let m = max_keys_for(num_attrs);
            assert!(OFFSET_SLOTS + m * leaf_stride(num_attrs) <= PAGE_SIZE);
            assert!(OFFSET_SLOTS + m * internal_stride(num_attrs) + 4 <= PAGE_SIZE);
            assert!(OFFSET_SLOTS + (m + 1) * leaf_stride(num_attrs) + 4 > PAGE_SIZE);
        }
    }

    #[test]
    fn test_leaf_layout() {
        let node = sample_leaf();
        let mut page = Page::new();
        encode_node(&node, 2, &mut page);

        assert_eq!(page.header().page_type, PageType::BTreeLeaf);
        assert_eq!(page.get_u32(OFFSET_KEY_COUNT), 2);
        assert_eq!(page.get_u32(OFFSET_LEFT), u32::MAX);
        // Second slot: rid page, rid slot, then the key.
        let slot = OFFSET_SLOTS + leaf_stride(2);
        assert_eq!(page.get_u32(slot), 11);
        assert_eq!(page.get_i32(slot + 12), i32::MAX);

        assert_eq!(decode_node(PageId::new(3), &page, 2).unwrap(), node);
    }

    #[test]
    fn test_internal_node_keeps_trailing_child() {
        let mut node = TreeNode::new(PageId::new(6), NodeKind::Internal);
        node.children_mut().push(PageId::new(20));
        node.insert_separator(0, Key::from([50]), PageId::new(21));
        node.insert_separator(1, Key::from([90]), PageId::new(22));

        let mut page = Page::new();
        encode_node(&node, 1, &mut page);
        let decoded = decode_node(PageId::new(6), &page, 1).unwrap();

        assert_eq!(decoded.children(), node.children());
        assert_eq!(decoded.keys, node.keys);
        assert!(!decoded.parent.is_valid());
    }

    #[test]
    fn test_decode_rejects_corruption() {
        let mut page = Page::new();
        encode_node(&sample_leaf(), 2, &mut page);
        page.put_u32(OFFSET_SLOTS, 12345);

        assert!(matches!(
            decode_node(PageId::new(3), &page, 2),
            Err(Error::Corrupted { page_id: 3, .. })
        ));
    }

    #[test]
    fn test_decode_rejects_wrong_page_type() {
        let mut page = Page::new();
        encode_free_page(PageId::INVALID, &mut page);

        assert!(decode_node(PageId::new(2), &page, 1).is_err());
        assert_eq!(decode_free_page(PageId::new(2), &page).unwrap(), PageId::INVALID);
        assert!(IndexHeader::decode(&page).is_err());
    }

    #[test]
    fn test_index_header() {
        let mut header = IndexHeader::new(3, AttrType::Int, 4);
        header.root = PageId::new(5);
        header.height = 2;
        header.page_count = 9;
        header.free_head = PageId::new(7);

        let mut page = Page::new();
        header.encode(&mut page);
        assert_eq!(IndexHeader::decode(&page).unwrap(), header);

        // A zeroed page is not an index header.
        assert!(IndexHeader::decode(&Page::new()).is_err());
    }

    #[test]
    fn test_index_header_rejects_out_of_range_order() {
        let limit = max_keys_for(1);
        for max_keys in [0, 1, MIN_FANOUT - 1, limit + 1] {
            let mut page = Page::new();
            IndexHeader::new(1, AttrType::Int, max_keys).encode(&mut page);
            assert!(
                matches!(IndexHeader::decode(&page), Err(Error::Corrupted { page_id: 0, .. })),
                "order {max_keys} was accepted"
            );
        }

        for max_keys in [MIN_FANOUT, limit] {
            let mut page = Page::new();
            IndexHeader::new(1, AttrType::Int, max_keys).encode(&mut page);
            assert_eq!(IndexHeader::decode(&page).unwrap().max_keys, max_keys);
        }
    }
}
