//! Index Handle: an open B+Tree and the plumbing its algorithms share.
//!
//! Nodes are loaded from the buffer pool into the handle's [`NodeArena`],
//! mutated there, and written back through the codec when a mutation
//! completes. Search lives here; insertion, deletion, scans and validation
//! live in sibling modules as further `impl IndexHandle` blocks.

use tracing::{error, trace};

use crate::buffer::{BufferPoolManager, CacheStats};
use crate::common::config::IndexConfig;
use crate::common::{Error, PageId, Result, Rid};
use crate::index::key::{AttrType, Key};
use crate::index::manager::Registration;

use super::arena::{NodeArena, NodeRef};
use super::codec::{self, IndexHeader};
use super::node::{NodeKind, TreeNode};

/// Page holding the [`IndexHeader`].
pub(crate) const HEADER_PAGE_ID: PageId = PageId(0);

/// Outcome of [`IndexHandle::search`].
///
/// When `found` is false, `(page_id, slot)` is where the key would be
/// inserted: the first leaf position holding a larger key, or the end of
/// the last leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchResult {
    pub found: bool,
    pub page_id: PageId,
    pub slot: usize,
}

/// An open index.
///
/// Obtained from [`IndexManager::open_index`](crate::index::IndexManager::open_index)
/// and returned through `close_index`. A handle dropped without being
/// closed still flushes (logging any failure) and releases its file.
pub struct IndexHandle {
    file_name: String,
    pool: BufferPoolManager,
    header: IndexHeader,
    header_dirty: bool,
    pub(super) nodes: NodeArena,
    closed: bool,
    _registration: Registration,
}

impl IndexHandle {
    pub(crate) fn open(
        file_name: String,
        pool: BufferPoolManager,
        config: &IndexConfig,
        registration: Registration,
    ) -> Result<Self> {
        let header = {
            let page = pool.fetch_page_read(HEADER_PAGE_ID)?;
            IndexHeader::decode(&page)?
        };

        Ok(Self {
            file_name,
            pool,
            header,
            header_dirty: false,
            nodes: NodeArena::new(config.node_cache_capacity),
            closed: false,
            _registration: registration,
        })
    }

    /// File name of the index, e.g. `orders.0.2`.
    pub fn name(&self) -> &str {
        &self.file_name
    }

    pub fn header(&self) -> &IndexHeader {
        &self.header
    }

    /// Root page, or `PageId::INVALID` for an empty tree.
    pub fn root(&self) -> PageId {
        self.header.root
    }

    /// Levels from root to leaf; 0 for an empty tree.
    pub fn height(&self) -> u32 {
        self.header.height
    }

    pub fn num_attrs(&self) -> usize {
        self.header.num_attrs
    }

    pub fn attr_type(&self) -> AttrType {
        self.header.attr_type
    }

    /// `MAX_KEYS`: the most keys a node may hold at rest.
    pub fn max_keys(&self) -> usize {
        self.header.max_keys
    }

    /// `MIN_KEYS`: the fewest keys a non-root node may hold.
    pub fn min_keys(&self) -> usize {
        self.header.max_keys / 2
    }

    pub fn page_cache_stats(&self) -> &CacheStats {
        self.pool.stats()
    }

    pub fn node_cache_stats(&self) -> &CacheStats {
        self.nodes.stats()
    }

    /// Decoded nodes currently held between operations.
    pub fn cached_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Find the first entry whose key is `>= key`.
    pub fn search(&mut self, key: &Key) -> Result<SearchResult> {
        self.check_arity(key)?;
        if !self.header.root.is_valid() {
            return Ok(SearchResult {
                found: false,
                page_id: PageId::INVALID,
                slot: 0,
            });
        }

        let (leaf, slot) = self.seek(key)?;
        let node = &self.nodes[leaf];
        let result = SearchResult {
            found: node.keys.get(slot) == Some(key),
            page_id: node.page_id,
            slot,
        };
        self.nodes.evict_overflow();
        Ok(result)
    }

    /// RID of the first entry with exactly this key.
    pub fn search_entry(&mut self, key: &Key) -> Result<Option<Rid>> {
        let result = self.search(key)?;
        if !result.found {
            return Ok(None);
        }
        let leaf = self.load(result.page_id)?;
        Ok(Some(self.nodes[leaf].rids()[result.slot]))
    }

    /// First leaf of the sibling chain, or `PageId::INVALID` when empty.
    pub fn leftmost_leaf(&mut self) -> Result<PageId> {
        if !self.header.root.is_valid() {
            return Ok(PageId::INVALID);
        }

        let mut node = self.load(self.header.root)?;
        while !self.nodes[node].is_leaf() {
            let first = self.nodes[node].children()[0];
            node = self.load(first)?;
        }
        let page_id = self.nodes[node].page_id;
        self.nodes.evict_overflow();
        Ok(page_id)
    }

    /// Raw access to any node, for traversals along sibling links.
    pub fn node(&mut self, page_id: PageId) -> Result<&TreeNode> {
        self.nodes.evict_overflow();
        let node = self.load(page_id)?;
        Ok(&self.nodes[node])
    }

    /// Write every pending change to disk and fsync.
    pub fn flush(&mut self) -> Result<()> {
        self.persist()?;
        self.pool.flush_all_pages()
    }

    pub(crate) fn close(mut self) -> Result<()> {
        let result = self.flush();
        self.closed = true;
        result
    }

    pub(super) fn check_arity(&self, key: &Key) -> Result<()> {
        if key.arity() != self.header.num_attrs {
            return Err(Error::KeyArity {
                expected: self.header.num_attrs,
                actual: key.arity(),
            });
        }
        Ok(())
    }

    /// Bring a node into the arena.
    pub(super) fn load(&mut self, page_id: PageId) -> Result<NodeRef> {
        if let Some(node) = self.nodes.lookup(page_id) {
            return Ok(node);
        }

        let node = {
            let page = self.pool.fetch_page_read(page_id)?;
            codec::decode_node(page_id, &page, self.header.num_attrs)?
        };
        Ok(self.nodes.insert(node, false))
    }

    /// Create an empty node on a recycled or freshly allocated page.
    pub(super) fn allocate_node(&mut self, kind: NodeKind) -> Result<NodeRef> {
        let page_id = if self.header.free_head.is_valid() {
            let page_id = self.header.free_head;
            self.header.free_head = {
                let page = self.pool.fetch_page_read(page_id)?;
                codec::decode_free_page(page_id, &page)?
            };
            page_id
        } else {
            let page_id = self.pool.new_page()?.page_id();
            self.header.page_count = self.pool.disk_page_count();
            page_id
        };

        self.header_dirty = true;
        trace!(%page_id, ?kind, "allocated node");
        Ok(self.nodes.insert(TreeNode::new(page_id, kind), true))
    }

    /// Drop a node that left the tree and put its page on the free list.
    pub(super) fn release_node(&mut self, node: NodeRef) -> Result<TreeNode> {
        let node = self.nodes.remove(node);
        let page_id = node.page_id;
        {
            let mut page = self.pool.fetch_page_write(page_id)?;
            codec::encode_free_page(self.header.free_head, &mut page);
        }
        self.header.free_head = page_id;
        self.header_dirty = true;
        trace!(%page_id, "released node");
        Ok(node)
    }

    pub(super) fn set_root(&mut self, root: PageId, height: u32) {
        self.header.root = root;
        self.header.height = height;
        self.header_dirty = true;
    }

    /// Descend to the leaf that takes `key` on insertion.
    pub(super) fn find_leaf(&mut self, key: &Key) -> Result<NodeRef> {
        let mut node = self.load(self.header.root)?;
        while !self.nodes[node].is_leaf() {
            let n = &self.nodes[node];
            let child = n.children()[n.find_child_for_key(key)];
            node = self.load(child)?;
        }
        Ok(node)
    }

    /// Position of the first entry `>= key` in leaf order.
    ///
    /// Descends along `lower_bound`, the leftmost subtree that may hold
    /// `key`, then walks right past leaves holding only smaller keys.
    pub(super) fn seek(&mut self, key: &Key) -> Result<(NodeRef, usize)> {
        let mut node = self.load(self.header.root)?;
        while !self.nodes[node].is_leaf() {
            let n = &self.nodes[node];
            let child = n.children()[n.lower_bound(key).0];
            node = self.load(child)?;
        }

        let mut slot = self.nodes[node].lower_bound(key).0;
        while slot == self.nodes[node].len() && self.nodes[node].right.is_valid() {
            let right = self.nodes[node].right;
            node = self.load(right)?;
            slot = self.nodes[node].lower_bound(key).0;
        }
        Ok((node, slot))
    }

    /// Slot of `child` in `parent`.
    ///
    /// # Panics
    /// Panics if the parent doesn't list the child: the tree is broken.
    pub(super) fn child_slot(&self, parent: NodeRef, child: PageId) -> usize {
        let parent = &self.nodes[parent];
        parent.child_index(child).unwrap_or_else(|| {
            panic!(
                "{} does not list {} among its children",
                parent.page_id, child
            )
        })
    }

    /// Point each of `children` at `parent`.
    pub(super) fn adopt(&mut self, parent: PageId, children: &[PageId]) -> Result<()> {
        for &child in children {
            let child = self.load(child)?;
            self.nodes[child].parent = parent;
        }
        Ok(())
    }

    /// Write back dirty nodes and the header, then trim the arena.
    ///
    /// A node is marked clean only once its page has been written, so a
    /// failure part way leaves the rest dirty for the next attempt.
    pub(super) fn persist(&mut self) -> Result<()> {
        let num_attrs = self.header.num_attrs;
        for node in self.nodes.dirty() {
            {
                let n = &self.nodes[node];
                let mut page = self.pool.fetch_page_write(n.page_id)?;
                codec::encode_node(n, num_attrs, &mut page);
            }
            self.nodes.mark_clean(node);
        }

        if self.header_dirty {
            let mut page = self.pool.fetch_page_write(HEADER_PAGE_ID)?;
            self.header.encode(&mut page);
            self.header_dirty = false;
        }

        let evicted = self.nodes.evict_overflow();
        if evicted > 0 {
            trace!(evicted, resident = self.nodes.len(), "trimmed node cache");
        }
        Ok(())
    }
}

impl Drop for IndexHandle {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(e) = self.flush() {
            error!(index = %self.file_name, error = %e, "failed to flush index on drop");
        }
    }
}
