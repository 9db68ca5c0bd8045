//! Tree Node: the decoded content of one B+Tree page.

use crate::common::{PageId, Rid};
use crate::index::key::Key;

/// Which half of the tree a node belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Internal,
    Leaf,
}

/// What a node stores alongside its keys.
///
/// `Children` always has one more entry than the node has keys; `Rids` is
/// index-aligned with the keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Children(Vec<PageId>),
    Rids(Vec<Rid>),
}

/// One B+Tree node.
///
/// Child `i` of an internal node holds keys between `keys[i-1]` and
/// `keys[i]` (both bounds inclusive, since runs of duplicates may straddle
/// a split). Sibling links chain every node of a level left to right.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    pub page_id: PageId,
    pub parent: PageId,
    pub left: PageId,
    pub right: PageId,
    pub keys: Vec<Key>,
    pub payload: Payload,
}

impl TreeNode {
    /// An empty, unlinked node.
    pub fn new(page_id: PageId, kind: NodeKind) -> Self {
        let payload = match kind {
            NodeKind::Leaf => Payload::Rids(Vec::new()),
            NodeKind::Internal => Payload::Children(Vec::new()),
        };
        Self {
            page_id,
            parent: PageId::INVALID,
            left: PageId::INVALID,
            right: PageId::INVALID,
            keys: Vec::new(),
            payload,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self.payload {
            Payload::Children(_) => NodeKind::Internal,
            Payload::Rids(_) => NodeKind::Leaf,
        }
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        matches!(self.payload, Payload::Rids(_))
    }

    /// Key count.
    #[inline]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// # Panics
    /// Panics on a leaf.
    pub fn children(&self) -> &[PageId] {
        match &self.payload {
            Payload::Children(children) => children,
            Payload::Rids(_) => panic!("{} is a leaf and has no children", self.page_id),
        }
    }

    /// # Panics
    /// Panics on a leaf.
    pub fn children_mut(&mut self) -> &mut Vec<PageId> {
        match &mut self.payload {
            Payload::Children(children) => children,
            Payload::Rids(_) => panic!("{} is a leaf and has no children", self.page_id),
        }
    }

    /// # Panics
    /// Panics on an internal node.
    pub fn rids(&self) -> &[Rid] {
        match &self.payload {
            Payload::Rids(rids) => rids,
            Payload::Children(_) => panic!("{} is internal and has no rids", self.page_id),
        }
    }

    /// # Panics
    /// Panics on an internal node.
    pub fn rids_mut(&mut self) -> &mut Vec<Rid> {
        match &mut self.payload {
            Payload::Rids(rids) => rids,
            Payload::Children(_) => panic!("{} is internal and has no rids", self.page_id),
        }
    }

    /// First index whose key is `>= key`, and whether that key equals `key`.
    pub fn lower_bound(&self, key: &Key) -> (usize, bool) {
        let pos = self.keys.partition_point(|k| k < key);
        (pos, self.keys.get(pos) == Some(key))
    }

    /// First index whose key is `> key`, and whether the key before it
    /// equals `key`.
    pub fn upper_bound(&self, key: &Key) -> (usize, bool) {
        let pos = self.keys.partition_point(|k| k <= key);
        (pos, pos > 0 && self.keys[pos - 1] == *key)
    }

    /// Child slot whose subtree takes `key` on insertion: child 0 covers
    /// everything below `keys[0]`, child `i` starts at `keys[i-1]`.
    pub fn find_child_for_key(&self, key: &Key) -> usize {
        debug_assert!(!self.is_leaf());
        self.upper_bound(key).0
    }

    /// Slot of `child` among this node's children.
    pub fn child_index(&self, child: PageId) -> Option<usize> {
        self.children().iter().position(|&c| c == child)
    }

    pub fn insert_entry(&mut self, pos: usize, key: Key, rid: Rid) {
        self.keys.insert(pos, key);
        self.rids_mut().insert(pos, rid);
    }

    pub fn remove_entry(&mut self, pos: usize) -> (Key, Rid) {
        let key = self.keys.remove(pos);
        (key, self.rids_mut().remove(pos))
    }

    /// Insert `key` at `pos` with `child` as the subtree to its right.
    pub fn insert_separator(&mut self, pos: usize, key: Key, child: PageId) {
        self.keys.insert(pos, key);
        self.children_mut().insert(pos + 1, child);
    }

    /// Remove the separator at `key_pos` and the child at `child_pos`.
    pub fn remove_separator(&mut self, key_pos: usize, child_pos: usize) -> (Key, PageId) {
        let key = self.keys.remove(key_pos);
        (key, self.children_mut().remove(child_pos))
    }
}
