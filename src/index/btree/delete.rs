//! Deletion and underflow repair: borrowing, merging and root collapse.

use std::mem;

use tracing::{debug, warn};

use crate::common::{PageId, Result, Rid};
use crate::index::key::Key;

use super::arena::NodeRef;
use super::handle::IndexHandle;
use super::node::Payload;

impl IndexHandle {
    /// Remove the entry matching both `key` and `rid`.
    ///
    /// Returns `false`, and leaves the tree untouched, when no such entry
    /// exists. With duplicate pairs only the first one goes.
    pub fn delete_entry(&mut self, key: &Key, rid: Rid) -> Result<bool> {
        self.check_arity(key)?;

        let Some((leaf, slot)) = self.locate_entry(key, rid)? else {
            warn!(index = %self.name(), %key, %rid, "delete of missing entry");
            self.nodes.evict_overflow();
            return Ok(false);
        };

        self.nodes[leaf].remove_entry(slot);
        self.repair(leaf)?;
        self.persist()?;
        Ok(true)
    }

    /// Find `(key, rid)` by scanning the run of equal keys, which may span
    /// several leaves.
    fn locate_entry(&mut self, key: &Key, rid: Rid) -> Result<Option<(NodeRef, usize)>> {
        if !self.root().is_valid() {
            return Ok(None);
        }

        let (mut leaf, mut slot) = self.seek(key)?;
        loop {
            let node = &self.nodes[leaf];
            if slot == node.len() {
                let right = node.right;
                if !right.is_valid() {
                    return Ok(None);
                }
                leaf = self.load(right)?;
                slot = 0;
                continue;
            }
            if node.keys[slot] != *key {
                return Ok(None);
            }
            if node.rids()[slot] == rid {
                return Ok(Some((leaf, slot)));
            }
            slot += 1;
        }
    }

    /// Restore the fanout bounds from `node` up towards the root.
    fn repair(&mut self, mut node: NodeRef) -> Result<()> {
        loop {
            let n = &self.nodes[node];
            if !n.parent.is_valid() {
                if !n.is_leaf() && n.is_empty() {
                    self.collapse_root(node)?;
                }
                return Ok(());
            }
            if n.len() >= self.min_keys() {
                return Ok(());
            }

            let (node_id, parent_id) = (n.page_id, n.parent);
            let parent = self.load(parent_id)?;
            let idx = self.child_slot(parent, node_id);

            if self.borrow_from_right(node, parent, idx)? || self.borrow_from_left(node, parent, idx)? {
                return Ok(());
            }
            self.merge(node, parent, idx)?;
            node = parent;
        }
    }

    /// Take the first entry of the right sibling. `idx` is `node`'s slot
    /// in `parent`.
    fn borrow_from_right(&mut self, node: NodeRef, parent: NodeRef, idx: usize) -> Result<bool> {
        let Some(&sibling_id) = self.nodes[parent].children().get(idx + 1) else {
            return Ok(false);
        };
        let sibling = self.load(sibling_id)?;
        if self.nodes[sibling].len() <= self.min_keys() {
            return Ok(false);
        }

        if self.nodes[node].is_leaf() {
            let (key, rid) = self.nodes[sibling].remove_entry(0);
            let len = self.nodes[node].len();
            self.nodes[node].insert_entry(len, key, rid);
            let boundary = self.nodes[sibling].keys[0].clone();
            self.nodes[parent].keys[idx] = boundary;
        } else {
            let (up, child) = self.nodes[sibling].remove_separator(0, 0);
            let down = mem::replace(&mut self.nodes[parent].keys[idx], up);
            let n = &mut self.nodes[node];
            n.keys.push(down);
            n.children_mut().push(child);
            let node_id = n.page_id;
            self.adopt(node_id, &[child])?;
        }

        debug!(
            node = %self.nodes[node].page_id,
            sibling = %sibling_id,
            "borrowed from right sibling"
        );
        Ok(true)
    }

    /// Take the last entry of the left sibling.
    fn borrow_from_left(&mut self, node: NodeRef, parent: NodeRef, idx: usize) -> Result<bool> {
        if idx == 0 {
            return Ok(false);
        }
        let sibling_id = self.nodes[parent].children()[idx - 1];
        let sibling = self.load(sibling_id)?;
        if self.nodes[sibling].len() <= self.min_keys() {
            return Ok(false);
        }

        let last = self.nodes[sibling].len() - 1;
        if self.nodes[node].is_leaf() {
            let (key, rid) = self.nodes[sibling].remove_entry(last);
            self.nodes[parent].keys[idx - 1] = key.clone();
            self.nodes[node].insert_entry(0, key, rid);
        } else {
            let (up, child) = self.nodes[sibling].remove_separator(last, last + 1);
            let down = mem::replace(&mut self.nodes[parent].keys[idx - 1], up);
            let n = &mut self.nodes[node];
            n.keys.insert(0, down);
            n.children_mut().insert(0, child);
            let node_id = n.page_id;
            self.adopt(node_id, &[child])?;
        }

        debug!(
            node = %self.nodes[node].page_id,
            sibling = %sibling_id,
            "borrowed from left sibling"
        );
        Ok(true)
    }

    /// Fold `node` into its right sibling, or its left one when it is the
    /// last child, and drop the separator between them from `parent`.
    ///
    /// # Panics
    /// Panics if `parent` has no other child, or the sibling is of the
    /// other node kind.
    fn merge(&mut self, node: NodeRef, parent: NodeRef, idx: usize) -> Result<()> {
        let child_count = self.nodes[parent].children().len();
        let (sibling_idx, sep_idx, into_right) = if idx + 1 < child_count {
            (idx + 1, idx, true)
        } else if idx > 0 {
            (idx - 1, idx - 1, false)
        } else {
            panic!(
                "{} underflowed with no sibling under {}",
                self.nodes[node].page_id, self.nodes[parent].page_id
            );
        };

        let sibling_id = self.nodes[parent].children()[sibling_idx];
        let sibling = self.load(sibling_id)?;
        assert_eq!(
            self.nodes[node].kind(),
            self.nodes[sibling].kind(),
            "cannot merge {} into {}",
            self.nodes[node].page_id,
            sibling_id
        );

        let separator = self.nodes[parent].keys[sep_idx].clone();
        let victim = self.release_node(node)?;
        let victim_id = victim.page_id;
        let (left, right) = (victim.left, victim.right);

        let s = &mut self.nodes[sibling];
        let mut moved = Vec::new();
        match victim.payload {
            Payload::Rids(mut rids) => {
                let mut keys = victim.keys;
                if into_right {
                    keys.append(&mut s.keys);
                    rids.append(s.rids_mut());
                    s.keys = keys;
                    *s.rids_mut() = rids;
                } else {
                    s.keys.append(&mut keys);
                    s.rids_mut().append(&mut rids);
                }
            }
            Payload::Children(mut children) => {
                moved.clone_from(&children);
                let mut keys = victim.keys;
                if into_right {
                    keys.push(separator);
                    keys.append(&mut s.keys);
                    children.append(s.children_mut());
                    s.keys = keys;
                    *s.children_mut() = children;
                } else {
                    s.keys.push(separator);
                    s.keys.append(&mut keys);
                    s.children_mut().append(&mut children);
                }
            }
        }
        self.adopt(sibling_id, &moved)?;

        if left.is_valid() {
            let left = self.load(left)?;
            self.nodes[left].right = right;
        }
        if right.is_valid() {
            let right = self.load(right)?;
            self.nodes[right].left = left;
        }

        self.nodes[parent].remove_separator(sep_idx, idx);
        debug!(node = %victim_id, into = %sibling_id, "merged node");
        Ok(())
    }

    /// Replace an internal root left with no keys by its only child.
    fn collapse_root(&mut self, root: NodeRef) -> Result<()> {
        let old_root = self.release_node(root)?;
        let new_root_id = old_root.children()[0];
        let new_root = self.load(new_root_id)?;
        self.nodes[new_root].parent = PageId::INVALID;

        let height = self.height() - 1;
        self.set_root(new_root_id, height);
        debug!(old_root = %old_root.page_id, new_root = %new_root_id, height, "collapsed root");
        Ok(())
    }
}
