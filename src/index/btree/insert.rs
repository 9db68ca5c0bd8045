//! Insertion and node splitting.

use tracing::debug;

use crate::common::{Result, Rid};
use crate::index::key::Key;

use super::arena::NodeRef;
use super::handle::IndexHandle;
use super::node::NodeKind;

impl IndexHandle {
    /// Add `(key, rid)` to the index.
    ///
    /// Duplicate keys are kept, each new entry going after the existing run
    /// of equal keys. Uniqueness is up to the caller.
    pub fn insert_entry(&mut self, key: &Key, rid: Rid) -> Result<()> {
        self.check_arity(key)?;

        if !self.root().is_valid() {
            let root = self.allocate_node(NodeKind::Leaf)?;
            let root_id = self.nodes[root].page_id;
            self.set_root(root_id, 1);
            debug!(root = %root_id, "started tree with a leaf root");
        }

        let leaf = self.find_leaf(key)?;
        let pos = self.nodes[leaf].upper_bound(key).0;
        self.nodes[leaf].insert_entry(pos, key.clone(), rid);

        let mut node = leaf;
        while self.nodes[node].len() > self.max_keys() {
            node = self.split(node)?;
        }

        self.persist()
    }

    /// Split an over-full node in two and hand the separator to its
    /// parent, growing a new root when there is none. Returns the parent,
    /// which may now be over-full itself.
    fn split(&mut self, node: NodeRef) -> Result<NodeRef> {
        let min = self.min_keys();
        let kind = self.nodes[node].kind();
        let sibling = self.allocate_node(kind)?;
        let sibling_id = self.nodes[sibling].page_id;

        let mut keys = self.nodes[node].keys.split_off(min);
        let separator = match kind {
            // The separator is copied: it stays as the sibling's first key.
            NodeKind::Leaf => {
                let rids = self.nodes[node].rids_mut().split_off(min);
                let separator = keys[0].clone();
                let s = &mut self.nodes[sibling];
                s.keys = keys;
                *s.rids_mut() = rids;
                separator
            }
            // The separator moves up and leaves both halves.
            NodeKind::Internal => {
                let separator = keys.remove(0);
                let children = self.nodes[node].children_mut().split_off(min + 1);
                self.adopt(sibling_id, &children)?;
                let s = &mut self.nodes[sibling];
                s.keys = keys;
                *s.children_mut() = children;
                separator
            }
        };

        let node_id = self.nodes[node].page_id;
        let parent_id = self.nodes[node].parent;
        let right = self.nodes[node].right;
        {
            let s = &mut self.nodes[sibling];
            s.parent = parent_id;
            s.left = node_id;
            s.right = right;
        }
        self.nodes[node].right = sibling_id;
        if right.is_valid() {
            let right = self.load(right)?;
            self.nodes[right].left = sibling_id;
        }

        debug!(
            ?kind,
            node = %node_id,
            sibling = %sibling_id,
            separator = %separator,
            "split node"
        );

        if !parent_id.is_valid() {
            let root = self.allocate_node(NodeKind::Internal)?;
            let root_id = self.nodes[root].page_id;
            {
                let r = &mut self.nodes[root];
                r.keys.push(separator);
                r.children_mut().extend([node_id, sibling_id]);
            }
            self.nodes[node].parent = root_id;
            self.nodes[sibling].parent = root_id;

            let height = self.height() + 1;
            self.set_root(root_id, height);
            debug!(root = %root_id, height, "grew new root");
            return Ok(root);
        }

        let parent = self.load(parent_id)?;
        let slot = self.child_slot(parent, node_id);
        self.nodes[parent].insert_separator(slot, separator, sibling_id);
        Ok(parent)
    }
}

#[cfg(test)]
mod tests {
    use crate::index::btree::test_util::{key, open_index, rid};
    use crate::PageId;

    #[test]
    fn test_first_insert_creates_leaf_root() {
        let (_dir, mut index) = open_index(1, 4);
        assert_eq!(index.height(), 0);

        index.insert_entry(&key(7), rid(7)).unwrap();

        assert_eq!(index.height(), 1);
        let root = index.root();
        let node = index.node(root).unwrap();
        assert!(node.is_leaf());
        assert_eq!(node.parent, PageId::INVALID);
        assert_eq!(node.rids(), &[rid(7)]);
    }

    #[test]
    fn test_leaf_split_copies_separator_up() {
        let (_dir, mut index) = open_index(1, 4);
        for k in 1..=5 {
            index.insert_entry(&key(k), rid(k)).unwrap();
        }

        assert_eq!(index.height(), 2);
        let root = index.node(index.root()).unwrap().clone();
        assert!(!root.is_leaf());
        assert_eq!(root.keys, vec![key(3)]);

        let left = index.node(root.children()[0]).unwrap().clone();
        let right = index.node(root.children()[1]).unwrap().clone();
        assert_eq!(left.keys, vec![key(1), key(2)]);
        assert_eq!(right.keys, vec![key(3), key(4), key(5)]);
        assert_eq!(left.right, right.page_id);
        assert_eq!(right.left, left.page_id);
        assert_eq!(left.parent, root.page_id);
        assert_eq!(right.parent, root.page_id);
    }

    #[test]
    fn test_internal_split_pushes_separator_up() {
        let (_dir, mut index) = open_index(1, 4);
        for k in 1..=14 {
            index.insert_entry(&key(k), rid(k)).unwrap();
        }

        assert_eq!(index.height(), 3);
        let root = index.node(index.root()).unwrap().clone();
        assert_eq!(root.len(), 1);
        for &child in root.children() {
            let child = index.node(child).unwrap().clone();
            assert!(!child.is_leaf());
            // A pushed-up separator never stays in the halves.
            assert!(!child.keys.contains(&root.keys[0]));
        }
        index.validate().unwrap();
    }

    #[test]
    fn test_duplicates_append_after_run() {
        let (_dir, mut index) = open_index(1, 4);
        for slot in 0..3 {
            index.insert_entry(&key(5), rid(slot)).unwrap();
        }
        index.insert_entry(&key(4), rid(40)).unwrap();

        let root = index.root();
        let leaf = index.node(root).unwrap();
        assert_eq!(leaf.keys, vec![key(4), key(5), key(5), key(5)]);
        assert_eq!(leaf.rids(), &[rid(40), rid(0), rid(1), rid(2)]);
    }
}
