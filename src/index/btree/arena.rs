//! Node arena: the decoded nodes an index handle is working with.
//!
//! Nodes are owned by the arena and addressed by [`NodeRef`] slot numbers,
//! so an algorithm can hold references to a node, its parent and its
//! siblings at once and mutate them one at a time. Slots never move or get
//! evicted during an operation; [`NodeArena::evict_overflow`] runs between
//! operations and drops clean nodes, least recently used first, until the
//! arena is back within capacity.

use std::collections::HashMap;
use std::ops::{Index, IndexMut};

use crate::buffer::CacheStats;
use crate::common::PageId;

use super::node::TreeNode;

/// Slot number of a node in a [`NodeArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeRef(usize);

struct Slot {
    node: TreeNode,
    dirty: bool,
    last_used: u64,
}

pub struct NodeArena {
    slots: Vec<Option<Slot>>,
    by_page: HashMap<PageId, NodeRef>,
    vacant: Vec<usize>,
    tick: u64,
    capacity: usize,
    stats: CacheStats,
}

impl NodeArena {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Vec::new(),
            by_page: HashMap::new(),
            vacant: Vec::new(),
            tick: 0,
            capacity,
            stats: CacheStats::new(),
        }
    }

    /// Find a resident node, marking it most recently used.
    pub fn lookup(&mut self, page_id: PageId) -> Option<NodeRef> {
        let Some(&node) = self.by_page.get(&page_id) else {
            self.stats.record_miss();
            return None;
        };
        self.tick += 1;
        self.slot_mut(node).last_used = self.tick;
        self.stats.record_hit();
        Some(node)
    }

    /// Take ownership of a node. A `dirty` node stays resident until it is
    /// written back and [marked clean](Self::mark_clean).
    ///
    /// # Panics
    /// Panics if a node for the same page is already resident.
    pub fn insert(&mut self, node: TreeNode, dirty: bool) -> NodeRef {
        let page_id = node.page_id;
        assert!(
            !self.by_page.contains_key(&page_id),
            "{page_id} is already resident"
        );

        self.tick += 1;
        let slot = Slot {
            node,
            dirty,
            last_used: self.tick,
        };
        let node_ref = match self.vacant.pop() {
            Some(i) => {
                self.slots[i] = Some(slot);
                NodeRef(i)
            }
            None => {
                self.slots.push(Some(slot));
                NodeRef(self.slots.len() - 1)
            }
        };
        if !dirty {
            self.stats.record_read();
        }
        self.by_page.insert(page_id, node_ref);
        node_ref
    }

    /// Drop a node without writing it back (its page is being freed).
    pub fn remove(&mut self, node: NodeRef) -> TreeNode {
        let slot = self.slots[node.0]
            .take()
            .unwrap_or_else(|| panic!("node slot {} is vacant", node.0));
        self.by_page.remove(&slot.node.page_id);
        self.vacant.push(node.0);
        slot.node
    }

    /// Nodes modified since they were last marked clean.
    pub fn dirty(&self) -> Vec<NodeRef> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.as_ref().is_some_and(|s| s.dirty))
            .map(|(i, _)| NodeRef(i))
            .collect()
    }

    /// Record that `node` has been written back.
    pub fn mark_clean(&mut self, node: NodeRef) {
        self.slot_mut(node).dirty = false;
        self.stats.record_write();
    }

    /// Evict clean nodes, least recently used first, down to capacity.
    /// Returns how many were evicted.
    pub fn evict_overflow(&mut self) -> usize {
        let excess = self.len().saturating_sub(self.capacity);
        if excess == 0 {
            return 0;
        }

        let mut clean: Vec<(u64, usize)> = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().filter(|s| !s.dirty).map(|s| (s.last_used, i)))
            .collect();
        clean.sort_unstable();

        let mut evicted = 0;
        for (_, i) in clean.into_iter().take(excess) {
            self.remove(NodeRef(i));
            self.stats.record_eviction();
            evicted += 1;
        }
        evicted
    }

    /// Number of resident nodes.
    pub fn len(&self) -> usize {
        self.by_page.len()
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    fn slot_mut(&mut self, node: NodeRef) -> &mut Slot {
        self.slots[node.0]
            .as_mut()
            .unwrap_or_else(|| panic!("node slot {} is vacant", node.0))
    }
}

impl Index<NodeRef> for NodeArena {
    type Output = TreeNode;

    fn index(&self, node: NodeRef) -> &TreeNode {
        match &self.slots[node.0] {
            Some(slot) => &slot.node,
            None => panic!("node slot {} is vacant", node.0),
        }
    }
}

/// Mutable access marks the node dirty.
impl IndexMut<NodeRef> for NodeArena {
    fn index_mut(&mut self, node: NodeRef) -> &mut TreeNode {
        let slot = self.slot_mut(node);
        slot.dirty = true;
        &mut slot.node
    }
}
