//! Whole-tree structural checks.

use crate::common::{Error, PageId, Result};
use crate::index::key::Key;

use super::handle::IndexHandle;

/// Summary of a tree that passed [`IndexHandle::validate`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeShape {
    pub height: u32,
    pub internal_nodes: usize,
    pub leaves: usize,
    pub entries: usize,
}

/// A node still to visit, with the key range its parent allows it.
struct Pending {
    page_id: PageId,
    parent: PageId,
    low: Option<Key>,
    high: Option<Key>,
}

impl IndexHandle {
    /// Walk the tree level by level and check every structural invariant:
    /// fanout bounds, child counts, parent pointers, sibling chains,
    /// separator bounds, key order and uniform leaf depth.
    ///
    /// Violations are reported as [`Error::Corrupted`] naming the
    /// offending page.
    pub fn validate(&mut self) -> Result<TreeShape> {
        let mut shape = TreeShape::default();
        let root = self.root();
        if !root.is_valid() {
            if self.height() != 0 {
                return Err(Error::corrupted(0, "empty tree with nonzero height"));
            }
            return Ok(shape);
        }

        let (min, max) = (self.min_keys(), self.max_keys());
        let mut level = vec![Pending {
            page_id: root,
            parent: PageId::INVALID,
            low: None,
            high: None,
        }];
        let mut last_leaf_key: Option<Key> = None;

        while !level.is_empty() {
            shape.height += 1;
            let mut next = Vec::new();
            let mut previous = PageId::INVALID;

            for (i, pending) in level.iter().enumerate() {
                let node = self.load(pending.page_id)?;
                let n = &self.nodes[node];
                let fail = |reason: String| Error::corrupted(n.page_id.0, reason);

                if n.parent != pending.parent {
                    return Err(fail(format!("parent is {}, expected {}", n.parent, pending.parent)));
                }
                if n.left != previous {
                    return Err(fail(format!("left sibling is {}, expected {}", n.left, previous)));
                }
                let expected_right = level.get(i + 1).map_or(PageId::INVALID, |p| p.page_id);
                if n.right != expected_right {
                    return Err(fail(format!("right sibling is {}, expected {}", n.right, expected_right)));
                }

                let is_root = !pending.parent.is_valid();
                if n.len() > max || (!is_root && n.len() < min) {
                    return Err(fail(format!("holds {} keys, bounds are {min}..={max}", n.len())));
                }
                if n.keys.windows(2).any(|w| w[0] > w[1]) {
                    return Err(fail("keys out of order".to_string()));
                }
                let below = pending.low.as_ref().is_some_and(|low| n.keys.first() < Some(low));
                let above = pending.high.as_ref().is_some_and(|high| n.keys.last() > Some(high));
                if below || above {
                    return Err(fail("keys outside the parent's separator bounds".to_string()));
                }

                if n.is_leaf() {
                    if let (Some(last), Some(first)) = (&last_leaf_key, n.keys.first()) {
                        if first < last {
                            return Err(fail("leaf chain out of order".to_string()));
                        }
                    }
                    if let Some(last) = n.keys.last() {
                        last_leaf_key = Some(last.clone());
                    }
                    shape.leaves += 1;
                    shape.entries += n.len();
                } else {
                    let children = n.children();
                    if children.len() != n.len() + 1 {
                        return Err(fail(format!(
                            "{} children for {} keys",
                            children.len(),
                            n.len()
                        )));
                    }
                    for (slot, &child) in children.iter().enumerate() {
                        next.push(Pending {
                            page_id: child,
                            parent: n.page_id,
                            low: if slot == 0 { pending.low.clone() } else { Some(n.keys[slot - 1].clone()) },
                            high: n.keys.get(slot).cloned().or_else(|| pending.high.clone()),
                        });
                    }
                    shape.internal_nodes += 1;
                }
                previous = n.page_id;
            }

            // A level mixing leaves and internal nodes means uneven depth.
            let leaves_here = shape.leaves > 0;
            if leaves_here && !next.is_empty() {
                return Err(Error::corrupted(
                    next[0].parent.0,
                    "leaves and internal nodes share a level",
                ));
            }
            level = next;
            self.nodes.evict_overflow();
        }

        if shape.height != self.height() {
            return Err(Error::corrupted(
                0,
                format!("header height {} but tree has {} levels", self.height(), shape.height),
            ));
        }
        Ok(shape)
    }
}
