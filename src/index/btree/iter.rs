//! Forward scans over the leaf chain.

use crate::common::{PageId, Result, Rid};
use crate::index::key::Key;

use super::handle::IndexHandle;

/// Iterator over `(Key, Rid)` entries in key order.
///
/// Follows right-sibling links from leaf to leaf, so the handle stays
/// mutably borrowed for as long as the scan runs. An I/O or decoding
/// error is yielded once and ends the scan.
pub struct IndexIter<'a> {
    handle: &'a mut IndexHandle,
    page: PageId,
    slot: usize,
}

impl IndexHandle {
    /// Scan the whole index.
    pub fn iter(&mut self) -> Result<IndexIter<'_>> {
        let page = self.leftmost_leaf()?;
        Ok(IndexIter {
            handle: self,
            page,
            slot: 0,
        })
    }

    /// Scan from the first entry whose key is `>= key`.
    pub fn iter_from(&mut self, key: &Key) -> Result<IndexIter<'_>> {
        let start = self.search(key)?;
        Ok(IndexIter {
            handle: self,
            page: start.page_id,
            slot: start.slot,
        })
    }
}

impl Iterator for IndexIter<'_> {
    type Item = Result<(Key, Rid)>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.page.is_valid() {
            let leaf = match self.handle.load(self.page) {
                Ok(leaf) => leaf,
                Err(e) => {
                    self.page = PageId::INVALID;
                    return Some(Err(e));
                }
            };

            let node = &self.handle.nodes[leaf];
            if self.slot < node.len() {
                let entry = (node.keys[self.slot].clone(), node.rids()[self.slot]);
                self.slot += 1;
                return Some(Ok(entry));
            }

            self.page = node.right;
            self.slot = 0;
            self.handle.nodes.evict_overflow();
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use crate::index::btree::test_util::{key, open_index, rid};
    use crate::Key;

    fn keys_of(entries: impl Iterator<Item = crate::Result<(Key, crate::Rid)>>) -> Vec<i32> {
        entries.map(|e| e.unwrap().0.values()[0]).collect()
    }

    #[test]
    fn test_iter_on_empty_index() {
        let (_dir, mut index) = open_index(1, 4);
        assert_eq!(index.iter().unwrap().count(), 0);
        assert_eq!(index.iter_from(&key(3)).unwrap().count(), 0);
    }

    #[test]
    fn test_full_scan_is_sorted() {
        let (_dir, mut index) = open_index(1, 4);
        for k in [9, 3, 7, 1, 5, 8, 2, 6, 4, 0] {
            index.insert_entry(&key(k), rid(k)).unwrap();
        }

        assert_eq!(keys_of(index.iter().unwrap()), (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_iter_from_crosses_leaves() {
        let (_dir, mut index) = open_index(1, 4);
        for k in (0..40).step_by(2) {
            index.insert_entry(&key(k), rid(k)).unwrap();
        }

        assert_eq!(
            keys_of(index.iter_from(&key(31)).unwrap()),
            vec![32, 34, 36, 38]
        );
        assert_eq!(keys_of(index.iter_from(&key(12)).unwrap().take(3)), vec![12, 14, 16]);
        assert_eq!(index.iter_from(&key(99)).unwrap().count(), 0);
    }

    #[test]
    fn test_scan_survives_tight_node_cache() {
        let (_dir, mut index) = crate::index::btree::test_util::open_index_with(
            1,
            4,
            crate::IndexConfig::default().with_node_cache_capacity(2),
        );
        for k in 0..100 {
            index.insert_entry(&key(k), rid(k)).unwrap();
        }

        assert_eq!(keys_of(index.iter().unwrap()), (0..100).collect::<Vec<_>>());
        assert!(index.cached_nodes() <= 2);
    }
}
