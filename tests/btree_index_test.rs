//! End-to-end B+Tree behavior through the public index API.

mod common;

use std::fs::OpenOptions;
use std::io::{Seek, SeekFrom, Write};

use common::{key, open, rid, scan_keys, setup};
use minirel::index::btree::codec::IndexHeader;
use minirel::index::{AttrType, IndexManager};
use minirel::{Error, IndexConfig, Key, Page, PageId, PAGE_SIZE};

fn order(max_keys: usize) -> IndexConfig {
    IndexConfig::default().with_max_keys(max_keys)
}

// ============================================================================
// Splits
// ============================================================================

#[test]
fn test_five_inserts_split_the_root() {
    let (_dir, manager) = setup(order(4));
    let mut index = open(&manager);

    for k in 1..=5 {
        index.insert_entry(&key(k), rid(k as u32)).unwrap();
    }

    assert_eq!(index.height(), 2);
    let root = index.node(index.root()).unwrap().clone();
    assert!(!root.is_leaf());
    assert_eq!(root.len(), 1);

    let mut leaves = Vec::new();
    for &child in root.children() {
        let leaf = index.node(child).unwrap().clone();
        assert!(leaf.is_leaf());
        assert!(leaf.len() >= index.min_keys());
        leaves.extend(leaf.keys.iter().map(|k| k.values()[0]));
    }
    assert_eq!(leaves, vec![1, 2, 3, 4, 5]);
    assert_eq!(scan_keys(&mut index), vec![1, 2, 3, 4, 5]);
}

#[test]
fn test_random_order_inserts_keep_invariants() {
    let (_dir, manager) = setup(order(5));
    let mut index = open(&manager);

    // A fixed permutation of 0..500.
    let keys: Vec<i32> = (0..500).map(|i| (i * 173) % 500).collect();
    for (n, &k) in keys.iter().enumerate() {
        index.insert_entry(&key(k), rid(n as u32)).unwrap();
        if n % 50 == 0 {
            index.validate().unwrap();
        }
    }

    let shape = index.validate().unwrap();
    assert_eq!(shape.entries, 500);
    assert_eq!(scan_keys(&mut index), (0..500).collect::<Vec<_>>());
}

// ============================================================================
// Deletes
// ============================================================================

#[test]
fn test_underflow_repair_after_deleting_first_key() {
    let (_dir, manager) = setup(order(4));
    let mut index = open(&manager);
    for k in 1..=5 {
        index.insert_entry(&key(k), rid(k as u32)).unwrap();
    }

    assert!(index.delete_entry(&key(1), rid(1)).unwrap());

    index.validate().unwrap();
    assert_eq!(scan_keys(&mut index), vec![2, 3, 4, 5]);
}

#[test]
fn test_root_collapses_one_level_at_a_time() {
    let (_dir, manager) = setup(order(4));
    let mut index = open(&manager);
    for k in 1..=40 {
        index.insert_entry(&key(k), rid(k as u32)).unwrap();
    }
    let start_height = index.height();
    assert!(start_height >= 3);

    let mut height = start_height;
    for k in 1..40 {
        index.delete_entry(&key(k), rid(k as u32)).unwrap();
        let now = index.height();
        assert!(now == height || now + 1 == height, "height jumped {height} -> {now}");
        if now != height {
            index.validate().unwrap();
        }
        height = now;
    }

    assert_eq!(index.height(), 1);
    let root = index.node(index.root()).unwrap().clone();
    assert!(root.is_leaf());
    assert_eq!(root.keys, vec![key(40)]);
    assert_eq!(index.validate().unwrap().entries, 1);
}

#[test]
fn test_delete_then_reinsert_restores_contents() {
    let (_dir, manager) = setup(order(4));
    let mut index = open(&manager);
    for k in 0..200 {
        index.insert_entry(&key(k), rid(k as u32)).unwrap();
    }

    for k in (0..200).filter(|k| k % 3 != 0) {
        assert!(index.delete_entry(&key(k), rid(k as u32)).unwrap());
    }
    index.validate().unwrap();
    assert_eq!(
        scan_keys(&mut index),
        (0..200).filter(|k| k % 3 == 0).collect::<Vec<_>>()
    );

    for k in (0..200).filter(|k| k % 3 != 0) {
        index.insert_entry(&key(k), rid(k as u32)).unwrap();
    }
    index.validate().unwrap();
    assert_eq!(scan_keys(&mut index), (0..200).collect::<Vec<_>>());
}

#[test]
fn test_freed_pages_are_reused() {
    let (_dir, manager) = setup(order(4));
    let mut index = open(&manager);
    for k in 0..200 {
        index.insert_entry(&key(k), rid(k as u32)).unwrap();
    }
    for k in 10..200 {
        index.delete_entry(&key(k), rid(k as u32)).unwrap();
    }
    let pages = index.header().page_count;
    assert!(index.header().free_head.is_valid());

    for k in 10..30 {
        index.insert_entry(&key(k), rid(k as u32)).unwrap();
    }

    assert_eq!(index.header().page_count, pages);
    index.validate().unwrap();
}

// ============================================================================
// Search
// ============================================================================

#[test]
fn test_search_reports_insertion_point() {
    let (_dir, manager) = setup(order(4));
    let mut index = open(&manager);

    let empty = index.search(&key(1)).unwrap();
    assert!(!empty.found);
    assert_eq!(empty.page_id, PageId::INVALID);

    for k in (0..100).step_by(10) {
        index.insert_entry(&key(k), rid(k as u32)).unwrap();
    }

    for k in 0..100 {
        let result = index.search(&key(k)).unwrap();
        assert_eq!(result.found, k % 10 == 0, "key {k}");
        let leaf = index.node(result.page_id).unwrap();
        match leaf.keys.get(result.slot) {
            Some(found) => assert!(*found >= key(k)),
            None => assert!(k > 90 && !leaf.right.is_valid()),
        }
        let expected = (k % 10 == 0).then(|| rid(k as u32));
        assert_eq!(index.search_entry(&key(k)).unwrap(), expected);
    }
}

#[test]
fn test_duplicate_run_spanning_leaves() {
    let (_dir, manager) = setup(order(4));
    let mut index = open(&manager);
    index.insert_entry(&key(1), rid(1000)).unwrap();
    for n in 0..30 {
        index.insert_entry(&key(5), rid(n)).unwrap();
    }
    index.insert_entry(&key(9), rid(2000)).unwrap();
    index.validate().unwrap();

    assert_eq!(index.search_entry(&key(5)).unwrap(), Some(rid(0)));

    // Odd rids from the back of the run, then even ones from the front.
    for n in (0..30).rev().step_by(2).chain((0..30).step_by(2)) {
        assert!(index.delete_entry(&key(5), rid(n)).unwrap(), "rid {n}");
        index.validate().unwrap();
    }
    assert_eq!(index.search_entry(&key(5)).unwrap(), None);
    assert_eq!(scan_keys(&mut index), vec![1, 9]);
}

#[test]
fn test_iter_from_in_duplicates() {
    let (_dir, manager) = setup(order(3));
    let mut index = open(&manager);
    for k in 0..10 {
        for n in 0..3 {
            index.insert_entry(&key(k), rid((k * 3 + n) as u32)).unwrap();
        }
    }

    let entries: Vec<_> = index
        .iter_from(&key(4))
        .unwrap()
        .take(4)
        .map(|e| e.unwrap())
        .collect();
    assert_eq!(
        entries,
        vec![
            (key(4), rid(12)),
            (key(4), rid(13)),
            (key(4), rid(14)),
            (key(5), rid(15))
        ]
    );
}

#[test]
fn test_composite_keys_order_lexicographically() {
    let dir = tempfile::TempDir::new().unwrap();
    let manager = IndexManager::new(dir.path(), order(4));
    manager.create_index("pairs", &[1, 0], AttrType::Int, 8).unwrap();
    let mut index = manager.open_index("pairs", &[1, 0]).unwrap();

    let mut n = 0;
    for a in (0..5).rev() {
        for b in [3, -1, 7] {
            index.insert_entry(&Key::from([a, b]), rid(n)).unwrap();
            n += 1;
        }
    }

    let keys: Vec<Key> = index.iter().unwrap().map(|e| e.unwrap().0).collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
    assert_eq!(keys.first(), Some(&Key::from([0, -1])));
    assert_eq!(keys.last(), Some(&Key::from([4, 7])));

    assert!(matches!(
        index.insert_entry(&Key::from([1]), rid(0)),
        Err(Error::KeyArity { expected: 2, actual: 1 })
    ));
    assert!(matches!(
        index.search(&Key::from([1, 2, 3])),
        Err(Error::KeyArity { .. })
    ));
}

// ============================================================================
// Persistence
// ============================================================================

#[test]
fn test_contents_survive_close_and_reopen() {
    let (_dir, manager) = setup(order(6));

    let mut index = open(&manager);
    for k in 0..300 {
        index.insert_entry(&key(k * 2), rid(k as u32)).unwrap();
    }
    for k in 0..50 {
        index.delete_entry(&key(k * 2), rid(k as u32)).unwrap();
    }
    let height = index.height();
    manager.close_index(index).unwrap();

    let mut index = open(&manager);
    assert_eq!(index.height(), height);
    assert_eq!(index.validate().unwrap().entries, 250);
    assert_eq!(index.search_entry(&key(100)).unwrap(), Some(rid(50)));
    assert_eq!(index.search_entry(&key(98)).unwrap(), None);
    assert_eq!(scan_keys(&mut index), (50..300).map(|k| k * 2).collect::<Vec<_>>());
}

#[test]
fn test_dropped_handle_still_flushes() {
    let (_dir, manager) = setup(order(4));
    {
        let mut index = open(&manager);
        for k in 0..20 {
            index.insert_entry(&key(k), rid(k as u32)).unwrap();
        }
    }

    let mut index = open(&manager);
    assert_eq!(scan_keys(&mut index), (0..20).collect::<Vec<_>>());
}

#[test]
fn test_small_caches_do_not_change_results() {
    let config = order(4).with_pool_size(4).with_node_cache_capacity(3);
    let (_dir, manager) = setup(config);
    let mut index = open(&manager);

    for k in 0..1000 {
        index.insert_entry(&key((k * 7) % 1000), rid(k as u32)).unwrap();
    }
    for k in (0..1000).step_by(2) {
        let n = (0..1000).find(|n| (n * 7) % 1000 == k).unwrap();
        assert!(index.delete_entry(&key(k), rid(n as u32)).unwrap());
    }

    assert!(index.cached_nodes() <= 3);
    assert_eq!(index.validate().unwrap().entries, 500);
    assert!(index.page_cache_stats().snapshot().evictions > 0);
    assert!(index.node_cache_stats().snapshot().evictions > 0);
}

#[test]
fn test_checksum_mismatch_is_reported() {
    let (dir, manager) = setup(order(4));
    let mut index = open(&manager);
    for k in 0..10 {
        index.insert_entry(&key(k), rid(k as u32)).unwrap();
    }
    manager.close_index(index).unwrap();

    // Page 1 was the first leaf root and is still the leftmost leaf.
    let mut file = OpenOptions::new()
        .write(true)
        .open(dir.path().join("t.0"))
        .unwrap();
    file.seek(SeekFrom::Start(PAGE_SIZE as u64 + 40)).unwrap();
    file.write_all(&[0xFF, 0xEE]).unwrap();
    drop(file);

    let mut index = open(&manager);
    assert!(matches!(
        index.search_entry(&key(0)),
        Err(Error::Corrupted { page_id: 1, .. })
    ));
}

#[test]
fn test_corrupted_header_fails_open() {
    let (dir, manager) = setup(order(4));

    let mut file = OpenOptions::new()
        .write(true)
        .open(dir.path().join("t.0"))
        .unwrap();
    file.seek(SeekFrom::Start(12)).unwrap();
    file.write_all(&[0xAB]).unwrap();
    drop(file);

    assert!(matches!(
        manager.open_index("t", &[0]),
        Err(Error::Corrupted { page_id: 0, .. })
    ));
    assert!(!manager.is_open("t", &[0]));
}

#[test]
fn test_header_with_undersized_order_fails_open() {
    let (dir, manager) = setup(order(4));

    // A well-formed header page, checksum included, with an order no tree
    // can be built with.
    for max_keys in [0, 2] {
        let mut page = Page::new();
        IndexHeader::new(1, AttrType::Int, max_keys).encode(&mut page);
        let mut file = OpenOptions::new()
            .write(true)
            .open(dir.path().join("t.0"))
            .unwrap();
        file.write_all(page.as_slice()).unwrap();
        drop(file);

        assert!(matches!(
            manager.open_index("t", &[0]),
            Err(Error::Corrupted { page_id: 0, .. })
        ));
        assert!(!manager.is_open("t", &[0]));
    }
}
