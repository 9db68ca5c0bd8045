//! Helpers shared by the integration tests.

#![allow(dead_code)]

use minirel::index::{AttrType, IndexHandle, IndexManager};
use minirel::{IndexConfig, Key, PageId, Rid};
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

/// Route library logs to the test harness. Set `RUST_LOG=minirel=debug`
/// to watch splits and merges.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn key(k: i32) -> Key {
    Key::from([k])
}

pub fn rid(n: u32) -> Rid {
    Rid::new(PageId::new(n / 64), n % 64)
}

/// A scratch directory with one empty single-column index, `t.0`.
pub fn setup(config: IndexConfig) -> (TempDir, IndexManager) {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let manager = IndexManager::new(dir.path(), config);
    manager.create_index("t", &[0], AttrType::Int, 4).unwrap();
    (dir, manager)
}

pub fn open(manager: &IndexManager) -> IndexHandle {
    manager.open_index("t", &[0]).unwrap()
}

/// Every key of a full scan, in order.
pub fn scan_keys(index: &mut IndexHandle) -> Vec<i32> {
    index
        .iter()
        .unwrap()
        .map(|entry| entry.unwrap().0.values()[0])
        .collect()
}
