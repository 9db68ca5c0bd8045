//! minirel - the storage core of a minimal relational engine.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                            minirel                              │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │              Index Layer (index/)                        │   │
//! │  │   IndexManager → IndexHandle → NodeArena → TreeNode      │   │
//! │  │        (file naming, open registry, B+Tree algorithms)   │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │       Buffer Pool (buffer/)                              │   │
//! │  │      BufferPoolManager + Frame + LruReplacer             │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │           Storage Layer (storage/)                       │   │
//! │  │          DiskManager + Page + PageHeader                 │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (PageId, FrameId, Rid, Error, config)
//! - [`storage`] - Disk I/O and page formats
//! - [`buffer`] - Buffer pool management and LRU eviction
//! - [`index`] - Persistent B+Tree index and its manager
//!
//! # Quick Start
//! ```no_run
//! use minirel::index::{AttrType, IndexManager, Key};
//! use minirel::{IndexConfig, PageId, Rid};
//!
//! let manager = IndexManager::new("data", IndexConfig::default());
//! manager.create_index("orders", &[0, 2], AttrType::Int, 8).unwrap();
//!
//! let mut index = manager.open_index("orders", &[0, 2]).unwrap();
//! index.insert_entry(&Key::from([7, 1]), Rid::new(PageId::new(3), 4)).unwrap();
//! assert!(index.search_entry(&Key::from([7, 1])).unwrap().is_some());
//! manager.close_index(index).unwrap();
//! ```

pub mod buffer;
pub mod common;
pub mod index;
pub mod storage;

// Re-export commonly used items at crate root for convenience
pub use common::config::{IndexConfig, PAGE_SIZE};
pub use common::{Error, FrameId, PageId, Result, Rid};

pub use buffer::{BufferPoolManager, CacheStats, StatsSnapshot};
pub use index::{AttrType, IndexHandle, IndexManager, Key};
pub use storage::page::{Page, PageHeader, PageType};
pub use storage::DiskManager;
