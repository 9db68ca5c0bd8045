//! Buffer pool management.
//!
//! The buffer pool is the page cache between an index and its file. It
//! manages a fixed pool of frames, each holding one page.
//!
//! # Components
//! - [`BufferPoolManager`] - The page cache
//! - [`Frame`] - A slot in the buffer pool holding a page + bookkeeping
//! - [`PageReadGuard`] / [`PageWriteGuard`] - RAII guards for page access
//! - [`CacheStats`] - Hit/miss/eviction counters
//! - [`replacer`] - Eviction policy

mod buffer_pool_manager;
mod frame;
mod page_guard;
pub mod replacer;
mod stats;

pub use buffer_pool_manager::BufferPoolManager;
pub use frame::{Frame, FrameMeta};
pub use page_guard::{PageReadGuard, PageWriteGuard};
pub use stats::{CacheStats, StatsSnapshot};
