//! Eviction policy implementations (replacers).
//!
//! - [`LruReplacer`] - Least Recently Used, the buffer pool's policy

mod lru;

pub use lru::LruReplacer;
