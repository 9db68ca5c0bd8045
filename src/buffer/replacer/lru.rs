//! LRU (Least-Recently-Used) replacement policy.

use std::collections::{BTreeMap, HashMap};

use crate::common::FrameId;

/// Evicts the evictable frame whose last access is oldest.
///
/// Every access stamps the frame with a monotonically increasing tick.
/// Evictable frames are kept ordered by that stamp, so picking a victim is
/// a single `pop_first`.
#[derive(Debug, Default)]
pub struct LruReplacer {
    /// Logical clock, bumped on every access.
    tick: u64,

    /// Last access stamp of every tracked frame.
    last_access: HashMap<FrameId, u64>,

    /// Evictable frames keyed by their last access stamp.
    evictable: BTreeMap<u64, FrameId>,
}

impl LruReplacer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that a frame was accessed, making it the most recently used.
    pub fn record_access(&mut self, frame_id: FrameId) {
        self.tick += 1;
        let stamp = self.tick;

        if let Some(old) = self.last_access.insert(frame_id, stamp) {
            if self.evictable.remove(&old).is_some() {
                self.evictable.insert(stamp, frame_id);
            }
        }
    }

    /// Mark a frame as evictable (pin count dropped to 0) or not.
    ///
    /// Untracked frames are ignored.
    pub fn set_evictable(&mut self, frame_id: FrameId, evictable: bool) {
        let Some(&stamp) = self.last_access.get(&frame_id) else {
            return;
        };
        if evictable {
            self.evictable.insert(stamp, frame_id);
        } else {
            self.evictable.remove(&stamp);
        }
    }

    /// Select and forget the least recently used evictable frame.
    ///
    /// Returns None if every tracked frame is pinned.
    pub fn evict(&mut self) -> Option<FrameId> {
        let (_, frame_id) = self.evictable.pop_first()?;
        self.last_access.remove(&frame_id);
        Some(frame_id)
    }

    /// Stop tracking a frame entirely.
    pub fn remove(&mut self, frame_id: FrameId) {
        if let Some(stamp) = self.last_access.remove(&frame_id) {
            self.evictable.remove(&stamp);
        }
    }

    /// Number of evictable frames.
    pub fn size(&self) -> usize {
        self.evictable.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracked(frames: &[usize]) -> LruReplacer {
        let mut replacer = LruReplacer::new();
        for &f in frames {
            replacer.record_access(FrameId::new(f));
            replacer.set_evictable(FrameId::new(f), true);
        }
        replacer
    }

    #[test]
    fn test_evicts_least_recently_used() {
        let mut replacer = tracked(&[0, 1, 2]);

        // Touch 0 again: 1 becomes the oldest.
        replacer.record_access(FrameId::new(0));

        assert_eq!(replacer.size(), 3);
        assert_eq!(replacer.evict(), Some(FrameId::new(1)));
        assert_eq!(replacer.evict(), Some(FrameId::new(2)));
        assert_eq!(replacer.evict(), Some(FrameId::new(0)));
        assert_eq!(replacer.evict(), None);
    }

    #[test]
    fn test_skips_pinned() {
        let mut replacer = tracked(&[0, 1, 2]);
        replacer.set_evictable(FrameId::new(0), false);
        replacer.set_evictable(FrameId::new(2), false);

        assert_eq!(replacer.size(), 1);
        assert_eq!(replacer.evict(), Some(FrameId::new(1)));
        assert_eq!(replacer.evict(), None);

        replacer.set_evictable(FrameId::new(2), true);
        assert_eq!(replacer.evict(), Some(FrameId::new(2)));
    }

    #[test]
    fn test_remove_and_untracked() {
        let mut replacer = tracked(&[0, 1]);
        replacer.remove(FrameId::new(0));
        replacer.set_evictable(FrameId::new(9), true);

        assert_eq!(replacer.size(), 1);
        assert_eq!(replacer.evict(), Some(FrameId::new(1)));
        assert_eq!(replacer.evict(), None);
    }
}
