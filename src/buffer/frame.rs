//! Frame - a slot in the buffer pool.
//!
//! A [`Frame`] holds a [`Page`] plus the bookkeeping the pool needs:
//! which page is loaded, how many guards pin it, and whether it has been
//! written since it was last flushed.

use parking_lot::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::common::PageId;
use crate::storage::page::Page;

/// Bookkeeping for one frame, updated together under one lock.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FrameMeta {
    /// Which page is currently loaded, or None if frame is empty.
    pub page_id: Option<PageId>,
    /// Number of live guards on this frame.
    pub pin_count: u32,
    /// Whether the page has been modified since loading or flushing.
    pub dirty: bool,
}

/// A frame in the buffer pool.
///
/// # Thread Safety
/// - `page`: `RwLock` so guards can hold shared or exclusive access
/// - `meta`: `Mutex`, held only for short bookkeeping updates
pub struct Frame {
    page: RwLock<Page>,
    meta: Mutex<FrameMeta>,
}

impl Frame {
    /// Create a new empty frame.
    pub fn new() -> Self {
        Self {
            page: RwLock::new(Page::new()),
            meta: Mutex::new(FrameMeta::default()),
        }
    }

    /// Acquire read lock on the page.
    #[inline]
    pub fn page(&self) -> RwLockReadGuard<'_, Page> {
        self.page.read()
    }

    /// Acquire write lock on the page.
    #[inline]
    pub fn page_mut(&self) -> RwLockWriteGuard<'_, Page> {
        self.page.write()
    }

    /// Copy of the current bookkeeping.
    #[inline]
    pub fn meta(&self) -> FrameMeta {
        *self.meta.lock()
    }

    #[inline]
    pub fn page_id(&self) -> Option<PageId> {
        self.meta.lock().page_id
    }

    /// Bind the frame to a freshly loaded page: pinned once, clean.
    pub fn assign(&self, page_id: PageId) {
        *self.meta.lock() = FrameMeta {
            page_id: Some(page_id),
            pin_count: 1,
            dirty: false,
        };
    }

    /// Increment the pin count. Returns the new pin count.
    #[inline]
    pub fn pin(&self) -> u32 {
        let mut meta = self.meta.lock();
        meta.pin_count += 1;
        meta.pin_count
    }

    /// Decrement the pin count, recording a write if `dirty`.
    /// Returns the new pin count.
    ///
    /// # Panics
    /// Panics if pin count is already 0.
    pub fn unpin(&self, dirty: bool) -> u32 {
        let mut meta = self.meta.lock();
        assert!(meta.pin_count > 0, "pin count underflow");
        meta.pin_count -= 1;
        meta.dirty |= dirty;
        meta.pin_count
    }

    /// Clear the dirty flag, returning whether it was set.
    #[inline]
    pub fn take_dirty(&self) -> bool {
        std::mem::take(&mut self.meta.lock().dirty)
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.meta.lock().dirty
    }

    #[inline]
    pub fn pin_count(&self) -> u32 {
        self.meta.lock().pin_count
    }

    /// Detach the frame from its page after eviction.
    pub fn clear(&self) {
        *self.meta.lock() = FrameMeta::default();
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}
