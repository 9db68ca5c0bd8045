//! RAII guards for page access.
//!
//! A guard pins its frame for as long as it lives. [`PageReadGuard`]s on
//! one page can coexist; a [`PageWriteGuard`] is exclusive and leaves the
//! page dirty behind it.

use std::ops::{Deref, DerefMut};

use parking_lot::{RwLockReadGuard, RwLockWriteGuard};

use crate::common::{FrameId, PageId};
use crate::storage::page::Page;

use super::buffer_pool_manager::BufferPoolManager;

/// One pin on a frame, released on drop.
struct Pin<'a> {
    bpm: &'a BufferPoolManager,
    frame_id: FrameId,
    page_id: PageId,
    dirty: bool,
}

impl Drop for Pin<'_> {
    fn drop(&mut self) {
        self.bpm.release_frame(self.frame_id, self.dirty);
    }
}

/// Shared access to a pinned page.
///
/// ```ignore
/// let page = bpm.fetch_page_read(page_id)?;
/// let header = IndexHeader::decode(&page)?;
/// ```
pub struct PageReadGuard<'a> {
    // Declared before `pin`: the page lock is released before the unpin.
    lock: RwLockReadGuard<'a, Page>,
    pin: Pin<'a>,
}

impl<'a> PageReadGuard<'a> {
    pub(crate) fn new(
        bpm: &'a BufferPoolManager,
        frame_id: FrameId,
        page_id: PageId,
        lock: RwLockReadGuard<'a, Page>,
    ) -> Self {
        let pin = Pin {
            bpm,
            frame_id,
            page_id,
            dirty: false,
        };
        Self { lock, pin }
    }

    #[inline]
    pub fn page_id(&self) -> PageId {
        self.pin.page_id
    }
}

impl Deref for PageReadGuard<'_> {
    type Target = Page;

    #[inline]
    fn deref(&self) -> &Page {
        &self.lock
    }
}

/// Exclusive access to a pinned page.
///
/// Taking one counts as a write: the frame is marked dirty on drop even if
/// the page was left untouched.
pub struct PageWriteGuard<'a> {
    lock: RwLockWriteGuard<'a, Page>,
    pin: Pin<'a>,
}

impl<'a> PageWriteGuard<'a> {
    pub(crate) fn new(
        bpm: &'a BufferPoolManager,
        frame_id: FrameId,
        page_id: PageId,
        lock: RwLockWriteGuard<'a, Page>,
    ) -> Self {
        let pin = Pin {
            bpm,
            frame_id,
            page_id,
            dirty: true,
        };
        Self { lock, pin }
    }

    #[inline]
    pub fn page_id(&self) -> PageId {
        self.pin.page_id
    }
}

impl Deref for PageWriteGuard<'_> {
    type Target = Page;

    #[inline]
    fn deref(&self) -> &Page {
        &self.lock
    }
}

impl DerefMut for PageWriteGuard<'_> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Page {
        &mut self.lock
    }
}
