//! Buffer Pool Manager - the page cache under every open index.
//!
//! The [`BufferPoolManager`] provides:
//! - Page caching between disk and memory
//! - Pin-based reference counting through RAII guards
//! - Dirty page write-back on eviction and flush
//! - LRU eviction of unpinned frames

use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::trace;

use crate::buffer::replacer::LruReplacer;
use crate::buffer::{CacheStats, Frame, PageReadGuard, PageWriteGuard};
use crate::common::{Error, FrameId, PageId, Result};
use crate::storage::DiskManager;

/// Bookkeeping shared by every pool operation, kept under one lock.
struct PoolState {
    /// Maps resident page IDs to their frames.
    page_table: HashMap<PageId, FrameId>,
    /// Frames holding no page (LIFO).
    free_list: Vec<FrameId>,
    /// Picks the victim when no frame is free.
    replacer: LruReplacer,
}

/// Manages a fixed pool of frames caching the pages of one file.
///
/// # Architecture
/// ```text
/// ┌─────────────────────────────────────────────────────────────┐
/// │                    BufferPoolManager                        │
/// │  ┌──────────────────────────┐  ┌──────────────────────────┐ │
/// │  │ state: Mutex<PoolState>  │  │   frames: Vec<Frame>     │ │
/// │  │  page_table PageId → Fid │─▶│ [Frame0] [Frame1] ...    │ │
/// │  │  free_list, LruReplacer  │  └──────────────────────────┘ │
/// │  └──────────────────────────┘  ┌──────────────────────────┐ │
/// │                                │ disk: Mutex<DiskManager> │ │
/// │                                └──────────────────────────┘ │
/// └─────────────────────────────────────────────────────────────┘
/// ```
///
/// Lock order is `state` before `disk`; page locks are taken last and
/// never while `state` is held by the guard's own call.
///
/// # Usage
/// ```ignore
/// let bpm = BufferPoolManager::new(16, DiskManager::create("t.idx")?);
///
/// let mut guard = bpm.new_page()?;
/// guard.put_u32(0, 7);
/// drop(guard); // marked dirty, unpinned
///
/// bpm.flush_all_pages()?; // written back and fsynced
/// ```
pub struct BufferPoolManager {
    frames: Vec<Frame>,
    state: Mutex<PoolState>,
    disk: Mutex<DiskManager>,
    stats: CacheStats,
}

impl BufferPoolManager {
    /// Create a new buffer pool manager.
    ///
    /// # Panics
    /// Panics if `pool_size` is 0.
    pub fn new(pool_size: usize, disk_manager: DiskManager) -> Self {
        assert!(pool_size > 0, "pool_size must be > 0");

        Self {
            frames: (0..pool_size).map(|_| Frame::new()).collect(),
            state: Mutex::new(PoolState {
                page_table: HashMap::with_capacity(pool_size),
                free_list: (0..pool_size).rev().map(FrameId::new).collect(),
                replacer: LruReplacer::new(),
            }),
            disk: Mutex::new(disk_manager),
            stats: CacheStats::new(),
        }
    }

    /// Fetch a page for reading.
    ///
    /// # Errors
    /// - `Error::PageNotFound` if the page doesn't exist on disk
    /// - `Error::NoFreeFrames` if all frames are pinned
    pub fn fetch_page_read(&self, page_id: PageId) -> Result<PageReadGuard<'_>> {
        let frame_id = self.pin_page(page_id)?;
        let lock = self.frames[frame_id.0].page();
        Ok(PageReadGuard::new(self, frame_id, page_id, lock))
    }

    /// Fetch a page for writing. The page is marked dirty when the guard drops.
    ///
    /// # Errors
    /// Same as [`fetch_page_read`](Self::fetch_page_read).
    pub fn fetch_page_write(&self, page_id: PageId) -> Result<PageWriteGuard<'_>> {
        let frame_id = self.pin_page(page_id)?;
        let lock = self.frames[frame_id.0].page_mut();
        Ok(PageWriteGuard::new(self, frame_id, page_id, lock))
    }

    /// Extend the file by one page and return a write guard on it.
    ///
    /// The page starts zeroed.
    pub fn new_page(&self) -> Result<PageWriteGuard<'_>> {
        let (frame_id, page_id) = {
            let mut state = self.state.lock();
            let frame_id = self.take_frame(&mut state)?;

            let page_id = match self.disk.lock().allocate_page() {
                Ok(pid) => pid,
                Err(e) => {
                    state.free_list.push(frame_id);
                    return Err(e);
                }
            };

            let frame = &self.frames[frame_id.0];
            frame.page_mut().reset();
            frame.assign(page_id);
            state.page_table.insert(page_id, frame_id);
            state.replacer.record_access(frame_id);
            (frame_id, page_id)
        };

        trace!(%page_id, %frame_id, "allocated page");
        let lock = self.frames[frame_id.0].page_mut();
        Ok(PageWriteGuard::new(self, frame_id, page_id, lock))
    }

    /// Write a page back to disk if it is resident and dirty.
    pub fn flush_page(&self, page_id: PageId) -> Result<()> {
        let frame_id = match self.state.lock().page_table.get(&page_id) {
            Some(&fid) => fid,
            None => return Ok(()),
        };
        self.write_back(frame_id, page_id)
    }

    /// Write every dirty page back to disk, then fsync the file.
    pub fn flush_all_pages(&self) -> Result<()> {
        let resident: Vec<(PageId, FrameId)> = {
            let state = self.state.lock();
            state.page_table.iter().map(|(&p, &f)| (p, f)).collect()
        };

        for (page_id, frame_id) in resident {
            self.write_back(frame_id, page_id)?;
        }
        self.sync()
    }

    /// Fsync the underlying file.
    pub fn sync(&self) -> Result<()> {
        self.disk.lock().sync()
    }

    /// Number of pages in the underlying file.
    pub fn disk_page_count(&self) -> u32 {
        self.disk.lock().page_count()
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    pub fn pool_size(&self) -> usize {
        self.frames.len()
    }

    pub fn free_frame_count(&self) -> usize {
        self.state.lock().free_list.len()
    }

    /// Number of pages currently cached.
    pub fn resident_page_count(&self) -> usize {
        self.state.lock().page_table.len()
    }

    /// Pin count of a resident page, or None if it isn't cached.
    pub fn pin_count(&self, page_id: PageId) -> Option<u32> {
        let frame_id = *self.state.lock().page_table.get(&page_id)?;
        Some(self.frames[frame_id.0].pin_count())
    }

    /// Unpin a frame. Called by the page guards on drop.
    pub(crate) fn release_frame(&self, frame_id: FrameId, dirty: bool) {
        if self.frames[frame_id.0].unpin(dirty) == 0 {
            self.state.lock().replacer.set_evictable(frame_id, true);
        }
    }

    /// Make `page_id` resident and pinned, returning its frame.
    fn pin_page(&self, page_id: PageId) -> Result<FrameId> {
        let mut state = self.state.lock();

        if let Some(&frame_id) = state.page_table.get(&page_id) {
            self.frames[frame_id.0].pin();
            state.replacer.record_access(frame_id);
            state.replacer.set_evictable(frame_id, false);
            self.stats.record_hit();
            return Ok(frame_id);
        }

        self.stats.record_miss();
        let frame_id = self.take_frame(&mut state)?;

        let page = match self.disk.lock().read_page(page_id) {
            Ok(page) => page,
            Err(e) => {
                state.free_list.push(frame_id);
                return Err(e);
            }
        };
        self.stats.record_read();

        let frame = &self.frames[frame_id.0];
        frame.page_mut().as_mut_slice().copy_from_slice(page.as_slice());
        frame.assign(page_id);
        state.page_table.insert(page_id, frame_id);
        state.replacer.record_access(frame_id);

        Ok(frame_id)
    }

    /// Get an empty frame, evicting the LRU unpinned page if necessary.
    fn take_frame(&self, state: &mut PoolState) -> Result<FrameId> {
        if let Some(frame_id) = state.free_list.pop() {
            return Ok(frame_id);
        }

        let frame_id = state.replacer.evict().ok_or(Error::NoFreeFrames)?;
        let frame = &self.frames[frame_id.0];

        if let Some(victim) = frame.page_id() {
            if let Err(e) = self.write_back(frame_id, victim) {
                // Keep the victim resident so its changes aren't lost.
                state.replacer.record_access(frame_id);
                state.replacer.set_evictable(frame_id, true);
                return Err(e);
            }
            state.page_table.remove(&victim);
            trace!(page_id = %victim, %frame_id, "evicted page");
        }

        frame.clear();
        self.stats.record_eviction();
        Ok(frame_id)
    }

    /// Write a frame to disk if dirty.
    fn write_back(&self, frame_id: FrameId, page_id: PageId) -> Result<()> {
        let frame = &self.frames[frame_id.0];
        if !frame.is_dirty() {
            return Ok(());
        }

        {
            let page = frame.page();
            self.disk.lock().write_page(page_id, &page)?;
        }
        frame.take_dirty();
        self.stats.record_write();
        Ok(())
    }
}
