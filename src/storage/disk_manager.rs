//! Disk Manager - page-granular file I/O.
//!
//! The [`DiskManager`] owns one file and exposes it as an array of pages:
//! - Reading and writing whole pages
//! - Growing the file one zeroed page at a time
//! - Forcing written pages to stable storage

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::common::config::{MAX_PAGES, PAGE_SIZE};
use crate::common::{Error, PageId, Result};
use crate::storage::page::Page;

/// Manages disk I/O for a single file.
///
/// # File Layout
/// ```text
/// ┌─────────┬─────────┬─────────┬─────────┬─────────┐
/// │ Page 0  │ Page 1  │ Page 2  │  ...    │ Page N  │
/// │ (4KB)   │ (4KB)   │ (4KB)   │         │ (4KB)   │
/// └─────────┴─────────┴─────────┴─────────┴─────────┘
/// ```
///
/// Page N is located at file offset `N × PAGE_SIZE`.
///
/// # Durability
/// Writes go to the OS page cache. Nothing is forced to disk until
/// [`sync`](Self::sync) is called; the buffer pool does that when an index
/// is flushed or closed.
pub struct DiskManager {
    file: File,
    path: PathBuf,
    page_count: u32,
}

impl DiskManager {
    /// Create a new file.
    ///
    /// # Errors
    /// Returns an `Io` error of kind `AlreadyExists` if the file exists.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path.as_ref())?;

        Ok(Self {
            file,
            path: path.as_ref().to_path_buf(),
            page_count: 0,
        })
    }

    /// Open an existing file.
    ///
    /// A trailing partial page (from a torn extension) is ignored.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path.as_ref())?;
        let page_count = (file.metadata()?.len() / PAGE_SIZE as u64) as u32;

        Ok(Self {
            file,
            path: path.as_ref().to_path_buf(),
            page_count,
        })
    }

    /// Read a page from disk.
    ///
    /// # Errors
    /// Returns `Error::PageNotFound` if the page was never allocated.
    pub fn read_page(&mut self, page_id: PageId) -> Result<Page> {
        self.seek_to(page_id)?;

        let mut page = Page::new();
        self.file.read_exact(page.as_mut_slice())?;
        Ok(page)
    }

    /// Write a page to disk.
    ///
    /// # Errors
    /// Returns `Error::PageNotFound` if the page was never allocated.
    pub fn write_page(&mut self, page_id: PageId, page: &Page) -> Result<()> {
        self.seek_to(page_id)?;
        self.file.write_all(page.as_slice())?;
        Ok(())
    }

    /// Extend the file by one zeroed page and return its id.
    pub fn allocate_page(&mut self) -> Result<PageId> {
        if u64::from(self.page_count) >= MAX_PAGES {
            return Err(Error::PageNotFound(self.page_count));
        }

        let page_id = PageId::new(self.page_count);
        self.file
            .seek(SeekFrom::Start(u64::from(page_id.0) * PAGE_SIZE as u64))?;
        self.file.write_all(&[0u8; PAGE_SIZE])?;

        self.page_count += 1;
        Ok(page_id)
    }

    /// Force all written pages to stable storage.
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }

    /// Number of pages in the file.
    #[inline]
    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    /// Path of the backing file.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn seek_to(&mut self, page_id: PageId) -> Result<()> {
        if !page_id.is_valid() || page_id.0 >= self.page_count {
            return Err(Error::PageNotFound(page_id.0));
        }
        self.file
            .seek(SeekFrom::Start(u64::from(page_id.0) * PAGE_SIZE as u64))?;
        Ok(())
    }
}
