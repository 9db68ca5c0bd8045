//! Page - the fundamental 4KB unit of storage.
//!
//! A [`Page`] is a raw 4KB byte array that serves as the unit of I/O
//! between disk and memory. Node and header codecs read and write
//! little-endian integers at fixed offsets through it.

use crate::common::config::PAGE_SIZE;

use super::page_header::PageHeader;

/// A page of data (4KB, 4KB-aligned).
///
/// `Page` does NOT implement `Clone` outside tests: copying 4KB should be
/// explicit.
///
/// # Example
/// ```
/// use minirel::storage::page::Page;
///
/// let mut page = Page::new();
/// page.put_u32(8, 0xDEAD_BEEF);
/// assert_eq!(page.get_u32(8), 0xDEAD_BEEF);
/// ```
#[repr(align(4096))]
pub struct Page {
    data: [u8; PAGE_SIZE],
}

impl Page {
    /// Create a new zeroed page.
    #[inline]
    pub fn new() -> Self {
        Self {
            data: [0u8; PAGE_SIZE],
        }
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Zero out the entire page.
    pub fn reset(&mut self) {
        self.data.fill(0);
    }

    /// Read a little-endian `u32` at `offset`.
    ///
    /// # Panics
    /// Panics if the read runs past the end of the page.
    #[inline]
    pub fn get_u32(&self, offset: usize) -> u32 {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.data[offset..offset + 4]);
        u32::from_le_bytes(bytes)
    }

    /// Write a little-endian `u32` at `offset`.
    #[inline]
    pub fn put_u32(&mut self, offset: usize, value: u32) {
        self.data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    /// Read a little-endian `i32` at `offset`.
    #[inline]
    pub fn get_i32(&self, offset: usize) -> i32 {
        self.get_u32(offset) as i32
    }

    /// Write a little-endian `i32` at `offset`.
    #[inline]
    pub fn put_i32(&mut self, offset: usize, value: i32) {
        self.put_u32(offset, value as u32);
    }

    /// Read the page header.
    pub fn header(&self) -> PageHeader {
        PageHeader::from_bytes(&self.data)
    }

    /// Write a page header.
    pub fn set_header(&mut self, header: &PageHeader) {
        header.write_to(&mut self.data);
    }

    /// Compute and store checksum in the header.
    ///
    /// Call this after all modifications to the page are complete.
    pub fn update_checksum(&mut self) {
        let checksum = PageHeader::compute_checksum(&self.data);
        self.put_u32(PageHeader::OFFSET_CHECKSUM, checksum);
    }

    /// Verify the page checksum is valid.
    pub fn verify_checksum(&self) -> bool {
        self.header().verify_checksum(&self.data)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
impl Clone for Page {
    fn clone(&self) -> Self {
        let mut new_page = Page::new();
        new_page.data.copy_from_slice(&self.data);
        new_page
    }
}
