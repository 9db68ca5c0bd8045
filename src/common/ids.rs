//! Identifier types: pages on disk, frames in the buffer pool, and record
//! locators stored in index leaves.

use std::fmt;

/// Identifies a page within one file.
///
/// `PageId::INVALID` doubles as the "none" link in tree nodes: a root's
/// parent, the ends of a sibling chain and the root of an empty tree.
///
/// # Example
/// ```
/// use minirel::PageId;
///
/// let page_id = PageId::new(42);
/// assert!(page_id.is_valid());
/// assert!(!PageId::INVALID.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(pub u32);

impl PageId {
    /// Sentinel for "no page".
    pub const INVALID: PageId = PageId(u32::MAX);

    #[inline]
    pub fn new(id: u32) -> Self {
        PageId(id)
    }

    /// Check if this page ID is a real page (not the sentinel value).
    #[inline]
    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "Page({})", self.0)
        } else {
            write!(f, "Page(NONE)")
        }
    }
}

/// Identifies a frame in the buffer pool.
///
/// Frames are stored in a `Vec<Frame>`, so the id is the vector index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(pub usize);

impl FrameId {
    #[inline]
    pub fn new(id: usize) -> Self {
        FrameId(id)
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frame({})", self.0)
    }
}

/// Record locator: where a row lives in its heap file.
///
/// The index stores and returns it without interpreting either field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Rid {
    pub page_id: PageId,
    pub slot_id: u32,
}

impl Rid {
    #[inline]
    pub fn new(page_id: PageId, slot_id: u32) -> Self {
        Self { page_id, slot_id }
    }
}

impl fmt::Display for Rid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rid({}, {})", self.page_id.0, self.slot_id)
    }
}
