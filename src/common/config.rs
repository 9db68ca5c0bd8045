//! Configuration for minirel.
//!
//! Page geometry is fixed at compile time; everything an index can tune at
//! runtime lives in [`IndexConfig`].

use super::error::{Error, Result};

/// Size of a page in bytes (4KB).
///
/// Every index file is a sequence of pages of this size. Page 0 holds the
/// index header, every other page is a tree node or a free page.
pub const PAGE_SIZE: usize = 4096;

/// Maximum number of pages with u32 PageId.
///
/// `u32::MAX` itself is reserved as the "no page" sentinel.
pub const MAX_PAGES: u64 = u32::MAX as u64;

/// Default number of buffer pool frames per open index.
pub const DEFAULT_POOL_SIZE: usize = 64;

/// Default number of decoded tree nodes kept per open index.
pub const DEFAULT_NODE_CACHE_CAPACITY: usize = 256;

/// Smallest order a B+Tree may be created with.
pub const MIN_FANOUT: usize = 3;

/// Runtime settings for indexes created and opened through an
/// [`IndexManager`](crate::index::IndexManager).
///
/// # Example
/// ```
/// use minirel::IndexConfig;
///
/// let config = IndexConfig::default().with_pool_size(16).with_max_keys(4);
/// assert_eq!(config.pool_size, 16);
/// assert_eq!(config.max_keys, Some(4));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexConfig {
    /// Buffer pool frames allocated for each open index.
    pub pool_size: usize,
    /// Decoded nodes kept in an index handle between operations.
    pub node_cache_capacity: usize,
    /// Order (`MAX_KEYS`) used when creating an index.
    ///
    /// `None` derives the largest order whose nodes fit in one page. The
    /// order is stored in the index header, so this only affects creation.
    pub max_keys: Option<usize>,
}

impl IndexConfig {
    /// Set the buffer pool size.
    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    /// Set the node cache capacity.
    pub fn with_node_cache_capacity(mut self, capacity: usize) -> Self {
        self.node_cache_capacity = capacity;
        self
    }

    /// Create indexes with a fixed order instead of the page-derived one.
    pub fn with_max_keys(mut self, max_keys: usize) -> Self {
        self.max_keys = Some(max_keys);
        self
    }

    /// Reject settings no index can run with. The order is checked
    /// against the key width at creation instead.
    pub fn validate(&self) -> Result<()> {
        if self.pool_size == 0 {
            return Err(Error::InvalidConfig("pool_size must be at least 1".to_string()));
        }
        Ok(())
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            pool_size: DEFAULT_POOL_SIZE,
            node_cache_capacity: DEFAULT_NODE_CACHE_CAPACITY,
            max_keys: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_size_is_power_of_two() {
        assert!(PAGE_SIZE.is_power_of_two());
        assert_eq!(PAGE_SIZE, 4096);
    }

    #[test]
    fn test_default_config() {
        let config = IndexConfig::default();
        assert_eq!(config.pool_size, DEFAULT_POOL_SIZE);
        assert_eq!(config.node_cache_capacity, DEFAULT_NODE_CACHE_CAPACITY);
        assert_eq!(config.max_keys, None);
    }

    #[test]
    fn test_builder_setters() {
        let config = IndexConfig::default()
            .with_pool_size(8)
            .with_node_cache_capacity(2)
            .with_max_keys(4);
        assert_eq!(config.pool_size, 8);
        assert_eq!(config.node_cache_capacity, 2);
        assert_eq!(config.max_keys, Some(4));
    }

    #[test]
    fn test_validate_rejects_empty_pool() {
        assert!(IndexConfig::default().validate().is_ok());
        assert!(IndexConfig::default().with_node_cache_capacity(0).validate().is_ok());
        assert!(matches!(
            IndexConfig::default().with_pool_size(0).validate(),
            Err(Error::InvalidConfig(_))
        ));
    }
}
