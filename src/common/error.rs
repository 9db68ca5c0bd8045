//! Error types for minirel.

use thiserror::Error;

/// Convenient Result type alias.
///
/// Instead of writing `Result<T, Error>` everywhere, we can write `Result<T>`.
pub type Result<T> = std::result::Result<T, Error>;

/// All recoverable errors in minirel.
///
/// Broken tree invariants (a parent that doesn't list its child, a merge of
/// mismatched node kinds) are not represented here: they indicate a bug or a
/// tree already damaged beyond repair, and panic instead.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from disk operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Requested page does not exist on disk.
    #[error("Page {0} not found")]
    PageNotFound(u32),

    /// Buffer pool has no free frames and cannot evict any pages.
    ///
    /// This happens when all frames are pinned.
    #[error("No free frames available in buffer pool")]
    NoFreeFrames,

    /// A page failed validation while being decoded.
    #[error("Page {page_id} is corrupted: {reason}")]
    Corrupted { page_id: u32, reason: String },

    /// Only INT attributes can be indexed.
    #[error("Unsupported index attribute type: {0}")]
    UnsupportedType(String),

    /// Attribute length must be a positive multiple of 4 bytes.
    #[error("Invalid attribute length {0}: expected a positive multiple of 4")]
    InvalidAttrLength(usize),

    /// Requested index order does not fit the page.
    #[error("Invalid fanout {requested}: must be between {min} and {max}")]
    InvalidFanout {
        requested: usize,
        min: usize,
        max: usize,
    },

    /// A runtime setting is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A key with the wrong number of attributes was passed to an index.
    #[error("Key has {actual} attributes, index expects {expected}")]
    KeyArity { expected: usize, actual: usize },

    /// The index file already exists.
    #[error("Index {0} already exists")]
    IndexExists(String),

    /// The index file does not exist.
    #[error("Index {0} not found")]
    IndexNotFound(String),

    /// The index is already open in this manager.
    #[error("Index {0} is already open")]
    IndexAlreadyOpen(String),

    /// The index cannot be destroyed while it is open.
    #[error("Index {0} is in use")]
    IndexInUse(String),
}

impl Error {
    pub(crate) fn corrupted(page_id: u32, reason: impl Into<String>) -> Self {
        Error::Corrupted {
            page_id,
            reason: reason.into(),
        }
    }
}
