//! Persistent B+Tree.
//!
//! # Layout
//! - [`node`] - decoded nodes and their in-node search primitives
//! - [`codec`] - page formats for nodes, the index header and free pages
//! - `arena` - bounded cache of decoded nodes addressed by slot
//! - [`IndexHandle`] - search, insert, delete, scans and validation
//!
//! Page 0 of an index file holds the [`IndexHeader`]. Every other page is
//! an internal node, a leaf, or a member of the free list. Pages released
//! by merges and root collapses are reused before the file grows.

mod arena;
pub mod codec;
mod delete;
mod handle;
mod insert;
mod iter;
pub mod node;
mod verify;

pub use codec::IndexHeader;
pub use handle::{IndexHandle, SearchResult};
pub use iter::IndexIter;
pub use node::{NodeKind, Payload, TreeNode};
pub use verify::TreeShape;
