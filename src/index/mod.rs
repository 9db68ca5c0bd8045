//! Persistent secondary indexes.
//!
//! [`IndexManager`] owns the files; an open [`IndexHandle`] runs the B+Tree
//! algorithms over one of them.

pub mod btree;
mod key;
mod manager;

pub use btree::{IndexHandle, IndexIter, NodeKind, Payload, SearchResult, TreeNode, TreeShape};
pub use key::{compare, AttrType, Key};
pub use manager::{index_file_name, IndexManager};
