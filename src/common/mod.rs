//! Common types and utilities shared across minirel.
//!
//! This module contains fundamental primitives used throughout the codebase:
//! - Configuration constants and [`IndexConfig`](config::IndexConfig)
//! - Error types
//! - Identifiers (PageId, FrameId) and the record locator [`Rid`]

pub mod config;
pub mod error;
mod ids;

pub use error::{Error, Result};
pub use ids::{FrameId, PageId, Rid};
