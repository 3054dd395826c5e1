//! MCP tool implementations.
//!
//! This module contains all tools exposed by the charter server.

pub mod cache;
pub mod document;

pub use cache::{CacheControlParams, CacheFetchParams};
pub use document::{DocumentGetParams, DocumentSearchParams};
