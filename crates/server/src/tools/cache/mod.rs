//! Cache-related MCP tools.
//!
//! These drive the offline worker through its [`Registration`](charter_core::Registration).

pub mod control;
pub mod fetch;

pub use control::{CacheControlParams, control_impl};
pub use fetch::{CacheFetchParams, fetch_impl};
