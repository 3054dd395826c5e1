//! Client code for charter.
//!
//! This crate provides the reqwest-backed network used by the offline
//! worker, shared by the server and CLI.

pub mod fetch;

pub use fetch::{FetchClient, FetchConfig, UrlError, canonicalize, resolve, resolve_in_origin, same_origin};
