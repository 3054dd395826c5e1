//! SQLite-backed storage for named cache generations.
//!
//! This module provides the storage the offline worker builds on: a set of
//! named caches, each mapping a request key to a stored response. It
//! supports:
//!
//! - Opening, listing and deleting cache generations
//! - Upserting and matching entries by request (method + URL)
//! - Automatic schema migrations
//! - WAL mode with cascading deletes from generation to entries

pub mod connection;
pub mod hash;
pub mod migrations;
pub mod storage;

pub use crate::Error;

pub use connection::CacheDb;
pub use storage::CacheEntry;
