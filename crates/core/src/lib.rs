//! Core types and shared functionality for charter.
//!
//! This crate provides:
//! - The constitution document model and loader
//! - Full-text search with ranking, excerpts and highlighting
//! - The offline worker and its SQLite-backed cache generations
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod document;
pub mod error;
pub mod reader;
pub mod search;
pub mod worker;

pub use cache::{CacheDb, CacheEntry};
pub use config::{AppConfig, ConfigError};
pub use document::{Document, load_document};
pub use error::{Error, NetworkError};
pub use reader::{Reader, ReaderEvent, ReaderOptions, ReaderView};
pub use search::SearchEngine;
pub use worker::{Network, OfflineWorker, Registration, Request, Response, WorkerConfig};
