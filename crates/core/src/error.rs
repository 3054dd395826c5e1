//! Unified error types for charter.
//!
//! Every message carries a stable code prefix so that hosts (the MCP server,
//! the CLI) can surface them without re-wording.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

use crate::worker::WorkerState;

/// Unified error types for the charter crates.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The search index has not been built yet.
    #[error("NOT_INITIALIZED: search index has not been built")]
    NotInitialized,

    /// Invalid input parameters (e.g., empty query).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Document JSON could not be parsed or violates a document invariant.
    #[error("INVALID_DOCUMENT: {0}")]
    InvalidDocument(String),

    /// No document part or cache entry exists for the given key.
    #[error("NOT_FOUND: {0}")]
    NotFound(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// Stored entry could not be decoded.
    #[error("CACHE_ERROR: corrupt entry: {0}")]
    CorruptEntry(String),

    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// The network could not produce a response.
    #[error("NETWORK_ERROR: {0}")]
    Network(#[from] NetworkError),

    /// A lifecycle transition was requested from the wrong state.
    #[error("INVALID_TRANSITION: cannot move from {from} to {to}")]
    InvalidTransition { from: WorkerState, to: WorkerState },
}

/// Failure of the network seam used by the offline worker.
#[derive(Debug, Clone, thiserror::Error)]
pub enum NetworkError {
    /// Connection refused, DNS failure, or the host is offline.
    #[error("unreachable: {0}")]
    Unreachable(String),

    /// Request timed out.
    #[error("timeout: {0}")]
    Timeout(String),

    /// Response body exceeded the configured limit.
    #[error("response too large: {0}")]
    TooLarge(String),

    /// The request could not be built (bad method, bad URL).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::CorruptEntry(err.to_string())
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let (code, message) = match &err {
            Error::InvalidInput(msg) => (-32602, msg.clone()),
            Error::NotInitialized => (-32000, "search index has not been built".to_string()),
            Error::InvalidDocument(msg) => (-32001, msg.clone()),
            Error::NotFound(msg) => (-32002, msg.clone()),
            Error::Database(e) => (-32003, e.to_string()),
            Error::MigrationFailed(msg) => (-32003, msg.clone()),
            Error::CorruptEntry(msg) => (-32003, msg.clone()),
            Error::InvalidUrl(msg) => (-32004, msg.clone()),
            Error::Network(e) => (-32005, e.to_string()),
            Error::InvalidTransition { .. } => (-32006, err.to_string()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}
