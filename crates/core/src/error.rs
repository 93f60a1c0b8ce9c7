//! Unified error types for swcache.
//!
//! Every variant renders with a stable upper-case code prefix so log lines and
//! tool errors stay greppable.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error type for the worker, its stores and the host.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The network fetch was rejected (offline, DNS, connection reset, ...).
    #[error("NETWORK_FAILURE: {0}")]
    NetworkFailure(String),

    /// A cache lookup found nothing.
    #[error("CACHE_MISS: {0}")]
    CacheMiss(String),

    /// A required core asset could not be fetched during install.
    #[error("INSTALL_ASSET_FAILED: {url}: {reason}")]
    InstallAssetFailure { url: String, reason: String },

    /// A stale store could not be deleted during activation.
    #[error("STORE_DELETE_FAILED: {name}: {reason}")]
    StoreDeletionFailure { name: String, reason: String },

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// A stored entry could not be turned back into a response.
    #[error("CACHE_ERROR: corrupt entry: {0}")]
    CorruptEntry(String),

    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Invalid input parameters (e.g., unknown HTTP method).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Operation not allowed in the worker's current lifecycle state.
    #[error("INVALID_STATE: {0}")]
    InvalidState(String),

    /// Fetch response too large.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),
}

impl Error {
    /// Whether the strategies may recover from this error by falling back.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::NetworkFailure(_) | Error::CacheMiss(_) | Error::FetchTooLarge(_))
    }
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

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let (code, message) = match &err {
            Error::InvalidInput(msg) => (-32602, msg.clone()),
            Error::NetworkFailure(msg) => (-32000, msg.clone()),
            Error::CacheMiss(msg) => (-32001, msg.clone()),
            Error::InvalidUrl(msg) => (-32003, msg.clone()),
            Error::InstallAssetFailure { .. } => (-32004, err.to_string()),
            Error::StoreDeletionFailure { .. } => (-32005, err.to_string()),
            Error::InvalidState(msg) => (-32006, msg.clone()),
            Error::FetchTooLarge(msg) => (-32007, msg.clone()),
            Error::Database(e) => (-32002, e.to_string()),
            Error::MigrationFailed(msg) => (-32002, msg.clone()),
            Error::CorruptEntry(msg) => (-32002, msg.clone()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}
