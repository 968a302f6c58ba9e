//! Unified error types for swcache.
//!
//! Every variant renders with a stable code prefix so log lines and MCP
//! error payloads can be matched on without parsing free text.

use std::fmt;

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Which store operation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    /// The backing medium is out of space.
    QuotaExceeded,
    /// A put, delete or open could not be written.
    WriteFailed,
    /// A get or key listing could not be read.
    ReadFailed,
}

impl fmt::Display for StoreErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StoreErrorKind::QuotaExceeded => "quota exceeded",
            StoreErrorKind::WriteFailed => "write failed",
            StoreErrorKind::ReadFailed => "read failed",
        };
        f.write_str(s)
    }
}

/// Unified error types for the cache engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., empty URL).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// The request never produced a response (connect, DNS, TLS, reset).
    #[error("NETWORK_ERROR: {0}")]
    Network(String),

    /// Fetch timeout.
    #[error("FETCH_TIMEOUT: {0}")]
    FetchTimeout(String),

    /// Fetch response too large.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),

    /// The server answered with a non-ok status.
    #[error("HTTP_ERROR: status {0}")]
    HttpStatus(u16),

    /// A store operation failed. Contained inside the strategy engine.
    #[error("CACHE_ERROR: {kind}: {message}")]
    Store { kind: StoreErrorKind, message: String },

    /// Database operation failed before it was attributed to a store operation.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// A precache fetch failed during install.
    #[error("INSTALL_FAILED: {url}: {reason}")]
    Install { url: String, reason: String },

    /// A stale store could not be deleted during activate.
    #[error("ACTIVATE_CLEANUP_FAILED: {store}: {reason}")]
    ActivateCleanup { store: String, reason: String },

    /// A lifecycle event fired out of order.
    #[error("LIFECYCLE_ERROR: {0}")]
    Lifecycle(String),
}

impl Error {
    /// Whether this error came from the network side of a fetch.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            Error::Network(_) | Error::FetchTimeout(_) | Error::FetchTooLarge(_) | Error::HttpStatus(_)
        )
    }

    /// Whether this error came from the cache store.
    pub fn is_store(&self) -> bool {
        matches!(self, Error::Store { .. } | Error::Database(_) | Error::MigrationFailed(_))
    }

    /// Attribute a raw database failure to a store operation.
    ///
    /// A full disk is always reported as `QuotaExceeded`, whatever the
    /// operation. Non-database errors pass through unchanged.
    pub fn into_store(self, kind: StoreErrorKind) -> Self {
        match self {
            Error::Database(e) => {
                let kind = if is_disk_full(&e) { StoreErrorKind::QuotaExceeded } else { kind };
                Error::Store { kind, message: e.to_string() }
            }
            other => other,
        }
    }
}

fn is_disk_full(err: &tokio_rusqlite::Error) -> bool {
    match err {
        tokio_rusqlite::Error::Error(e) => e.sqlite_error_code() == Some(rusqlite::ErrorCode::DiskFull),
        _ => false,
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
        let code = match &err {
            Error::InvalidInput(_) => -32602,
            Error::Store { .. } | Error::Database(_) | Error::MigrationFailed(_) => -32002,
            Error::InvalidUrl(_) => -32003,
            Error::FetchTimeout(_) => -32006,
            Error::FetchTooLarge(_) => -32007,
            Error::Network(_) | Error::HttpStatus(_) => -32008,
            Error::Install { .. } => -32020,
            Error::ActivateCleanup { .. } => -32021,
            Error::Lifecycle(_) => -32022,
        };

        McpError { code: ErrorCode(code), message: err.to_string().into(), data: None }
    }
}
