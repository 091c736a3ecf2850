//! Error taxonomy shared by every endpoint and the transfer engine.
//!
//! Errors carry a distinct [`ErrorKind`] so callers can tell transient
//! failures (`ConnectionError`) from permanent ones (`FormatError`) without
//! parsing messages.

use serde::Serialize;
use thiserror::Error;

/// Main error type for discovery and transfer operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyncError {
    /// Malformed or missing request fields (bad delimiter, empty column list, ...)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Handshake, authentication or transport failure
    #[error("Connection error: {0}")]
    Connection(String),

    /// Missing file or table
    #[error("Not found: {0}")]
    NotFound(String),

    /// Catalog or data query rejected by the database
    #[error("Query error: {0}")]
    Query(String),

    /// Header/row shape mismatch or a value that does not fit its column
    #[error("Format error: {0}")]
    Format(String),

    /// Sink rejected a batch
    #[error("Write error: {0}")]
    Write(String),
}

/// Serializable discriminant of [`SyncError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    ConfigError,
    ConnectionError,
    NotFoundError,
    QueryError,
    FormatError,
    WriteError,
}

impl SyncError {
    pub fn config(message: impl Into<String>) -> Self {
        SyncError::Config(message.into())
    }

    pub fn connection(message: impl Into<String>) -> Self {
        SyncError::Connection(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        SyncError::NotFound(message.into())
    }

    pub fn query(message: impl Into<String>) -> Self {
        SyncError::Query(message.into())
    }

    pub fn format(message: impl Into<String>) -> Self {
        SyncError::Format(message.into())
    }

    pub fn write(message: impl Into<String>) -> Self {
        SyncError::Write(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::Config(_) => ErrorKind::ConfigError,
            SyncError::Connection(_) => ErrorKind::ConnectionError,
            SyncError::NotFound(_) => ErrorKind::NotFoundError,
            SyncError::Query(_) => ErrorKind::QueryError,
            SyncError::Format(_) => ErrorKind::FormatError,
            SyncError::Write(_) => ErrorKind::WriteError,
        }
    }

    /// The bare message without the kind prefix added by `Display`.
    pub fn message(&self) -> &str {
        match self {
            SyncError::Config(m)
            | SyncError::Connection(m)
            | SyncError::NotFound(m)
            | SyncError::Query(m)
            | SyncError::Format(m)
            | SyncError::Write(m) => m,
        }
    }

    /// Whether the failure was caused by the caller's input rather than a
    /// downstream system.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::ConfigError | ErrorKind::NotFoundError | ErrorKind::FormatError
        )
    }

    /// Map a local I/O error, treating a missing path as `NotFoundError` and
    /// anything else as the kind built by `otherwise`.
    pub fn from_io(err: std::io::Error, path: &str, otherwise: fn(String) -> SyncError) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            SyncError::NotFound(format!("file not found: {path}"))
        } else {
            otherwise(format!("I/O error on {path}: {err}"))
        }
    }
}

/// Result type alias for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
