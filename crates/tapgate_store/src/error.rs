//! Error types for store operations.

use std::io;
use std::path::PathBuf;
use tapgate_core::EventId;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A row failed to encode or decode.
    #[error("codec error: {message}")]
    Codec {
        /// Description of the codec failure.
        message: String,
    },

    /// The log is structurally invalid beyond its tail.
    #[error("log corrupted: {message}")]
    Corrupt {
        /// Description of the corruption.
        message: String,
    },

    /// Attempted to read beyond the end of the log.
    #[error("read beyond end of log: offset {offset}, len {len}, size {size}")]
    ReadPastEnd {
        /// The requested read offset.
        offset: u64,
        /// The requested read length.
        len: usize,
        /// The current log size.
        size: u64,
    },

    /// Attempted to truncate the log beyond its end.
    #[error("truncate beyond end of log: requested {requested}, size {size}")]
    TruncateBeyondEnd {
        /// The requested new size.
        requested: u64,
        /// The current log size.
        size: u64,
    },

    /// Another process holds the store lock.
    #[error("store is locked by another process: {path}")]
    Locked {
        /// The store directory.
        path: PathBuf,
    },

    /// The referenced event does not exist.
    #[error("event not found: {id}")]
    EventNotFound {
        /// The missing event id.
        id: EventId,
    },

    /// A rule failed domain validation.
    #[error(transparent)]
    InvalidRule(#[from] tapgate_core::CoreError),
}

impl StoreError {
    /// Creates a codec error.
    pub fn codec(message: impl Into<String>) -> Self {
        Self::Codec {
            message: message.into(),
        }
    }

    /// Creates a corruption error.
    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::Corrupt {
            message: message.into(),
        }
    }
}
