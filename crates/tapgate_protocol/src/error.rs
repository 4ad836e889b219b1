//! Error types for the protocol crate.
//!
//! Most abnormal conditions at the contactless boundary are *outcomes*,
//! not errors: an incompatible tag, a torn carrier, a malformed
//! identity all map to [`crate::TransactionOutcome`] variants. Errors
//! are reserved for faults of the device itself.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur while driving a transaction.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The local store failed while recording an event.
    #[error("store error: {0}")]
    Store(#[from] tapgate_store::StoreError),
}
