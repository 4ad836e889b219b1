//! Error types for sync operations.

use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur while talking to the authority or
/// reconciling local state.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Network or transport error.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// The response could not be interpreted.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The authority rejected the request.
    #[error("authority error: {0}")]
    Authority(String),

    /// Local store error during reconciliation.
    #[error("store error: {0}")]
    Store(#[from] tapgate_store::StoreError),

    /// The sync cycle was cancelled.
    #[error("sync cancelled")]
    Cancelled,

    /// A cycle was started while another was active.
    #[error("invalid state transition from {from} to {to}")]
    InvalidStateTransition {
        /// Current state.
        from: String,
        /// Attempted target state.
        to: String,
    },

    /// The authority is not reachable.
    #[error("authority not reachable")]
    NotReachable,

    /// The request timed out.
    #[error("operation timed out")]
    Timeout,
}

impl SyncError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if a retry might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Transport { retryable, .. } => *retryable,
            SyncError::Timeout | SyncError::NotReachable => true,
            SyncError::Authority(_) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(SyncError::transport_retryable("connection reset").is_retryable());
        assert!(!SyncError::transport_fatal("bad certificate").is_retryable());
        assert!(SyncError::Timeout.is_retryable());
        assert!(SyncError::NotReachable.is_retryable());
        assert!(!SyncError::Cancelled.is_retryable());
        assert!(!SyncError::Protocol("garbage body".into()).is_retryable());
    }

    #[test]
    fn display_carries_context() {
        let err = SyncError::InvalidStateTransition {
            from: "Pushing".into(),
            to: "sync".into(),
        };
        assert!(err.to_string().contains("Pushing"));
    }
}
