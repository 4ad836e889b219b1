//! Notification types emitted by the endpoints.
//!
//! Both endpoints push notifications onto plain `mpsc` channels; UI
//! collaborators subscribe to the receiving end. Dropping the receiver
//! is allowed - notifications are best-effort and never block the
//! protocol state machines.

use chrono::{DateTime, Utc};

/// A decision received by the credential device.
///
/// Raised by [`crate::CredentialEndpoint`] when the reader pushes a
/// result frame; this is what the phone UI renders (green/red screen,
/// buzz).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionNotice {
    /// Whether passage was granted.
    pub granted: bool,
    /// Human-readable message from the reader.
    pub message: String,
    /// When the frame arrived.
    pub received_at: DateTime<Utc>,
}

/// An operator-facing condition on the reader side.
///
/// These never reach the person presenting a credential; the only
/// surface they see is granted / denied / not-recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReaderNotice {
    /// The authority could not be reached; this transaction fell back
    /// to cached rules.
    OfflineFallback {
        /// The transport error that triggered the fallback.
        error: String,
    },
    /// A decision was recorded but the result frame never made it to
    /// the credential device.
    FeedbackNotDelivered {
        /// The link error encountered.
        error: String,
    },
    /// A device answered the select but presented an unusable identity.
    InvalidCredential {
        /// What was wrong with the payload.
        error: String,
    },
}
