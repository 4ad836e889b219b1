//! Error types for the frame crate.
//!
//! Note that [`crate::decode`] is total and never returns these; they
//! only arise when the *reader* interprets a response payload.

use thiserror::Error;

/// Result type for frame operations.
pub type FrameResult<T> = Result<T, FrameError>;

/// Errors that can occur while interpreting a response payload.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// The credential answered with the failure trailer.
    #[error("request refused by credential")]
    Refused,

    /// The response ended with a status word outside the vocabulary.
    #[error("unexpected status word: {sw1:02X} {sw2:02X}")]
    UnexpectedStatus {
        /// First status byte.
        sw1: u8,
        /// Second status byte.
        sw2: u8,
    },

    /// The response was too short to carry a status trailer.
    #[error("response too short: {len} bytes")]
    ResponseTooShort {
        /// Observed length.
        len: usize,
    },

    /// The identity payload was not valid UTF-8.
    #[error("identity payload is not valid UTF-8")]
    InvalidUtf8,

    /// The identity payload is missing a required field.
    #[error("incomplete identity payload: missing {field}")]
    IncompleteIdentity {
        /// Name of the missing field (`CRED` or `USER`).
        field: &'static str,
    },

    /// A field carried a value that does not parse.
    #[error("invalid value for {key}: {value:?}")]
    InvalidField {
        /// Field key.
        key: String,
        /// Offending value text.
        value: String,
    },
}
