//! Error types for Tapgate core.

use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in core type handling.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// An identifier could not be parsed.
    #[error("invalid identifier: {text:?}")]
    InvalidId {
        /// The text that failed to parse.
        text: String,
    },

    /// A day-of-week value outside 0..=6.
    #[error("invalid day of week: {value} (expected 0..=6, 0 = Sunday)")]
    InvalidDayOfWeek {
        /// The offending value.
        value: u8,
    },

    /// A wall-clock time component was out of range.
    #[error("invalid time of day: {hour:02}:{minute:02}")]
    InvalidTimeOfDay {
        /// Hour component.
        hour: u32,
        /// Minute component.
        minute: u32,
    },
}
