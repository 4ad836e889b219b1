//! Endpoint configuration.

use std::time::Duration;
use tapgate_frame::APPLICATION_ID;

/// Configuration of a credential endpoint.
///
/// One instance per emulated credential; there is deliberately no
/// global "current identity" - the identity is injected on the
/// instance (see [`crate::CredentialEndpoint::set_identity`]) so
/// independent instances can coexist under test.
#[derive(Debug, Clone)]
pub struct CredentialConfig {
    /// The AID this endpoint answers to.
    pub aid: Vec<u8>,
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            aid: APPLICATION_ID.to_vec(),
        }
    }
}

/// Configuration of a reader endpoint.
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// The AID the reader selects on a discovered device.
    pub aid: Vec<u8>,
    /// How long the result state stays visible before scanning resumes.
    pub display_duration: Duration,
    /// How long the invalid-credential state stays visible.
    pub invalid_cooldown: Duration,
    /// Timeout for the select and get-data round trips.
    pub command_timeout: Duration,
    /// Timeout for delivering the result frame.
    ///
    /// Generous on purpose: the person is already walking through and
    /// slow carriers should still get their feedback.
    pub result_timeout: Duration,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            aid: APPLICATION_ID.to_vec(),
            display_duration: Duration::from_secs(5),
            invalid_cooldown: Duration::from_secs(3),
            command_timeout: Duration::from_secs(2),
            result_timeout: Duration::from_secs(10),
        }
    }
}

impl ReaderConfig {
    /// Sets the result display duration.
    #[must_use]
    pub fn with_display_duration(mut self, duration: Duration) -> Self {
        self.display_duration = duration;
        self
    }

    /// Sets the invalid-credential cool-down.
    #[must_use]
    pub fn with_invalid_cooldown(mut self, duration: Duration) -> Self {
        self.invalid_cooldown = duration;
        self
    }

    /// Sets the result delivery timeout.
    #[must_use]
    pub fn with_result_timeout(mut self, duration: Duration) -> Self {
        self.result_timeout = duration;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_operational_timings() {
        let config = ReaderConfig::default();
        assert_eq!(config.display_duration, Duration::from_secs(5));
        assert_eq!(config.result_timeout, Duration::from_secs(10));
        assert_eq!(config.aid, APPLICATION_ID.to_vec());
    }
}
