//! Carrier link abstraction between reader and credential.

use crate::credential::CredentialEndpoint;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors a carrier link can produce.
///
/// None of these are faults: a disconnect is the person walking away,
/// a timeout is a slow or departing carrier. The reader maps them to
/// transaction outcomes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// The carrier was lost (device moved out of field).
    #[error("carrier lost")]
    Disconnected,

    /// The round trip did not complete in time.
    #[error("transmit timed out")]
    Timeout,

    /// The underlying transport failed.
    #[error("link failure: {0}")]
    Failed(String),
}

/// One exclusive session with a discovered credential device.
///
/// Implementations wrap the platform's contactless transceive call.
/// A link is handed to [`crate::ReaderEndpoint::present`] after
/// discovery and is dead after the session ends; sessions are never
/// reused across physical taps.
pub trait CredentialLink: Send + Sync {
    /// Sends one command frame and waits for the response.
    ///
    /// `timeout` bounds the whole round trip; implementations must
    /// return [`LinkError::Timeout`] rather than blocking past it.
    fn transmit(&self, apdu: &[u8], timeout: Duration) -> Result<Vec<u8>, LinkError>;

    /// Returns true while the device is still in the field.
    fn is_present(&self) -> bool;
}

/// A link that delivers frames directly to an in-process
/// [`CredentialEndpoint`].
///
/// The test double for the contactless carrier: supports simulated
/// removal ([`LoopbackLink::set_present`]) and a countdown that cuts
/// the carrier after N round trips ([`LoopbackLink::drop_after`]).
pub struct LoopbackLink {
    endpoint: Arc<CredentialEndpoint>,
    present: AtomicBool,
    drop_after: AtomicUsize,
}

impl LoopbackLink {
    /// Creates a link attached to a credential endpoint.
    #[must_use]
    pub fn new(endpoint: Arc<CredentialEndpoint>) -> Self {
        Self {
            endpoint,
            present: AtomicBool::new(true),
            drop_after: AtomicUsize::new(usize::MAX),
        }
    }

    /// Simulates the device entering or leaving the field.
    pub fn set_present(&self, present: bool) {
        self.present.store(present, Ordering::SeqCst);
        if !present {
            self.endpoint.deactivate();
        }
    }

    /// Cuts the carrier after `round_trips` successful transmits.
    pub fn drop_after(&self, round_trips: usize) {
        self.drop_after.store(round_trips, Ordering::SeqCst);
    }
}

impl CredentialLink for LoopbackLink {
    fn transmit(&self, apdu: &[u8], _timeout: Duration) -> Result<Vec<u8>, LinkError> {
        if !self.is_present() {
            return Err(LinkError::Disconnected);
        }
        let remaining = self.drop_after.load(Ordering::SeqCst);
        if remaining == 0 {
            self.set_present(false);
            return Err(LinkError::Disconnected);
        }
        if remaining != usize::MAX {
            self.drop_after.store(remaining - 1, Ordering::SeqCst);
        }
        Ok(self.endpoint.process(apdu))
    }

    fn is_present(&self) -> bool {
        self.present.load(Ordering::SeqCst)
    }
}
