//! # Tapgate Sync
//!
//! Authority client abstraction and the sync coordinator that keeps a
//! device's local store converged with the central authority.
//!
//! ## Architecture
//!
//! The coordinator implements a **pull-then-push** cycle:
//! 1. Pull the authoritative rule projection and replace the local
//!    cache wholesale
//! 2. Pull the authoritative event history and replace local rows for
//!    the holder (discarding unsynced duplicates)
//! 3. Push any events still unsynced, one at a time
//!
//! ## Key invariants
//!
//! - The authority is the source of truth; local state converges to
//!   whatever it reports
//! - Pull always happens before push, so a push/pull race cannot leave
//!    duplicate rows behind more than one cycle
//! - Events that carry a backend id are never pushed again
//! - Per-event push failures are tolerated: the event stays queued for
//!   the next cycle
//! - Retries are bounded ([`RetryConfig`]), with exponential backoff

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod authority;
mod config;
mod coordinator;
mod error;
mod http;

pub use authority::{AuthorityClient, MockAuthority};
pub use config::{RetryConfig, SyncConfig};
pub use coordinator::{SyncCoordinator, SyncReport, SyncState, SyncStats};
pub use error::{SyncError, SyncResult};
pub use http::{HttpAuthority, HttpClient};
