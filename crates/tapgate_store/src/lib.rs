//! # Tapgate Store
//!
//! Durable local state for a reader device: the offline rule cache and
//! the access event store.
//!
//! ## Architecture
//!
//! Both tables are built on the same primitive: an append-only log of
//! CRC-protected records over a [`LogBackend`] (in-memory for tests,
//! file-backed for devices). Each store replays its log on open to
//! rebuild in-memory state, so reads never touch the backend.
//!
//! - [`RuleCache`] holds the offline projection of the policy rules and
//!   supports only destructive full replacement; stale rules must never
//!   linger, so there is no incremental merge.
//! - [`EventStore`] is an operation log over access events: appends,
//!   sync acknowledgements, and authoritative full refreshes per
//!   holder.
//!
//! ## Single writer
//!
//! A device owns its store directory exclusively; [`StoreDir`] takes an
//! advisory lock so a second process fails fast with
//! [`StoreError::Locked`]. Within a process, the reader endpoint and
//! the sync coordinator share one store instance and are serialized by
//! its internal write lock.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod dir;
mod error;
mod event_store;
mod file;
mod memory;
mod record;
mod rule_cache;

pub use backend::LogBackend;
pub use dir::{LocalStore, StoreDir};
pub use error::{StoreError, StoreResult};
pub use event_store::EventStore;
pub use file::FileBackend;
pub use memory::MemoryBackend;
pub use record::{RecordLog, LOG_MAGIC, LOG_VERSION};
pub use rule_cache::RuleCache;
