//! # Tapgate Core
//!
//! Domain types and the pure access decision engine for Tapgate.
//!
//! This crate provides:
//! - Opaque identifiers for credentials, holders, control points and roles
//! - Policy rule types with time-of-day and calendar windows
//! - Access events as the unit of local/remote reconciliation
//! - A pure, clock-free decision engine
//!
//! ## Purity
//!
//! Nothing in this crate performs I/O. The decision engine takes the
//! current instant as an argument and never consults a clock, which makes
//! every decision reproducible in tests. The [`Clock`] trait exists only
//! as the seam through which the protocol layer obtains "now".
//!
//! ## Usage
//!
//! ```
//! use std::collections::BTreeSet;
//! use chrono::NaiveDate;
//! use tapgate_core::{engine, AccessRule, ControlPointId, RoleId, TimeWindow};
//!
//! let rule = AccessRule::new(ControlPointId::new(1))
//!     .with_role(RoleId::new(7))
//!     .with_time_window(TimeWindow::from_hms(9, 0, 17, 0).unwrap());
//!
//! let mut roles = BTreeSet::new();
//! roles.insert(RoleId::new(7));
//!
//! let now = NaiveDate::from_ymd_opt(2025, 3, 10)
//!     .unwrap()
//!     .and_hms_opt(10, 0, 0)
//!     .unwrap();
//! let decision = engine::evaluate(&[rule], &roles, now);
//! assert!(decision.granted);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod clock;
pub mod engine;
mod error;
mod event;
mod rule;
mod types;

pub use clock::{Clock, SystemClock};
pub use error::{CoreError, CoreResult};
pub use event::{AccessDecision, AccessEvent, NewEvent};
pub use rule::{AccessRule, CachedRule, DateWindow, TimeWindow};
pub use types::{ControlPointId, CredentialId, EventId, HolderId, Identity, RoleId};
