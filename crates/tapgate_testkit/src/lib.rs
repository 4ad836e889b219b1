//! # Tapgate Testkit
//!
//! Test utilities shared across the workspace:
//! - Fixtures: a controllable clock, identities, rule builders, and
//!   temporary file-backed stores
//! - Property-based generators for frames and schedule windows
//!
//! ## Usage
//!
//! ```
//! use tapgate_testkit::{FixedClock, weekday_rule};
//! use tapgate_core::{Clock, ControlPointId, HolderId};
//!
//! let clock = FixedClock::at("2025-03-10T10:00:00Z");
//! let rule = weekday_rule(HolderId::new(1), ControlPointId::new(1));
//! assert!(rule.matches(clock.now_local()));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

pub use fixtures::*;
pub use generators::*;
