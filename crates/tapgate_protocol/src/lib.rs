//! # Tapgate Protocol
//!
//! The two endpoint state machines of the contactless exchange.
//!
//! - [`CredentialEndpoint`] is the passive side: it holds an injected
//!   identity, answers select/get-data, and surfaces inbound decision
//!   frames as [`DecisionNotice`] values on an explicit channel.
//! - [`ReaderEndpoint`] is the active side: it drives the fixed command
//!   sequence against a discovered device, obtains a decision (online
//!   with automatic offline fallback), records the access event, and
//!   pushes the visual result back.
//!
//! ## Threading model
//!
//! Frames arrive on whatever thread the hardware layer delivers them
//! on. Both endpoints are internally locked and never block in a
//! command handler; notifications go through `std::sync::mpsc` channels
//! so the state machines never assume a delivery thread. One physical
//! interface carries at most one session at a time - a "connect" is
//! exclusive until "disconnect" - and the endpoints rely on that for
//! sequencing, not for safety.
//!
//! ## Time
//!
//! Visible reader states (result display, invalid-credential cool-down)
//! are deadline-based against the injected [`tapgate_core::Clock`]; no
//! background timers exist. Polling [`ReaderEndpoint::state`] after a
//! deadline observes the return to scanning.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod credential;
mod error;
mod events;
mod link;
mod reader;

pub use config::{CredentialConfig, ReaderConfig};
pub use credential::{CredentialEndpoint, SessionState};
pub use error::{ProtocolError, ProtocolResult};
pub use events::{DecisionNotice, ReaderNotice};
pub use link::{CredentialLink, LinkError, LoopbackLink};
pub use reader::{ReaderEndpoint, ReaderState, TransactionOutcome};
