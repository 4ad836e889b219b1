//! # Tapgate Frame
//!
//! Binary command frame codec for the contactless link between a
//! credential device and a reader.
//!
//! The command vocabulary is closed: select-application, get-data, and
//! the two result pushes (granted/denied). Everything else decodes to
//! [`Command::Unknown`] - decoding is total and never panics, whatever
//! the input.
//!
//! ## Identity payload
//!
//! The get-data response carries the identity as delimited UTF-8 text
//! (`CRED:<id>|USER:<id>`) followed by the two-byte success trailer.
//! The text framing is deliberate: a malformed or partial read fails
//! safely and the raw payload stays diagnosable on the wire.
//!
//! ## Usage
//!
//! ```
//! use tapgate_frame::{decode, encode_command, Command, APPLICATION_ID};
//!
//! let bytes = encode_command(&Command::SelectApplication(APPLICATION_ID.to_vec()));
//! match decode(&bytes) {
//!     Command::SelectApplication(aid) => assert_eq!(aid, APPLICATION_ID),
//!     other => panic!("unexpected command: {other:?}"),
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod command;
mod decoder;
mod encoder;
mod error;

pub use command::{
    Command, APPLICATION_ID, RESPONSE_UNKNOWN, STATUS_FAILURE, STATUS_SUCCESS,
};
pub use decoder::{decode, parse_identity_response};
pub use encoder::{encode_command, encode_identity_response, encode_status};
pub use error::{FrameError, FrameResult};
