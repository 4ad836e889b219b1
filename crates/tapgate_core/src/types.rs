//! Core identifier types for Tapgate.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! opaque_id {
    ($(#[$doc:meta])* $name:ident, $prefix:literal) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// Creates a new identifier.
            #[must_use]
            pub const fn new(id: u64) -> Self {
                Self(id)
            }

            /// Returns the raw identifier value.
            #[must_use]
            pub const fn as_u64(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, ":{}"), self.0)
            }
        }

        impl FromStr for $name {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let raw = s.strip_prefix(concat!($prefix, ":")).unwrap_or(s);
                raw.parse::<u64>()
                    .map(Self)
                    .map_err(|_| CoreError::InvalidId {
                        text: s.to_string(),
                    })
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }
    };
}

opaque_id!(
    /// Identifier of a digital credential (the emulated card).
    ///
    /// Credential identifiers are opaque: the reader never interprets
    /// them beyond equality and forwarding to the authority.
    CredentialId,
    "cred"
);

opaque_id!(
    /// Identifier of the person holding a credential.
    HolderId,
    "holder"
);

opaque_id!(
    /// Identifier of a physical control point (door, gate, turnstile).
    ControlPointId,
    "point"
);

opaque_id!(
    /// Identifier of a role granted to a holder.
    RoleId,
    "role"
);

opaque_id!(
    /// Locally assigned identifier of an access event.
    ///
    /// Event identifiers are monotonically increasing within one store
    /// and never reused.
    EventId,
    "event"
);

/// The identity read from a credential during a transaction.
///
/// An identity is immutable once parsed from a get-data payload. It is
/// never persisted on its own; it only appears embedded in an
/// [`crate::AccessEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    /// The credential that was presented.
    pub credential: CredentialId,
    /// The holder the credential belongs to.
    pub holder: HolderId,
}

impl Identity {
    /// Creates a new identity.
    #[must_use]
    pub const fn new(credential: CredentialId, holder: HolderId) -> Self {
        Self { credential, holder }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.credential, self.holder)
    }
}
