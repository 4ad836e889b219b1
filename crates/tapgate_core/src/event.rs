//! Access events and decisions.

use crate::types::{ControlPointId, EventId, HolderId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The outcome of evaluating a request for passage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessDecision {
    /// Whether passage is granted.
    pub granted: bool,
    /// Human-readable reason, shown on the credential device.
    pub reason: String,
}

impl AccessDecision {
    /// Creates a granting decision.
    pub fn granted(reason: impl Into<String>) -> Self {
        Self {
            granted: true,
            reason: reason.into(),
        }
    }

    /// Creates a denying decision.
    pub fn denied(reason: impl Into<String>) -> Self {
        Self {
            granted: false,
            reason: reason.into(),
        }
    }
}

/// A recorded passage attempt.
///
/// Events are created by the reader at decision time and mutated only
/// by the sync layer (to attach a backend id) or replaced wholesale by
/// an authoritative refresh.
///
/// # Invariants
///
/// - `backend_id.is_some()` means the authority has accepted this event;
///   it is authoritative and must never be re-submitted.
/// - `backend_id.is_none()` means the event is a candidate for sync.
/// - `synced` implies `backend_id.is_some()` for locally created events;
///   rows installed from authoritative history carry both already set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessEvent {
    /// Locally assigned identifier.
    pub id: EventId,
    /// Authority-assigned identifier, present once accepted.
    pub backend_id: Option<u64>,
    /// The holder who presented a credential.
    pub holder: HolderId,
    /// The control point where the attempt happened.
    pub control_point: ControlPointId,
    /// When the attempt happened.
    pub occurred_at: DateTime<Utc>,
    /// Whether passage was granted.
    pub granted: bool,
    /// Reason attached to the decision.
    pub reason: String,
    /// Whether the authority has confirmed this event.
    pub synced: bool,
}

impl AccessEvent {
    /// Returns true if the authority has accepted this event.
    ///
    /// Authoritative events are never pushed again.
    #[must_use]
    pub fn is_authoritative(&self) -> bool {
        self.backend_id.is_some()
    }
}

/// A not-yet-stored access event, as produced by the reader.
///
/// The store assigns the local [`EventId`] on append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    /// The holder who presented a credential.
    pub holder: HolderId,
    /// The control point where the attempt happened.
    pub control_point: ControlPointId,
    /// When the attempt happened.
    pub occurred_at: DateTime<Utc>,
    /// Whether passage was granted.
    pub granted: bool,
    /// Reason attached to the decision.
    pub reason: String,
}

impl NewEvent {
    /// Creates a new event draft from a decision.
    pub fn from_decision(
        holder: HolderId,
        control_point: ControlPointId,
        occurred_at: DateTime<Utc>,
        decision: &AccessDecision,
    ) -> Self {
        Self {
            holder,
            control_point,
            occurred_at,
            granted: decision.granted,
            reason: decision.reason.clone(),
        }
    }
}
