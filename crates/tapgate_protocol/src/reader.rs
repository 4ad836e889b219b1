//! The active (reader) side of the contactless exchange.

use crate::config::ReaderConfig;
use crate::error::ProtocolResult;
use crate::events::ReaderNotice;
use crate::link::CredentialLink;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::mpsc;
use std::sync::Arc;
use tapgate_core::{
    engine, AccessDecision, Clock, ControlPointId, EventId, Identity, NewEvent,
};
use tapgate_frame::{
    encode_command, parse_identity_response, Command, STATUS_SUCCESS,
};
use tapgate_store::{EventStore, RuleCache};
use tapgate_sync::AuthorityClient;

/// Operator-visible state of the reader.
///
/// Timed states carry their deadline; [`ReaderEndpoint::state`]
/// resolves expired deadlines back to `Scanning` lazily, so no
/// background timer exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    /// Waiting for a device.
    Scanning,
    /// A decision is being computed.
    Validating,
    /// Showing a decision result.
    ShowingResult {
        /// Whether the shown result is a grant.
        granted: bool,
        /// When the display period ends.
        until: DateTime<Utc>,
    },
    /// Showing the "credential not recognized" state.
    InvalidCredential {
        /// When the cool-down ends.
        until: DateTime<Utc>,
    },
}

/// How one transaction ended.
///
/// Only [`TransactionOutcome::Completed`] records an event; everything
/// else leaves no trace beyond an operator notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionOutcome {
    /// A decision was made and recorded.
    Completed {
        /// The decision.
        decision: AccessDecision,
        /// The recorded event's local id.
        event_id: EventId,
    },
    /// The device never acknowledged our application; not a credential.
    NotACredential,
    /// The device is a credential but its identity payload is unusable.
    InvalidCredential,
    /// The carrier was lost before a decision was made.
    Disconnected,
    /// The reader is still displaying a previous result or cool-down.
    Busy,
}

/// The control-point device.
///
/// Drives the select → get-data → decide → record → result sequence
/// against one discovered device per call to
/// [`ReaderEndpoint::present`]. Decisions prefer the authority and
/// fall back to cached rules within the same transaction when the
/// authority fails; the fall-back is reported once on the notice
/// channel, never shown to the person at the door.
pub struct ReaderEndpoint<A: AuthorityClient> {
    config: ReaderConfig,
    control_point: ControlPointId,
    authority: Arc<A>,
    rules: Arc<RuleCache>,
    events: Arc<EventStore>,
    clock: Arc<dyn Clock>,
    state: RwLock<ReaderState>,
    notices: mpsc::Sender<ReaderNotice>,
}

impl<A: AuthorityClient> ReaderEndpoint<A> {
    /// Creates a reader and the receiving end of its notice channel.
    pub fn new(
        config: ReaderConfig,
        control_point: ControlPointId,
        authority: Arc<A>,
        rules: Arc<RuleCache>,
        events: Arc<EventStore>,
        clock: Arc<dyn Clock>,
    ) -> (Self, mpsc::Receiver<ReaderNotice>) {
        let (notices, receiver) = mpsc::channel();
        (
            Self {
                config,
                control_point,
                authority,
                rules,
                events,
                clock,
                state: RwLock::new(ReaderState::Scanning),
                notices,
            },
            receiver,
        )
    }

    /// Current visible state, resolving expired deadlines.
    #[must_use]
    pub fn state(&self) -> ReaderState {
        let now = self.clock.now();
        let mut state = self.state.write();
        match *state {
            ReaderState::ShowingResult { until, .. } | ReaderState::InvalidCredential { until }
                if now >= until =>
            {
                *state = ReaderState::Scanning;
            }
            _ => {}
        }
        *state
    }

    /// The control point this reader guards.
    #[must_use]
    pub fn control_point(&self) -> ControlPointId {
        self.control_point
    }

    /// Runs one transaction against a discovered device.
    ///
    /// # Errors
    ///
    /// Only a local store failure while recording the event is an
    /// error; everything the contactless boundary can do wrong maps to
    /// a [`TransactionOutcome`].
    pub fn present(&self, link: &dyn CredentialLink) -> ProtocolResult<TransactionOutcome> {
        if self.state() != ReaderState::Scanning {
            return Ok(TransactionOutcome::Busy);
        }

        // Step 1: select. Anything but the success trailer means this
        // tag is not one of ours; walk away silently.
        let select = encode_command(&Command::SelectApplication(self.config.aid.clone()));
        match link.transmit(&select, self.config.command_timeout) {
            Ok(response) if response == STATUS_SUCCESS => {}
            Ok(_) => {
                tracing::debug!("device refused selection");
                return Ok(TransactionOutcome::NotACredential);
            }
            Err(error) => {
                tracing::debug!(%error, "carrier lost during select");
                return Ok(TransactionOutcome::Disconnected);
            }
        }

        // Step 2: identity.
        let get_data = encode_command(&Command::GetData);
        let response = match link.transmit(&get_data, self.config.command_timeout) {
            Ok(response) => response,
            Err(error) => {
                tracing::debug!(%error, "carrier lost during get-data");
                return Ok(TransactionOutcome::Disconnected);
            }
        };
        let identity = match parse_identity_response(&response) {
            Ok(identity) => identity,
            Err(error) => {
                tracing::warn!(%error, "unusable identity payload");
                self.enter_invalid_state(&error.to_string());
                return Ok(TransactionOutcome::InvalidCredential);
            }
        };

        // Step 3: decide.
        *self.state.write() = ReaderState::Validating;
        let decision = self.decide(&identity);

        // Step 4: record. A store failure here is a real fault.
        let draft = NewEvent::from_decision(
            identity.holder,
            self.control_point,
            self.clock.now(),
            &decision,
        );
        let event_id = match self.events.append(draft) {
            Ok(id) => id,
            Err(error) => {
                // Do not strand the lane in `Validating`.
                *self.state.write() = ReaderState::Scanning;
                return Err(error.into());
            }
        };

        // Step 5: feedback. A lost carrier cannot undo the recorded
        // decision; it only costs the visual confirmation.
        let result = if decision.granted {
            Command::AccessGranted(decision.reason.clone())
        } else {
            Command::AccessDenied(decision.reason.clone())
        };
        match link.transmit(&encode_command(&result), self.config.result_timeout) {
            Ok(response) if response == STATUS_SUCCESS => {}
            Ok(_) => {
                tracing::warn!("result frame not acknowledged");
                self.notify(ReaderNotice::FeedbackNotDelivered {
                    error: "result frame not acknowledged".into(),
                });
            }
            Err(error) => {
                tracing::warn!(%error, "visual feedback not delivered");
                self.notify(ReaderNotice::FeedbackNotDelivered {
                    error: error.to_string(),
                });
            }
        }

        // Step 6: show the result for the configured duration.
        *self.state.write() = ReaderState::ShowingResult {
            granted: decision.granted,
            until: self.clock.now() + self.config.display_duration,
        };

        Ok(TransactionOutcome::Completed { decision, event_id })
    }

    /// Computes the decision for an identity, online when possible.
    fn decide(&self, identity: &Identity) -> AccessDecision {
        if self.authority.is_reachable() {
            match self
                .authority
                .validate(identity.holder, self.control_point, self.clock.now())
            {
                Ok(decision) => return decision,
                Err(error) => {
                    tracing::warn!(%error, "authority unreachable, falling back to cache");
                    self.notify(ReaderNotice::OfflineFallback {
                        error: error.to_string(),
                    });
                }
            }
        }
        let cached = self.rules.lookup(identity.holder, self.control_point);
        engine::evaluate_cached(&cached, self.clock.now_local())
    }

    fn enter_invalid_state(&self, error: &str) {
        *self.state.write() = ReaderState::InvalidCredential {
            until: self.clock.now() + self.config.invalid_cooldown,
        };
        self.notify(ReaderNotice::InvalidCredential {
            error: error.to_string(),
        });
    }

    fn notify(&self, notice: ReaderNotice) {
        if self.notices.send(notice).is_err() {
            tracing::debug!("reader notice dropped: no subscriber");
        }
    }
}
