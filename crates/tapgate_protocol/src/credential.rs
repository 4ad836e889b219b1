//! The passive (credential) side of the contactless exchange.

use crate::config::CredentialConfig;
use crate::events::DecisionNotice;
use parking_lot::RwLock;
use std::sync::mpsc;
use std::sync::Arc;
use tapgate_core::{Clock, Identity};
use tapgate_frame::{
    decode, encode_identity_response, encode_status, Command, RESPONSE_UNKNOWN,
};

/// Session state of a credential endpoint.
///
/// One physical session at a time; the carrier guarantees that, not
/// this type. A disconnect at any point resets to `Idle` silently -
/// the device moving away is expected behavior, not a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No session in progress.
    Idle,
    /// The reader selected our application.
    Selected,
    /// The identity payload was handed over.
    DataSent,
    /// A decision frame came back.
    ResultReceived,
}

/// The emulated access card.
///
/// Holds a per-instance identity (injected, never global) and answers
/// the reader's command sequence. Inbound decision frames surface as
/// [`DecisionNotice`] values on the channel returned by
/// [`CredentialEndpoint::new`].
///
/// [`CredentialEndpoint::process`] is non-blocking and safe to call
/// from whatever thread the hardware delivers frames on.
pub struct CredentialEndpoint {
    config: CredentialConfig,
    identity: RwLock<Option<Identity>>,
    state: RwLock<SessionState>,
    notices: mpsc::Sender<DecisionNotice>,
    clock: Arc<dyn Clock>,
}

impl CredentialEndpoint {
    /// Creates an endpoint and the receiving end of its notice channel.
    pub fn new(
        config: CredentialConfig,
        clock: Arc<dyn Clock>,
    ) -> (Self, mpsc::Receiver<DecisionNotice>) {
        let (notices, receiver) = mpsc::channel();
        (
            Self {
                config,
                identity: RwLock::new(None),
                state: RwLock::new(SessionState::Idle),
                notices,
                clock,
            },
            receiver,
        )
    }

    /// Injects the identity this endpoint presents.
    pub fn set_identity(&self, identity: Identity) {
        *self.identity.write() = Some(identity);
    }

    /// Removes the configured identity.
    pub fn clear_identity(&self) {
        *self.identity.write() = None;
    }

    /// Current session state.
    #[must_use]
    pub fn session_state(&self) -> SessionState {
        *self.state.read()
    }

    /// Handles one inbound command frame and returns the response.
    ///
    /// Never fails: protocol errors are answered with the unknown
    /// marker and leave the state untouched, so the reader can retry
    /// within the same session.
    pub fn process(&self, apdu: &[u8]) -> Vec<u8> {
        let command = decode(apdu);
        let state = self.session_state();
        tracing::debug!(command = command.name(), ?state, "credential frame");

        match command {
            Command::SelectApplication(aid) => {
                if aid == self.config.aid {
                    *self.state.write() = SessionState::Selected;
                    encode_status(true).to_vec()
                } else {
                    // Not our application; the session state is
                    // untouched so a correct retry still works.
                    encode_status(false).to_vec()
                }
            }
            Command::GetData => {
                if state != SessionState::Selected {
                    return RESPONSE_UNKNOWN.to_vec();
                }
                match *self.identity.read() {
                    Some(identity) => {
                        *self.state.write() = SessionState::DataSent;
                        encode_identity_response(&identity)
                    }
                    None => {
                        // Operator error, not a protocol error: stay
                        // selected so configuring an identity and
                        // retrying works.
                        tracing::warn!("get-data with no identity configured");
                        encode_status(false).to_vec()
                    }
                }
            }
            Command::AccessGranted(message) if state == SessionState::DataSent => {
                self.receive_result(true, message)
            }
            Command::AccessDenied(message) if state == SessionState::DataSent => {
                self.receive_result(false, message)
            }
            _ => RESPONSE_UNKNOWN.to_vec(),
        }
    }

    fn receive_result(&self, granted: bool, message: String) -> Vec<u8> {
        *self.state.write() = SessionState::ResultReceived;
        let notice = DecisionNotice {
            granted,
            message,
            received_at: self.clock.now(),
        };
        if self.notices.send(notice).is_err() {
            tracing::debug!("decision notice dropped: no subscriber");
        }
        encode_status(true).to_vec()
    }

    /// Resets the session on carrier loss.
    ///
    /// Called by the hardware adapter on deactivation; valid in any
    /// state and never an error.
    pub fn deactivate(&self) {
        let mut state = self.state.write();
        if *state != SessionState::Idle {
            tracing::debug!(from = ?*state, "session reset on carrier loss");
        }
        *state = SessionState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tapgate_core::{CredentialId, HolderId, SystemClock};
    use tapgate_frame::{encode_command, parse_identity_response, APPLICATION_ID, STATUS_FAILURE, STATUS_SUCCESS};

    fn endpoint() -> (CredentialEndpoint, mpsc::Receiver<DecisionNotice>) {
        CredentialEndpoint::new(CredentialConfig::default(), Arc::new(SystemClock))
    }

    fn select_frame() -> Vec<u8> {
        encode_command(&Command::SelectApplication(APPLICATION_ID.to_vec()))
    }

    fn get_data_frame() -> Vec<u8> {
        encode_command(&Command::GetData)
    }

    #[test]
    fn full_session_happy_path() {
        let (endpoint, notices) = endpoint();
        endpoint.set_identity(Identity::new(CredentialId::new(5), HolderId::new(9)));

        assert_eq!(endpoint.process(&select_frame()), STATUS_SUCCESS.to_vec());
        assert_eq!(endpoint.session_state(), SessionState::Selected);

        let response = endpoint.process(&get_data_frame());
        let identity = parse_identity_response(&response).unwrap();
        assert_eq!(identity.holder, HolderId::new(9));
        assert_eq!(endpoint.session_state(), SessionState::DataSent);

        let result = encode_command(&Command::AccessGranted("Welcome".into()));
        assert_eq!(endpoint.process(&result), STATUS_SUCCESS.to_vec());
        assert_eq!(endpoint.session_state(), SessionState::ResultReceived);

        let notice = notices.try_recv().unwrap();
        assert!(notice.granted);
        assert_eq!(notice.message, "Welcome");
    }

    #[test]
    fn commands_before_selection_are_unknown() {
        let (endpoint, _notices) = endpoint();
        endpoint.set_identity(Identity::new(CredentialId::new(1), HolderId::new(1)));

        assert_eq!(endpoint.process(&get_data_frame()), RESPONSE_UNKNOWN.to_vec());
        assert_eq!(endpoint.session_state(), SessionState::Idle);

        // The session is held open: selecting now still works.
        assert_eq!(endpoint.process(&select_frame()), STATUS_SUCCESS.to_vec());
    }

    #[test]
    fn wrong_aid_is_refused_without_state_change() {
        let (endpoint, _notices) = endpoint();
        let frame = encode_command(&Command::SelectApplication(vec![0xDE, 0xAD]));
        assert_eq!(endpoint.process(&frame), STATUS_FAILURE.to_vec());
        assert_eq!(endpoint.session_state(), SessionState::Idle);
    }

    #[test]
    fn get_data_without_identity_fails_but_stays_selected() {
        let (endpoint, _notices) = endpoint();
        endpoint.process(&select_frame());

        assert_eq!(endpoint.process(&get_data_frame()), STATUS_FAILURE.to_vec());
        assert_eq!(endpoint.session_state(), SessionState::Selected);

        // Configure and retry within the same session.
        endpoint.set_identity(Identity::new(CredentialId::new(2), HolderId::new(3)));
        let response = endpoint.process(&get_data_frame());
        assert!(parse_identity_response(&response).is_ok());
    }

    #[test]
    fn result_before_data_sent_is_unknown() {
        let (endpoint, notices) = endpoint();
        endpoint.set_identity(Identity::new(CredentialId::new(1), HolderId::new(1)));
        endpoint.process(&select_frame());

        let result = encode_command(&Command::AccessDenied("early".into()));
        assert_eq!(endpoint.process(&result), RESPONSE_UNKNOWN.to_vec());
        assert!(notices.try_recv().is_err());
    }

    #[test]
    fn denied_result_raises_notice() {
        let (endpoint, notices) = endpoint();
        endpoint.set_identity(Identity::new(CredentialId::new(1), HolderId::new(1)));
        endpoint.process(&select_frame());
        endpoint.process(&get_data_frame());

        let result = encode_command(&Command::AccessDenied("Outside hours".into()));
        endpoint.process(&result);

        let notice = notices.try_recv().unwrap();
        assert!(!notice.granted);
        assert_eq!(notice.message, "Outside hours");
    }

    #[test]
    fn deactivate_resets_any_state() {
        let (endpoint, _notices) = endpoint();
        endpoint.set_identity(Identity::new(CredentialId::new(1), HolderId::new(1)));
        endpoint.process(&select_frame());
        endpoint.process(&get_data_frame());

        endpoint.deactivate();
        assert_eq!(endpoint.session_state(), SessionState::Idle);

        // Deactivating an idle endpoint is also fine.
        endpoint.deactivate();
        assert_eq!(endpoint.session_state(), SessionState::Idle);
    }

    #[test]
    fn garbage_frames_are_answered_not_raised() {
        let (endpoint, _notices) = endpoint();
        assert_eq!(endpoint.process(&[]), RESPONSE_UNKNOWN.to_vec());
        assert_eq!(endpoint.process(&[0xFF, 0xFF]), RESPONSE_UNKNOWN.to_vec());
        assert_eq!(endpoint.process(&[0x00, 0x00, 0x00, 0x00, 0x00]), RESPONSE_UNKNOWN.to_vec());
    }

    #[test]
    fn dropped_receiver_does_not_block_session() {
        let (endpoint, notices) = endpoint();
        drop(notices);
        endpoint.set_identity(Identity::new(CredentialId::new(1), HolderId::new(1)));
        endpoint.process(&select_frame());
        endpoint.process(&get_data_frame());

        let result = encode_command(&Command::AccessGranted("ok".into()));
        assert_eq!(endpoint.process(&result), STATUS_SUCCESS.to_vec());
    }
}
