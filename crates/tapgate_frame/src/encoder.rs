//! Frame encoding: commands, identity payloads, and status trailers.

use crate::command::{
    Command, CLA, INS_GET_DATA, INS_RESULT, INS_SELECT, P1_DENIED, P1_GRANTED, P1_SELECT_BY_NAME,
    RESPONSE_UNKNOWN, STATUS_FAILURE, STATUS_SUCCESS,
};
use bytes::{BufMut, BytesMut};
use tapgate_core::Identity;

/// Encodes a command for transmission.
///
/// [`Command::Unknown`] encodes as the two-byte unknown marker; it
/// exists so a decoded frame can be echoed back verbatim in tests.
#[must_use]
pub fn encode_command(command: &Command) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(16);
    match command {
        Command::SelectApplication(aid) => {
            buf.put_slice(&[CLA, INS_SELECT, P1_SELECT_BY_NAME, 0x00]);
            buf.put_u8(aid.len() as u8);
            buf.put_slice(aid);
        }
        Command::GetData => {
            buf.put_slice(&[CLA, INS_GET_DATA, 0x00, 0x00, 0x00]);
        }
        Command::AccessGranted(message) => {
            buf.put_slice(&[CLA, INS_RESULT, P1_GRANTED, 0x00]);
            buf.put_slice(message.as_bytes());
        }
        Command::AccessDenied(message) => {
            buf.put_slice(&[CLA, INS_RESULT, P1_DENIED, 0x00]);
            buf.put_slice(message.as_bytes());
        }
        Command::Unknown => {
            buf.put_slice(&RESPONSE_UNKNOWN);
        }
    }
    buf.to_vec()
}

/// Encodes the get-data response for an identity.
///
/// Produces `CRED:<id>|USER:<id>` as UTF-8 followed by the success
/// trailer.
#[must_use]
pub fn encode_identity_response(identity: &Identity) -> Vec<u8> {
    let text = format!(
        "CRED:{}|USER:{}",
        identity.credential.as_u64(),
        identity.holder.as_u64()
    );
    let mut buf = BytesMut::with_capacity(text.len() + 2);
    buf.put_slice(text.as_bytes());
    buf.put_slice(&STATUS_SUCCESS);
    buf.to_vec()
}

/// Encodes the bare status trailer used for command acknowledgements.
#[must_use]
pub fn encode_status(success: bool) -> [u8; 2] {
    if success {
        STATUS_SUCCESS
    } else {
        STATUS_FAILURE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tapgate_core::{CredentialId, HolderId};

    #[test]
    fn select_layout() {
        let bytes = encode_command(&Command::SelectApplication(vec![0xF0, 0x01]));
        assert_eq!(bytes, vec![0x00, 0xA4, 0x04, 0x00, 0x02, 0xF0, 0x01]);
    }

    #[test]
    fn get_data_layout() {
        assert_eq!(
            encode_command(&Command::GetData),
            vec![0x00, 0xCA, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn result_layout() {
        let bytes = encode_command(&Command::AccessGranted("Hi".into()));
        assert_eq!(&bytes[..4], &[0x00, 0xAC, 0x01, 0x00]);
        assert_eq!(&bytes[4..], b"Hi");

        let bytes = encode_command(&Command::AccessDenied(String::new()));
        assert_eq!(bytes, vec![0x00, 0xAC, 0x00, 0x00]);
    }

    #[test]
    fn identity_payload_layout() {
        let identity = Identity::new(CredentialId::new(42), HolderId::new(7));
        let bytes = encode_identity_response(&identity);
        assert_eq!(&bytes[..bytes.len() - 2], b"CRED:42|USER:7");
        assert_eq!(&bytes[bytes.len() - 2..], &STATUS_SUCCESS);
    }

    #[test]
    fn status_trailers() {
        assert_eq!(encode_status(true), [0x90, 0x00]);
        assert_eq!(encode_status(false), [0x6A, 0x82]);
    }
}
