//! Frame decoding: raw bytes to [`Command`], response payloads to
//! identities.

use crate::command::{
    Command, CLA, INS_GET_DATA, INS_RESULT, INS_SELECT, P1_DENIED, P1_GRANTED, P1_SELECT_BY_NAME,
    STATUS_FAILURE, STATUS_SUCCESS,
};
use crate::error::{FrameError, FrameResult};
use tapgate_core::{CredentialId, HolderId, Identity};

/// Decodes one command frame.
///
/// Decoding is total: buffers shorter than four bytes, unknown headers,
/// and truncated bodies all yield [`Command::Unknown`]. This function
/// never panics on any input.
#[must_use]
pub fn decode(bytes: &[u8]) -> Command {
    if bytes.len() < 4 {
        return Command::Unknown;
    }
    let (cla, ins, p1, p2) = (bytes[0], bytes[1], bytes[2], bytes[3]);
    if cla != CLA {
        return Command::Unknown;
    }
    let body = &bytes[4..];

    match (ins, p1, p2) {
        (INS_SELECT, P1_SELECT_BY_NAME, 0x00) => decode_select(body),
        (INS_GET_DATA, 0x00, 0x00) => Command::GetData,
        (INS_RESULT, P1_GRANTED, 0x00) => Command::AccessGranted(decode_message(body)),
        (INS_RESULT, P1_DENIED, 0x00) => Command::AccessDenied(decode_message(body)),
        _ => Command::Unknown,
    }
}

fn decode_select(body: &[u8]) -> Command {
    // Body is `Lc || AID`; a missing or truncated AID is not a valid
    // selection.
    let Some((&len, aid)) = body.split_first() else {
        return Command::Unknown;
    };
    let len = usize::from(len);
    if len == 0 || aid.len() < len {
        return Command::Unknown;
    }
    Command::SelectApplication(aid[..len].to_vec())
}

fn decode_message(body: &[u8]) -> String {
    // Result messages are for human display; salvage what is readable
    // rather than dropping the frame.
    String::from_utf8_lossy(body).into_owned()
}

/// Parses the get-data response into an [`Identity`].
///
/// The payload is `CRED:<int>|USER:<int>` followed by the success
/// trailer. Unknown keys are logged and ignored so the format can grow
/// without breaking old readers. A payload missing either required
/// field is an incomplete credential.
///
/// # Errors
///
/// - [`FrameError::Refused`] if the credential answered the failure
///   trailer instead of a payload
/// - [`FrameError::IncompleteIdentity`] if `CRED` or `USER` is absent
/// - [`FrameError::InvalidField`] if an id does not parse as an integer
/// - [`FrameError::InvalidUtf8`] / [`FrameError::ResponseTooShort`] /
///   [`FrameError::UnexpectedStatus`] on transport-level malformations
pub fn parse_identity_response(bytes: &[u8]) -> FrameResult<Identity> {
    if bytes.len() < 2 {
        return Err(FrameError::ResponseTooShort { len: bytes.len() });
    }
    let (payload, trailer) = bytes.split_at(bytes.len() - 2);
    if trailer == STATUS_FAILURE {
        return Err(FrameError::Refused);
    }
    if trailer != STATUS_SUCCESS {
        return Err(FrameError::UnexpectedStatus {
            sw1: trailer[0],
            sw2: trailer[1],
        });
    }

    let text = std::str::from_utf8(payload).map_err(|_| FrameError::InvalidUtf8)?;

    let mut credential: Option<CredentialId> = None;
    let mut holder: Option<HolderId> = None;

    for field in text.split('|') {
        let Some((key, value)) = field.split_once(':') else {
            tracing::debug!(field, "identity payload field without separator, ignoring");
            continue;
        };
        match key {
            "CRED" => credential = Some(CredentialId::new(parse_id(key, value)?)),
            "USER" => holder = Some(HolderId::new(parse_id(key, value)?)),
            other => {
                tracing::debug!(key = other, "unknown identity payload key, ignoring");
            }
        }
    }

    let credential = credential.ok_or(FrameError::IncompleteIdentity { field: "CRED" })?;
    let holder = holder.ok_or(FrameError::IncompleteIdentity { field: "USER" })?;
    Ok(Identity::new(credential, holder))
}

fn parse_id(key: &str, value: &str) -> FrameResult<u64> {
    value.parse::<u64>().map_err(|_| FrameError::InvalidField {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::APPLICATION_ID;
    use crate::encoder::{encode_command, encode_identity_response};
    use proptest::prelude::*;

    #[test]
    fn short_buffers_decode_to_unknown() {
        assert_eq!(decode(&[]), Command::Unknown);
        assert_eq!(decode(&[0x00]), Command::Unknown);
        assert_eq!(decode(&[0x00, 0xA4, 0x04]), Command::Unknown);
    }

    #[test]
    fn select_roundtrip() {
        let bytes = encode_command(&Command::SelectApplication(APPLICATION_ID.to_vec()));
        assert_eq!(
            decode(&bytes),
            Command::SelectApplication(APPLICATION_ID.to_vec())
        );
    }

    #[test]
    fn select_with_truncated_aid_is_unknown() {
        // Claims 7 AID bytes but carries 3.
        let bytes = [0x00, 0xA4, 0x04, 0x00, 0x07, 0xF0, 0x54, 0x41];
        assert_eq!(decode(&bytes), Command::Unknown);
    }

    #[test]
    fn select_with_zero_length_aid_is_unknown() {
        let bytes = [0x00, 0xA4, 0x04, 0x00, 0x00];
        assert_eq!(decode(&bytes), Command::Unknown);
    }

    #[test]
    fn get_data_decodes() {
        assert_eq!(decode(&[0x00, 0xCA, 0x00, 0x00, 0x00]), Command::GetData);
        // The trailing length byte is optional on the wire.
        assert_eq!(decode(&[0x00, 0xCA, 0x00, 0x00]), Command::GetData);
    }

    #[test]
    fn result_frames_carry_messages() {
        let bytes = encode_command(&Command::AccessGranted("Welcome".into()));
        assert_eq!(decode(&bytes), Command::AccessGranted("Welcome".into()));

        let bytes = encode_command(&Command::AccessDenied("Outside hours".into()));
        assert_eq!(decode(&bytes), Command::AccessDenied("Outside hours".into()));
    }

    #[test]
    fn result_with_empty_message_decodes() {
        assert_eq!(
            decode(&[0x00, 0xAC, 0x01, 0x00]),
            Command::AccessGranted(String::new())
        );
    }

    #[test]
    fn wrong_class_byte_is_unknown() {
        assert_eq!(decode(&[0x80, 0xCA, 0x00, 0x00, 0x00]), Command::Unknown);
    }

    #[test]
    fn identity_roundtrip() {
        let identity = Identity::new(CredentialId::new(42), HolderId::new(7));
        let bytes = encode_identity_response(&identity);
        assert_eq!(parse_identity_response(&bytes).unwrap(), identity);
    }

    #[test]
    fn identity_missing_user_is_incomplete() {
        let mut bytes = b"CRED:5".to_vec();
        bytes.extend_from_slice(&STATUS_SUCCESS);
        assert_eq!(
            parse_identity_response(&bytes),
            Err(FrameError::IncompleteIdentity { field: "USER" })
        );
    }

    #[test]
    fn identity_missing_cred_is_incomplete() {
        let mut bytes = b"USER:5".to_vec();
        bytes.extend_from_slice(&STATUS_SUCCESS);
        assert_eq!(
            parse_identity_response(&bytes),
            Err(FrameError::IncompleteIdentity { field: "CRED" })
        );
    }

    #[test]
    fn identity_unknown_keys_are_ignored() {
        let mut bytes = b"CRED:1|BADGE:zz|USER:2".to_vec();
        bytes.extend_from_slice(&STATUS_SUCCESS);
        let identity = parse_identity_response(&bytes).unwrap();
        assert_eq!(identity.credential, CredentialId::new(1));
        assert_eq!(identity.holder, HolderId::new(2));
    }

    #[test]
    fn identity_non_numeric_id_is_invalid_field() {
        let mut bytes = b"CRED:abc|USER:2".to_vec();
        bytes.extend_from_slice(&STATUS_SUCCESS);
        assert!(matches!(
            parse_identity_response(&bytes),
            Err(FrameError::InvalidField { .. })
        ));
    }

    #[test]
    fn identity_failure_trailer_is_refused() {
        assert_eq!(
            parse_identity_response(&STATUS_FAILURE),
            Err(FrameError::Refused)
        );
    }

    #[test]
    fn identity_odd_status_word_is_surfaced() {
        assert_eq!(
            parse_identity_response(&[0x6F, 0x00]),
            Err(FrameError::UnexpectedStatus {
                sw1: 0x6F,
                sw2: 0x00
            })
        );
    }

    proptest! {
        #[test]
        fn decode_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
            let _ = decode(&bytes);
        }

        #[test]
        fn parse_identity_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
            let _ = parse_identity_response(&bytes);
        }

        #[test]
        fn short_inputs_always_unknown(bytes in proptest::collection::vec(any::<u8>(), 0..4)) {
            prop_assert_eq!(decode(&bytes), Command::Unknown);
        }
    }
}
