//! CRC-protected record framing over a log backend.
//!
//! Layout:
//!
//! ```text
//! magic (4) | version (2, LE)            <- log header
//! len (4, LE) | payload | crc32 (4, LE)  <- repeated records
//! ```
//!
//! The CRC covers the payload only. A torn write at the tail (partial
//! length, payload, or checksum) is expected after power loss and is
//! dropped silently on open; a checksum mismatch anywhere *before* the
//! tail means real corruption and fails the open.

use crate::backend::LogBackend;
use crate::error::{StoreError, StoreResult};

/// Magic bytes identifying a tapgate log file.
pub const LOG_MAGIC: [u8; 4] = *b"TGLG";
/// Current log format version.
pub const LOG_VERSION: u16 = 1;

const HEADER_LEN: u64 = 6;
const LEN_FIELD: u64 = 4;
const CRC_FIELD: u64 = 4;

/// Computes the IEEE CRC32 of `data`.
#[must_use]
pub(crate) fn compute_crc32(data: &[u8]) -> u32 {
    const CRC32_TABLE: [u32; 256] = {
        let mut table = [0u32; 256];
        let mut i = 0;
        while i < 256 {
            let mut crc = i as u32;
            let mut j = 0;
            while j < 8 {
                if crc & 1 != 0 {
                    crc = (crc >> 1) ^ 0xEDB8_8320;
                } else {
                    crc >>= 1;
                }
                j += 1;
            }
            table[i] = crc;
            i += 1;
        }
        table
    };

    let mut crc = 0xFFFF_FFFFu32;
    for &byte in data {
        let index = ((crc ^ u32::from(byte)) & 0xFF) as usize;
        crc = (crc >> 8) ^ CRC32_TABLE[index];
    }
    crc ^ 0xFFFF_FFFF
}

/// An append-only log of framed records.
///
/// `RecordLog` owns its backend; stores rebuild their in-memory state
/// from the payload list returned by [`RecordLog::open`] and then only
/// append (or [`RecordLog::reset`] for full rewrites).
pub struct RecordLog {
    backend: Box<dyn LogBackend>,
    end: u64,
    recovered_truncation: bool,
}

impl RecordLog {
    /// Opens a log and replays all intact records.
    ///
    /// An empty backend is initialized with a fresh header. A torn tail
    /// is truncated away and noted (see
    /// [`RecordLog::recovered_truncation`]).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Corrupt`] on a bad magic, an unsupported
    /// version, or a checksum mismatch before the tail.
    pub fn open(mut backend: Box<dyn LogBackend>) -> StoreResult<(Self, Vec<Vec<u8>>)> {
        let size = backend.len()?;
        let mut recovered = false;

        if size < HEADER_LEN {
            if size > 0 {
                // Torn header write; the log never held a record.
                tracing::warn!(size, "dropping torn log header");
                backend.truncate(0)?;
                recovered = true;
            }
            let mut header = Vec::with_capacity(HEADER_LEN as usize);
            header.extend_from_slice(&LOG_MAGIC);
            header.extend_from_slice(&LOG_VERSION.to_le_bytes());
            backend.append(&header)?;
            backend.sync()?;
            return Ok((
                Self {
                    backend,
                    end: HEADER_LEN,
                    recovered_truncation: recovered,
                },
                Vec::new(),
            ));
        }

        let header = backend.read_at(0, HEADER_LEN as usize)?;
        if header[..4] != LOG_MAGIC {
            return Err(StoreError::corrupt("bad log magic"));
        }
        let version = u16::from_le_bytes([header[4], header[5]]);
        if version != LOG_VERSION {
            return Err(StoreError::corrupt(format!(
                "unsupported log version {version}"
            )));
        }

        let mut payloads = Vec::new();
        let mut pos = HEADER_LEN;
        loop {
            let remaining = size - pos;
            if remaining == 0 {
                break;
            }
            if remaining < LEN_FIELD {
                tracing::warn!(offset = pos, "dropping torn record length");
                backend.truncate(pos)?;
                recovered = true;
                break;
            }

            let len_bytes = backend.read_at(pos, LEN_FIELD as usize)?;
            let payload_len =
                u64::from(u32::from_le_bytes([len_bytes[0], len_bytes[1], len_bytes[2], len_bytes[3]]));
            let record_len = LEN_FIELD + payload_len + CRC_FIELD;

            if remaining < record_len {
                tracing::warn!(offset = pos, "dropping torn record tail");
                backend.truncate(pos)?;
                recovered = true;
                break;
            }

            let payload = backend.read_at(pos + LEN_FIELD, payload_len as usize)?;
            let crc_bytes = backend.read_at(pos + LEN_FIELD + payload_len, CRC_FIELD as usize)?;
            let stored_crc =
                u32::from_le_bytes([crc_bytes[0], crc_bytes[1], crc_bytes[2], crc_bytes[3]]);

            if compute_crc32(&payload) != stored_crc {
                if pos + record_len == size {
                    // Checksum of the very last record does not match:
                    // a torn write, not corruption.
                    tracing::warn!(offset = pos, "dropping record with torn checksum");
                    backend.truncate(pos)?;
                    recovered = true;
                    break;
                }
                return Err(StoreError::corrupt(format!(
                    "checksum mismatch at offset {pos}"
                )));
            }

            payloads.push(payload);
            pos += record_len;
        }

        let end = backend.len()?;
        Ok((
            Self {
                backend,
                end,
                recovered_truncation: recovered,
            },
            payloads,
        ))
    }

    /// Appends one record and makes it durable.
    pub fn append(&mut self, payload: &[u8]) -> StoreResult<()> {
        let mut buf = Vec::with_capacity(payload.len() + 8);
        buf.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        buf.extend_from_slice(payload);
        buf.extend_from_slice(&compute_crc32(payload).to_le_bytes());
        self.backend.append(&buf)?;
        self.backend.sync()?;
        self.end += buf.len() as u64;
        Ok(())
    }

    /// Replaces the entire log content with the given records.
    ///
    /// The rewrite happens under the caller's write lock; readers of
    /// the owning store never observe the intermediate state.
    pub fn reset(&mut self, payloads: &[Vec<u8>]) -> StoreResult<()> {
        self.backend.truncate(0)?;
        let mut header = Vec::with_capacity(HEADER_LEN as usize);
        header.extend_from_slice(&LOG_MAGIC);
        header.extend_from_slice(&LOG_VERSION.to_le_bytes());
        self.backend.append(&header)?;
        self.end = HEADER_LEN;
        for payload in payloads {
            let mut buf = Vec::with_capacity(payload.len() + 8);
            buf.extend_from_slice(&(payload.len() as u32).to_le_bytes());
            buf.extend_from_slice(payload);
            buf.extend_from_slice(&compute_crc32(payload).to_le_bytes());
            self.backend.append(&buf)?;
            self.end += buf.len() as u64;
        }
        self.backend.sync()?;
        Ok(())
    }

    /// Returns true if a torn tail was dropped during open.
    #[must_use]
    pub fn recovered_truncation(&self) -> bool {
        self.recovered_truncation
    }

    /// Returns the size of the log in bytes.
    pub fn size(&self) -> StoreResult<u64> {
        self.backend.len()
    }

    #[cfg(test)]
    pub(crate) fn raw_for_tests(&self) -> Vec<u8> {
        let size = self.backend.len().unwrap();
        self.backend.read_at(0, size as usize).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBackend;

    fn open_mem(data: Vec<u8>) -> StoreResult<(RecordLog, Vec<Vec<u8>>)> {
        RecordLog::open(Box::new(MemoryBackend::with_data(data)))
    }

    #[test]
    fn crc32_known_vectors() {
        assert_eq!(compute_crc32(b"123456789"), 0xCBF4_3926);
        assert_eq!(compute_crc32(b""), 0x0000_0000);
    }

    #[test]
    fn empty_log_gets_header() {
        let (log, payloads) = open_mem(Vec::new()).unwrap();
        assert!(payloads.is_empty());
        assert!(!log.recovered_truncation());
        assert_eq!(log.size().unwrap(), 6);
    }

    fn read_all(log: &RecordLog) -> Vec<u8> {
        log.raw_for_tests()
    }

    #[test]
    fn append_then_reopen() {
        let (mut log, _) = open_mem(Vec::new()).unwrap();
        log.append(b"one").unwrap();
        log.append(b"two").unwrap();

        let (log, payloads) = open_mem(read_all(&log)).unwrap();
        assert_eq!(payloads, vec![b"one".to_vec(), b"two".to_vec()]);
        assert!(!log.recovered_truncation());
    }

    #[test]
    fn torn_tail_is_dropped() {
        let (mut log, _) = open_mem(Vec::new()).unwrap();
        log.append(b"good").unwrap();
        let mut raw = read_all(&log);
        // Simulate a torn write: a record length with no payload.
        raw.extend_from_slice(&9u32.to_le_bytes());
        raw.push(0xAB);

        let (log, payloads) = open_mem(raw).unwrap();
        assert_eq!(payloads, vec![b"good".to_vec()]);
        assert!(log.recovered_truncation());
    }

    #[test]
    fn flipped_bit_in_last_record_is_dropped() {
        let (mut log, _) = open_mem(Vec::new()).unwrap();
        log.append(b"only").unwrap();
        let mut raw = read_all(&log);
        let idx = raw.len() - 6; // inside the payload
        raw[idx] ^= 0x01;

        let (log, payloads) = open_mem(raw).unwrap();
        assert!(payloads.is_empty());
        assert!(log.recovered_truncation());
    }

    #[test]
    fn flipped_bit_before_tail_is_corruption() {
        let (mut log, _) = open_mem(Vec::new()).unwrap();
        log.append(b"first").unwrap();
        log.append(b"second").unwrap();
        let mut raw = read_all(&log);
        // Header is 6 bytes, the length field 4 more; offset 11 is
        // inside the first record's payload.
        raw[11] ^= 0x01;

        assert!(matches!(open_mem(raw), Err(StoreError::Corrupt { .. })));
    }

    #[test]
    fn bad_magic_is_corruption() {
        let raw = b"NOPE\x01\x00".to_vec();
        assert!(matches!(open_mem(raw), Err(StoreError::Corrupt { .. })));
    }

    #[test]
    fn reset_replaces_content() {
        let (mut log, _) = open_mem(Vec::new()).unwrap();
        log.append(b"old").unwrap();
        log.reset(&[b"new-1".to_vec(), b"new-2".to_vec()]).unwrap();

        let raw = read_all(&log);
        let (_, payloads) = open_mem(raw).unwrap();
        assert_eq!(payloads, vec![b"new-1".to_vec(), b"new-2".to_vec()]);
    }

    #[test]
    fn torn_header_is_reset() {
        let (log, payloads) = open_mem(b"TG".to_vec()).unwrap();
        assert!(payloads.is_empty());
        assert!(log.recovered_truncation());
        assert_eq!(log.size().unwrap(), 6);
    }

    proptest::proptest! {
        #[test]
        fn arbitrary_payloads_replay_exactly(
            payloads in proptest::collection::vec(
                proptest::collection::vec(proptest::prelude::any::<u8>(), 0..64),
                0..16,
            )
        ) {
            let (mut log, _) = open_mem(Vec::new()).unwrap();
            log.reset(&payloads).unwrap();
            let raw = read_all(&log);
            let (_, replayed) = open_mem(raw).unwrap();
            proptest::prop_assert_eq!(replayed, payloads);
        }
    }
}
