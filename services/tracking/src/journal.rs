//! Append-only fix journal with checksums
//!
//! Durable record of every ingested GPS fix. The location store writes
//! here before it acknowledges a fix; on startup the journal is replayed
//! to rebuild the in-memory indexes.
//!
//! # Binary format (per entry)
//! ```text
//! [body_len:  u32]
//! [sequence:  u64]
//! [timestamp: i64]   // Unix milliseconds of the fix
//! [payload_len: u32][payload: bytes]   // bincode LocationFix
//! [checksum: u32]    // CRC32C over sequence+timestamp+payload
//! ```
//!
//! Replay stops at the first corrupt or truncated entry (torn write at
//! crash) and keeps the intact prefix.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crc32c::crc32c;
use thiserror::Error;
use tracing::{info, warn};
use types::location::LocationFix;

#[derive(Error, Debug)]
pub enum JournalError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("corrupt entry at offset {offset}: {reason}")]
    Corrupt { offset: usize, reason: String },
}

/// A single journal entry representing one persisted fix.
#[derive(Debug, Clone, PartialEq)]
pub struct JournalEntry {
    /// Monotonic per-journal sequence number
    pub sequence: u64,
    /// Fix timestamp, Unix milliseconds
    pub timestamp: i64,
    /// Bincode-serialized `LocationFix`
    pub payload: Vec<u8>,
    /// CRC32C over (sequence ++ timestamp ++ payload)
    pub checksum: u32,
}

impl JournalEntry {
    /// Create a new entry, computing the checksum automatically.
    pub fn new(sequence: u64, timestamp: i64, payload: Vec<u8>) -> Self {
        let checksum = Self::compute_checksum(sequence, timestamp, &payload);
        Self {
            sequence,
            timestamp,
            payload,
            checksum,
        }
    }

    pub fn compute_checksum(sequence: u64, timestamp: i64, payload: &[u8]) -> u32 {
        let mut buf = Vec::with_capacity(8 + 8 + payload.len());
        buf.extend_from_slice(&sequence.to_le_bytes());
        buf.extend_from_slice(&timestamp.to_le_bytes());
        buf.extend_from_slice(payload);
        crc32c(&buf)
    }

    pub fn verify_checksum(&self) -> bool {
        self.checksum == Self::compute_checksum(self.sequence, self.timestamp, &self.payload)
    }

    /// Serialize entry to the binary wire format.
    pub fn to_bytes(&self) -> Vec<u8> {
        let payload_len = self.payload.len() as u32;
        // body = 8 (seq) + 8 (ts) + 4 (pl_len) + payload + 4 (crc)
        let body_len: u32 = 8 + 8 + 4 + payload_len + 4;

        let mut buf = Vec::with_capacity(4 + body_len as usize);
        buf.extend_from_slice(&body_len.to_le_bytes());
        buf.extend_from_slice(&self.sequence.to_le_bytes());
        buf.extend_from_slice(&self.timestamp.to_le_bytes());
        buf.extend_from_slice(&payload_len.to_le_bytes());
        buf.extend_from_slice(&self.payload);
        buf.extend_from_slice(&self.checksum.to_le_bytes());
        buf
    }

    /// Deserialize one entry from `data`, returning `(entry, bytes_consumed)`.
    pub fn from_bytes(data: &[u8]) -> Result<(Self, usize), JournalError> {
        let need = |len: usize, reason: &str| JournalError::Corrupt {
            offset: len,
            reason: reason.to_string(),
        };

        if data.len() < 4 {
            return Err(need(0, "not enough data for length prefix"));
        }
        let body_len = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;

        // Reject implausible lengths (likely corruption) before allocating.
        if body_len < 24 || body_len > 1_000_000 {
            return Err(need(0, &format!("implausible body length {body_len}")));
        }

        let total = 4 + body_len;
        if data.len() < total {
            return Err(need(
                0,
                &format!("incomplete entry: need {total} bytes, have {}", data.len()),
            ));
        }

        let sequence = u64::from_le_bytes(data[4..12].try_into().expect("slice len 8"));
        let timestamp = i64::from_le_bytes(data[12..20].try_into().expect("slice len 8"));
        let payload_len =
            u32::from_le_bytes(data[20..24].try_into().expect("slice len 4")) as usize;

        if body_len != 24 + payload_len {
            return Err(need(0, "payload length disagrees with body length"));
        }

        let payload = data[24..24 + payload_len].to_vec();
        let checksum = u32::from_le_bytes(
            data[24 + payload_len..24 + payload_len + 4]
                .try_into()
                .expect("slice len 4"),
        );

        let entry = Self {
            sequence,
            timestamp,
            payload,
            checksum,
        };
        if !entry.verify_checksum() {
            return Err(need(0, "checksum mismatch"));
        }
        Ok((entry, total))
    }

    /// Decode the payload back into a fix.
    pub fn decode_fix(&self) -> Result<LocationFix, JournalError> {
        bincode::deserialize(&self.payload)
            .map_err(|e| JournalError::Serialization(e.to_string()))
    }
}

/// Append-only journal writer for location fixes.
pub struct FixJournal {
    writer: BufWriter<File>,
    path: PathBuf,
    next_sequence: u64,
}

impl FixJournal {
    /// Open (or create) a journal, replaying existing entries.
    ///
    /// Returns the writer positioned at the tail plus every fix recovered
    /// from the file.
    pub fn open(path: impl AsRef<Path>) -> Result<(Self, Vec<LocationFix>), JournalError> {
        let path = path.as_ref().to_path_buf();
        let recovered = if path.exists() {
            Self::read_fixes(&path)?
        } else {
            Vec::new()
        };

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let journal = Self {
            writer: BufWriter::new(file),
            path,
            next_sequence: recovered.len() as u64 + 1,
        };

        info!(
            path = %journal.path.display(),
            recovered = recovered.len(),
            "fix journal opened"
        );
        Ok((journal, recovered))
    }

    /// Read every intact fix from a journal file.
    ///
    /// Replay stops at the first corrupt or incomplete entry: the intact
    /// prefix is returned and the damaged tail is logged and dropped.
    pub fn read_fixes(path: impl AsRef<Path>) -> Result<Vec<LocationFix>, JournalError> {
        let mut data = Vec::new();
        File::open(path.as_ref())?.read_to_end(&mut data)?;

        let mut fixes = Vec::new();
        let mut offset = 0;
        while offset < data.len() {
            match JournalEntry::from_bytes(&data[offset..]) {
                Ok((entry, consumed)) => {
                    fixes.push(entry.decode_fix()?);
                    offset += consumed;
                }
                Err(err) => {
                    // A torn final entry is expected after a crash.
                    warn!(
                        offset,
                        trailing_bytes = data.len() - offset,
                        error = %err,
                        "dropping corrupt journal tail"
                    );
                    break;
                }
            }
        }
        Ok(fixes)
    }

    /// Append one fix, flushing it to the file before returning.
    pub fn append(&mut self, fix: &LocationFix) -> Result<u64, JournalError> {
        let payload =
            bincode::serialize(fix).map_err(|e| JournalError::Serialization(e.to_string()))?;
        let entry = JournalEntry::new(self.next_sequence, fix.timestamp.timestamp_millis(), payload);

        self.writer.write_all(&entry.to_bytes())?;
        self.writer.flush()?;

        let sequence = self.next_sequence;
        self.next_sequence += 1;
        Ok(sequence)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use types::ids::{BusId, FixId, TripId};

    fn make_fix(n: i64) -> LocationFix {
        LocationFix {
            id: FixId::new(),
            bus: BusId::new(),
            trip: Some(TripId::new()),
            latitude: 6.9271,
            longitude: 79.8612,
            speed: 40.0 + n as f64,
            heading: 90.0,
            timestamp: Utc.timestamp_millis_opt(1_755_000_000_000 + n * 1000).unwrap(),
        }
    }

    #[test]
    fn test_entry_roundtrip() {
        let payload = bincode::serialize(&make_fix(1)).unwrap();
        let entry = JournalEntry::new(1, 1_755_000_000_000, payload);
        let bytes = entry.to_bytes();

        let (decoded, consumed) = JournalEntry::from_bytes(&bytes).unwrap();
        assert_eq!(consumed, bytes.len());
        assert_eq!(decoded, entry);
        assert!(decoded.verify_checksum());
    }

    #[test]
    fn test_checksum_detects_flip() {
        let payload = bincode::serialize(&make_fix(1)).unwrap();
        let entry = JournalEntry::new(1, 1_755_000_000_000, payload);
        let mut bytes = entry.to_bytes();
        let mid = bytes.len() / 2;
        bytes[mid] ^= 0xFF;

        assert!(JournalEntry::from_bytes(&bytes).is_err());
    }

    #[test]
    fn test_append_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fixes.journal");

        let fixes: Vec<LocationFix> = (0..3).map(make_fix).collect();
        {
            let (mut journal, recovered) = FixJournal::open(&path).unwrap();
            assert!(recovered.is_empty());
            for fix in &fixes {
                journal.append(fix).unwrap();
            }
        }

        let (journal, recovered) = FixJournal::open(&path).unwrap();
        assert_eq!(recovered, fixes);
        assert_eq!(journal.next_sequence(), 4);
    }

    #[test]
    fn test_truncated_tail_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fixes.journal");

        {
            let (mut journal, _) = FixJournal::open(&path).unwrap();
            journal.append(&make_fix(0)).unwrap();
            journal.append(&make_fix(1)).unwrap();
        }

        // Simulate a torn write by chopping bytes off the end.
        let data = std::fs::read(&path).unwrap();
        std::fs::write(&path, &data[..data.len() - 7]).unwrap();

        let recovered = FixJournal::read_fixes(&path).unwrap();
        assert_eq!(recovered.len(), 1);
        assert_eq!(recovered[0].speed, 40.0);
    }

    #[test]
    fn test_empty_journal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fixes.journal");
        let (journal, recovered) = FixJournal::open(&path).unwrap();
        assert!(recovered.is_empty());
        assert_eq!(journal.next_sequence(), 1);
    }
}
