//! Attendance log records
//!
//! The log stream starts with a 10-byte prefix followed by 40-byte chunks:
//!
//! ```text
//! [2:4]   uid          LE u16
//! [4:13]  badge id     NUL-stripped
//! [28]    state        verify / punch state
//! [29:33] timestamp    LE u32, packed date-time
//! [33]    record type
//! ```

use std::fmt;

use byteorder::{ByteOrder, LittleEndian};
use bytes::Bytes;
use chrono::{NaiveDate, NaiveDateTime};
use tracing::debug;

use crate::timestamp;

/// One punch read from the attendance log
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AttendanceRecord {
    pub uid: u16,

    /// Raw badge id with NULs removed
    pub badge_id: Bytes,

    pub state: u8,
    pub timestamp: NaiveDateTime,
    pub record_type: u8,
}

impl AttendanceRecord {
    /// Size of one log chunk
    pub const SIZE: usize = 40;

    /// Bytes preceding the first chunk in the log stream
    pub const STREAM_PREFIX: usize = 10;

    /// Badge id as text
    pub fn badge(&self) -> String {
        String::from_utf8_lossy(&self.badge_id).into_owned()
    }

    /// Decode one 40-byte chunk
    ///
    /// Returns `None` when the timestamp is not a calendar date-time.
    pub fn decode(chunk: &[u8; Self::SIZE]) -> Option<Self> {
        let packed = LittleEndian::read_u32(&chunk[29..33]);
        let timestamp = match timestamp::decode(packed) {
            Ok(ts) => ts,
            Err(e) => {
                debug!(error = %e, "Skipping attendance chunk");
                return None;
            }
        };

        let badge_id: Vec<u8> = chunk[4..13].iter().copied().filter(|&b| b != 0).collect();

        Some(Self {
            uid: LittleEndian::read_u16(&chunk[2..4]),
            badge_id: Bytes::from(badge_id),
            state: chunk[28],
            timestamp,
            record_type: chunk[33],
        })
    }

    /// Encode as a 40-byte log chunk
    ///
    /// Badge ids longer than 9 bytes are cut off.
    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut chunk = [0u8; Self::SIZE];
        chunk[2..4].copy_from_slice(&self.uid.to_le_bytes());

        let badge = &self.badge_id[..self.badge_id.len().min(9)];
        chunk[4..4 + badge.len()].copy_from_slice(badge);

        chunk[28] = self.state;
        chunk[29..33].copy_from_slice(&timestamp::encode_le(&self.timestamp));
        chunk[33] = self.record_type;
        chunk
    }

    /// Check if the punch happened on `date`
    pub fn is_on(&self, date: NaiveDate) -> bool {
        self.timestamp.date() == date
    }
}

impl fmt::Display for AttendanceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Punch[uid={}, badge={}, state={}, at={}]",
            self.uid,
            self.badge(),
            self.state,
            self.timestamp
        )
    }
}

/// Decode an attendance log stream
///
/// Chunks are read while at least 40 bytes remain after the prefix; chunks
/// with an impossible timestamp are dropped.
pub fn decode_attendance(stream: &[u8]) -> Vec<AttendanceRecord> {
    let Some(body) = stream.get(AttendanceRecord::STREAM_PREFIX..) else {
        return Vec::new();
    };

    body.chunks_exact(AttendanceRecord::SIZE)
        .filter_map(|chunk| <&[u8; AttendanceRecord::SIZE]>::try_from(chunk).ok())
        .filter_map(AttendanceRecord::decode)
        .collect()
}

/// The `limit` most recent records, newest first
pub fn most_recent(mut records: Vec<AttendanceRecord>, limit: usize) -> Vec<AttendanceRecord> {
    records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    records.truncate(limit);
    records
}
