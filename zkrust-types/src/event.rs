//! Real-time event frames
//!
//! Once registered, the terminal pushes unsolicited datagrams. Fields are read
//! from the whole datagram, header included:
//!
//! ```text
//! [8]     event type
//! [9:11]  uid          LE u16
//! [11:15] timestamp    LE u32, packed date-time
//! [15]    state
//! ```

use std::fmt;

use byteorder::{ByteOrder, LittleEndian};
use bytes::Bytes;
use chrono::NaiveDateTime;
use tracing::trace;

use crate::timestamp;

/// Kind of a pushed event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EventKind {
    Attendance,
    DoorOpen,
    DoorClose,
    Alarm,
    UserEnroll,
    UserDelete,
    SystemStart,
    SystemShutdown,
    Unknown,
}

impl EventKind {
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => Self::Attendance,
            2 => Self::DoorOpen,
            3 => Self::DoorClose,
            4 => Self::Alarm,
            5 => Self::UserEnroll,
            6 => Self::UserDelete,
            7 => Self::SystemStart,
            8 => Self::SystemShutdown,
            _ => Self::Unknown,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Attendance => "attendance",
            Self::DoorOpen => "door_open",
            Self::DoorClose => "door_close",
            Self::Alarm => "alarm",
            Self::UserEnroll => "user_enroll",
            Self::UserDelete => "user_delete",
            Self::SystemStart => "system_start",
            Self::SystemShutdown => "system_shutdown",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A decoded event
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeviceEvent {
    pub kind: EventKind,
    pub uid: u16,

    /// `None` when the packed field is not a calendar date
    pub timestamp: Option<NaiveDateTime>,
    pub state: u8,

    /// Whole datagram as received
    pub raw: Bytes,
}

impl DeviceEvent {
    /// Shortest datagram carrying an event
    pub const MIN_SIZE: usize = 16;

    /// Decode a pushed datagram
    ///
    /// Datagrams shorter than 16 bytes are noise and yield `None`. A frame
    /// whose timestamp field is not a date still decodes, without a time.
    pub fn decode(datagram: &[u8]) -> Option<Self> {
        if datagram.len() < Self::MIN_SIZE {
            trace!(len = datagram.len(), "Ignoring short datagram");
            return None;
        }

        let packed = LittleEndian::read_u32(&datagram[11..15]);
        let timestamp = match timestamp::decode(packed) {
            Ok(at) => Some(at),
            Err(e) => {
                trace!(packed, error = %e, "Event without a valid timestamp");
                None
            }
        };

        Some(Self {
            kind: EventKind::from_code(datagram[8]),
            uid: LittleEndian::read_u16(&datagram[9..11]),
            timestamp,
            state: datagram[15],
            raw: Bytes::copy_from_slice(datagram),
        })
    }

    /// Raw datagram as lowercase hex
    pub fn raw_hex(&self) -> String {
        hex::encode(&self.raw)
    }
}

impl fmt::Display for DeviceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Event[{}](uid={}, at=", self.kind, self.uid)?;
        match self.timestamp {
            Some(at) => write!(f, "{}", at)?,
            None => f.write_str("?")?,
        }
        write!(f, ", state={})", self.state)
    }
}
