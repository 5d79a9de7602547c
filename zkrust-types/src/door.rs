//! Door relay control and status

use std::fmt;

use crate::error::{Result, ensure_len};

/// Door operated when callers do not name one
pub const DEFAULT_DOOR: u8 = 1;

/// Relay action sent with a door control request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DoorAction {
    Open = 1,
    Close = 2,
    Lock = 3,
    Unlock = 4,
}

impl DoorAction {
    /// Control payload: door id, action, two reserved bytes
    pub fn payload(self, door_id: u8) -> [u8; 4] {
        [door_id, self as u8, 0, 0]
    }
}

impl fmt::Display for DoorAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Open => "open",
            Self::Close => "close",
            Self::Lock => "lock",
            Self::Unlock => "unlock",
        };
        f.write_str(name)
    }
}

/// Payload of a door status query
pub fn status_request(door_id: u8) -> [u8; 4] {
    [door_id, 0, 0, 0]
}

/// Decoded door status bits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DoorStatus {
    pub open: bool,
    pub locked: bool,
    pub sensor_active: bool,
    pub alarm_active: bool,
}

impl DoorStatus {
    /// Bytes a status reply must carry; a fourth byte is reserved
    pub const MIN_SIZE: usize = 3;

    /// Decode a status reply payload
    ///
    /// ```text
    /// byte 0  bit 0 = open, bit 1 = alarm
    /// byte 1  bit 0 = locked
    /// byte 2  bit 0 = sensor
    /// ```
    pub fn decode(payload: &[u8]) -> Result<Self> {
        ensure_len("door status", payload, Self::MIN_SIZE)?;

        Ok(Self {
            open: payload[0] & 0x01 != 0,
            alarm_active: payload[0] & 0x02 != 0,
            locked: payload[1] & 0x01 != 0,
            sensor_active: payload[2] & 0x01 != 0,
        })
    }
}

impl fmt::Display for DoorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Door[{}, {}{}{}]",
            if self.open { "open" } else { "closed" },
            if self.locked { "locked" } else { "unlocked" },
            if self.sensor_active { ", sensor" } else { "" },
            if self.alarm_active { ", ALARM" } else { "" }
        )
    }
}
