//! Protocol constants

use bitflags::bitflags;

/// Reply ids wrap modulo this value rather than at `u16::MAX + 1`
pub const USHRT_MAX: u16 = 65535;

/// Reply id carried by the CONNECT frame (`-1` as an unsigned short)
pub const CONNECT_REPLY_ID: u16 = 0xFFFF;

/// Receive timeout that mirrors the terminal's heartbeat tolerance (seconds)
pub const DEVICE_RECEIVE_TIMEOUT: u64 = 60;

/// Default socket setup timeout (seconds)
pub const DEFAULT_CONNECT_TIMEOUT: u64 = 5;

/// Largest datagram the terminal sends during a bulk transfer
pub const MAX_DATAGRAM_SIZE: usize = 1032;

bitflags! {
    /// Real-time event classes requested with `CMD_REG_EVENT`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EventFlags: u32 {
        /// Attendance log event
        const ATTLOG = 1;
        /// Fingerprint pressed
        const FINGER = 1 << 1;
        /// User enrolled
        const ENROLL_USER = 1 << 2;
        /// Fingerprint enrolled
        const ENROLL_FINGER = 1 << 3;
        /// Button pressed
        const BUTTON = 1 << 4;
        /// Door unlocked
        const UNLOCK = 1 << 5;
        /// Verification event
        const VERIFY = 1 << 7;
        /// Fingerprint minutiae captured
        const FP_FEATURE = 1 << 8;
        /// Alarm signal
        const ALARM = 1 << 9;
    }
}

impl EventFlags {
    /// `CMD_REG_EVENT` payload for this mask
    pub fn to_payload(self) -> [u8; 4] {
        self.bits().to_le_bytes()
    }
}

/// Table selectors sent with bulk read requests
pub mod data_types {
    /// Attendance log
    pub const FCT_ATTLOG: u8 = 1;

    /// Fingerprint template
    pub const FCT_FINGERTMP: u8 = 2;

    /// User record
    pub const FCT_USER: u8 = 5;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_flag_payload() {
        assert_eq!(EventFlags::ATTLOG.to_payload(), [1, 0, 0, 0]);
        assert_eq!(EventFlags::empty().to_payload(), [0, 0, 0, 0]);
        assert_eq!(
            (EventFlags::ATTLOG | EventFlags::ALARM).to_payload(),
            [0x01, 0x02, 0, 0]
        );
    }
}
