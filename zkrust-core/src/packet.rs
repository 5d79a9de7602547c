//! Frame structure and encoding/decoding

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fmt;
use tracing::debug;

use crate::{
    checksum,
    command::Command,
    error::{Error, Result},
};

/// A single protocol frame
///
/// # Packet Structure
///
/// ```text
/// ┌─────────────┬─────────────┬─────────────┬─────────────┬─────────────┐
/// │   Command   │  Checksum   │  SessionID  │  ReplyID    │   Payload   │
/// │   2 bytes   │   2 bytes   │   2 bytes   │   2 bytes   │   N bytes   │
/// │ (LE u16)    │  (LE u16)   │  (LE u16)   │  (LE u16)   │   (bytes)   │
/// └─────────────┴─────────────┴─────────────┴─────────────┴─────────────┘
/// ```
///
/// # Examples
///
/// ```
/// use zkrust_core::{Packet, Command};
///
/// let packet = Packet::new(Command::Connect, 0, 0xFFFF);
/// let encoded = packet.encode();
///
/// let decoded = Packet::decode(&encoded).unwrap();
/// assert_eq!(packet, decoded);
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Packet {
    /// Command code
    pub command: Command,

    /// Session identifier (assigned by device on connect)
    pub session_id: u16,

    /// Reply number, echoed and incremented per exchange
    pub reply_id: u16,

    /// Packet payload (command-specific data)
    pub payload: Bytes,
}

impl Packet {
    /// Packet header size in bytes
    pub const HEADER_SIZE: usize = 8;

    /// Create a new packet with empty payload
    pub fn new(command: Command, session_id: u16, reply_id: u16) -> Self {
        Self {
            command,
            session_id,
            reply_id,
            payload: Bytes::new(),
        }
    }

    /// Create a packet with payload
    ///
    /// ```
    /// use zkrust_core::{Packet, Command};
    ///
    /// let packet = Packet::with_payload(Command::DeleteUser, 1234, 3, vec![42, 0]);
    /// assert_eq!(packet.size(), 10);
    /// ```
    pub fn with_payload(
        command: Command,
        session_id: u16,
        reply_id: u16,
        payload: impl Into<Bytes>,
    ) -> Self {
        Self {
            command,
            session_id,
            reply_id,
            payload: payload.into(),
        }
    }

    /// Calculate checksum for this packet
    pub fn checksum(&self) -> u16 {
        checksum::calculate(
            self.command.into(),
            self.session_id,
            self.reply_id,
            &self.payload,
        )
    }

    /// Encode packet to bytes
    pub fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(self.size());

        buf.put_u16_le(self.command.into());
        buf.put_u16_le(self.checksum());
        buf.put_u16_le(self.session_id);
        buf.put_u16_le(self.reply_id);
        buf.put_slice(&self.payload);

        buf
    }

    /// Read the raw header fields `(command, session_id, reply_id)` without
    /// interpreting the command code
    pub fn peek_header(buf: &[u8]) -> Result<(u16, u16, u16)> {
        if buf.len() < Self::HEADER_SIZE {
            return Err(Error::PacketTooShort {
                expected: Self::HEADER_SIZE,
                actual: buf.len(),
            });
        }

        let word = |at: usize| u16::from_le_bytes([buf[at], buf[at + 1]]);
        Ok((word(0), word(4), word(6)))
    }

    /// Decode a received datagram
    ///
    /// The checksum is advisory: a mismatch is logged and the frame is still
    /// returned, since session matching is what gates a reply.
    ///
    /// # Errors
    ///
    /// - Buffer is too short (< 8 bytes)
    /// - Command code is not in the catalog
    pub fn decode(buf: &[u8]) -> Result<Self> {
        let (packet, received) = Self::decode_parts(buf)?;

        let calculated = packet.checksum();
        if calculated != received {
            debug!(
                command = %packet.command,
                expected = format!("0x{:04X}", calculated),
                received = format!("0x{:04X}", received),
                "Ignoring checksum mismatch"
            );
        }

        Ok(packet)
    }

    /// Decode a datagram and reject it on checksum mismatch
    pub fn decode_strict(buf: &[u8]) -> Result<Self> {
        let (packet, received) = Self::decode_parts(buf)?;

        let calculated = packet.checksum();
        if calculated != received {
            return Err(Error::ChecksumMismatch {
                expected: calculated,
                received,
            });
        }

        Ok(packet)
    }

    fn decode_parts(buf: &[u8]) -> Result<(Self, u16)> {
        if buf.len() < Self::HEADER_SIZE {
            return Err(Error::PacketTooShort {
                expected: Self::HEADER_SIZE,
                actual: buf.len(),
            });
        }

        let mut header = &buf[..Self::HEADER_SIZE];
        let command_raw = header.get_u16_le();
        let checksum_received = header.get_u16_le();
        let session_id = header.get_u16_le();
        let reply_id = header.get_u16_le();

        let command = Command::try_from(command_raw)?;

        let packet = Self {
            command,
            session_id,
            reply_id,
            payload: Bytes::copy_from_slice(&buf[Self::HEADER_SIZE..]),
        };

        Ok((packet, checksum_received))
    }

    /// Check if this is a response packet (ACK)
    pub fn is_response(&self) -> bool {
        self.command.is_response()
    }

    /// Check if this is a success response
    pub fn is_success(&self) -> bool {
        self.command.is_success()
    }

    /// Check if the device refused the request
    pub fn is_error(&self) -> bool {
        self.command.is_error()
    }

    /// Get total packet size
    pub fn size(&self) -> usize {
        Self::HEADER_SIZE + self.payload.len()
    }
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packet")
            .field("command", &self.command)
            .field("session_id", &format!("0x{:04X}", self.session_id))
            .field("reply_id", &format!("0x{:04X}", self.reply_id))
            .field("checksum", &format!("0x{:04X}", self.checksum()))
            .field("payload", &hex::encode(&self.payload[..self.payload.len().min(32)]))
            .field("payload_len", &self.payload.len())
            .finish()
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Packet[{}](session={}, reply={}, len={})",
            self.command,
            self.session_id,
            self.reply_id,
            self.payload.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_packet_wire_layout() {
        let packet = Packet::with_payload(Command::DeleteUser, 0x1234, 0x0102, vec![42, 0]);
        let encoded = packet.encode();

        assert_eq!(&encoded[0..2], &[0x12, 0x00]); // 18, LE
        assert_eq!(&encoded[4..6], &[0x34, 0x12]);
        assert_eq!(&encoded[6..8], &[0x02, 0x01]);
        assert_eq!(&encoded[8..], &[42, 0]);
        assert_eq!(
            u16::from_le_bytes([encoded[2], encoded[3]]),
            packet.checksum()
        );
    }

    #[test]
    fn test_packet_encode_decode() {
        let original = Packet::with_payload(Command::UserWrq, 7, 9, vec![1, 2, 3, 4]);

        let encoded = original.encode();
        let decoded = Packet::decode(&encoded).unwrap();

        assert_eq!(original, decoded);
    }

    #[test]
    fn test_decode_tolerates_bad_checksum() {
        let packet = Packet::new(Command::AckOk, 77, 3);
        let mut encoded = packet.encode();
        encoded[2] ^= 0xFF;
        encoded[3] ^= 0xFF;

        let decoded = Packet::decode(&encoded).unwrap();
        assert_eq!(decoded, packet);
    }

    #[test]
    fn test_decode_strict_rejects_bad_checksum() {
        let packet = Packet::new(Command::Connect, 0, 65534);
        let mut encoded = packet.encode();
        encoded[2] ^= 0xFF;
        encoded[3] ^= 0xFF;

        match Packet::decode_strict(&encoded) {
            Err(Error::ChecksumMismatch { expected, received }) => assert_ne!(expected, received),
            other => panic!("Expected ChecksumMismatch error, got {:?}", other),
        }
    }

    #[test]
    fn test_packet_too_short() {
        assert!(matches!(
            Packet::decode(&[1, 2, 3]),
            Err(Error::PacketTooShort { expected: 8, actual: 3 })
        ));
        assert!(Packet::peek_header(&[0; 7]).is_err());
    }

    #[test]
    fn test_unknown_command_code() {
        let raw = [0x39, 0x30, 0, 0, 1, 0, 2, 0]; // 12345
        assert!(matches!(Packet::decode(&raw), Err(Error::UnknownCommand(12345))));
        assert_eq!(Packet::peek_header(&raw).unwrap(), (12345, 1, 2));
    }

    #[test]
    fn test_is_response() {
        assert!(Packet::new(Command::AckOk, 0, 0).is_response());
        assert!(Packet::new(Command::AckError, 0, 0).is_error());
        assert!(!Packet::new(Command::Connect, 0, 0).is_response());
    }

    proptest! {
        #[test]
        fn prop_header_round_trip(
            code in prop::sample::select(vec![
                Command::Connect, Command::Exit, Command::UserTempRrq,
                Command::AckOk, Command::PrepareData, Command::RegEvent,
            ]),
            session_id in any::<u16>(),
            reply_id in any::<u16>(),
            payload in proptest::collection::vec(any::<u8>(), 0..48),
        ) {
            let packet = Packet::with_payload(code, session_id, reply_id, payload);
            let decoded = Packet::decode_strict(&packet.encode()).unwrap();

            prop_assert_eq!(decoded.command, code);
            prop_assert_eq!(decoded.session_id, session_id);
            prop_assert_eq!(decoded.reply_id, reply_id);
            prop_assert_eq!(decoded.payload, packet.payload);
        }
    }
}
