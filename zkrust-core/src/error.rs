//! Frame and session errors

pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while framing datagrams or driving the session state
///
/// Problems with a reply's content (wrong session, error acknowledgement)
/// are not errors at this level; see [`crate::FailureReason`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Datagram of {actual} bytes is shorter than the {expected}-byte header")]
    PacketTooShort { expected: usize, actual: usize },

    /// Only raised by strict decoding
    #[error("Checksum mismatch: computed 0x{expected:04X}, frame carries 0x{received:04X}")]
    ChecksumMismatch { expected: u16, received: u16 },

    #[error("Unknown command code: {0}")]
    UnknownCommand(u16),

    /// Operation not allowed in the current session state
    #[error("Invalid session state: {0}")]
    InvalidSessionState(String),
}

impl Error {
    /// Check if a fresh datagram may decode fine
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::ChecksumMismatch { .. } | Self::PacketTooShort { .. })
    }

    /// Check if the session must be reset with a new connect
    pub fn requires_reconnect(&self) -> bool {
        matches!(self, Self::InvalidSessionState(_))
    }
}
