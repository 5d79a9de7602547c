//! Reply classification
//!
//! Every exchange ends in exactly one [`CommandOutcome`]. Classification is a
//! pure function of the command kind, the stored session id and the reply
//! frame, so it can be checked without a socket.

use std::fmt;

use bytes::Bytes;

use crate::command::Command;
use crate::packet::Packet;

/// How a command's answer is delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// The whole answer fits in the reply payload
    General,

    /// The reply opens a bulk transfer that is read separately
    Data,
}

/// Why an exchange did not produce a usable answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// Socket send or receive failed
    Transport(String),

    /// No reply arrived before the receive timeout
    Timeout,

    /// Reply could not be decoded as a frame
    Malformed(String),

    /// General reply carried another session id
    SessionMismatch { expected: u16, actual: u16 },

    /// Data reply carried session id 0
    MissingDataToken,

    /// Device answered with an error acknowledgement
    Rejected(Command),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "transport error: {}", e),
            Self::Timeout => f.write_str("timed out waiting for reply"),
            Self::Malformed(e) => write!(f, "malformed reply: {}", e),
            Self::SessionMismatch { expected, actual } => {
                write!(f, "session mismatch (expected {}, got {})", expected, actual)
            }
            Self::MissingDataToken => f.write_str("data reply without session token"),
            Self::Rejected(command) => write!(f, "device rejected request with {}", command),
        }
    }
}

/// Result of a single dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Payload past the reply header
    General(Bytes),

    /// Session token announcing a bulk transfer
    DataToken(u16),

    /// No usable answer
    Failure(FailureReason),
}

impl CommandOutcome {
    /// Classify a reply frame
    ///
    /// - `General`: the reply's session must equal `expected_session`, and an
    ///   error acknowledgement counts as a rejection
    /// - `Data`: any non-zero reply session is a token for the transfer
    pub fn classify(kind: CommandKind, expected_session: u16, reply: &Packet) -> Self {
        match kind {
            CommandKind::General if reply.session_id == expected_session => {
                if reply.is_error() {
                    Self::Failure(FailureReason::Rejected(reply.command))
                } else {
                    Self::General(reply.payload.clone())
                }
            }
            CommandKind::General => Self::Failure(FailureReason::SessionMismatch {
                expected: expected_session,
                actual: reply.session_id,
            }),
            CommandKind::Data if reply.session_id != 0 => Self::DataToken(reply.session_id),
            CommandKind::Data => Self::Failure(FailureReason::MissingDataToken),
        }
    }

    /// Check if the exchange succeeded
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failure(_))
    }

    /// Payload of a general reply
    pub fn payload(&self) -> Option<&Bytes> {
        match self {
            Self::General(payload) => Some(payload),
            _ => None,
        }
    }
}
