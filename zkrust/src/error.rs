//! High-level error types

use zkrust_core::{Command, FailureReason};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Core protocol error: {0}")]
    Core(#[from] zkrust_core::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] zkrust_transport::Error),

    #[error("Record error: {0}")]
    Types(#[from] zkrust_types::Error),

    #[error("Device not connected")]
    NotConnected,

    #[error("Device refused the session")]
    ConnectRefused,

    #[error("{command} failed: {reason}")]
    CommandFailed {
        command: Command,
        reason: FailureReason,
    },

    #[error("Invalid response from device: {0}")]
    InvalidResponse(String),

    #[error("No free {0} slot")]
    SlotsExhausted(zkrust_types::TemplateKind),

    #[error("Operation not supported: {0}")]
    NotSupported(String),
}

impl Error {
    /// Check if the same call may succeed when simply repeated
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Core(e) => e.is_recoverable(),
            Self::Transport(e) => e.is_timeout(),
            Self::CommandFailed { reason, .. } => matches!(
                reason,
                FailureReason::Timeout | FailureReason::Transport(_) | FailureReason::Malformed(_)
            ),
            _ => false,
        }
    }

    /// Check if the session is unusable and a new `connect` is needed
    pub fn requires_reconnect(&self) -> bool {
        match self {
            Self::NotConnected | Self::ConnectRefused => true,
            Self::Core(e) => e.requires_reconnect(),
            Self::Transport(e) => !e.is_timeout(),
            Self::CommandFailed { reason, .. } => {
                matches!(reason, FailureReason::SessionMismatch { .. })
            }
            _ => false,
        }
    }
}
