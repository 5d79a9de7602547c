//! # zkrust-core
//!
//! Wire-level primitives for the terminal UDP protocol:
//! - 8-byte frame header with the ones-complement checksum
//! - Command catalog
//! - Session state machine and reply-id bookkeeping
//! - Classification of replies into [`CommandOutcome`]s
//!
//! Nothing here touches a socket; every function is driven by byte slices
//! and plain values.

pub mod checksum;
pub mod command;
pub mod constants;
pub mod error;
pub mod outcome;
pub mod packet;
pub mod session;

pub use command::Command;
pub use constants::EventFlags;
pub use error::{Error, Result};
pub use outcome::{CommandKind, CommandOutcome, FailureReason};
pub use packet::Packet;
pub use session::{Session, SessionState};

/// Frame header size
pub const HEADER_SIZE: usize = Packet::HEADER_SIZE;
