//! Session bookkeeping
//!
//! A session tracks:
//! - Session ID (assigned by the device's connect acknowledgement)
//! - The reply id of the most recently received frame
//! - Connection state
//!
//! The value is owned by whoever drives the socket and is lent out by
//! `&mut` for each exchange, so two devices never share state.

use crate::constants::{CONNECT_REPLY_ID, USHRT_MAX};
use crate::error::{Error, Result};

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Not connected
    Disconnected,

    /// CONNECT sent, waiting for the acknowledgement
    Connecting,

    /// Session id assigned, ready for commands
    Connected,
}

/// Per-connection session state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    session_id: u16,
    last_reply_id: u16,
    state: SessionState,
}

impl Session {
    /// Create a new disconnected session
    pub fn new() -> Self {
        Self {
            session_id: 0,
            last_reply_id: 0,
            state: SessionState::Disconnected,
        }
    }

    /// Get current session ID
    pub fn session_id(&self) -> u16 {
        self.session_id
    }

    /// Reply id of the last frame received from the device
    pub fn last_reply_id(&self) -> u16 {
        self.last_reply_id
    }

    /// Get current state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Check if connected
    pub fn is_connected(&self) -> bool {
        self.state == SessionState::Connected
    }

    /// Mark the CONNECT frame as sent
    ///
    /// Returns the reply id the CONNECT frame must carry.
    pub fn begin_connect(&mut self) -> Result<u16> {
        if self.state != SessionState::Disconnected {
            return Err(Error::InvalidSessionState(format!(
                "Cannot connect from state: {:?}",
                self.state
            )));
        }

        self.session_id = 0;
        self.state = SessionState::Connecting;
        Ok(CONNECT_REPLY_ID)
    }

    /// Accept the session id from the connect acknowledgement
    ///
    /// A zero session id means the device refused the session; the state
    /// falls back to `Disconnected`.
    pub fn establish(&mut self, session_id: u16, reply_id: u16) -> Result<()> {
        if self.state != SessionState::Connecting {
            return Err(Error::InvalidSessionState(format!(
                "Cannot establish from state: {:?}",
                self.state
            )));
        }

        if session_id == 0 {
            self.close();
            return Err(Error::InvalidSessionState(
                "Device acknowledged with session id 0".into(),
            ));
        }

        self.session_id = session_id;
        self.last_reply_id = reply_id;
        self.state = SessionState::Connected;
        Ok(())
    }

    /// Record the reply id of a frame received from the device
    pub fn observe(&mut self, reply_id: u16) {
        self.last_reply_id = reply_id;
    }

    /// Reply id for the next outgoing frame
    ///
    /// The last received reply id plus one, wrapping modulo 65535.
    pub fn next_reply_id(&self) -> u16 {
        ((self.last_reply_id as u32 + 1) % USHRT_MAX as u32) as u16
    }

    /// Close session
    pub fn close(&mut self) {
        self.session_id = 0;
        self.last_reply_id = 0;
        self.state = SessionState::Disconnected;
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
