//! Device timing and event configuration

use std::time::Duration;

use zkrust_core::EventFlags;
use zkrust_core::constants::{DEFAULT_CONNECT_TIMEOUT, DEVICE_RECEIVE_TIMEOUT};

/// Per-device settings
///
/// ```
/// use std::time::Duration;
/// use zkrust::DeviceConfig;
///
/// let config = DeviceConfig::default()
///     .with_command_timeout(Duration::from_secs(3))
///     .with_bulk_timeout(Duration::from_secs(10));
/// assert_eq!(config.connect_timeout, Duration::from_secs(5));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Wait for the reply to one command
    ///
    /// Defaults to the terminal's heartbeat tolerance; interactive callers
    /// usually want something much shorter.
    pub command_timeout: Duration,

    /// Bound on opening the socket and on the connect handshake
    pub connect_timeout: Duration,

    /// Bound on a whole bulk transfer
    pub bulk_timeout: Duration,

    /// Receive wait per monitor poll
    pub poll_wait: Duration,

    /// Pause between monitor polls
    pub poll_interval: Duration,

    /// Event classes requested when monitoring
    pub event_mask: EventFlags,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            command_timeout: Duration::from_secs(DEVICE_RECEIVE_TIMEOUT),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT),
            bulk_timeout: Duration::from_secs(30),
            poll_wait: Duration::from_millis(50),
            poll_interval: Duration::from_millis(100),
            event_mask: EventFlags::ATTLOG,
        }
    }
}

impl DeviceConfig {
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_bulk_timeout(mut self, timeout: Duration) -> Self {
        self.bulk_timeout = timeout;
        self
    }

    pub fn with_poll_wait(mut self, wait: Duration) -> Self {
        self.poll_wait = wait;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_event_mask(mut self, mask: EventFlags) -> Self {
        self.event_mask = mask;
        self
    }
}
