//! High-level device interface

use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};
use chrono::{FixedOffset, Local, NaiveDateTime, Utc};
use tracing::{debug, info, warn};

use zkrust_core::{
    Command, CommandKind, CommandOutcome, EventFlags, FailureReason, Packet, Session,
};
use zkrust_transport::{Transport, UdpTransport};
use zkrust_types::{DeviceInfo, Endpoint, device_info::option_value, timestamp};

use crate::config::DeviceConfig;
use crate::dispatch::{Dispatcher, StreamLayout};
use crate::error::{Error, Result};

/// Option keys understood by `CMD_OPTIONS_RRQ`
pub mod options {
    pub const DEVICE_NAME: &str = "~DeviceName";
    pub const SERIAL_NUMBER: &str = "~SerialNumber";
    pub const PLATFORM: &str = "~Platform";
    pub const FINGERPRINT_VERSION: &str = "~ZKFPVersion";
    pub const OS: &str = "~OS";
    pub const PIN_WIDTH: &str = "~PIN2Width";
    pub const SSR: &str = "~SSR";
    pub const WORK_CODE: &str = "WorkCode";
    pub const FACE_FUNCTION: &str = "FaceFunOn";
}

/// Payload sent with power and voice commands
const ZERO_WORD: [u8; 2] = [0, 0];

/// Wait for the datagram that closes a bulk transfer
const DRAIN_WAIT: Duration = Duration::from_millis(500);

/// A terminal reached over UDP
///
/// Every operation takes `&mut self`, so one device never has two exchanges
/// in flight. Devices share nothing; drive several terminals by creating one
/// `Device` each.
///
/// # Examples
///
/// ```no_run
/// use zkrust::Device;
///
/// #[tokio::main]
/// async fn main() -> zkrust::Result<()> {
///     let mut device = Device::new("192.168.1.201".parse()?);
///
///     device.connect().await?;
///     println!("Connected!");
///
///     let info = device.get_device_info().await?;
///     println!("Device: {}", info);
///
///     device.disconnect().await?;
///     Ok(())
/// }
/// ```
pub struct Device {
    dispatcher: Dispatcher,
    session: Session,
    config: DeviceConfig,
}

impl Device {
    /// Create a device with default settings
    pub fn new(endpoint: Endpoint) -> Self {
        Self::with_config(endpoint, DeviceConfig::default())
    }

    /// Create a device with explicit settings
    pub fn with_config(endpoint: Endpoint, config: DeviceConfig) -> Self {
        let transport = UdpTransport::new(endpoint).with_connect_timeout(config.connect_timeout);
        Self::with_transport(Box::new(transport), config)
    }

    /// Create a device over any transport
    pub fn with_transport(transport: Box<dyn Transport>, config: DeviceConfig) -> Self {
        Self {
            dispatcher: Dispatcher::new(transport, config.command_timeout),
            session: Session::new(),
            config,
        }
    }

    /// Set command timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.command_timeout = timeout;
        self.dispatcher.set_timeout(timeout);
        self
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Check if connected
    pub fn is_connected(&self) -> bool {
        self.session.is_connected() && self.dispatcher.is_open()
    }

    /// Open a session
    ///
    /// # Errors
    ///
    /// - The socket cannot be opened
    /// - No valid acknowledgement arrives within the connect timeout
    /// - The terminal answers with session id 0
    pub async fn connect(&mut self) -> Result<()> {
        info!("Connecting to {}...", self.dispatcher.remote_addr());

        let reply_id = self.session.begin_connect()?;
        if let Err(e) = self.dispatcher.open().await {
            self.session.close();
            return Err(e);
        }

        let request = Packet::new(Command::Connect, 0, reply_id);
        let reply = match self
            .dispatcher
            .exchange(&mut self.session, &request, self.config.connect_timeout)
            .await
        {
            Ok(reply) => reply,
            Err(reason) => {
                self.abort_connect().await;
                return Err(Error::CommandFailed {
                    command: Command::Connect,
                    reason,
                });
            }
        };

        if reply.session_id == 0 {
            self.abort_connect().await;
            return Err(Error::ConnectRefused);
        }

        match reply.command {
            Command::AckOk => {}
            Command::AckUnauth => {
                warn!("Device expects a comm key; commands may be refused");
            }
            other => {
                self.abort_connect().await;
                return Err(Error::InvalidResponse(format!(
                    "Unexpected connect reply: {}",
                    other
                )));
            }
        }

        self.session.establish(reply.session_id, reply.reply_id)?;

        info!(
            "Connected to {} (session_id={})",
            self.dispatcher.remote_addr(),
            reply.session_id
        );
        Ok(())
    }

    async fn abort_connect(&mut self) {
        self.session.close();
        if let Err(e) = self.dispatcher.close().await {
            debug!(error = %e, "Closing socket after failed connect");
        }
    }

    /// Close the session
    ///
    /// Teardown is best effort: the session is reset and the socket closed
    /// whatever the terminal answers. Returns whether the terminal
    /// acknowledged the exit.
    pub async fn disconnect(&mut self) -> Result<bool> {
        if !self.session.is_connected() && !self.dispatcher.is_open() {
            return Ok(false);
        }

        info!("Disconnecting from {}...", self.dispatcher.remote_addr());

        let mut acknowledged = false;
        if self.session.is_connected() && self.dispatcher.is_open() {
            let request = Packet::new(
                Command::Exit,
                self.session.session_id(),
                self.session.next_reply_id(),
            );
            match self
                .dispatcher
                .exchange(&mut self.session, &request, self.config.command_timeout)
                .await
            {
                Ok(reply) => acknowledged = reply.command == Command::AckOk,
                Err(reason) => debug!(%reason, "No exit acknowledgement"),
            }
        }

        self.session.close();
        if let Err(e) = self.dispatcher.close().await {
            warn!("Failed to close socket: {}", e);
        }

        info!("Disconnected");
        Ok(acknowledged)
    }

    // Control

    /// Enable device (normal operation mode)
    pub async fn enable_device(&mut self) -> Result<()> {
        debug!("Enabling device...");
        self.general(Command::EnableDevice, &[]).await.map(drop)
    }

    /// Disable device (show "Working..." on LCD)
    pub async fn disable_device(&mut self) -> Result<()> {
        debug!("Disabling device...");
        self.general(Command::DisableDevice, &ZERO_WORD).await.map(drop)
    }

    /// Power off device
    ///
    /// The local session is closed once the terminal accepts the command.
    pub async fn power_off(&mut self) -> Result<()> {
        warn!("Powering off device...");
        self.general(Command::PowerOff, &ZERO_WORD).await?;
        self.drop_session().await;
        Ok(())
    }

    /// Restart device
    ///
    /// The local session is closed once the terminal accepts the command.
    pub async fn restart(&mut self) -> Result<()> {
        warn!("Restarting device...");
        self.general(Command::Restart, &ZERO_WORD).await?;
        self.drop_session().await;
        Ok(())
    }

    pub async fn sleep(&mut self) -> Result<()> {
        debug!("Putting device to sleep...");
        self.general(Command::Sleep, &ZERO_WORD).await.map(drop)
    }

    pub async fn resume(&mut self) -> Result<()> {
        debug!("Resuming device...");
        self.general(Command::Resume, &ZERO_WORD).await.map(drop)
    }

    /// Play the "thank you" voice prompt
    pub async fn test_voice(&mut self) -> Result<()> {
        self.general(Command::TestVoice, &ZERO_WORD).await.map(drop)
    }

    pub async fn clear_lcd(&mut self) -> Result<()> {
        self.general(Command::ClearLcd, &[]).await.map(drop)
    }

    /// Write text on an LCD line
    pub async fn write_lcd(&mut self, line: u16, text: &str) -> Result<()> {
        debug!(line, text, "Writing LCD");

        let mut payload = BytesMut::with_capacity(4 + text.len());
        payload.put_u16_le(line);
        payload.put_u8(0);
        payload.put_u8(b' ');
        payload.put_slice(text.as_bytes());

        self.general(Command::WriteLcd, &payload).await.map(drop)
    }

    /// Show a message on one of the four LCD lines
    ///
    /// `line` must be 1..=4 and `text` at most 32 bytes.
    pub async fn display_message(&mut self, text: &str, line: u8) -> Result<()> {
        if !(1..=4).contains(&line) {
            return Err(zkrust_types::Error::Validation(format!("LCD line {} is not 1..=4", line)).into());
        }
        if text.len() > 32 {
            return Err(zkrust_types::Error::Validation(format!(
                "message is {} bytes, limit is 32",
                text.len()
            ))
            .into());
        }

        self.write_lcd(line as u16, text).await
    }

    // Information

    /// Firmware version string
    pub async fn version(&mut self) -> Result<String> {
        let payload = self.general(Command::GetVersion, &[]).await?;
        Ok(option_value(&payload))
    }

    /// Query one device option by key
    ///
    /// Keys are vendor strings such as `~SerialNumber`; see [`options`].
    pub async fn query_option(&mut self, key: &str) -> Result<String> {
        debug!(key, "Querying option");
        let payload = self.general(Command::OptionsRrq, key.as_bytes()).await?;
        Ok(option_value(&payload))
    }

    pub async fn device_name(&mut self) -> Result<String> {
        self.query_option(options::DEVICE_NAME).await
    }

    pub async fn serial_number(&mut self) -> Result<String> {
        self.query_option(options::SERIAL_NUMBER).await
    }

    pub async fn platform(&mut self) -> Result<String> {
        self.query_option(options::PLATFORM).await
    }

    /// Fingerprint algorithm version
    pub async fn firmware_version(&mut self) -> Result<String> {
        self.query_option(options::FINGERPRINT_VERSION).await
    }

    pub async fn os_version(&mut self) -> Result<String> {
        self.query_option(options::OS).await
    }

    pub async fn pin_width(&mut self) -> Result<String> {
        self.query_option(options::PIN_WIDTH).await
    }

    pub async fn work_code(&mut self) -> Result<String> {
        self.query_option(options::WORK_CODE).await
    }

    pub async fn ssr(&mut self) -> Result<String> {
        self.query_option(options::SSR).await
    }

    pub async fn face_function_on(&mut self) -> Result<String> {
        self.query_option(options::FACE_FUNCTION).await
    }

    /// Get device information
    ///
    /// Serial number and version are required; the other fields are left
    /// empty when the terminal does not answer them.
    pub async fn get_device_info(&mut self) -> Result<DeviceInfo> {
        debug!("Getting device info...");

        let serial_number = self.serial_number().await?;
        let firmware_version = self.version().await?;

        let mut info = DeviceInfo::new(serial_number, firmware_version);
        info.fingerprint_version = self.firmware_version().await.ok();
        info.platform = self.platform().await.ok();
        info.device_name = self.device_name().await.ok();
        info.os_version = self.os_version().await.ok();

        debug!("Device info: {}", info);
        Ok(info)
    }

    // Clock

    pub async fn get_time(&mut self) -> Result<NaiveDateTime> {
        let payload = self.general(Command::GetTime, &[]).await?;
        Ok(timestamp::decode_le(&payload)?)
    }

    pub async fn set_time(&mut self, time: NaiveDateTime) -> Result<()> {
        debug!(%time, "Setting device time");
        self.general(Command::SetTime, &timestamp::encode_le(&time))
            .await
            .map(drop)
    }

    /// Set the device clock to the host's local time
    pub async fn sync_time(&mut self) -> Result<()> {
        self.set_time(Local::now().naive_local()).await
    }

    /// Set the device clock to the current time at `offset`
    pub async fn sync_time_with_offset(&mut self, offset: FixedOffset) -> Result<()> {
        self.set_time(Utc::now().with_timezone(&offset).naive_local())
            .await
    }

    // Real-time events

    /// Ask the terminal to push the event classes in `mask`
    pub async fn enable_events(&mut self, mask: EventFlags) -> Result<()> {
        debug!(?mask, "Registering for events");
        self.general(Command::RegEvent, &mask.to_payload())
            .await
            .map(drop)
    }

    /// Stop event pushes
    pub async fn disable_events(&mut self) -> Result<()> {
        self.enable_events(EventFlags::empty()).await
    }

    pub(crate) async fn poll_datagram(&mut self, wait: Duration) -> Option<BytesMut> {
        self.dispatcher.poll(wait).await
    }

    // Helpers

    /// Run a general command and return the reply payload
    pub(crate) async fn general(&mut self, command: Command, payload: &[u8]) -> Result<Bytes> {
        let outcome = self
            .dispatcher
            .dispatch(&mut self.session, command, payload, CommandKind::General)
            .await?;

        match outcome {
            CommandOutcome::General(payload) => Ok(payload),
            CommandOutcome::Failure(reason) => Err(Error::CommandFailed { command, reason }),
            CommandOutcome::DataToken(_) => Err(Error::InvalidResponse(format!(
                "{} answered with a data token",
                command
            ))),
        }
    }

    /// Run a data command and read the transfer it opens
    ///
    /// A refused command or a broken transfer yields an empty stream; only a
    /// missing session is an error.
    pub(crate) async fn bulk(
        &mut self,
        command: Command,
        payload: &[u8],
        layout: StreamLayout,
    ) -> Result<Bytes> {
        let outcome = self
            .dispatcher
            .dispatch(&mut self.session, command, payload, CommandKind::Data)
            .await?;

        match outcome {
            CommandOutcome::DataToken(_) => Ok(self
                .dispatcher
                .read_bulk(&mut self.session, layout, self.config.bulk_timeout, DRAIN_WAIT)
                .await),
            other => {
                debug!(%command, ?other, "No transfer");
                Ok(Bytes::new())
            }
        }
    }

    /// Run a data command where a lost reply must not read as "nothing"
    ///
    /// Only a refused transfer (session 0) or a reply that announces no data
    /// yields an empty stream. Timeouts, socket errors, garbled replies and
    /// short transfers are `CommandFailed`.
    pub(crate) async fn bulk_strict(
        &mut self,
        command: Command,
        payload: &[u8],
        layout: StreamLayout,
    ) -> Result<Bytes> {
        let outcome = self
            .dispatcher
            .dispatch(&mut self.session, command, payload, CommandKind::Data)
            .await?;

        match outcome {
            CommandOutcome::DataToken(_) => {
                let transfer = self
                    .dispatcher
                    .read_transfer(&mut self.session, layout, self.config.bulk_timeout, DRAIN_WAIT)
                    .await;
                match transfer.interrupted {
                    None => Ok(transfer.stream),
                    Some(reason) => Err(Error::CommandFailed { command, reason }),
                }
            }
            CommandOutcome::Failure(
                reason @ (FailureReason::Timeout
                | FailureReason::Transport(_)
                | FailureReason::Malformed(_)),
            ) => Err(Error::CommandFailed { command, reason }),
            other => {
                debug!(%command, ?other, "No transfer");
                Ok(Bytes::new())
            }
        }
    }

    async fn drop_session(&mut self) {
        self.session.close();
        if let Err(e) = self.dispatcher.close().await {
            debug!(error = %e, "Closing socket");
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::mock::MockTransport;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    pub(crate) const SESSION: u16 = 0x2A2A;

    pub(crate) fn device(mock: &MockTransport) -> Device {
        Device::with_transport(Box::new(mock.clone()), DeviceConfig::default())
    }

    pub(crate) async fn connected(mock: &MockTransport) -> Device {
        mock.push(Command::AckOk, SESSION, 0, Bytes::new());
        let mut device = device(mock);
        device.connect().await.unwrap();
        device
    }

    /// Queue a complete transfer of `body` in one data frame
    ///
    /// Uses three reply ids starting at `reply_id`.
    pub(crate) fn push_table(mock: &MockTransport, reply_id: u16, body: &[u8]) {
        mock.push(
            Command::PrepareData,
            SESSION,
            reply_id,
            (body.len() as u32).to_le_bytes().to_vec(),
        );
        mock.push(Command::Data, SESSION, reply_id + 1, body.to_vec());
        mock.push(Command::AckOk, SESSION, reply_id + 2, Bytes::new());
    }

    #[test]
    fn test_device_create() {
        let device = Device::new("192.168.1.201".parse().unwrap());
        assert!(!device.is_connected());
        assert_eq!(device.config().command_timeout, Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_connect_handshake() {
        let mock = MockTransport::new();
        let device = connected(&mock).await;

        assert!(device.is_connected());
        assert_eq!(device.session().session_id(), SESSION);

        let sent = mock.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].command, Command::Connect);
        assert_eq!(sent[0].session_id, 0);
        assert_eq!(sent[0].reply_id, 0xFFFF);
        assert!(sent[0].payload.is_empty());
    }

    #[tokio::test]
    async fn test_connect_refused_with_zero_session() {
        let mock = MockTransport::new();
        mock.push(Command::AckOk, 0, 0, Bytes::new());
        let mut device = device(&mock);

        assert!(matches!(device.connect().await, Err(Error::ConnectRefused)));
        assert!(!device.is_connected());
        assert!(device.session().state() == zkrust_core::SessionState::Disconnected);
    }

    #[tokio::test]
    async fn test_connect_timeout() {
        let mock = MockTransport::new();
        let mut device = device(&mock);

        assert!(matches!(
            device.connect().await,
            Err(Error::CommandFailed { command: Command::Connect, .. })
        ));
        assert!(!device.is_connected());

        // A failed attempt leaves the device ready for another
        mock.push(Command::AckOk, SESSION, 0, Bytes::new());
        device.connect().await.unwrap();
        assert!(device.is_connected());
    }

    #[tokio::test]
    async fn test_disconnect_is_best_effort() {
        let mock = MockTransport::new();
        let mut device = connected(&mock).await;

        // No reply queued: the exit times out but teardown still happens
        assert!(!device.disconnect().await.unwrap());
        assert!(!device.is_connected());
        assert_eq!(device.session().session_id(), 0);
        assert_eq!(mock.sent_commands(), vec![Command::Connect, Command::Exit]);

        // Second disconnect is a no-op
        assert!(!device.disconnect().await.unwrap());
        assert_eq!(mock.sent().len(), 2);
    }

    #[tokio::test]
    async fn test_disconnect_acknowledged() {
        let mock = MockTransport::new();
        let mut device = connected(&mock).await;
        mock.push(Command::AckOk, SESSION, 1, Bytes::new());

        assert!(device.disconnect().await.unwrap());
        let exit = &mock.sent()[1];
        assert_eq!(exit.session_id, SESSION);
        assert_eq!(exit.reply_id, 1);
    }

    #[tokio::test]
    async fn test_commands_require_connection() {
        let mock = MockTransport::new();
        let mut device = device(&mock);

        assert!(matches!(device.enable_device().await, Err(Error::NotConnected)));
        assert!(matches!(device.get_users().await, Err(Error::NotConnected)));
        assert!(mock.sent().is_empty());
    }

    #[tokio::test]
    async fn test_control_payloads() {
        let mock = MockTransport::new();
        let mut device = connected(&mock).await;
        for reply_id in 1..=3 {
            mock.push(Command::AckOk, SESSION, reply_id, Bytes::new());
        }

        device.disable_device().await.unwrap();
        device.test_voice().await.unwrap();
        device.write_lcd(2, "Hi").await.unwrap();

        let sent = mock.sent();
        assert_eq!(&sent[1].payload[..], &[0, 0]);
        assert_eq!(sent[2].command, Command::TestVoice);
        assert_eq!(&sent[3].payload[..], &[2, 0, 0, b' ', b'H', b'i']);
    }

    #[tokio::test]
    async fn test_rejected_command() {
        let mock = MockTransport::new();
        let mut device = connected(&mock).await;
        mock.push(Command::AckError, SESSION, 1, Bytes::new());

        let err = device.clear_lcd().await.unwrap_err();
        assert!(matches!(
            err,
            Error::CommandFailed {
                command: Command::ClearLcd,
                reason: zkrust_core::FailureReason::Rejected(Command::AckError),
            }
        ));
    }

    #[tokio::test]
    async fn test_display_message_validation() {
        let mock = MockTransport::new();
        let mut device = connected(&mock).await;

        assert!(device.display_message("hello", 0).await.is_err());
        assert!(device.display_message("hello", 5).await.is_err());
        assert!(device.display_message(&"x".repeat(33), 1).await.is_err());
        assert_eq!(mock.sent().len(), 1);

        mock.push(Command::AckOk, SESSION, 1, Bytes::new());
        device.display_message("Welcome", 4).await.unwrap();
        assert_eq!(mock.sent()[1].command, Command::WriteLcd);
    }

    #[tokio::test]
    async fn test_restart_closes_session() {
        let mock = MockTransport::new();
        let mut device = connected(&mock).await;
        mock.push(Command::AckOk, SESSION, 1, Bytes::new());

        device.restart().await.unwrap();
        assert!(!device.is_connected());
    }

    #[tokio::test]
    async fn test_option_queries() {
        let mock = MockTransport::new();
        let mut device = connected(&mock).await;
        mock.push(Command::AckOk, SESSION, 1, &b"~SerialNumber=ABC123\0"[..]);
        mock.push(Command::AckOk, SESSION, 2, &b"Ver 6.60 Apr 28 2017\0"[..]);
        mock.push(Command::AckOk, SESSION, 3, &b"~ZKFPVersion=10\0"[..]);
        mock.push(Command::AckOk, SESSION, 4, &b"~Platform=ZMM220_TFT\0"[..]);
        mock.push(Command::AckOk, SESSION, 5, &b"~DeviceName=F18\0"[..]);
        mock.push(Command::AckError, SESSION, 6, Bytes::new());

        let info = device.get_device_info().await.unwrap();

        assert_eq!(info.serial_number, "ABC123");
        assert_eq!(info.firmware_version, "Ver 6.60 Apr 28 2017");
        assert_eq!(info.fingerprint_version.as_deref(), Some("10"));
        assert_eq!(info.platform.as_deref(), Some("ZMM220_TFT"));
        assert_eq!(info.device_name.as_deref(), Some("F18"));
        assert_eq!(info.os_version, None);

        let sent = mock.sent();
        assert_eq!(sent[1].command, Command::OptionsRrq);
        assert_eq!(&sent[1].payload[..], b"~SerialNumber");
    }

    #[tokio::test]
    async fn test_time_round_trip() {
        let mock = MockTransport::new();
        let mut device = connected(&mock).await;
        mock.push(Command::AckOk, SESSION, 1, vec![136u8, 60, 13, 46]);
        mock.push(Command::AckOk, SESSION, 2, Bytes::new());

        let time = device.get_time().await.unwrap();
        let expected = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(8, 30, 0)
            .unwrap();
        assert_eq!(time, expected);

        device.set_time(expected).await.unwrap();
        let sent = mock.sent();
        assert_eq!(sent[2].command, Command::SetTime);
        assert_eq!(&sent[2].payload[..], &[136, 60, 13, 46]);
    }

    #[tokio::test]
    async fn test_event_registration_payloads() {
        let mock = MockTransport::new();
        let mut device = connected(&mock).await;
        mock.push(Command::AckOk, SESSION, 1, Bytes::new());
        mock.push(Command::AckOk, SESSION, 2, Bytes::new());

        device.enable_events(EventFlags::ATTLOG).await.unwrap();
        device.disable_events().await.unwrap();

        let sent = mock.sent();
        assert_eq!(&sent[1].payload[..], &[1, 0, 0, 0]);
        assert_eq!(&sent[2].payload[..], &[0, 0, 0, 0]);
    }
}
