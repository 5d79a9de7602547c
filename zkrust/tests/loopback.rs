//! End-to-end exchanges against a fake terminal on a loopback UDP socket

use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};
use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;

use zkrust::{
    AttendanceRecord, Command, Device, DeviceConfig, Endpoint, Error, Packet, TemplateKind,
    UserRecord,
};

const SESSION: u16 = 0x5A5A;

/// Bytes of stream body carried per data datagram
const CHUNK: usize = 100;

struct FakeTerminal {
    socket: UdpSocket,
    users: Vec<UserRecord>,
    punches: Vec<AttendanceRecord>,
    templates: HashMap<(u16, u8), Bytes>,
}

impl FakeTerminal {
    async fn start(
        users: Vec<UserRecord>,
        punches: Vec<AttendanceRecord>,
    ) -> (Endpoint, JoinHandle<HashMap<(u16, u8), Bytes>>) {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let endpoint = Endpoint::new(Ipv4Addr::LOCALHOST, socket.local_addr().unwrap().port());

        let terminal = FakeTerminal {
            socket,
            users,
            punches,
            templates: HashMap::new(),
        };
        (endpoint, tokio::spawn(terminal.serve()))
    }

    async fn serve(mut self) -> HashMap<(u16, u8), Bytes> {
        let mut buf = [0u8; 2048];
        loop {
            let (n, peer) = self.socket.recv_from(&mut buf).await.unwrap();
            let request = Packet::decode(&buf[..n]).unwrap();
            let reply_id = request.reply_id;

            match request.command {
                Command::Connect => self.reply(peer, Command::AckOk, reply_id, b"").await,
                Command::Exit => {
                    self.reply(peer, Command::AckOk, reply_id, b"").await;
                    return self.templates;
                }
                Command::GetVersion => {
                    self.reply(peer, Command::AckOk, reply_id, b"Ver 6.60 Sep 27 2019\0")
                        .await
                }
                Command::OptionsRrq => {
                    let key = String::from_utf8_lossy(&request.payload).into_owned();
                    let value = match key.as_str() {
                        "~SerialNumber" => "CKJ4192160012",
                        "~DeviceName" => "MB460",
                        "~Platform" => "ZMM220_TFT",
                        _ => "",
                    };
                    let answer = format!("{}={}\0", key, value);
                    self.reply(peer, Command::AckOk, reply_id, answer.as_bytes()).await
                }
                Command::UserTempRrq if request.payload[..] == [5] => {
                    let mut body = BytesMut::new();
                    body.put_u32_le((self.users.len() * UserRecord::SIZE) as u32);
                    for user in &self.users {
                        body.put_slice(&user.encode().unwrap());
                    }
                    self.stream(peer, reply_id, &body).await
                }
                Command::UserTempRrq => {
                    let uid = u16::from_le_bytes([request.payload[0], request.payload[1]]);
                    match self.templates.get(&(uid, request.payload[2])).cloned() {
                        Some(raw) => self.stream(peer, reply_id, &raw).await,
                        None => self.send(peer, Command::AckError, 0, reply_id, b"").await,
                    }
                }
                Command::UserTempWrq => {
                    let envelope = &request.payload;
                    let uid = u16::from_le_bytes([envelope[2], envelope[3]]);
                    self.templates
                        .insert((uid, envelope[4]), request.payload.slice(6..));
                    self.reply(peer, Command::AckOk, reply_id, b"").await
                }
                Command::AttLogRrq => {
                    let mut body = BytesMut::new();
                    body.put_u16_le(0);
                    for punch in &self.punches {
                        body.put_slice(&punch.encode());
                    }
                    self.stream(peer, reply_id, &body).await
                }
                _ => self.reply(peer, Command::AckOk, reply_id, b"").await,
            }
        }
    }

    async fn reply(&self, peer: SocketAddr, command: Command, reply_id: u16, payload: &[u8]) {
        self.send(peer, command, SESSION, reply_id, payload).await
    }

    async fn send(&self, peer: SocketAddr, command: Command, session: u16, reply_id: u16, payload: &[u8]) {
        let frame = Packet::with_payload(command, session, reply_id, Bytes::copy_from_slice(payload));
        self.socket.send_to(&frame.encode(), peer).await.unwrap();
    }

    /// Announce a transfer, send it in chunks, then close it
    async fn stream(&self, peer: SocketAddr, reply_id: u16, body: &[u8]) {
        self.reply(peer, Command::PrepareData, reply_id, &(body.len() as u32).to_le_bytes())
            .await;
        for chunk in body.chunks(CHUNK) {
            self.reply(peer, Command::Data, reply_id, chunk).await;
        }
        self.reply(peer, Command::AckOk, reply_id, b"").await;
    }
}

fn config() -> DeviceConfig {
    DeviceConfig::default()
        .with_command_timeout(Duration::from_secs(2))
        .with_connect_timeout(Duration::from_secs(2))
        .with_bulk_timeout(Duration::from_secs(5))
}

fn staff() -> Vec<UserRecord> {
    (1..=5)
        .map(|uid| UserRecord::new(uid, format!("{}", 1000 + uid), format!("Worker {}", uid)))
        .collect()
}

fn punches() -> Vec<AttendanceRecord> {
    (0..4u32)
        .map(|i| AttendanceRecord {
            uid: (i + 1) as u16,
            badge_id: Bytes::from(format!("{}", 1001 + i)),
            state: 1,
            timestamp: NaiveDate::from_ymd_opt(2024, 2, 12)
                .unwrap()
                .and_hms_opt(8, i * 5, 0)
                .unwrap(),
            record_type: 0,
        })
        .collect()
}

#[tokio::test]
async fn test_full_session() {
    let (endpoint, terminal) = FakeTerminal::start(staff(), punches()).await;
    let mut device = Device::with_config(endpoint, config());

    device.connect().await.unwrap();
    assert!(device.is_connected());
    assert_eq!(device.session().session_id(), SESSION);

    let info = device.get_device_info().await.unwrap();
    assert_eq!(info.serial_number, "CKJ4192160012");
    assert_eq!(info.firmware_version, "Ver 6.60 Sep 27 2019");
    assert_eq!(info.device_name.as_deref(), Some("MB460"));

    // 364 bytes of user table over four datagrams
    assert_eq!(device.get_users().await.unwrap(), staff());
    assert_eq!(device.get_attendance().await.unwrap(), punches());

    let slot = device.enroll_fingerprint(3, vec![0x20u8; 300]).await.unwrap();
    assert_eq!(slot, 0);
    let slot = device.enroll_fingerprint(3, vec![0x21u8; 300]).await.unwrap();
    assert_eq!(slot, 1);

    let fingerprints = device.get_fingerprints(3).await.unwrap();
    assert_eq!(fingerprints.len(), 2);
    assert_eq!(&fingerprints[1].raw[..], &[0x21u8; 300][..]);

    assert!(device.disconnect().await.unwrap());
    assert!(!device.is_connected());

    let stored = terminal.await.unwrap();
    assert_eq!(stored.len(), 2);
    assert!(stored.contains_key(&(3, 0)));
}

#[tokio::test]
async fn test_silent_terminal_times_out() {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let endpoint = Endpoint::new(Ipv4Addr::LOCALHOST, socket.local_addr().unwrap().port());

    let mut device = Device::with_config(
        endpoint,
        config().with_connect_timeout(Duration::from_millis(100)),
    );

    let err = device.connect().await.unwrap_err();
    assert!(matches!(err, Error::CommandFailed { command: Command::Connect, .. }));
    assert!(err.is_recoverable());
    assert!(!device.is_connected());

    // Nothing to tear down
    assert!(!device.disconnect().await.unwrap());
    assert_eq!(
        device.get_template(TemplateKind::Fingerprint, 1, 0).await.unwrap_err().to_string(),
        "Device not connected"
    );
}
