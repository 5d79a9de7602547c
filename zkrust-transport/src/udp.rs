//! UDP transport
//!
//! One connected socket per terminal. Every receive is bounded by a timeout;
//! the protocol has no push notification, so an idle socket simply times out.

use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use tokio::net::UdpSocket;
use tokio::time::timeout;
use tracing::{debug, trace};

use zkrust_core::constants::{DEFAULT_CONNECT_TIMEOUT, MAX_DATAGRAM_SIZE};
use zkrust_types::Endpoint;

use crate::{Transport, error::*};

/// Room for the largest bulk datagram plus slack for odd firmware
const RECV_BUFFER_SIZE: usize = MAX_DATAGRAM_SIZE * 2;

/// UDP transport to a terminal
pub struct UdpTransport {
    endpoint: Endpoint,
    socket: Option<UdpSocket>,
    connect_timeout: Duration,
}

impl UdpTransport {
    /// Create new UDP transport
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            socket: None,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT),
        }
    }

    /// Set the bound on socket setup
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn endpoint(&self) -> Endpoint {
        self.endpoint
    }

    async fn open(&self) -> Result<UdpSocket> {
        // Bind to any available local port
        let socket = UdpSocket::bind("0.0.0.0:0").await?;

        // Fix the default send/recv peer
        socket.connect(self.endpoint.socket_addr()).await?;
        Ok(socket)
    }
}

#[async_trait]
impl Transport for UdpTransport {
    async fn connect(&mut self) -> Result<()> {
        if self.is_connected() {
            return Err(Error::AlreadyConnected);
        }

        debug!("Opening UDP socket to {}...", self.endpoint);

        let socket = timeout(self.connect_timeout, self.open())
            .await
            .map_err(|_| Error::ConnectionTimeout)??;

        debug!(
            local = ?socket.local_addr().ok(),
            "UDP socket open to {}", self.endpoint
        );

        self.socket = Some(socket);
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        if self.socket.take().is_some() {
            debug!("Closed UDP socket to {}", self.endpoint);
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.socket.is_some()
    }

    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let socket = self.socket.as_ref().ok_or(Error::NotConnected)?;

        trace!(
            len = data.len(),
            data = %hex::encode(&data[..data.len().min(32)]),
            "UDP send"
        );

        socket.send(data).await?;
        Ok(())
    }

    async fn receive(&mut self, wait: Duration) -> Result<BytesMut> {
        let socket = self.socket.as_ref().ok_or(Error::NotConnected)?;

        let mut buf = BytesMut::zeroed(RECV_BUFFER_SIZE);

        let n = timeout(wait, socket.recv(&mut buf))
            .await
            .map_err(|_| Error::ReadTimeout)??;

        if n == 0 {
            return Err(Error::ConnectionClosed);
        }

        buf.truncate(n);

        trace!(
            len = n,
            data = %hex::encode(&buf[..n.min(32)]),
            "UDP recv"
        );

        Ok(buf)
    }

    fn remote_addr(&self) -> String {
        self.endpoint.to_string()
    }
}
