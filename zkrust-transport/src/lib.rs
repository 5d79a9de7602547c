//! Transport layer for the terminal protocol
//!
//! Terminals speak one datagram per frame over UDP. The [`Transport`] trait
//! is the seam between the dispatcher and the socket so that higher layers
//! can be driven by a scripted transport in tests.

pub mod error;
pub mod udp;

pub use error::{Error, Result};
pub use udp::UdpTransport;

use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;

/// Datagram transport to one terminal
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open the socket
    async fn connect(&mut self) -> Result<()>;

    /// Close the socket
    async fn disconnect(&mut self) -> Result<()>;

    /// Check if connected
    fn is_connected(&self) -> bool;

    /// Send one datagram
    async fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Receive one datagram, waiting at most `timeout`
    async fn receive(&mut self, timeout: Duration) -> Result<BytesMut>;

    /// Get remote address
    fn remote_addr(&self) -> String;
}
