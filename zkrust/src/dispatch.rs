//! Command dispatch and bulk transfer
//!
//! The [`Dispatcher`] owns the transport and runs one request/reply exchange
//! at a time. It never owns the [`Session`]: the caller lends it by `&mut`
//! for each exchange, and the dispatcher is the only code that records reply
//! ids into it.

use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use zkrust_core::{Command, CommandKind, CommandOutcome, FailureReason, Packet, Session};
use zkrust_transport::{Error as TransportError, Transport};

use crate::error::{Error, Result};

/// How the datagrams of a bulk transfer are joined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamLayout {
    /// First datagram kept whole, later ones without their header
    ///
    /// Used by tables (users, attendance) whose decoders strip the leading
    /// header and size word themselves.
    Table,

    /// Header stripped from every datagram, leaving the raw template
    Template,
}

/// A bulk transfer as received
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    /// Joined payload, possibly short
    pub stream: Bytes,

    /// Why the transfer stopped before the announced size, if it did
    pub interrupted: Option<FailureReason>,
}

/// Sends frames and classifies replies
pub struct Dispatcher {
    transport: Box<dyn Transport>,
    timeout: Duration,
    last_reply: Option<Packet>,
}

impl Dispatcher {
    pub fn new(transport: Box<dyn Transport>, timeout: Duration) -> Self {
        Self {
            transport,
            timeout,
            last_reply: None,
        }
    }

    /// Receive timeout of a single exchange
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    pub fn remote_addr(&self) -> String {
        self.transport.remote_addr()
    }

    pub fn is_open(&self) -> bool {
        self.transport.is_connected()
    }

    /// Last frame received in an exchange
    pub fn last_reply(&self) -> Option<&Packet> {
        self.last_reply.as_ref()
    }

    pub async fn open(&mut self) -> Result<()> {
        self.transport.connect().await?;
        Ok(())
    }

    pub async fn close(&mut self) -> Result<()> {
        self.last_reply = None;
        self.transport.disconnect().await?;
        Ok(())
    }

    /// Send `request` and wait for one reply frame
    ///
    /// Does not look at sessions; the reply id of any frame that arrives is
    /// recorded into `session`.
    pub async fn exchange(
        &mut self,
        session: &mut Session,
        request: &Packet,
        wait: Duration,
    ) -> std::result::Result<Packet, FailureReason> {
        trace!("Sending: {:?}", request);

        self.transport
            .send(&request.encode())
            .await
            .map_err(|e| FailureReason::Transport(e.to_string()))?;

        let datagram = match self.transport.receive(wait).await {
            Ok(datagram) => datagram,
            Err(TransportError::ReadTimeout) => {
                warn!(command = %request.command, "Timed out after {:?}", wait);
                return Err(FailureReason::Timeout);
            }
            Err(e) => return Err(FailureReason::Transport(e.to_string())),
        };

        match Packet::decode(&datagram) {
            Ok(reply) => {
                trace!("Received: {:?}", reply);
                session.observe(reply.reply_id);
                self.last_reply = Some(reply.clone());
                Ok(reply)
            }
            Err(e) => {
                if let Ok((_, _, reply_id)) = Packet::peek_header(&datagram) {
                    session.observe(reply_id);
                }
                debug!(error = %e, raw = %hex::encode(&datagram), "Undecodable reply");
                Err(FailureReason::Malformed(e.to_string()))
            }
        }
    }

    /// Run one command on a connected session
    ///
    /// Failures are reported as [`CommandOutcome::Failure`] and never
    /// retried. Only a disconnected session is an `Err`.
    pub async fn dispatch(
        &mut self,
        session: &mut Session,
        command: Command,
        payload: &[u8],
        kind: CommandKind,
    ) -> Result<CommandOutcome> {
        if !session.is_connected() || !self.transport.is_connected() {
            return Err(Error::NotConnected);
        }

        let request = Packet::with_payload(
            command,
            session.session_id(),
            session.next_reply_id(),
            Bytes::copy_from_slice(payload),
        );

        let outcome = match self.exchange(session, &request, self.timeout).await {
            Ok(reply) => CommandOutcome::classify(kind, session.session_id(), &reply),
            Err(reason) => CommandOutcome::Failure(reason),
        };

        match &outcome {
            CommandOutcome::Failure(reason) => debug!(%command, %reason, "Command failed"),
            _ => debug!(%command, "Command ok"),
        }

        Ok(outcome)
    }

    /// Size announced by the last reply, if it opened a transfer
    fn announced_size(&self) -> Option<usize> {
        let reply = self.last_reply.as_ref()?;
        if reply.command != Command::PrepareData || reply.payload.len() < 4 {
            return None;
        }
        let size = u32::from_le_bytes([
            reply.payload[0],
            reply.payload[1],
            reply.payload[2],
            reply.payload[3],
        ]);
        Some(size as usize)
    }

    /// Read the bulk transfer opened by the last data command
    ///
    /// Datagrams are collected until the payload bytes received reach the
    /// announced size or `limit` runs out; a short transfer is returned as
    /// is. One trailing datagram is then drained, waiting at most `drain`.
    pub async fn read_bulk(
        &mut self,
        session: &mut Session,
        layout: StreamLayout,
        limit: Duration,
        drain: Duration,
    ) -> Bytes {
        self.read_transfer(session, layout, limit, drain).await.stream
    }

    /// Like [`Dispatcher::read_bulk`], but reports a short transfer
    pub async fn read_transfer(
        &mut self,
        session: &mut Session,
        layout: StreamLayout,
        limit: Duration,
        drain: Duration,
    ) -> Transfer {
        let Some(size) = self.announced_size() else {
            debug!("No transfer announced");
            return Transfer {
                stream: Bytes::new(),
                interrupted: None,
            };
        };

        let deadline = Instant::now() + limit;
        let mut stream = BytesMut::with_capacity(size + Packet::HEADER_SIZE);
        let mut received = 0usize;
        let mut first = true;
        let mut interrupted = None;

        while received < size {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                warn!(received, size, "Bulk transfer deadline reached, truncating");
                interrupted = Some(FailureReason::Timeout);
                break;
            }

            let datagram = match self.transport.receive(remaining.min(self.timeout)).await {
                Ok(datagram) => datagram,
                Err(e) => {
                    warn!(received, size, error = %e, "Bulk transfer interrupted, truncating");
                    interrupted = Some(if e.is_timeout() {
                        FailureReason::Timeout
                    } else {
                        FailureReason::Transport(e.to_string())
                    });
                    break;
                }
            };

            if datagram.len() < Packet::HEADER_SIZE {
                trace!(len = datagram.len(), "Skipping runt datagram");
                continue;
            }
            if let Ok((_, _, reply_id)) = Packet::peek_header(&datagram) {
                session.observe(reply_id);
            }

            let body = &datagram[Packet::HEADER_SIZE..];
            received += body.len();

            match layout {
                StreamLayout::Table if first => stream.extend_from_slice(&datagram),
                _ => stream.extend_from_slice(body),
            }
            first = false;

            trace!(received, size, "Bulk datagram");
        }

        match self.transport.receive(drain).await {
            Ok(trailer) => {
                if let Ok((_, _, reply_id)) = Packet::peek_header(&trailer) {
                    session.observe(reply_id);
                }
            }
            Err(e) => trace!(error = %e, "No trailing datagram"),
        }

        debug!(bytes = stream.len(), "Bulk transfer done");
        Transfer {
            stream: stream.freeze(),
            interrupted,
        }
    }

    /// Wait for one unsolicited datagram
    pub async fn poll(&mut self, wait: Duration) -> Option<BytesMut> {
        match self.transport.receive(wait).await {
            Ok(datagram) => Some(datagram),
            Err(e) if e.is_timeout() => None,
            Err(e) => {
                debug!(error = %e, "Poll receive failed");
                None
            }
        }
    }
}
