//! Scripted transport for unit tests
//!
//! Replies are queued up front and handed out one per `receive`; an empty
//! queue behaves like a silent terminal and times out. Every sent datagram
//! is logged. The state sits behind a shared handle so a test can keep
//! inspecting it after the transport has been boxed into a `Device`.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;

use zkrust_core::{Command, Packet};
use zkrust_transport::{Error, Result, Transport};

#[derive(Debug)]
pub(crate) enum Reply {
    Datagram(Vec<u8>),
    Timeout,
}

#[derive(Debug, Default)]
struct State {
    connected: bool,
    replies: VecDeque<Reply>,
    sent: Vec<Vec<u8>>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct MockTransport {
    state: Arc<Mutex<State>>,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Queue a raw datagram
    pub(crate) fn push_raw(&self, datagram: impl Into<Vec<u8>>) -> &Self {
        self.state.lock().replies.push_back(Reply::Datagram(datagram.into()));
        self
    }

    /// Queue a frame
    pub(crate) fn push(
        &self,
        command: Command,
        session_id: u16,
        reply_id: u16,
        payload: impl Into<Bytes>,
    ) -> &Self {
        let packet = Packet::with_payload(command, session_id, reply_id, payload);
        self.push_raw(packet.encode().to_vec())
    }

    /// Queue a receive that times out
    pub(crate) fn push_timeout(&self) -> &Self {
        self.state.lock().replies.push_back(Reply::Timeout);
        self
    }

    /// All datagrams sent so far, decoded
    pub(crate) fn sent(&self) -> Vec<Packet> {
        self.state
            .lock()
            .sent
            .iter()
            .filter_map(|raw| Packet::decode(raw).ok())
            .collect()
    }

    /// Commands sent so far
    pub(crate) fn sent_commands(&self) -> Vec<Command> {
        self.sent().into_iter().map(|p| p.command).collect()
    }

    pub(crate) fn remaining(&self) -> usize {
        self.state.lock().replies.len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        if state.connected {
            return Err(Error::AlreadyConnected);
        }
        state.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.state.lock().connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.state.lock().connected
    }

    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let mut state = self.state.lock();
        if !state.connected {
            return Err(Error::NotConnected);
        }
        state.sent.push(data.to_vec());
        Ok(())
    }

    async fn receive(&mut self, _timeout: Duration) -> Result<BytesMut> {
        let mut state = self.state.lock();
        if !state.connected {
            return Err(Error::NotConnected);
        }
        match state.replies.pop_front() {
            Some(Reply::Datagram(data)) => Ok(BytesMut::from(&data[..])),
            Some(Reply::Timeout) | None => Err(Error::ReadTimeout),
        }
    }

    fn remote_addr(&self) -> String {
        "mock".into()
    }
}
