//! Replica side of the replication handshake.
//!
//! [`ReplicaHandshake`] is a plain state machine: it produces the next
//! outbound command and consumes decoded replies, without touching any
//! socket. [`ReplicaHandshake::run`] drives it over a stream and
//! [`replicate_from_master`] is the task spawned by a replica at startup.

use std::fmt;

use bytes::{Buf, Bytes, BytesMut};
use thiserror::Error;
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    net::TcpStream,
};
use tracing::{debug, error, info};

use crate::resp::{decode_reply, decode_snapshot, RespError, RespValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    Idle,
    PingSent,
    AwaitingPong,
    ReplconfPortSent,
    AwaitingPortAck,
    ReplconfCapaSent,
    AwaitingCapaAck,
    PsyncSent,
    Streaming,
    Failed,
}

impl fmt::Display for HandshakeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Error, Debug)]
pub enum HandshakeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("master closed the connection")]
    ConnectionClosed,
    #[error("protocol error: {0}")]
    Protocol(#[from] RespError),
    #[error("unexpected reply {reply:?} in state {state}")]
    UnexpectedReply {
        state: HandshakeState,
        reply: RespValue,
    },
    #[error("operation not allowed in state {0}")]
    InvalidState(HandshakeState),
}

#[derive(Debug)]
pub struct ReplicaHandshake {
    state: HandshakeState,
    listening_port: u16,
    master_repl_id: Option<String>,
    master_repl_offset: Option<i64>,
}

impl ReplicaHandshake {
    pub fn new(listening_port: u16) -> Self {
        Self {
            state: HandshakeState::Idle,
            listening_port,
            master_repl_id: None,
            master_repl_offset: None,
        }
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Replication id announced by the master in `FULLRESYNC`.
    pub fn master_repl_id(&self) -> Option<&str> {
        self.master_repl_id.as_deref()
    }

    pub fn master_repl_offset(&self) -> Option<i64> {
        self.master_repl_offset
    }

    /// True once `FULLRESYNC` was accepted and only the snapshot is missing.
    pub fn awaiting_snapshot(&self) -> bool {
        self.state == HandshakeState::PsyncSent && self.master_repl_id.is_some()
    }

    /// Returns the first message to send (`PING`).
    pub fn start(&mut self) -> Result<RespValue, HandshakeError> {
        if self.state != HandshakeState::Idle {
            return Err(self.fail(HandshakeError::InvalidState(self.state)));
        }

        self.transition(HandshakeState::PingSent);
        Ok(RespValue::command(&["PING"]))
    }

    /// Records that the last message produced by the machine was written out.
    pub fn message_sent(&mut self) {
        let next = match self.state {
            HandshakeState::PingSent => HandshakeState::AwaitingPong,
            HandshakeState::ReplconfPortSent => HandshakeState::AwaitingPortAck,
            HandshakeState::ReplconfCapaSent => HandshakeState::AwaitingCapaAck,
            other => other,
        };

        self.transition(next);
    }

    /// Consumes one reply from the master.
    ///
    /// Returns the next message to send, or `None` while waiting for the
    /// snapshot that follows `FULLRESYNC`.
    pub fn handle_reply(&mut self, reply: RespValue) -> Result<Option<RespValue>, HandshakeError> {
        match (self.state, &reply) {
            (HandshakeState::PingSent | HandshakeState::AwaitingPong, RespValue::SimpleString(text))
                if &text[..] == b"PONG" =>
            {
                self.transition(HandshakeState::ReplconfPortSent);
                let port = self.listening_port.to_string();
                Ok(Some(RespValue::command(&["REPLCONF", "listening-port", &port])))
            }
            (
                HandshakeState::ReplconfPortSent | HandshakeState::AwaitingPortAck,
                RespValue::SimpleString(text),
            ) if &text[..] == b"OK" => {
                self.transition(HandshakeState::ReplconfCapaSent);
                Ok(Some(RespValue::command(&["REPLCONF", "capa", "psync2"])))
            }
            (
                HandshakeState::ReplconfCapaSent | HandshakeState::AwaitingCapaAck,
                RespValue::SimpleString(text),
            ) if &text[..] == b"OK" => {
                self.transition(HandshakeState::PsyncSent);
                Ok(Some(RespValue::command(&["PSYNC", "?", "-1"])))
            }
            (HandshakeState::PsyncSent, RespValue::SimpleString(text))
                if self.master_repl_id.is_none() =>
            {
                match parse_full_resync(text) {
                    Some((repl_id, offset)) => {
                        debug!(%repl_id, offset, "master accepted full resynchronization");
                        self.master_repl_id = Some(repl_id);
                        self.master_repl_offset = Some(offset);
                        Ok(None)
                    }
                    None => Err(self.unexpected(reply)),
                }
            }
            _ => Err(self.unexpected(reply)),
        }
    }

    /// Consumes the snapshot that follows `FULLRESYNC`. Its content is discarded.
    pub fn handle_snapshot(&mut self, snapshot: &[u8]) -> Result<(), HandshakeError> {
        if !self.awaiting_snapshot() {
            return Err(self.fail(HandshakeError::InvalidState(self.state)));
        }

        debug!(bytes = snapshot.len(), "discarding snapshot");
        self.transition(HandshakeState::Streaming);
        Ok(())
    }

    /// Opens the connection to the master. A failure moves the machine to `Failed`.
    pub async fn connect(&mut self, address: (&str, u16)) -> Result<TcpStream, HandshakeError> {
        match TcpStream::connect(address).await {
            Ok(stream) => Ok(stream),
            Err(e) => Err(self.fail(e.into())),
        }
    }

    /// Runs the whole exchange over `stream`, leaving the machine in
    /// `Streaming` on success and in `Failed` otherwise.
    pub async fn run<S>(&mut self, stream: &mut S) -> Result<(), HandshakeError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        match self.drive(stream).await {
            Ok(()) => Ok(()),
            Err(e) => Err(self.fail(e)),
        }
    }

    async fn drive<S>(&mut self, stream: &mut S) -> Result<(), HandshakeError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut buffer = BytesMut::with_capacity(1024);
        let mut outbound = Some(self.start()?);

        while self.state != HandshakeState::Streaming {
            if let Some(message) = outbound.take() {
                stream.write_all(&message.encode()).await?;
                stream.flush().await?;
                self.message_sent();
            }

            if self.awaiting_snapshot() {
                let snapshot = read_frame(stream, &mut buffer, decode_snapshot).await?;
                self.handle_snapshot(&snapshot)?;
            } else {
                let reply = read_frame(stream, &mut buffer, decode_reply).await?;
                outbound = self.handle_reply(reply)?;
            }
        }

        if !buffer.is_empty() {
            debug!(pending = buffer.len(), "ignoring bytes received after the snapshot");
        }

        Ok(())
    }

    fn transition(&mut self, next: HandshakeState) {
        if self.state != next {
            debug!(from = %self.state, to = %next, "handshake state transition");
            self.state = next;
        }
    }

    fn unexpected(&mut self, reply: RespValue) -> HandshakeError {
        self.fail(HandshakeError::UnexpectedReply {
            state: self.state,
            reply,
        })
    }

    fn fail(&mut self, e: HandshakeError) -> HandshakeError {
        self.transition(HandshakeState::Failed);
        e
    }
}

/// Parses `FULLRESYNC <replid> <offset>`.
fn parse_full_resync(line: &Bytes) -> Option<(String, i64)> {
    let line = std::str::from_utf8(line).ok()?;
    let mut parts = line.split_whitespace();

    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(keyword), Some(repl_id), Some(offset), None)
            if keyword.eq_ignore_ascii_case("FULLRESYNC") =>
        {
            let offset = offset.parse::<i64>().ok()?;
            Some((repl_id.to_string(), offset))
        }
        _ => None,
    }
}

/// Reads from `stream` until `decode` yields a complete frame.
async fn read_frame<S, T, F>(
    stream: &mut S,
    buffer: &mut BytesMut,
    decode: F,
) -> Result<T, HandshakeError>
where
    S: AsyncRead + Unpin,
    F: Fn(&[u8]) -> Result<Option<(T, usize)>, RespError>,
{
    loop {
        if let Some((frame, consumed)) = decode(&buffer[..])? {
            buffer.advance(consumed);
            return Ok(frame);
        }

        if stream.read_buf(buffer).await? == 0 {
            return Err(HandshakeError::ConnectionClosed);
        }
    }
}

/// Connects to the master, performs the handshake and then holds the link
/// open until the master goes away. Failures are logged and never retried.
pub async fn replicate_from_master(host: String, port: u16, listening_port: u16) {
    let master = format!("{}:{}", host, port);
    let mut handshake = ReplicaHandshake::new(listening_port);

    let mut stream = match handshake.connect((host.as_str(), port)).await {
        Ok(stream) => stream,
        Err(e) => {
            error!(%master, "failed to connect to master: {}", e);
            return;
        }
    };

    if let Err(e) = handshake.run(&mut stream).await {
        error!(%master, state = %handshake.state(), "handshake failed: {}", e);
        return;
    }

    info!(
        %master,
        repl_id = handshake.master_repl_id().unwrap_or_default(),
        offset = handshake.master_repl_offset().unwrap_or_default(),
        "replication link established"
    );

    match tokio::io::copy(&mut stream, &mut tokio::io::sink()).await {
        Ok(_) => info!("master closed the replication link"),
        Err(e) => error!("replication link failed: {}", e),
    }
}
