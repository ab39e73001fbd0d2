//! The per-connection state machine.
//!
//! ```text
//!              ┌──────────────────────────────────────────────┐
//!              ▼                                              │
//!        AwaitHeader ──▶ AwaitBody ──▶ Dispatch ──(reply)──▶ AwaitWriteDrain
//!              │             │            │  │
//!              │             │            │  └──(no reply / dropped)──▶ AwaitHeader
//!              └─────────────┴────────────┴──(error)──▶ Closed
//! ```
//!
//! One task drives one session, so a session never has two reads or two
//! writes in flight. Every failure lands in `Closed`, after which the
//! participant leaves the broker exactly once.

use std::fmt;

use textrelay_broker::{BrokerError, BrokerHandle, ParticipantKey};
use textrelay_protocol::{FrameCodec, ProtocolError, decode_request};
use textrelay_transport::{Connection, TransportError};

use crate::dispatch::dispatch;
use crate::{SessionConfig, SessionError};

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Where a session is in its read/dispatch/write cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for the fixed-width length header.
    AwaitHeader,
    /// Waiting for exactly `len` body bytes.
    AwaitBody { len: usize },
    /// A complete body is ready to verify, parse, and apply.
    Dispatch { body: String },
    /// A reply frame is being written.
    AwaitWriteDrain { frame: Vec<u8> },
    /// Terminal. No further reads or writes.
    Closed,
}

impl SessionState {
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AwaitHeader => write!(f, "AwaitHeader"),
            Self::AwaitBody { len } => write!(f, "AwaitBody({len})"),
            Self::Dispatch { .. } => write!(f, "Dispatch"),
            Self::AwaitWriteDrain { frame } => {
                write!(f, "AwaitWriteDrain({} bytes)", frame.len())
            }
            Self::Closed => write!(f, "Closed"),
        }
    }
}

// ---------------------------------------------------------------------------
// LeaveGuard
// ---------------------------------------------------------------------------

/// Removes the participant from the broker when the session ends.
///
/// The normal path calls [`leave`](Self::leave). If the session task is
/// dropped first (aborted, or panicked) `Drop` hands the leave to a new
/// task instead, since `Drop` cannot await.
struct LeaveGuard {
    broker: BrokerHandle,
    key: Option<ParticipantKey>,
}

impl LeaveGuard {
    fn new(broker: BrokerHandle, key: ParticipantKey) -> Self {
        Self {
            broker,
            key: Some(key),
        }
    }

    async fn leave(mut self) -> Result<(), BrokerError> {
        if let Some(key) = self.key.take() {
            self.broker.leave(key).await?;
        }
        Ok(())
    }
}

impl Drop for LeaveGuard {
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            let broker = self.broker.clone();
            tokio::spawn(async move {
                let _ = broker.leave(key).await;
            });
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One client connection, from accept to close.
pub struct Session<C: Connection> {
    conn: C,
    key: ParticipantKey,
    broker: BrokerHandle,
    codec: FrameCodec,
    config: SessionConfig,
    /// Set when a transition fails; explains the move to `Closed`.
    close_reason: Option<SessionError>,
}

impl<C: Connection> Session<C> {
    /// Creates a session for `conn`. The participant key is derived from
    /// the connection id.
    pub fn new(conn: C, broker: BrokerHandle, config: SessionConfig) -> Self {
        let key = ParticipantKey::new(conn.id().into_inner());
        Self {
            conn,
            key,
            broker,
            codec: FrameCodec::new(config.frame),
            config,
            close_reason: None,
        }
    }

    pub fn key(&self) -> ParticipantKey {
        self.key
    }

    /// Registers with the broker, drives the state machine until
    /// `Closed`, then leaves the broker.
    ///
    /// A peer closing the connection is a normal end and returns `Ok`.
    ///
    /// # Errors
    /// The [`SessionError`] that closed the session, or
    /// [`SessionError::Broker`] if the broker task is gone.
    pub async fn run(mut self) -> Result<(), SessionError> {
        let conn_id = self.conn.id();
        let key = self.key;

        self.broker.register(key).await?;
        let guard = LeaveGuard::new(self.broker.clone(), key);
        tracing::info!(%conn_id, %key, "session started");

        let mut state = SessionState::AwaitHeader;
        while !state.is_closed() {
            state = self.step(state).await;
        }

        if let Err(e) = self.conn.close().await {
            tracing::debug!(%conn_id, error = %e, "error closing connection");
        }
        let left = guard.leave().await;

        match self.close_reason.take() {
            Some(e) if !e.is_disconnect() => {
                tracing::warn!(%conn_id, %key, error = %e, "session closed on error");
                Err(e)
            }
            _ => {
                tracing::info!(%conn_id, %key, "session closed");
                left.map_err(SessionError::from)
            }
        }
    }

    /// Runs one transition. Any failure moves to `Closed`.
    async fn step(&mut self, state: SessionState) -> SessionState {
        match self.transition(state).await {
            Ok(next) => next,
            Err(e) => {
                self.close_reason = Some(e);
                SessionState::Closed
            }
        }
    }

    async fn transition(
        &mut self,
        state: SessionState,
    ) -> Result<SessionState, SessionError> {
        match state {
            SessionState::AwaitHeader => {
                let mut header = vec![0u8; self.codec.header_width()];
                self.conn.read_exact(&mut header).await?;
                let len = self.codec.decode_header(&header)?;
                Ok(SessionState::AwaitBody { len })
            }
            SessionState::AwaitBody { len } => {
                let mut body = vec![0u8; len];
                self.conn.read_exact(&mut body).await?;
                let body = self.codec.decode_body(body)?;
                Ok(SessionState::Dispatch { body })
            }
            SessionState::Dispatch { body } => self.handle_body(&body).await,
            SessionState::AwaitWriteDrain { frame } => {
                self.conn.write_all(&frame).await?;
                Ok(SessionState::AwaitHeader)
            }
            SessionState::Closed => Ok(SessionState::Closed),
        }
    }

    /// Verifies, parses, and applies one body.
    ///
    /// Bad checksums and malformed bodies are dropped without a reply.
    async fn handle_body(&mut self, body: &str) -> Result<SessionState, SessionError> {
        let conn_id = self.conn.id();
        let request = match decode_request(body, self.config.verify_checksums) {
            Ok(request) => request,
            Err(ProtocolError::ChecksumMismatch) => {
                tracing::warn!(%conn_id, "checksum mismatch, message dropped");
                return Ok(SessionState::AwaitHeader);
            }
            Err(ProtocolError::Malformed(reason)) => {
                tracing::warn!(%conn_id, %reason, "malformed body, message dropped");
                return Ok(SessionState::AwaitHeader);
            }
            Err(ProtocolError::Frame(e)) => return Err(e.into()),
            Err(ProtocolError::Io(e)) => {
                return Err(TransportError::ReceiveFailed(e).into());
            }
        };

        tracing::debug!(
            %conn_id,
            key = %self.key,
            command = %request.command,
            "dispatching"
        );
        let reply = dispatch(
            &self.broker,
            self.key,
            request.command,
            self.codec.max_body_length(),
        )
        .await?;

        match reply {
            Some(reply) => {
                let frame = self.codec.encode(reply.to_body().as_bytes())?;
                Ok(SessionState::AwaitWriteDrain { frame })
            }
            None => Ok(SessionState::AwaitHeader),
        }
    }
}
