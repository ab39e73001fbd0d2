//! Error types for the session layer.

use textrelay_broker::BrokerError;
use textrelay_protocol::FrameError;
use textrelay_transport::TransportError;

/// Why a session reached `Closed`.
///
/// Only conditions that end the connection show up here. A checksum
/// mismatch or a malformed body discards one message and the session
/// keeps reading, so neither is a `SessionError`.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Reading or writing the socket failed, or the peer went away.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The peer sent a header or body the frame codec rejects.
    #[error(transparent)]
    Frame(#[from] FrameError),

    /// The broker task is gone.
    #[error(transparent)]
    Broker(#[from] BrokerError),
}

impl SessionError {
    /// Returns `true` if the peer simply closed the connection.
    pub fn is_disconnect(&self) -> bool {
        matches!(self, Self::Transport(TransportError::ConnectionClosed(_)))
    }
}
