//! Transport abstraction layer for Textrelay.
//!
//! Provides the [`Transport`] and [`Connection`] traits that abstract
//! over byte-stream sockets, plus the TCP implementation the server uses.
//! Framing lives one layer up; a connection only moves exact byte counts.

mod error;
mod tcp;

pub use error::TransportError;
pub use tcp::{StreamConnection, TcpConnection, TcpTransport};

use std::fmt;
use std::future::Future;
use std::net::SocketAddr;

/// Opaque identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Accepts new incoming connections.
pub trait Transport: Send + 'static {
    /// The connection type produced by this transport.
    type Connection: Connection;

    /// Waits for and accepts the next incoming connection.
    fn accept(
        &mut self,
    ) -> impl Future<Output = Result<Self::Connection, TransportError>> + Send;

    /// Returns the address the transport is listening on.
    fn local_addr(&self) -> std::io::Result<SocketAddr>;
}

/// A single connection that reads and writes exact byte counts.
///
/// Each method returns a `Send` future so a connection can be driven
/// from a spawned Tokio task.
pub trait Connection: Send + 'static {
    /// Fills `buf` completely from the peer.
    ///
    /// Returns [`TransportError::ConnectionClosed`] if the peer closes
    /// before `buf` is full.
    fn read_exact(
        &mut self,
        buf: &mut [u8],
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Writes all of `data` to the peer.
    fn write_all(
        &mut self,
        data: &[u8],
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Shuts down the write half of the connection.
    fn close(&mut self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_new_and_into_inner() {
        let id = ConnectionId::new(42);
        assert_eq!(id.into_inner(), 42);
    }

    #[test]
    fn test_connection_id_display() {
        let id = ConnectionId::new(7);
        assert_eq!(id.to_string(), "conn-7");
    }

    #[test]
    fn test_connection_id_orders_by_value() {
        assert!(ConnectionId::new(1) < ConnectionId::new(2));
    }

    #[test]
    fn test_read_eof_maps_to_connection_closed() {
        let err = TransportError::from_read(std::io::Error::from(
            std::io::ErrorKind::UnexpectedEof,
        ));
        assert!(matches!(err, TransportError::ConnectionClosed(_)));

        let err = TransportError::from_read(std::io::Error::from(
            std::io::ErrorKind::ConnectionReset,
        ));
        assert!(matches!(err, TransportError::ReceiveFailed(_)));
    }
}
