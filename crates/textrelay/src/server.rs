//! `RelayServer` builder and accept loop.
//!
//! This is the Listener: it owns the listening transport and the broker
//! handle, and turns every accepted connection into a [`Session`] task.
//!
//! ```text
//! accept ──▶ Session::new(conn, broker.clone()) ──▶ tokio::spawn(run)
//! ```

use std::future::Future;
use std::net::SocketAddr;

use textrelay_broker::{BrokerConfig, BrokerHandle, spawn_broker};
use textrelay_protocol::FrameConfig;
use textrelay_session::{Session, SessionConfig};
use textrelay_transport::{Connection, TcpTransport, Transport};

use crate::{RelayConfig, RelayError};

/// Builder for configuring and starting a relay server.
///
/// # Example
///
/// ```rust,no_run
/// use textrelay::prelude::*;
///
/// # async fn start() -> Result<(), RelayError> {
/// let server = RelayServer::builder()
///     .bind("0.0.0.0:9000")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct RelayServerBuilder {
    config: RelayConfig,
}

impl RelayServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: RelayConfig::default(),
        }
    }

    /// Starts from a complete configuration.
    pub fn from_config(config: RelayConfig) -> Self {
        Self { config }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Sets header width and maximum body length.
    pub fn frame_config(mut self, frame: FrameConfig) -> Self {
        self.config.session.frame = frame;
        self
    }

    /// Sets default room, history limit, and channel size.
    pub fn broker_config(mut self, config: BrokerConfig) -> Self {
        self.config.broker = config;
        self
    }

    /// Sets the per-session configuration, framing included.
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.config.session = config;
        self
    }

    /// Validates the frame limits, binds the listener, and starts the
    /// broker task.
    ///
    /// Must be called from within a Tokio runtime.
    pub async fn build(self) -> Result<RelayServer, RelayError> {
        self.config.session.validate()?;
        let transport = TcpTransport::bind(&self.config.bind_addr).await?;
        RelayServer::with_transport(transport, self.config.broker, self.config.session)
    }
}

impl Default for RelayServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A relay server bound to a transport.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct RelayServer<T: Transport = TcpTransport> {
    transport: T,
    broker: BrokerHandle,
    session_config: SessionConfig,
}

impl RelayServer {
    /// Creates a new builder.
    pub fn builder() -> RelayServerBuilder {
        RelayServerBuilder::new()
    }
}

impl<T: Transport> RelayServer<T> {
    /// Wraps an already-bound transport and spawns a fresh broker.
    ///
    /// # Errors
    /// Returns [`RelayError::Config`] if the session's frame limits are
    /// unusable.
    pub fn with_transport(
        transport: T,
        broker_config: BrokerConfig,
        session_config: SessionConfig,
    ) -> Result<Self, RelayError> {
        session_config.validate()?;
        Ok(Self {
            transport,
            broker: spawn_broker(broker_config),
            session_config,
        })
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.transport.local_addr()
    }

    /// Returns a handle to the server's broker.
    pub fn broker(&self) -> BrokerHandle {
        self.broker.clone()
    }

    /// Runs the accept loop until the process is terminated.
    pub async fn run(self) -> Result<(), RelayError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the accept loop until `shutdown` completes.
    ///
    /// Sessions already running are left to finish on their own. The
    /// broker stops once the last of them drops its handle.
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<(), RelayError>
    where
        F: Future<Output = ()>,
    {
        let addr = self.local_addr().ok();
        tracing::info!(?addr, "relay server running");

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("relay server shutting down");
                    return Ok(());
                }
                accepted = self.transport.accept() => match accepted {
                    Ok(conn) => self.spawn_session(conn),
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                },
            }
        }
    }

    fn spawn_session(&self, conn: T::Connection) {
        let conn_id = conn.id();
        tracing::info!(%conn_id, "connection accepted");

        let session = Session::new(conn, self.broker.clone(), self.session_config);
        tokio::spawn(async move {
            if let Err(e) = session.run().await {
                tracing::debug!(%conn_id, error = %e, "session ended with error");
            }
        });
    }
}
