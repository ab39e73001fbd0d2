//! # Textrelay
//!
//! A multi-room text relay server. Clients connect over TCP, exchange
//! length-framed, checksummed command lines, join named rooms, post
//! text, and pull whatever is new in their room.
//!
//! This crate ties the layers together:
//!
//! ```text
//! transport → protocol → session → broker
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use textrelay::prelude::*;
//!
//! # async fn start() -> Result<(), RelayError> {
//! let server = RelayServer::builder()
//!     .bind("127.0.0.1:9000")
//!     .broker_config(BrokerConfig {
//!         history_limit: Some(1_000),
//!         ..BrokerConfig::default()
//!     })
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod server;

pub use config::{DEFAULT_BIND_ADDR, RelayConfig};
pub use error::RelayError;
pub use server::{RelayServer, RelayServerBuilder};

/// Re-exports of the most common types from all Textrelay crates.
pub mod prelude {
    pub use crate::{RelayConfig, RelayError, RelayServer, RelayServerBuilder};
    pub use textrelay_broker::{BrokerConfig, BrokerHandle, ParticipantKey};
    pub use textrelay_protocol::{
        Command, FrameCodec, FrameConfig, ParticipantId, TextEntry, compose_body,
    };
    pub use textrelay_session::{SessionConfig, SessionError};
    pub use textrelay_transport::{ConnectionId, TransportError};
}
