//! Unified error type for Textrelay.

use textrelay_broker::BrokerError;
use textrelay_protocol::FrameError;
use textrelay_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant generates a `From` impl, so
/// `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Binding or accepting on the listening socket failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The configured frame limits are unusable.
    #[error(transparent)]
    Config(#[from] FrameError),

    /// The broker task is gone.
    #[error(transparent)]
    Broker(#[from] BrokerError),
}
