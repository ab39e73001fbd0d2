//! Error types for the broker layer.

/// Errors returned by [`BrokerHandle`](crate::BrokerHandle) calls.
///
/// Broker operations themselves never fail: invalid room references and
/// taken names are reported as `false`/`None` results, not errors. The
/// only failure is losing contact with the broker task.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    /// The broker task has stopped and its channel is closed.
    #[error("broker is unavailable")]
    Unavailable,
}
