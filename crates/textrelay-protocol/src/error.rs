//! Error types for the protocol layer.
//!
//! Framing problems and grammar problems are kept apart: a
//! [`FrameError`] means the byte stream itself can no longer be trusted
//! and the connection must close, while the other [`ProtocolError`]
//! variants only spoil a single body.

/// Errors raised while splitting the byte stream into frames.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The header is not a non-negative decimal number.
    ///
    /// Carries the offending header text (lossily decoded) so it shows
    /// up in logs.
    #[error("invalid frame header: {0:?}")]
    InvalidHeader(String),

    /// The declared or supplied body is longer than the configured maximum.
    #[error("frame body of {len} bytes exceeds maximum of {max}")]
    BodyTooLong { len: usize, max: usize },

    /// The body bytes are not valid UTF-8.
    #[error("frame body is not valid UTF-8")]
    InvalidUtf8,

    /// The configured limits cannot describe a usable frame.
    #[error("invalid frame config: {0}")]
    InvalidConfig(String),
}

/// Errors that can occur while decoding a request body.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The frame itself was bad. Fatal for the connection.
    #[error(transparent)]
    Frame(#[from] FrameError),

    /// The checksum token does not match the line it was sent with.
    #[error("checksum mismatch")]
    ChecksumMismatch,

    /// The body verified but does not follow the command grammar
    /// (no checksum separator, or fewer than three tokens).
    #[error("malformed body: {0}")]
    Malformed(String),

    /// I/O error surfaced through the `tokio_util` codec adapters.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProtocolError {
    /// Returns `true` if the error means the connection must be closed.
    ///
    /// Checksum mismatches and malformed bodies only discard the one
    /// message; everything else poisons the stream.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Frame(_) | Self::Io(_))
    }
}
