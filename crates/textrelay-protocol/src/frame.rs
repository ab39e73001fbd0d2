//! Length-prefixed framing.
//!
//! Every frame on the wire is a fixed-width ASCII header holding the
//! decimal length of the body, followed by exactly that many body bytes.
//! There is no delimiter and no escaping: both ends know the header width.
//!
//! ```text
//! ┌──────┬─────────────────────────────────┐
//! │"  42"│ 42 bytes of UTF-8 body text      │
//! └──────┴─────────────────────────────────┘
//!  header  body (≤ max_body_length bytes)
//! ```
//!
//! The header is right-aligned and space-padded on encode. On decode,
//! surrounding spaces are ignored, so zero-padded headers (`"0042"`) are
//! accepted too.

use crate::FrameError;

/// Width of the length header on the wire.
pub const DEFAULT_HEADER_WIDTH: usize = 4;

/// Largest body accepted or sent by default.
pub const DEFAULT_MAX_BODY_LENGTH: usize = 512;

// ---------------------------------------------------------------------------
// FrameConfig
// ---------------------------------------------------------------------------

/// Framing limits shared by both ends of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameConfig {
    /// Number of ASCII bytes in the length header.
    pub header_width: usize,

    /// Maximum number of body bytes in a single frame.
    pub max_body_length: usize,
}

impl FrameConfig {
    /// Checks that every length up to `max_body_length` can be written
    /// into a `header_width`-digit header.
    ///
    /// # Errors
    /// Returns [`FrameError::InvalidConfig`] for a zero-width header or a
    /// maximum the header cannot hold.
    pub fn validate(&self) -> Result<(), FrameError> {
        let width = self.header_width;
        if width == 0 {
            return Err(FrameError::InvalidConfig(
                "header width must be at least 1".into(),
            ));
        }
        // `None` means 10^width overflows, so any usize fits.
        let limit = u32::try_from(width)
            .ok()
            .and_then(|w| 10usize.checked_pow(w));
        match limit {
            Some(limit) if self.max_body_length >= limit => {
                Err(FrameError::InvalidConfig(format!(
                    "max body length {} does not fit a {width}-digit header (at most {})",
                    self.max_body_length,
                    limit - 1
                )))
            }
            _ => Ok(()),
        }
    }
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            header_width: DEFAULT_HEADER_WIDTH,
            max_body_length: DEFAULT_MAX_BODY_LENGTH,
        }
    }
}

// ---------------------------------------------------------------------------
// FrameCodec
// ---------------------------------------------------------------------------

/// Encodes bodies into frames and decodes headers and bodies back.
///
/// The codec performs no semantic interpretation of the body. It is
/// `Copy`, so every session can hold its own.
///
/// ## Example
///
/// ```rust
/// use textrelay_protocol::{FrameCodec, FrameConfig};
///
/// let codec = FrameCodec::new(FrameConfig::default());
/// let frame = codec.encode(b"hello").unwrap();
/// assert_eq!(frame, b"   5hello");
///
/// let len = codec.decode_header(&frame[..4]).unwrap();
/// assert_eq!(len, 5);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameCodec {
    config: FrameConfig,
}

impl FrameCodec {
    /// Creates a codec with the given limits.
    pub fn new(config: FrameConfig) -> Self {
        Self { config }
    }

    /// Returns the limits this codec enforces.
    pub fn config(&self) -> FrameConfig {
        self.config
    }

    /// Number of header bytes to read before each body.
    pub fn header_width(&self) -> usize {
        self.config.header_width
    }

    /// Maximum body length in bytes.
    pub fn max_body_length(&self) -> usize {
        self.config.max_body_length
    }

    /// Prefixes `body` with its length header.
    ///
    /// # Errors
    /// Returns [`FrameError::BodyTooLong`] if the body exceeds the
    /// configured maximum or its length does not fit in the header.
    pub fn encode(&self, body: &[u8]) -> Result<Vec<u8>, FrameError> {
        let header = self.encode_header(body.len())?;
        let mut frame = Vec::with_capacity(header.len() + body.len());
        frame.extend_from_slice(header.as_bytes());
        frame.extend_from_slice(body);
        Ok(frame)
    }

    fn encode_header(&self, len: usize) -> Result<String, FrameError> {
        let max = self.config.max_body_length;
        if len > max {
            return Err(FrameError::BodyTooLong { len, max });
        }
        let width = self.config.header_width;
        let header = format!("{len:>width$}");
        if header.len() != width {
            return Err(FrameError::BodyTooLong { len, max });
        }
        Ok(header)
    }

    /// Parses a length header.
    ///
    /// # Errors
    /// - [`FrameError::InvalidHeader`]: wrong width, or not a
    ///   non-negative decimal number.
    /// - [`FrameError::BodyTooLong`]: the declared length exceeds the
    ///   configured maximum.
    pub fn decode_header(&self, header: &[u8]) -> Result<usize, FrameError> {
        let invalid =
            || FrameError::InvalidHeader(String::from_utf8_lossy(header).into_owned());

        if header.len() != self.config.header_width {
            return Err(invalid());
        }
        let text = std::str::from_utf8(header).map_err(|_| invalid())?;
        let digits = text.trim_matches(' ');
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let len: usize = digits.parse().map_err(|_| invalid())?;

        let max = self.config.max_body_length;
        if len > max {
            return Err(FrameError::BodyTooLong { len, max });
        }
        Ok(len)
    }

    /// Validates a body that was read after its header.
    ///
    /// # Errors
    /// - [`FrameError::BodyTooLong`]: more bytes than the maximum.
    /// - [`FrameError::InvalidUtf8`]: the bytes are not UTF-8 text.
    pub fn decode_body(&self, body: Vec<u8>) -> Result<String, FrameError> {
        let max = self.config.max_body_length;
        if body.len() > max {
            return Err(FrameError::BodyTooLong {
                len: body.len(),
                max,
            });
        }
        String::from_utf8(body).map_err(|_| FrameError::InvalidUtf8)
    }
}

// ---------------------------------------------------------------------------
// tokio_util adapters
// ---------------------------------------------------------------------------

/// Streaming decoder so a socket can be wrapped in
/// `tokio_util::codec::Framed` by clients and tests.
#[cfg(feature = "codec")]
impl tokio_util::codec::Decoder for FrameCodec {
    type Item = String;
    type Error = crate::ProtocolError;

    fn decode(
        &mut self,
        src: &mut bytes::BytesMut,
    ) -> Result<Option<String>, Self::Error> {
        let width = self.config.header_width;
        if src.len() < width {
            return Ok(None);
        }
        let len = self.decode_header(&src[..width])?;
        if src.len() < width + len {
            src.reserve(width + len - src.len());
            return Ok(None);
        }

        let _ = src.split_to(width);
        let body = src.split_to(len);
        Ok(Some(self.decode_body(body.to_vec())?))
    }
}

#[cfg(feature = "codec")]
impl tokio_util::codec::Encoder<String> for FrameCodec {
    type Error = crate::ProtocolError;

    fn encode(
        &mut self,
        item: String,
        dst: &mut bytes::BytesMut,
    ) -> Result<(), Self::Error> {
        let header = self.encode_header(item.len())?;
        dst.reserve(header.len() + item.len());
        dst.extend_from_slice(header.as_bytes());
        dst.extend_from_slice(item.as_bytes());
        Ok(())
    }
}
