//! CRC32 integrity tokens.
//!
//! A transmitted body is a checksum token glued onto a canonical line:
//!
//! ```text
//! 3610a686,20261019T101500.000000,SENDTEXT,hello
//! └──────┘└──────────────────────────────────────┘
//!  token    canonical line (starts with the comma)
//! ```
//!
//! The token is the CRC32 (IEEE, as used by zlib) of the canonical line's
//! UTF-8 bytes, in lowercase hex without zero padding. It detects
//! accidental corruption only; it is not a cryptographic MAC.

use crate::ProtocolError;

/// Computes the checksum token for a canonical line.
///
/// ```rust
/// use textrelay_protocol::checksum;
///
/// assert_eq!(checksum(""), "0");
/// assert_eq!(checksum("123456789"), "cbf43926");
/// ```
pub fn checksum(line: &str) -> String {
    format!("{:x}", crc32fast::hash(line.as_bytes()))
}

/// Returns `true` if `token` is the checksum of `line`.
pub fn verify(token: &str, line: &str) -> bool {
    checksum(line) == token
}

/// Splits a transmitted body into its checksum token and canonical line.
///
/// The token is everything before the first comma; the canonical line is
/// the rest of the body, leading comma included.
///
/// # Errors
/// Returns [`ProtocolError::Malformed`] if the body has no comma.
pub fn split_token(body: &str) -> Result<(&str, &str), ProtocolError> {
    let idx = body.find(',').ok_or_else(|| {
        ProtocolError::Malformed("missing checksum separator".into())
    })?;
    Ok(body.split_at(idx))
}
