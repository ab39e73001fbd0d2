//! Wire protocol for Textrelay.
//!
//! This crate defines the "language" that relay clients and the server
//! speak:
//!
//! - **Frames** ([`FrameCodec`]): a fixed-width decimal length header
//!   followed by a UTF-8 body.
//! - **Checksums** ([`checksum`], [`verify`]): a CRC32 token that guards
//!   each body against accidental corruption.
//! - **Commands** ([`Command`], [`Request`]): the tokenized grammar
//!   carried inside a verified body.
//! - **Lines and payloads** ([`compose_body`], [`payload`]): how replies
//!   are rendered back onto the wire.
//! - **Errors** ([`FrameError`], [`ProtocolError`]).
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw bytes) and session
//! (per-connection state). It knows nothing about sockets or rooms.
//!
//! ```text
//! Transport (bytes) → Frame (body text) → Checksum → Command → Session
//! ```

mod checksum;
mod command;
mod error;
mod frame;
mod line;
pub mod payload;
mod types;

pub use checksum::{checksum, split_token, verify};
pub use command::{Command, ParsedLine, Request, decode_request, parse_line, tokenize};
pub use error::{FrameError, ProtocolError};
pub use frame::{DEFAULT_HEADER_WIDTH, DEFAULT_MAX_BODY_LENGTH, FrameCodec, FrameConfig};
pub use line::{compose_body, compose_body_at, compose_line, line_overhead, timestamp_now};
pub use types::{MemberEntry, ParticipantId, TextEntry};
