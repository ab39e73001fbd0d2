//! The command grammar carried inside a body.
//!
//! After the checksum has been verified, a body is split on both `,` and
//! ` `, empty tokens are dropped, and the result is read positionally:
//!
//! ```text
//! token[0]  checksum   (already verified)
//! token[1]  timestamp
//! token[2]  command name
//! token[3..] argument tail, re-joined with single spaces
//! ```
//!
//! The re-join recovers arguments that contained spaces, but it cannot
//! tell which separators were commas: `NICK,a,b` and `NICK,a b` both
//! yield the argument `"a b"`. Existing clients rely on this, so the
//! grammar is kept as is.

use std::fmt;

use crate::{ProtocolError, split_token, verify};

// ---------------------------------------------------------------------------
// Tokenizing
// ---------------------------------------------------------------------------

/// A body split into its positional parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLine {
    pub checksum: String,
    pub timestamp: String,
    pub command: String,
    /// Argument tail re-joined with single spaces; empty if absent.
    pub args: String,
}

/// Splits a body on `,` and ` ` and drops empty tokens.
pub fn tokenize(body: &str) -> Vec<&str> {
    body.split([',', ' '])
        .filter(|token| !token.is_empty())
        .collect()
}

/// Parses a body into checksum, timestamp, command name and arguments.
///
/// # Errors
/// Returns [`ProtocolError::Malformed`] if fewer than three tokens remain
/// after splitting.
pub fn parse_line(body: &str) -> Result<ParsedLine, ProtocolError> {
    let tokens = tokenize(body);
    if tokens.len() < 3 {
        return Err(ProtocolError::Malformed(format!(
            "expected at least 3 tokens, got {}",
            tokens.len()
        )));
    }

    Ok(ParsedLine {
        checksum: tokens[0].to_string(),
        timestamp: tokens[1].to_string(),
        command: tokens[2].to_string(),
        args: tokens[3..].join(" "),
    })
}

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

/// A client request, as named on the wire.
///
/// Names the server does not recognize still parse, as
/// [`Command::Unknown`]; the session ignores them at dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `REQUUID`: issue a fresh identity to this connection.
    RequestId,
    /// `NICK <name>`: claim a display name.
    Nick(String),
    /// `SENDTEXT <text>`: post to the current room.
    SendText(String),
    /// `NAMECHATROOM <name>`: create a room if it does not exist.
    NameRoom(String),
    /// `CHANGECHATROOM <name>`: move to an existing room.
    ChangeRoom(String),
    /// `REQUSERS`: list members of the current room.
    RequestUsers,
    /// `REQCHATROOMS`: list every room.
    RequestRooms,
    /// `REQCHATROOM`: report the current room.
    RequestRoom,
    /// `REQTEXT`: pull entries posted since the last pull.
    RequestText,
    /// `MYUUID`: log this connection's identity server-side.
    MyId,
    /// Anything else.
    Unknown(String),
}

impl Command {
    pub const REQUEST_ID: &'static str = "REQUUID";
    pub const NICK: &'static str = "NICK";
    pub const SEND_TEXT: &'static str = "SENDTEXT";
    pub const NAME_ROOM: &'static str = "NAMECHATROOM";
    pub const CHANGE_ROOM: &'static str = "CHANGECHATROOM";
    pub const REQUEST_USERS: &'static str = "REQUSERS";
    pub const REQUEST_ROOMS: &'static str = "REQCHATROOMS";
    pub const REQUEST_ROOM: &'static str = "REQCHATROOM";
    pub const REQUEST_TEXT: &'static str = "REQTEXT";
    pub const MY_ID: &'static str = "MYUUID";

    /// Builds a command from its wire name and argument text.
    ///
    /// Argument text is dropped for commands that take none.
    pub fn from_parts(name: &str, args: String) -> Self {
        match name {
            Self::REQUEST_ID => Self::RequestId,
            Self::NICK => Self::Nick(args),
            Self::SEND_TEXT => Self::SendText(args),
            Self::NAME_ROOM => Self::NameRoom(args),
            Self::CHANGE_ROOM => Self::ChangeRoom(args),
            Self::REQUEST_USERS => Self::RequestUsers,
            Self::REQUEST_ROOMS => Self::RequestRooms,
            Self::REQUEST_ROOM => Self::RequestRoom,
            Self::REQUEST_TEXT => Self::RequestText,
            Self::MY_ID => Self::MyId,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// The wire name of this command.
    pub fn name(&self) -> &str {
        match self {
            Self::RequestId => Self::REQUEST_ID,
            Self::Nick(_) => Self::NICK,
            Self::SendText(_) => Self::SEND_TEXT,
            Self::NameRoom(_) => Self::NAME_ROOM,
            Self::ChangeRoom(_) => Self::CHANGE_ROOM,
            Self::RequestUsers => Self::REQUEST_USERS,
            Self::RequestRooms => Self::REQUEST_ROOMS,
            Self::RequestRoom => Self::REQUEST_ROOM,
            Self::RequestText => Self::REQUEST_TEXT,
            Self::MyId => Self::MY_ID,
            Self::Unknown(name) => name,
        }
    }

    /// The argument text, for commands that carry one.
    pub fn args(&self) -> &str {
        match self {
            Self::Nick(a)
            | Self::SendText(a)
            | Self::NameRoom(a)
            | Self::ChangeRoom(a) => a,
            _ => "",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// A decoded, verified client request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// The client's timestamp token, as sent.
    pub timestamp: String,
    pub command: Command,
}

impl From<ParsedLine> for Request {
    fn from(line: ParsedLine) -> Self {
        Self {
            command: Command::from_parts(&line.command, line.args),
            timestamp: line.timestamp,
        }
    }
}

/// Verifies and parses a body in one step.
///
/// With `verify_checksum` off, the token is still required as the first
/// field but its value is not checked.
///
/// # Errors
/// - [`ProtocolError::ChecksumMismatch`]: the token does not match.
/// - [`ProtocolError::Malformed`]: the body does not follow the grammar.
pub fn decode_request(
    body: &str,
    verify_checksum: bool,
) -> Result<Request, ProtocolError> {
    let (token, line) = split_token(body)?;
    if verify_checksum && !verify(token, line) {
        return Err(ProtocolError::ChecksumMismatch);
    }
    parse_line(body).map(Request::from)
}
