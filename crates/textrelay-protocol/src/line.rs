//! Rendering request and reply lines.
//!
//! Requests and replies share one layout. The canonical line always
//! starts with a comma; the payload segment is present only when the
//! payload is non-empty:
//!
//! ```text
//! canonical:  ,20261019T101500.123456,REQCHATROOM,the lobby
//! body:       <crc32 hex>,20261019T101500.123456,REQCHATROOM,the lobby
//! ```

use time::OffsetDateTime;
use time::macros::format_description;

use crate::checksum;

/// Length of a [`timestamp_now`] string: `YYYYMMDDTHHMMSS.ffffff`.
const TIMESTAMP_LEN: usize = 22;

/// Longest possible checksum token (a full 32-bit value in hex).
const MAX_CHECKSUM_LEN: usize = 8;

/// Returns the current local time as a compact ISO-8601 string,
/// e.g. `20261019T101500.123456`.
///
/// Falls back to UTC when the local offset cannot be determined (some
/// platforms refuse to read it once several threads are running).
pub fn timestamp_now() -> String {
    let now = OffsetDateTime::now_local()
        .unwrap_or_else(|_| OffsetDateTime::now_utc());
    now.format(format_description!(
        "[year][month][day]T[hour][minute][second].[subsecond digits:6]"
    ))
    .unwrap_or_default()
}

/// Builds the canonical, unchecksummed line.
pub fn compose_line(timestamp: &str, command: &str, payload: &str) -> String {
    let mut line = String::with_capacity(
        timestamp.len() + command.len() + payload.len() + 3,
    );
    line.push(',');
    line.push_str(timestamp);
    line.push(',');
    line.push_str(command);
    if !payload.is_empty() {
        line.push(',');
        line.push_str(payload);
    }
    line
}

/// Builds a full checksummed body with an explicit timestamp.
pub fn compose_body_at(timestamp: &str, command: &str, payload: &str) -> String {
    seal(&compose_line(timestamp, command, payload))
}

/// Builds a full checksummed body stamped with [`timestamp_now`].
pub fn compose_body(command: &str, payload: &str) -> String {
    compose_body_at(&timestamp_now(), command, payload)
}

/// Upper bound on the bytes a body for `command` spends on everything
/// except the payload itself.
///
/// `max_body_length - line_overhead(cmd)` is the room left for a payload.
pub fn line_overhead(command: &str) -> usize {
    // token + ",ts" + ",CMD" + ","
    MAX_CHECKSUM_LEN + 1 + TIMESTAMP_LEN + 1 + command.len() + 1
}

/// Prefixes a canonical line with its checksum token.
pub(crate) fn seal(line: &str) -> String {
    let mut body = checksum(line);
    body.push_str(line);
    body
}
