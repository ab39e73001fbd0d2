//! Session configuration.

use textrelay_protocol::{Command, FrameConfig, FrameError, line_overhead};

/// Every command a session may answer.
const REPLY_COMMANDS: [&str; 9] = [
    Command::REQUEST_ID,
    Command::NICK,
    Command::SEND_TEXT,
    Command::NAME_ROOM,
    Command::CHANGE_ROOM,
    Command::REQUEST_USERS,
    Command::REQUEST_ROOMS,
    Command::REQUEST_ROOM,
    Command::REQUEST_TEXT,
];

/// Configuration shared by every session on a server.
///
/// Start from `SessionConfig::default()` and override the fields you
/// care about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Header width and maximum body length, for both directions.
    pub frame: FrameConfig,

    /// Whether request checksums are checked.
    ///
    /// When off, the token must still be present but any value passes.
    pub verify_checksums: bool,
}

impl SessionConfig {
    /// Smallest `max_body_length` that still fits every reply line with
    /// an empty payload.
    pub fn min_body_length() -> usize {
        REPLY_COMMANDS
            .iter()
            .map(|command| line_overhead(command))
            .max()
            .unwrap_or_default()
    }

    /// Checks the frame limits and that they leave room for replies.
    ///
    /// # Errors
    /// Returns [`FrameError::InvalidConfig`] if the header cannot hold
    /// `max_body_length` or the body limit is too small for a reply.
    pub fn validate(&self) -> Result<(), FrameError> {
        self.frame.validate()?;
        let min = Self::min_body_length();
        if self.frame.max_body_length < min {
            return Err(FrameError::InvalidConfig(format!(
                "max body length {} is below the {min} bytes a reply needs",
                self.frame.max_body_length
            )));
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            frame: FrameConfig::default(),
            verify_checksums: true,
        }
    }
}
