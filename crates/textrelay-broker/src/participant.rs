//! Per-connection participant records.

use std::fmt;

use textrelay_protocol::ParticipantId;

/// Broker-side key for a participant, one per connection.
///
/// Unlike [`ParticipantId`], the key exists from the moment a connection
/// is accepted, so a participant can be addressed before it has asked
/// for an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParticipantKey(u64);

impl ParticipantKey {
    pub fn new(key: u64) -> Self {
        Self(key)
    }

    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ParticipantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "participant-{}", self.0)
    }
}

/// A connected participant as the broker tracks it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub key: ParticipantKey,
    /// Empty until issued.
    pub id: ParticipantId,
    pub name: Option<String>,
    /// Name of the current room. Always present in the registry.
    pub room: String,
    /// Absolute index of the next entry to deliver from `room`.
    pub cursor: usize,
}

impl Participant {
    pub(crate) fn new(key: ParticipantKey, room: String) -> Self {
        Self {
            key,
            id: ParticipantId::default(),
            name: None,
            room,
            cursor: 0,
        }
    }

    /// Display name, or `""` if none was set.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_participant_key_display() {
        assert_eq!(ParticipantKey::new(9).to_string(), "participant-9");
    }

    #[test]
    fn test_new_participant_has_no_identity() {
        let p = Participant::new(ParticipantKey::new(1), "the lobby".into());
        assert!(p.id.is_empty());
        assert_eq!(p.display_name(), "");
        assert_eq!(p.cursor, 0);
    }
}
