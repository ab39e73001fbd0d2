//! Wire-level value types shared by the broker and the session.

use std::fmt;

// ---------------------------------------------------------------------------
// ParticipantId
// ---------------------------------------------------------------------------

/// A server-issued, opaque participant identity.
///
/// Empty until the participant asks for one with `REQUUID`; see
/// [`ParticipantId::generate`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParticipantId(String);

impl ParticipantId {
    /// Wraps an existing identity string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh random identity (a v4 UUID in hyphenated form).
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Returns the identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if no identity has been issued.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("<unassigned>")
        } else {
            f.write_str(&self.0)
        }
    }
}

// ---------------------------------------------------------------------------
// TextEntry
// ---------------------------------------------------------------------------

/// One posted message in a room's log. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEntry {
    /// Identity of the poster at the time of posting.
    pub author: ParticipantId,
    pub content: String,
    /// Zero-based position in the room's log. Stable and contiguous.
    pub index: usize,
}

impl TextEntry {
    /// Renders the entry as it appears in a `REQTEXT` payload:
    /// `author content;`.
    pub fn render(&self) -> String {
        format!("{} {};", self.author.as_str(), self.content)
    }

    /// Byte length of [`render`](Self::render), without allocating.
    pub fn rendered_len(&self) -> usize {
        self.author.as_str().len() + 1 + self.content.len() + 1
    }
}

// ---------------------------------------------------------------------------
// MemberEntry
// ---------------------------------------------------------------------------

/// A room member as listed by `REQUSERS`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberEntry {
    pub id: ParticipantId,
    /// Display name; empty if never set.
    pub name: String,
}
