//! A single room: its append-only log and its member set.

use std::collections::{BTreeSet, VecDeque};

use textrelay_protocol::{ParticipantId, TextEntry};

use crate::ParticipantKey;

/// One room's message log plus the participants currently in it.
///
/// Entry indices are absolute: the first entry ever posted is index 0,
/// and indices keep counting when a history limit drops old entries.
///
/// ```text
///            dropped          retained
///   ┌───┬───┬───┬───┐ ┌───┬───┬───┬───┐
///   │ 0 │ 1 │ 2 │ 3 │ │ 4 │ 5 │ 6 │ 7 │
///   └───┴───┴───┴───┘ └───┴───┴───┴───┘
///                       ▲               ▲
///                  first_index        len()
/// ```
#[derive(Debug, Clone)]
pub struct RoomLog {
    name: String,
    entries: VecDeque<TextEntry>,
    first_index: usize,
    history_limit: Option<usize>,
    /// Keys are allocated in connection order, so iteration is too.
    members: BTreeSet<ParticipantKey>,
}

impl RoomLog {
    /// Creates an empty room.
    pub fn new(name: impl Into<String>, history_limit: Option<usize>) -> Self {
        Self {
            name: name.into(),
            entries: VecDeque::new(),
            first_index: 0,
            history_limit,
            members: BTreeSet::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Total number of entries ever appended. This is the index the next
    /// entry will get, and the cursor value meaning "fully caught up".
    pub fn len(&self) -> usize {
        self.first_index + self.entries.len()
    }

    /// Returns `true` if nothing was ever posted here.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Absolute index of the oldest retained entry.
    pub fn first_index(&self) -> usize {
        self.first_index
    }

    /// Number of entries still held in memory.
    pub fn retained(&self) -> usize {
        self.entries.len()
    }

    /// Appends an entry and returns it.
    pub fn append(&mut self, author: ParticipantId, content: String) -> TextEntry {
        let entry = TextEntry {
            author,
            content,
            index: self.len(),
        };
        self.entries.push_back(entry.clone());

        if let Some(limit) = self.history_limit {
            while self.entries.len() > limit {
                self.entries.pop_front();
                self.first_index += 1;
            }
        }
        entry
    }

    /// Retained entries at or after absolute index `cursor`, oldest first.
    ///
    /// A cursor older than the retained window starts at the oldest
    /// retained entry.
    pub fn entries_from(&self, cursor: usize) -> impl Iterator<Item = &TextEntry> {
        let start = cursor
            .saturating_sub(self.first_index)
            .min(self.entries.len());
        self.entries.range(start..)
    }

    pub(crate) fn add_member(&mut self, key: ParticipantKey) {
        self.members.insert(key);
    }

    pub(crate) fn remove_member(&mut self, key: ParticipantKey) -> bool {
        self.members.remove(&key)
    }

    /// Returns `true` if `key` is currently in this room.
    pub fn is_member(&self, key: ParticipantKey) -> bool {
        self.members.contains(&key)
    }

    /// Current members in connection order.
    pub fn members(&self) -> impl Iterator<Item = ParticipantKey> + '_ {
        self.members.iter().copied()
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }
}
