//! The room broker: every room, every participant, and the operations
//! that mutate them.
//!
//! [`Broker`] is a plain synchronous struct. It is never shared; the
//! broker task owns it and applies commands one at a time (see
//! [`spawn_broker`](crate::spawn_broker)), which is what makes each
//! operation atomic with respect to every session.
//!
//! Failures are not errors here. Joining a missing room, claiming a
//! taken name, or addressing an unknown participant all leave state
//! unchanged and report it through a `false` or `None` result.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use textrelay_protocol::{MemberEntry, ParticipantId, TextEntry};

use crate::{BrokerConfig, Participant, ParticipantKey, RoomLog};

/// Owns all room logs and participant records.
#[derive(Debug)]
pub struct Broker {
    config: BrokerConfig,
    /// Ordered so room listings come out sorted.
    rooms: BTreeMap<String, RoomLog>,
    participants: BTreeMap<ParticipantKey, Participant>,
}

impl Broker {
    /// Creates a broker holding only the default room.
    pub fn new(config: BrokerConfig) -> Self {
        let mut broker = Self {
            config,
            rooms: BTreeMap::new(),
            participants: BTreeMap::new(),
        };
        let default_room = broker.config.default_room.clone();
        broker.ensure_room(&default_room);
        broker
    }

    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Participants
    // -----------------------------------------------------------------------

    /// Registers a new connection and places it in the default room.
    ///
    /// Registering a key twice returns the existing record unchanged.
    pub fn register(&mut self, key: ParticipantKey) -> &Participant {
        match self.participants.entry(key) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let room = self.config.default_room.clone();
                if let Some(log) = self.rooms.get_mut(&room) {
                    log.add_member(key);
                }
                tracing::info!(%key, %room, "participant registered");
                entry.insert(Participant::new(key, room))
            }
        }
    }

    /// Removes a participant from its room and forgets it.
    ///
    /// Returns the final record, or `None` if `key` was not registered.
    pub fn leave(&mut self, key: ParticipantKey) -> Option<Participant> {
        let participant = self.participants.remove(&key)?;
        if let Some(log) = self.rooms.get_mut(&participant.room) {
            log.remove_member(key);
        }
        tracing::info!(%key, room = %participant.room, "participant left");
        Some(participant)
    }

    /// Issues a fresh identity, replacing any previous one.
    pub fn issue_id(&mut self, key: ParticipantKey) -> Option<ParticipantId> {
        let participant = self.participants.get_mut(&key)?;
        participant.id = ParticipantId::generate();
        tracing::debug!(%key, id = %participant.id, "identity issued");
        Some(participant.id.clone())
    }

    /// Returns `true` if any live participant holds `candidate` as its name.
    pub fn name_taken(&self, candidate: &str) -> bool {
        self.participants
            .values()
            .any(|p| p.name.as_deref() == Some(candidate))
    }

    /// Sets a display name if no other participant holds it.
    ///
    /// Empty names are refused. Re-claiming the name a participant already
    /// holds succeeds.
    pub fn set_name(&mut self, key: ParticipantKey, name: &str) -> bool {
        if name.is_empty() {
            return false;
        }
        match self.participants.get(&key) {
            None => return false,
            Some(p) if p.name.as_deref() == Some(name) => return true,
            Some(_) => {}
        }
        if self.name_taken(name) {
            tracing::debug!(%key, name, "name already taken");
            return false;
        }
        match self.participants.get_mut(&key) {
            Some(participant) => {
                participant.name = Some(name.to_string());
                true
            }
            None => false,
        }
    }

    pub fn participant(&self, key: ParticipantKey) -> Option<&Participant> {
        self.participants.get(&key)
    }

    /// Name of the room `key` is currently in.
    pub fn current_room(&self, key: ParticipantKey) -> Option<&str> {
        self.participants.get(&key).map(|p| p.room.as_str())
    }

    // -----------------------------------------------------------------------
    // Rooms
    // -----------------------------------------------------------------------

    /// Creates an empty room unless one with this name exists.
    ///
    /// Returns `true` if the room was created.
    pub fn ensure_room(&mut self, name: &str) -> bool {
        if self.rooms.contains_key(name) {
            return false;
        }
        self.rooms.insert(
            name.to_string(),
            RoomLog::new(name, self.config.history_limit),
        );
        tracing::info!(room = %name, "room created");
        true
    }

    pub fn room_exists(&self, name: &str) -> bool {
        self.rooms.contains_key(name)
    }

    /// Moves a participant into an existing room.
    ///
    /// The cursor resets so the room's history is delivered from the
    /// start, even when re-joining the current room. Returns `false`
    /// without any change if the room or participant does not exist.
    pub fn join(&mut self, key: ParticipantKey, room: &str) -> bool {
        if !self.rooms.contains_key(room) {
            tracing::debug!(%key, room, "join ignored: no such room");
            return false;
        }
        let Some(participant) = self.participants.get_mut(&key) else {
            return false;
        };

        if let Some(previous) = self.rooms.get_mut(&participant.room) {
            previous.remove_member(key);
        }
        if let Some(next) = self.rooms.get_mut(room) {
            next.add_member(key);
        }
        participant.room = room.to_string();
        participant.cursor = 0;
        tracing::debug!(%key, room, "participant joined room");
        true
    }

    /// Appends `text` to the participant's current room.
    ///
    /// The poster's own cursor is left alone, so it sees its post on its
    /// next pull like every other member.
    pub fn post(&mut self, key: ParticipantKey, text: String) -> Option<TextEntry> {
        self.post_within(key, text, usize::MAX)
    }

    /// Like [`post`](Self::post), but refuses text whose rendered entry
    /// would exceed `budget` bytes. Nothing is appended on refusal.
    pub fn post_within(
        &mut self,
        key: ParticipantKey,
        text: String,
        budget: usize,
    ) -> Option<TextEntry> {
        let participant = self.participants.get(&key)?;
        // Author, separating space, and trailing `;`.
        let rendered = participant.id.as_str().len() + text.len() + 2;
        if rendered > budget {
            tracing::debug!(%key, rendered, budget, "post refused: entry too large");
            return None;
        }
        let log = self.rooms.get_mut(&participant.room)?;
        let entry = log.append(participant.id.clone(), text);
        tracing::debug!(%key, room = %participant.room, index = entry.index, "posted");
        Some(entry)
    }

    /// Returns every entry the participant has not seen yet and marks
    /// them delivered.
    pub fn pull(&mut self, key: ParticipantKey) -> Vec<TextEntry> {
        self.pull_within(key, usize::MAX)
    }

    /// Like [`pull`](Self::pull), but stops before the rendered entries
    /// exceed `budget` bytes.
    ///
    /// The cursor advances only past delivered entries. Entries are never
    /// cut: the first pending entry is delivered whole even when it alone
    /// is over budget, so a pull with anything pending always makes
    /// progress. Posting through [`post_within`](Self::post_within) with
    /// the same budget keeps that case from arising.
    pub fn pull_within(&mut self, key: ParticipantKey, budget: usize) -> Vec<TextEntry> {
        let Some(participant) = self.participants.get_mut(&key) else {
            return Vec::new();
        };
        let Some(log) = self.rooms.get(&participant.room) else {
            return Vec::new();
        };

        let mut delivered: Vec<TextEntry> = Vec::new();
        let mut used = 0usize;
        for entry in log.entries_from(participant.cursor) {
            let len = entry.rendered_len();
            if !delivered.is_empty() && used.saturating_add(len) > budget {
                break;
            }
            used += len;
            delivered.push(entry.clone());
        }

        participant.cursor = match delivered.last() {
            Some(last) => last.index + 1,
            None => log.len(),
        };
        delivered
    }

    /// Members of `room` in connection order. Empty for unknown rooms.
    pub fn list_members(&self, room: &str) -> Vec<MemberEntry> {
        let Some(log) = self.rooms.get(room) else {
            return Vec::new();
        };
        log.members()
            .filter_map(|key| self.participants.get(&key))
            .map(|p| MemberEntry {
                id: p.id.clone(),
                name: p.display_name().to_string(),
            })
            .collect()
    }

    /// All room names, sorted.
    pub fn list_rooms(&self) -> Vec<String> {
        self.rooms.keys().cloned().collect()
    }

    /// Total entries ever posted to `room`.
    pub fn room_len(&self, room: &str) -> Option<usize> {
        self.rooms.get(room).map(RoomLog::len)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn room(&self, name: &str) -> Option<&RoomLog> {
        self.rooms.get(name)
    }
}
