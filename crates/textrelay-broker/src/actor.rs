//! Broker actor: an isolated Tokio task that owns the [`Broker`].
//!
//! The task is the only place broker state is touched. Sessions talk to
//! it through a [`BrokerHandle`], which sends a [`BrokerCommand`] over a
//! bounded channel and waits for the answer on a oneshot reply channel.
//! Commands are applied one at a time in arrival order, so no lock
//! guards the registry.

use textrelay_protocol::{MemberEntry, ParticipantId, TextEntry};
use tokio::sync::{mpsc, oneshot};

use crate::{Broker, BrokerConfig, BrokerError, Participant, ParticipantKey};

/// Commands sent to the broker task through its channel.
///
/// Each variant carries a `reply` sender; the caller sends the command
/// and waits for the response on that channel.
pub(crate) enum BrokerCommand {
    Register {
        key: ParticipantKey,
        reply: oneshot::Sender<Participant>,
    },
    Leave {
        key: ParticipantKey,
        reply: oneshot::Sender<Option<Participant>>,
    },
    IssueId {
        key: ParticipantKey,
        reply: oneshot::Sender<Option<ParticipantId>>,
    },
    SetName {
        key: ParticipantKey,
        name: String,
        reply: oneshot::Sender<bool>,
    },
    NameTaken {
        name: String,
        reply: oneshot::Sender<bool>,
    },
    EnsureRoom {
        name: String,
        reply: oneshot::Sender<bool>,
    },
    RoomExists {
        name: String,
        reply: oneshot::Sender<bool>,
    },
    Join {
        key: ParticipantKey,
        room: String,
        reply: oneshot::Sender<bool>,
    },
    /// `budget: None` accepts text of any size.
    Post {
        key: ParticipantKey,
        text: String,
        budget: Option<usize>,
        reply: oneshot::Sender<Option<TextEntry>>,
    },
    /// `budget: None` pulls everything pending.
    Pull {
        key: ParticipantKey,
        budget: Option<usize>,
        reply: oneshot::Sender<Vec<TextEntry>>,
    },
    ListMembers {
        room: String,
        reply: oneshot::Sender<Vec<MemberEntry>>,
    },
    ListRooms {
        reply: oneshot::Sender<Vec<String>>,
    },
    CurrentRoom {
        key: ParticipantKey,
        reply: oneshot::Sender<Option<String>>,
    },
    GetParticipant {
        key: ParticipantKey,
        reply: oneshot::Sender<Option<Participant>>,
    },
    RoomLen {
        room: String,
        reply: oneshot::Sender<Option<usize>>,
    },
    RoomCount {
        reply: oneshot::Sender<usize>,
    },
    Shutdown,
}

/// Handle to the running broker task.
///
/// Cheap to clone; it's just an `mpsc::Sender` wrapper. Every session
/// holds one.
#[derive(Debug, Clone)]
pub struct BrokerHandle {
    sender: mpsc::Sender<BrokerCommand>,
}

impl BrokerHandle {
    /// Sends a command built around a fresh reply channel and awaits the
    /// answer.
    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> BrokerCommand,
    ) -> Result<T, BrokerError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(command(reply_tx))
            .await
            .map_err(|_| BrokerError::Unavailable)?;
        reply_rx.await.map_err(|_| BrokerError::Unavailable)
    }

    /// Registers a new connection in the default room.
    pub async fn register(&self, key: ParticipantKey) -> Result<Participant, BrokerError> {
        self.request(|reply| BrokerCommand::Register { key, reply }).await
    }

    /// Removes a participant from its room and forgets it.
    pub async fn leave(
        &self,
        key: ParticipantKey,
    ) -> Result<Option<Participant>, BrokerError> {
        self.request(|reply| BrokerCommand::Leave { key, reply }).await
    }

    pub async fn issue_id(
        &self,
        key: ParticipantKey,
    ) -> Result<Option<ParticipantId>, BrokerError> {
        self.request(|reply| BrokerCommand::IssueId { key, reply }).await
    }

    pub async fn set_name(
        &self,
        key: ParticipantKey,
        name: impl Into<String>,
    ) -> Result<bool, BrokerError> {
        let name = name.into();
        self.request(|reply| BrokerCommand::SetName { key, name, reply })
            .await
    }

    pub async fn name_taken(&self, name: impl Into<String>) -> Result<bool, BrokerError> {
        let name = name.into();
        self.request(|reply| BrokerCommand::NameTaken { name, reply }).await
    }

    /// Creates a room unless it exists. `true` if it was created.
    pub async fn ensure_room(&self, name: impl Into<String>) -> Result<bool, BrokerError> {
        let name = name.into();
        self.request(|reply| BrokerCommand::EnsureRoom { name, reply }).await
    }

    pub async fn room_exists(&self, name: impl Into<String>) -> Result<bool, BrokerError> {
        let name = name.into();
        self.request(|reply| BrokerCommand::RoomExists { name, reply }).await
    }

    /// Moves a participant into an existing room. `false` if it doesn't
    /// exist.
    pub async fn join(
        &self,
        key: ParticipantKey,
        room: impl Into<String>,
    ) -> Result<bool, BrokerError> {
        let room = room.into();
        self.request(|reply| BrokerCommand::Join { key, room, reply }).await
    }

    pub async fn post(
        &self,
        key: ParticipantKey,
        text: impl Into<String>,
    ) -> Result<Option<TextEntry>, BrokerError> {
        let text = text.into();
        self.request(|reply| BrokerCommand::Post {
            key,
            text,
            budget: None,
            reply,
        })
        .await
    }

    /// Posts unless the rendered entry would exceed `budget` bytes.
    /// `None` means the text was refused or the participant is unknown.
    pub async fn post_within(
        &self,
        key: ParticipantKey,
        text: impl Into<String>,
        budget: usize,
    ) -> Result<Option<TextEntry>, BrokerError> {
        let text = text.into();
        self.request(|reply| BrokerCommand::Post {
            key,
            text,
            budget: Some(budget),
            reply,
        })
        .await
    }

    /// Delivers everything the participant has not seen yet.
    pub async fn pull(&self, key: ParticipantKey) -> Result<Vec<TextEntry>, BrokerError> {
        self.request(|reply| BrokerCommand::Pull {
            key,
            budget: None,
            reply,
        })
        .await
    }

    /// Delivers pending entries up to `budget` rendered bytes.
    pub async fn pull_within(
        &self,
        key: ParticipantKey,
        budget: usize,
    ) -> Result<Vec<TextEntry>, BrokerError> {
        self.request(|reply| BrokerCommand::Pull {
            key,
            budget: Some(budget),
            reply,
        })
        .await
    }

    pub async fn list_members(
        &self,
        room: impl Into<String>,
    ) -> Result<Vec<MemberEntry>, BrokerError> {
        let room = room.into();
        self.request(|reply| BrokerCommand::ListMembers { room, reply })
            .await
    }

    pub async fn list_rooms(&self) -> Result<Vec<String>, BrokerError> {
        self.request(|reply| BrokerCommand::ListRooms { reply }).await
    }

    pub async fn current_room(
        &self,
        key: ParticipantKey,
    ) -> Result<Option<String>, BrokerError> {
        self.request(|reply| BrokerCommand::CurrentRoom { key, reply })
            .await
    }

    /// Snapshot of a participant record.
    pub async fn participant(
        &self,
        key: ParticipantKey,
    ) -> Result<Option<Participant>, BrokerError> {
        self.request(|reply| BrokerCommand::GetParticipant { key, reply })
            .await
    }

    pub async fn room_len(&self, room: impl Into<String>) -> Result<Option<usize>, BrokerError> {
        let room = room.into();
        self.request(|reply| BrokerCommand::RoomLen { room, reply }).await
    }

    pub async fn room_count(&self) -> Result<usize, BrokerError> {
        self.request(|reply| BrokerCommand::RoomCount { reply }).await
    }

    /// Tells the broker task to stop. Later calls on any handle fail
    /// with [`BrokerError::Unavailable`].
    pub async fn shutdown(&self) -> Result<(), BrokerError> {
        self.sender
            .send(BrokerCommand::Shutdown)
            .await
            .map_err(|_| BrokerError::Unavailable)
    }
}

/// The broker task state.
struct BrokerActor {
    broker: Broker,
    receiver: mpsc::Receiver<BrokerCommand>,
}

impl BrokerActor {
    /// Processes commands until shutdown or until every handle is dropped.
    async fn run(mut self) {
        tracing::info!(
            default_room = %self.broker.config().default_room,
            "broker started"
        );

        while let Some(cmd) = self.receiver.recv().await {
            if !self.apply(cmd) {
                tracing::info!("broker shutting down");
                break;
            }
        }

        tracing::info!("broker stopped");
    }

    /// Applies one command. Returns `false` on shutdown.
    ///
    /// Reply send errors mean the caller gave up waiting; the command has
    /// still been applied.
    fn apply(&mut self, cmd: BrokerCommand) -> bool {
        let broker = &mut self.broker;
        match cmd {
            BrokerCommand::Register { key, reply } => {
                let _ = reply.send(broker.register(key).clone());
            }
            BrokerCommand::Leave { key, reply } => {
                let _ = reply.send(broker.leave(key));
            }
            BrokerCommand::IssueId { key, reply } => {
                let _ = reply.send(broker.issue_id(key));
            }
            BrokerCommand::SetName { key, name, reply } => {
                let _ = reply.send(broker.set_name(key, &name));
            }
            BrokerCommand::NameTaken { name, reply } => {
                let _ = reply.send(broker.name_taken(&name));
            }
            BrokerCommand::EnsureRoom { name, reply } => {
                let _ = reply.send(broker.ensure_room(&name));
            }
            BrokerCommand::RoomExists { name, reply } => {
                let _ = reply.send(broker.room_exists(&name));
            }
            BrokerCommand::Join { key, room, reply } => {
                let _ = reply.send(broker.join(key, &room));
            }
            BrokerCommand::Post {
                key,
                text,
                budget,
                reply,
            } => {
                let entry = match budget {
                    Some(budget) => broker.post_within(key, text, budget),
                    None => broker.post(key, text),
                };
                let _ = reply.send(entry);
            }
            BrokerCommand::Pull { key, budget, reply } => {
                let entries = match budget {
                    Some(budget) => broker.pull_within(key, budget),
                    None => broker.pull(key),
                };
                let _ = reply.send(entries);
            }
            BrokerCommand::ListMembers { room, reply } => {
                let _ = reply.send(broker.list_members(&room));
            }
            BrokerCommand::ListRooms { reply } => {
                let _ = reply.send(broker.list_rooms());
            }
            BrokerCommand::CurrentRoom { key, reply } => {
                let _ = reply.send(broker.current_room(key).map(str::to_string));
            }
            BrokerCommand::GetParticipant { key, reply } => {
                let _ = reply.send(broker.participant(key).cloned());
            }
            BrokerCommand::RoomLen { room, reply } => {
                let _ = reply.send(broker.room_len(&room));
            }
            BrokerCommand::RoomCount { reply } => {
                let _ = reply.send(broker.room_count());
            }
            BrokerCommand::Shutdown => return false,
        }
        true
    }
}

/// Spawns the broker task and returns a handle to communicate with it.
///
/// `config.channel_size` controls backpressure: if the channel fills up,
/// senders wait.
pub fn spawn_broker(config: BrokerConfig) -> BrokerHandle {
    let (tx, rx) = mpsc::channel(config.channel_size.max(1));

    let actor = BrokerActor {
        broker: Broker::new(config),
        receiver: rx,
    };
    tokio::spawn(actor.run());

    BrokerHandle { sender: tx }
}
