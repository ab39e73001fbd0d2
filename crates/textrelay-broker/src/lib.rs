//! Room broker for Textrelay.
//!
//! The broker owns every room's message log and every connected
//! participant. Delivery is pull-based: each participant keeps a cursor
//! into its current room's log, and a pull returns whatever lies past
//! the cursor.
//!
//! ```text
//!   room "the lobby"   [ e0 | e1 | e2 | e3 | e4 ]
//!                                  ▲              ▲
//!                          alice.cursor      bob.cursor
//!
//!   pull(alice) → [e2, e3, e4], alice.cursor = 5
//!   pull(bob)   → []
//! ```
//!
//! # Key types
//!
//! - [`Broker`]: the synchronous registry and its operations
//! - [`BrokerHandle`]: async access to the broker task
//! - [`RoomLog`]: one room's append-only log and member set
//! - [`Participant`] / [`ParticipantKey`]: per-connection records
//! - [`BrokerConfig`]: default room, history limit, channel size

mod actor;
mod broker;
mod config;
mod error;
mod participant;
mod room;

pub use actor::{BrokerHandle, spawn_broker};
pub use broker::Broker;
pub use config::{BrokerConfig, DEFAULT_CHANNEL_SIZE, DEFAULT_ROOM};
pub use error::BrokerError;
pub use participant::{Participant, ParticipantKey};
pub use room::RoomLog;
