//! Client sessions for Textrelay.
//!
//! A [`Session`] owns one connection and drives it through a small state
//! machine: read a frame, verify and parse it, apply the command to the
//! broker, write the reply, repeat.
//!
//! # How it fits in the stack
//!
//! ```text
//! Listener (above)     ← accepts connections and spawns one session each
//!     ↕
//! Session (this crate) ← framing, verification, dispatch, replies
//!     ↕
//! Broker / Protocol / Transport (below)
//! ```

mod config;
mod dispatch;
mod error;
mod session;

pub use config::SessionConfig;
pub use dispatch::{Reply, dispatch};
pub use error::SessionError;
pub use session::{Session, SessionState};
