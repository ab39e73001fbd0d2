//! Broker configuration.

/// Name of the room every participant starts in.
pub const DEFAULT_ROOM: &str = "the lobby";

/// Default command channel size for the broker task.
pub const DEFAULT_CHANNEL_SIZE: usize = 64;

/// Configuration for a [`Broker`](crate::Broker) and its task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerConfig {
    /// Room created at startup and joined by every new participant.
    pub default_room: String,

    /// Maximum entries kept per room. `None` keeps the full history.
    ///
    /// When set, the oldest entries are dropped as new ones arrive.
    /// Entry indices stay absolute, so cursors are never rewritten.
    pub history_limit: Option<usize>,

    /// Bound of the command channel in front of the broker task.
    /// Senders wait when it is full.
    pub channel_size: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            default_room: DEFAULT_ROOM.to_string(),
            history_limit: None,
            channel_size: DEFAULT_CHANNEL_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broker_config_default() {
        let config = BrokerConfig::default();
        assert_eq!(config.default_room, "the lobby");
        assert_eq!(config.history_limit, None);
        assert_eq!(config.channel_size, 64);
    }
}
