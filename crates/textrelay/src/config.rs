//! Server configuration.

use textrelay_broker::BrokerConfig;
use textrelay_session::SessionConfig;

/// Default listen address.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:9000";

/// Everything needed to start a relay server.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Address to listen on. Port `0` lets the OS pick one.
    pub bind_addr: String,
    pub broker: BrokerConfig,
    pub session: SessionConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            broker: BrokerConfig::default(),
            session: SessionConfig::default(),
        }
    }
}
