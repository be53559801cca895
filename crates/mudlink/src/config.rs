//! Server-wide settings.

use mudlink_tick::TickConfig;
use mudlink_transport::TransportConfig;
use serde::{Deserialize, Serialize};

/// Default listening address.
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:1234";

/// Everything needed to start a [`MudServer`](crate::MudServer).
///
/// Every field has a default, so a partial JSON document is enough:
///
/// ```rust
/// use mudlink::ServerConfig;
///
/// let config: ServerConfig =
///     serde_json::from_str(r#"{"bind": "127.0.0.1:4000", "tick": {"tick_rate_hz": 10}}"#).unwrap();
/// assert_eq!(config.bind, "127.0.0.1:4000");
/// assert_eq!(config.tick.tick_rate_hz, 10);
/// assert!(!config.transport.require_name);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to listen on.
    pub bind: String,
    pub transport: TransportConfig,
    pub tick: TickConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND_ADDR.to_string(),
            transport: TransportConfig::default(),
            tick: TickConfig::default(),
        }
    }
}
