//! Transport settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for a [`TelnetTransport`](crate::TelnetTransport).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// How long a connection may go without a liveness probe.
    ///
    /// A probe is a single NUL byte; if writing it fails, the peer is gone.
    pub probe_interval: Duration,

    /// Size of the scratch buffer for each `read` call.
    pub read_chunk_size: usize,

    /// Whether the first line a client sends is its name.
    ///
    /// When set, that line is reported as
    /// [`TransportEvent::NameSubmitted`](crate::TransportEvent::NameSubmitted)
    /// instead of a regular line.
    pub require_name: bool,

    /// Sent to every client right after it connects.
    pub greeting: Option<String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            probe_interval: Duration::from_secs(5),
            read_chunk_size: 4096,
            require_name: false,
            greeting: None,
        }
    }
}
