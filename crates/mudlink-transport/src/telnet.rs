//! Telnet-style TCP transport.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use futures_util::FutureExt;
use mudlink_protocol::{encode_line, telnet::PROBE};
use tokio::net::TcpListener;

use crate::{
    Connection, ConnectionId, Transport, TransportConfig, TransportError,
    TransportEvent,
};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// A [`Transport`] that accepts raw TCP clients speaking line-based
/// text with Telnet negotiation mixed in.
pub struct TelnetTransport {
    /// `None` once [`Transport::shutdown`] has released it.
    listener: Option<TcpListener>,
    local_addr: SocketAddr,
    /// Ordered by id so a poll visits connections in accept order.
    connections: BTreeMap<ConnectionId, Connection>,
    /// Events produced outside `poll` (failed sends, explicit closes).
    pending: Vec<TransportEvent>,
    config: TransportConfig,
}

impl TelnetTransport {
    /// Binds a new transport to the given address.
    ///
    /// # Errors
    /// [`TransportError::ListenerSetup`] if the address can't be bound.
    pub async fn bind(
        addr: &str,
        config: TransportConfig,
    ) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::ListenerSetup)?;
        let local_addr =
            listener.local_addr().map_err(TransportError::ListenerSetup)?;
        tracing::info!(%local_addr, "telnet transport listening");

        Ok(Self {
            listener: Some(listener),
            local_addr,
            connections: BTreeMap::new(),
            pending: Vec::new(),
            config,
        })
    }

    /// The address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// The transport's configuration.
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Looks up an open connection.
    pub fn connection(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&id)
    }

    /// Whether the listening socket is still held.
    pub fn is_listening(&self) -> bool {
        self.listener.is_some()
    }

    fn accept_pending(&mut self, events: &mut Vec<TransportEvent>) {
        let Some(listener) = &self.listener else {
            return;
        };

        // `now_or_never` polls the accept future exactly once: either a
        // client is already waiting or we move on.
        while let Some(result) = listener.accept().now_or_never() {
            let (stream, addr) = match result {
                Ok(accepted) => accepted,
                Err(e) => {
                    tracing::warn!(error = %e, "accept failed");
                    break;
                }
            };
            if let Err(e) = stream.set_nodelay(true) {
                tracing::debug!(%addr, error = %e, "could not set TCP_NODELAY");
            }

            let id = ConnectionId::new(
                NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
            );
            let mut conn = Connection::new(id, stream, addr);
            if let Some(greeting) = &self.config.greeting {
                conn.queue(&encode_line(greeting));
            }
            tracing::info!(%id, %addr, "client connected");

            self.connections.insert(id, conn);
            events.push(TransportEvent::Connected { id, addr });
        }
    }

    /// Removes a connection and records its disconnect event.
    fn drop_connection(&mut self, id: ConnectionId, events: &mut Vec<TransportEvent>) {
        if let Some(conn) = self.connections.remove(&id) {
            conn.close();
            tracing::info!(%id, "client disconnected");
            events.push(TransportEvent::Disconnected { id });
        }
    }
}

impl Transport for TelnetTransport {
    fn poll(&mut self) -> Vec<TransportEvent> {
        let mut events = std::mem::take(&mut self.pending);
        self.accept_pending(&mut events);

        let now = Instant::now();
        let probe_interval = self.config.probe_interval;
        let chunk_size = self.config.read_chunk_size;
        let require_name = self.config.require_name;
        let mut dead = Vec::new();

        for (&id, conn) in self.connections.iter_mut() {
            if conn.probe_due(now, probe_interval) {
                conn.queue(&[PROBE]);
                conn.mark_checked(now);
            }
            if let Err(e) = conn.flush() {
                tracing::debug!(%id, error = %e, "write failed");
                dead.push(id);
                continue;
            }

            let open = match conn.read_available(chunk_size) {
                Ok(open) => open,
                Err(e) => {
                    tracing::debug!(%id, error = %e, "read failed");
                    false
                }
            };

            // Lines that arrived just before EOF still count.
            for line in conn.take_lines() {
                let text = line.trim();
                if text.is_empty() {
                    continue;
                }
                if require_name && conn.mark_named() {
                    events.push(TransportEvent::NameSubmitted {
                        id,
                        name: text.to_string(),
                    });
                } else {
                    events.push(TransportEvent::Line {
                        id,
                        text: text.to_string(),
                    });
                }
            }

            if !open {
                dead.push(id);
            }
        }

        for id in dead {
            self.drop_connection(id, &mut events);
        }

        if !events.is_empty() {
            tracing::trace!(count = events.len(), "transport poll produced events");
        }
        events
    }

    fn send(&mut self, id: ConnectionId, text: &str) {
        let Some(conn) = self.connections.get_mut(&id) else {
            tracing::trace!(%id, "send to unknown connection ignored");
            return;
        };
        conn.queue(&encode_line(text));
        if let Err(e) = conn.flush() {
            tracing::debug!(%id, error = %e, "send failed");
            let mut pending = std::mem::take(&mut self.pending);
            self.drop_connection(id, &mut pending);
            self.pending = pending;
        }
    }

    fn close(&mut self, id: ConnectionId) {
        let mut pending = std::mem::take(&mut self.pending);
        self.drop_connection(id, &mut pending);
        self.pending = pending;
    }

    fn connection_ids(&self) -> Vec<ConnectionId> {
        self.connections.keys().copied().collect()
    }

    fn shutdown(&mut self) {
        for (_, conn) in std::mem::take(&mut self.connections) {
            conn.close();
        }
        self.pending.clear();

        if let Some(listener) = self.listener.take() {
            drop(listener);
            tracing::info!(local_addr = %self.local_addr, "listener released");
        }
    }
}

impl Drop for TelnetTransport {
    fn drop(&mut self) {
        if self.listener.is_some() || !self.connections.is_empty() {
            self.shutdown();
        }
    }
}
