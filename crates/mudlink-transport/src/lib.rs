//! Transport layer for Mudlink.
//!
//! Provides the [`Transport`] trait the dispatcher drives once per tick,
//! and [`TelnetTransport`], its TCP implementation.
//!
//! Unlike a task-per-connection server, a transport here never blocks and
//! never spawns: every call to [`Transport::poll`] accepts, probes, flushes
//! and reads whatever is ready *right now*, and reports what happened as a
//! batch of [`TransportEvent`]s.

mod config;
mod connection;
mod error;
mod telnet;

pub use config::TransportConfig;
pub use connection::Connection;
pub use error::TransportError;
pub use telnet::TelnetTransport;

use std::fmt;
use std::net::SocketAddr;

/// Opaque identifier for a connection, unique for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Something that happened on the wire during one poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A client connected.
    Connected { id: ConnectionId, addr: SocketAddr },
    /// A client sent a complete, non-empty line.
    Line { id: ConnectionId, text: String },
    /// The first line of a client, when names are required.
    NameSubmitted { id: ConnectionId, name: String },
    /// A client went away (EOF, I/O error, failed probe, or explicit close).
    Disconnected { id: ConnectionId },
}

impl TransportEvent {
    /// The connection this event concerns.
    pub fn id(&self) -> ConnectionId {
        match self {
            Self::Connected { id, .. }
            | Self::Line { id, .. }
            | Self::NameSubmitted { id, .. }
            | Self::Disconnected { id } => *id,
        }
    }
}

/// A set of client connections that can be polled without blocking.
pub trait Transport: Send + 'static {
    /// Accepts, probes, flushes and reads everything that is ready now.
    ///
    /// Connection failures never surface as errors: they show up as
    /// [`TransportEvent::Disconnected`] in this or the next batch.
    fn poll(&mut self) -> Vec<TransportEvent>;

    /// Queues `text` plus a line ending for `id`. Best-effort.
    ///
    /// A write failure closes the connection; the matching
    /// `Disconnected` event arrives with the next [`poll`](Self::poll).
    /// Unknown ids are ignored.
    fn send(&mut self, id: ConnectionId, text: &str);

    /// Sends `text` to every open connection.
    fn broadcast(&mut self, text: &str) {
        for id in self.connection_ids() {
            self.send(id, text);
        }
    }

    /// Closes one connection. Its `Disconnected` event arrives with the
    /// next poll.
    fn close(&mut self, id: ConnectionId);

    /// Ids of all open connections.
    fn connection_ids(&self) -> Vec<ConnectionId>;

    /// Closes every connection and releases the listener.
    ///
    /// Safe to call more than once.
    fn shutdown(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_new_and_into_inner() {
        let id = ConnectionId::new(42);
        assert_eq!(id.into_inner(), 42);
    }

    #[test]
    fn test_connection_id_display() {
        let id = ConnectionId::new(7);
        assert_eq!(id.to_string(), "conn-7");
    }

    #[test]
    fn test_connection_id_orders_by_value() {
        let mut ids = vec![ConnectionId::new(3), ConnectionId::new(1), ConnectionId::new(2)];
        ids.sort();
        assert_eq!(ids, vec![ConnectionId::new(1), ConnectionId::new(2), ConnectionId::new(3)]);
    }

    #[test]
    fn test_transport_event_id_for_every_variant() {
        let id = ConnectionId::new(5);
        let addr: SocketAddr = "127.0.0.1:4000".parse().unwrap();
        let events = [
            TransportEvent::Connected { id, addr },
            TransportEvent::Line { id, text: "look".into() },
            TransportEvent::NameSubmitted { id, name: "Ada".into() },
            TransportEvent::Disconnected { id },
        ];

        for event in events {
            assert_eq!(event.id(), id);
        }
    }
}
