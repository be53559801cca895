use crate::ConnectionId;

/// Errors that can occur in the transport layer.
///
/// Only [`TransportError::ListenerSetup`] ever reaches a caller. The
/// per-connection variants are logged and turned into a
/// [`TransportEvent::Disconnected`](crate::TransportEvent::Disconnected).
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Binding the listening socket failed. Fatal at startup.
    #[error("listener setup failed: {0}")]
    ListenerSetup(#[source] std::io::Error),

    /// Reading from or writing to one connection failed.
    #[error("i/o error on {id}: {source}")]
    Io {
        id: ConnectionId,
        #[source]
        source: std::io::Error,
    },

    /// The peer closed the connection.
    #[error("connection closed: {0}")]
    ConnectionClosed(ConnectionId),

    /// The transport was shut down.
    #[error("transport shut down")]
    Shutdown,
}
