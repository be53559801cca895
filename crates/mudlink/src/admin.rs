//! Handing operator commands to a running dispatcher.

use mudlink_protocol::AdminCommand;
use tokio::sync::mpsc;

use crate::MudlinkError;

/// A cloneable, thread-safe way to send [`AdminCommand`]s to the
/// dispatcher.
///
/// Commands are queued and applied at the start of the next tick, never
/// concurrently with game logic. Works from plain threads too (a stdin
/// console, for instance): sending never blocks or awaits.
#[derive(Debug, Clone)]
pub struct AdminHandle {
    tx: mpsc::UnboundedSender<AdminCommand>,
}

impl AdminHandle {
    pub(crate) fn new(tx: mpsc::UnboundedSender<AdminCommand>) -> Self {
        Self { tx }
    }

    /// Queues a command.
    ///
    /// # Errors
    /// [`MudlinkError::DispatcherStopped`] once the dispatcher is gone.
    pub fn send(&self, command: AdminCommand) -> Result<(), MudlinkError> {
        self.tx
            .send(command)
            .map_err(|_| MudlinkError::DispatcherStopped)
    }

    /// Parses an operator line and queues the result.
    ///
    /// # Errors
    /// [`MudlinkError::Protocol`] if the line isn't a command,
    /// [`MudlinkError::DispatcherStopped`] once the dispatcher is gone.
    pub fn submit(&self, line: &str) -> Result<AdminCommand, MudlinkError> {
        let command = AdminCommand::parse(line)?;
        self.send(command.clone())?;
        Ok(command)
    }

    /// Queues a server notice for every client.
    pub fn broadcast(&self, text: impl Into<String>) -> Result<(), MudlinkError> {
        self.send(AdminCommand::Broadcast(text.into()))
    }

    /// Asks the dispatcher to log who is connected.
    pub fn list_players(&self) -> Result<(), MudlinkError> {
        self.send(AdminCommand::ListPlayers)
    }

    /// Asks the dispatcher to say goodbye and stop.
    pub fn shutdown(&self) -> Result<(), MudlinkError> {
        self.send(AdminCommand::Shutdown)
    }

    /// Whether the dispatcher has gone away.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
