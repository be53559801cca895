//! The handle a receiver gets during its update.

use crate::{ControlError, ControllerId, ReceiverId, Registry};

/// A receiver's view of its current controller.
///
/// The controller is looked up again on every call, so a receiver that
/// detaches itself (or is detached by something it triggered) mid-update
/// sees [`ControlError::AttachConflict`] on its next read or write instead
/// of talking to a stale controller.
pub struct Link<'r> {
    registry: &'r mut Registry,
    receiver: ReceiverId,
}

impl<'r> Link<'r> {
    pub(crate) fn new(registry: &'r mut Registry, receiver: ReceiverId) -> Self {
        Self { registry, receiver }
    }

    /// The receiver being updated.
    pub fn receiver(&self) -> ReceiverId {
        self.receiver
    }

    /// The controller the receiver is attached to right now.
    pub fn controller(&self) -> Option<ControllerId> {
        self.registry.controller_of(self.receiver)
    }

    /// Whether a command is waiting. `false` when detached.
    pub fn has_input(&self) -> bool {
        self.controller()
            .is_some_and(|c| self.registry.has_input(c))
    }

    /// Takes the next pending command.
    ///
    /// # Errors
    /// [`ControlError::AttachConflict`] when detached,
    /// [`ControlError::NoInput`] when nothing is pending.
    pub fn read(&mut self) -> Result<String, ControlError> {
        let controller = self
            .controller()
            .ok_or(ControlError::AttachConflict(self.receiver))?;
        self.registry.read(controller)
    }

    /// Sends one line of output to whoever controls this receiver.
    ///
    /// # Errors
    /// [`ControlError::AttachConflict`] when detached.
    pub fn write(&mut self, message: impl Into<String>) -> Result<(), ControlError> {
        let controller = self
            .controller()
            .ok_or(ControlError::AttachConflict(self.receiver))?;
        self.registry.write(controller, message);
        Ok(())
    }

    /// The receiver's display label.
    pub fn label(&self) -> &str {
        self.registry.label(self.receiver).unwrap_or_default()
    }

    /// Renames the receiver.
    pub fn set_label(&mut self, label: impl Into<String>) {
        // The receiver is registered for as long as its update runs.
        let _ = self.registry.set_label(self.receiver, label);
    }

    /// Detaches the receiver from its controller.
    pub fn detach(&mut self) {
        let _ = self.registry.detach(self.receiver);
    }

    /// The whole registry, for receivers that rearrange links (a lobby
    /// handing a player to a character, say).
    pub fn registry(&mut self) -> &mut Registry {
        self.registry
    }
}
