//! Error types for the control layer.

use crate::{ControllerId, ReceiverId};

/// Errors from controller and receiver operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ControlError {
    /// A read found no pending command. Check `has_input` first.
    #[error("no input pending")]
    NoInput,

    /// A receiver tried to read or write while not attached to anything.
    #[error("receiver {0} is not attached to a controller")]
    AttachConflict(ReceiverId),

    /// No controller with this id is registered (it may have been torn down).
    #[error("controller {0} not found")]
    UnknownController(ControllerId),

    /// No receiver with this id is registered.
    #[error("receiver {0} not found")]
    UnknownReceiver(ReceiverId),

    /// The operation needs a simple (queue-pair) controller.
    #[error("controller {0} is not a simple controller")]
    NotSimple(ControllerId),

    /// The controller is private to a composite receiver and can't be
    /// composed or removed from outside.
    #[error("controller {0} belongs to a composite receiver")]
    ShadowController(ControllerId),
}

/// Errors a [`Receiver`](crate::Receiver) may return from `update`.
///
/// The dispatcher logs these per receiver and carries on with the tick.
#[derive(Debug, thiserror::Error)]
pub enum ReceiverError {
    /// A controller operation failed.
    #[error(transparent)]
    Control(#[from] ControlError),

    /// Game logic gave up on this update.
    #[error("receiver failed: {0}")]
    Failed(String),
}
