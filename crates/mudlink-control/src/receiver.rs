//! Receivers: the "what is being driven" side of a link.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{ControllerId, Link, MessageRouter, ReceiverError};

/// Identifier for a receiver inside a [`Registry`](crate::Registry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReceiverId(u64);

impl ReceiverId {
    /// Creates a new `ReceiverId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ReceiverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "recv-{}", self.0)
    }
}

/// Game logic that can be driven by a controller.
///
/// Only `update` is required. `attach` and `detach` are notifications
/// fired after the registry has already changed the link, so a receiver
/// can greet its new controller or tidy up when it loses one.
///
/// # Example
///
/// ```
/// use mudlink_control::{Link, Receiver, ReceiverError};
///
/// struct Echo;
///
/// impl Receiver for Echo {
///     fn update(&mut self, link: &mut Link<'_>) -> Result<(), ReceiverError> {
///         while link.has_input() {
///             let line = link.read()?;
///             link.write(format!("You said: {line}"))?;
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait Receiver: Send + 'static {
    /// Called after this receiver was linked to `controller`.
    fn attach(&mut self, controller: ControllerId) {
        let _ = controller;
    }

    /// Called after this receiver was unlinked from its controller.
    ///
    /// Not called when the receiver detaches itself from inside its own
    /// `update`; it already knows.
    fn detach(&mut self) {}

    /// Runs one tick of game logic. Reads commands from and writes
    /// output through `link`.
    fn update(&mut self, link: &mut Link<'_>) -> Result<(), ReceiverError>;
}

/// How a composite receiver treats its sub-receivers.
///
/// Both flags are off by default: output passes through unfiltered and
/// subs taken elsewhere stay in the group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositeOptions {
    /// Suppress duplicate output and label each source.
    pub filter: bool,
    /// Drop sub-receivers that get attached elsewhere, with a notice.
    pub fragile: bool,
}

/// One sub-receiver of a composite and the shadow controller driving it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SubSlot {
    pub(crate) receiver: ReceiverId,
    pub(crate) shadow: ControllerId,
}

pub(crate) struct CompositeState {
    pub(crate) subs: Vec<SubSlot>,
    pub(crate) router: MessageRouter,
    pub(crate) fragile: bool,
}

pub(crate) enum ReceiverKind {
    /// `None` while the behavior is out for its own update.
    Simple(Option<Box<dyn Receiver>>),
    Composite(CompositeState),
}

pub(crate) struct ReceiverEntry {
    pub(crate) label: String,
    pub(crate) controller: Option<ControllerId>,
    pub(crate) kind: ReceiverKind,
}

impl ReceiverEntry {
    pub(crate) fn composite_state(&self) -> Option<&CompositeState> {
        match &self.kind {
            ReceiverKind::Composite(state) => Some(state),
            ReceiverKind::Simple(_) => None,
        }
    }

    pub(crate) fn composite_state_mut(&mut self) -> Option<&mut CompositeState> {
        match &mut self.kind {
            ReceiverKind::Composite(state) => Some(state),
            ReceiverKind::Simple(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receiver_id_display() {
        assert_eq!(ReceiverId::new(9).to_string(), "recv-9");
    }

    #[test]
    fn test_composite_options_default_is_unfiltered_and_sturdy() {
        let options = CompositeOptions::default();
        assert!(!options.filter);
        assert!(!options.fragile);
    }
}
