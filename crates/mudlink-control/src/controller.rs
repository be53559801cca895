//! Controllers: the "who is typing" side of a link.

use std::collections::VecDeque;
use std::fmt;

use mudlink_transport::ConnectionId;

use crate::ReceiverId;

/// Identifier for a controller inside a [`Registry`](crate::Registry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ControllerId(u64);

impl ControllerId {
    /// Creates a new `ControllerId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ControllerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctrl-{}", self.0)
    }
}

/// The three shapes a controller can take.
#[derive(Debug)]
pub(crate) enum ControllerKind {
    /// A pair of queues, usually bound to one connection.
    Simple {
        connection: Option<ConnectionId>,
        inbound: VecDeque<String>,
        outbound: VecDeque<String>,
    },
    /// Several simple controllers acting as one. Never nested: composing a
    /// composite splices in its children.
    Composite { children: Vec<ControllerId> },
    /// The private controller a composite receiver drives one of its
    /// sub-receivers through. Output goes to `owner`'s router.
    Shadow {
        owner: ReceiverId,
        sub: ReceiverId,
        inbound: VecDeque<String>,
    },
}

#[derive(Debug)]
pub(crate) struct ControllerEntry {
    pub(crate) kind: ControllerKind,
    /// For a composite's child this is the composite's receiver.
    pub(crate) receiver: Option<ReceiverId>,
}

impl ControllerEntry {
    pub(crate) fn simple(connection: Option<ConnectionId>) -> Self {
        Self {
            kind: ControllerKind::Simple {
                connection,
                inbound: VecDeque::new(),
                outbound: VecDeque::new(),
            },
            receiver: None,
        }
    }

    pub(crate) fn composite(children: Vec<ControllerId>) -> Self {
        Self {
            kind: ControllerKind::Composite { children },
            receiver: None,
        }
    }

    pub(crate) fn shadow(owner: ReceiverId, sub: ReceiverId) -> Self {
        Self {
            kind: ControllerKind::Shadow {
                owner,
                sub,
                inbound: VecDeque::new(),
            },
            receiver: None,
        }
    }

    pub(crate) fn is_shadow(&self) -> bool {
        matches!(self.kind, ControllerKind::Shadow { .. })
    }

    pub(crate) fn children(&self) -> &[ControllerId] {
        match &self.kind {
            ControllerKind::Composite { children } => children,
            _ => &[],
        }
    }
}
