//! The registry: every controller, every receiver, and the links between
//! them.
//!
//! Controllers and receivers refer to each other by id, never by
//! reference, so the two sides of a link can be rewired freely while game
//! logic runs. The registry keeps both sides consistent:
//!
//! ```text
//!   ReceiverEntry.controller ──→ ControllerEntry
//!   ControllerEntry.receiver ──→ ReceiverEntry
//! ```
//!
//! For a composite controller, each child also points back at the
//! composite's receiver, so nothing else can grab a child while the
//! composite is attached.
//!
//! # Sessions
//!
//! Each open connection owns one simple controller, created by
//! [`Registry::open_session`] and torn down (detaching whatever it drove)
//! by [`Registry::close_session`].

use std::collections::HashMap;

use mudlink_transport::ConnectionId;

use crate::controller::{ControllerEntry, ControllerKind};
use crate::receiver::{CompositeState, ReceiverEntry, ReceiverKind, SubSlot};
use crate::{
    CompositeOptions, ControlError, ControllerId, Link, MessageRouter, Receiver,
    ReceiverError, ReceiverId,
};

/// Owns all controllers and receivers and the links between them.
///
/// Not thread-safe by itself. The dispatcher owns it and hands
/// `&mut Registry` to game code once per tick.
#[derive(Default)]
pub struct Registry {
    controllers: HashMap<ControllerId, ControllerEntry>,
    receivers: HashMap<ReceiverId, ReceiverEntry>,
    sessions: HashMap<ConnectionId, ControllerId>,
    /// Connections game logic asked to hang up, in request order.
    closing: Vec<ConnectionId>,
    next_controller: u64,
    next_receiver: u64,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    // -- Controllers ------------------------------------------------------

    /// Creates a simple controller, optionally bound to a connection.
    pub fn add_controller(&mut self, connection: Option<ConnectionId>) -> ControllerId {
        let id = self.next_controller_id();
        self.controllers.insert(id, ControllerEntry::simple(connection));
        id
    }

    /// Combines controllers into one composite.
    ///
    /// Composites among `children` are flattened into their own children,
    /// and duplicates are dropped, so the result is always one level deep.
    ///
    /// # Errors
    /// [`ControlError::UnknownController`] for an unregistered child,
    /// [`ControlError::ShadowController`] for a composite's private one.
    pub fn compose(&mut self, children: &[ControllerId]) -> Result<ControllerId, ControlError> {
        let mut flat: Vec<ControllerId> = Vec::with_capacity(children.len());
        for &child in children {
            let entry = self
                .controllers
                .get(&child)
                .ok_or(ControlError::UnknownController(child))?;
            let members = match &entry.kind {
                ControllerKind::Simple { .. } => vec![child],
                ControllerKind::Composite { children } => children.clone(),
                ControllerKind::Shadow { .. } => {
                    return Err(ControlError::ShadowController(child));
                }
            };
            for member in members {
                if !flat.contains(&member) {
                    flat.push(member);
                }
            }
        }

        let id = self.next_controller_id();
        tracing::debug!(controller = %id, children = flat.len(), "composite controller created");
        self.controllers.insert(id, ControllerEntry::composite(flat));
        Ok(id)
    }

    /// Removes a controller, detaching its receiver first.
    ///
    /// A removed child also disappears from every composite it was in.
    ///
    /// # Errors
    /// [`ControlError::UnknownController`] if not registered,
    /// [`ControlError::ShadowController`] for a composite's private one.
    pub fn remove_controller(&mut self, id: ControllerId) -> Result<(), ControlError> {
        let entry = self
            .controllers
            .get(&id)
            .ok_or(ControlError::UnknownController(id))?;
        if entry.is_shadow() {
            return Err(ControlError::ShadowController(id));
        }

        self.detach_controller(id)?;
        self.controllers.remove(&id);
        for entry in self.controllers.values_mut() {
            if let ControllerKind::Composite { children } = &mut entry.kind {
                children.retain(|c| *c != id);
            }
        }
        self.sessions.retain(|_, c| *c != id);
        Ok(())
    }

    /// Detaches whatever receiver is attached to `id` itself.
    ///
    /// A child of an attached composite is left alone; detach the
    /// composite instead.
    ///
    /// # Errors
    /// [`ControlError::UnknownController`] if not registered.
    pub fn detach_controller(&mut self, id: ControllerId) -> Result<(), ControlError> {
        let entry = self
            .controllers
            .get(&id)
            .ok_or(ControlError::UnknownController(id))?;
        if let Some(receiver) = entry.receiver {
            if self.controller_of(receiver) == Some(id) {
                self.detach(receiver)?;
            }
        }
        Ok(())
    }

    /// Whether `id` is registered.
    pub fn contains_controller(&self, id: ControllerId) -> bool {
        self.controllers.contains_key(&id)
    }

    /// Whether `id` is a composite controller.
    pub fn is_composite(&self, id: ControllerId) -> bool {
        self.controllers
            .get(&id)
            .is_some_and(|e| matches!(e.kind, ControllerKind::Composite { .. }))
    }

    /// A composite's children in declaration order. Empty for anything else.
    pub fn children(&self, id: ControllerId) -> Vec<ControllerId> {
        self.controllers
            .get(&id)
            .map(|e| e.children().to_vec())
            .unwrap_or_default()
    }

    /// The receiver `id` currently drives.
    ///
    /// For a child of an attached composite this is the composite's
    /// receiver.
    pub fn receiver_of(&self, id: ControllerId) -> Option<ReceiverId> {
        self.controllers.get(&id).and_then(|e| e.receiver)
    }

    /// The connection a simple controller is bound to.
    pub fn connection_of(&self, id: ControllerId) -> Option<ConnectionId> {
        match self.controllers.get(&id).map(|e| &e.kind) {
            Some(ControllerKind::Simple { connection, .. }) => *connection,
            _ => None,
        }
    }

    /// Number of registered controllers, shadows included.
    pub fn controller_count(&self) -> usize {
        self.controllers.len()
    }

    // -- Command and output queues ----------------------------------------

    /// Queues a command on a simple controller, as if its player typed it.
    ///
    /// # Errors
    /// [`ControlError::UnknownController`] if not registered,
    /// [`ControlError::NotSimple`] for composite and shadow controllers.
    pub fn push_command(
        &mut self,
        id: ControllerId,
        command: impl Into<String>,
    ) -> Result<(), ControlError> {
        let entry = self
            .controllers
            .get_mut(&id)
            .ok_or(ControlError::UnknownController(id))?;
        match &mut entry.kind {
            ControllerKind::Simple { inbound, .. } => {
                inbound.push_back(command.into());
                Ok(())
            }
            _ => Err(ControlError::NotSimple(id)),
        }
    }

    /// Whether `id` has a command waiting.
    ///
    /// A composite has input when any child does.
    pub fn has_input(&self, id: ControllerId) -> bool {
        match self.controllers.get(&id).map(|e| &e.kind) {
            Some(ControllerKind::Simple { inbound, .. })
            | Some(ControllerKind::Shadow { inbound, .. }) => !inbound.is_empty(),
            Some(ControllerKind::Composite { children }) => {
                children.iter().any(|c| self.has_input(*c))
            }
            None => false,
        }
    }

    /// Takes the next command from `id`.
    ///
    /// A composite reads from the first child (in declaration order) that
    /// has input.
    ///
    /// # Errors
    /// [`ControlError::NoInput`] when nothing is pending,
    /// [`ControlError::UnknownController`] if not registered.
    pub fn read(&mut self, id: ControllerId) -> Result<String, ControlError> {
        let entry = self
            .controllers
            .get_mut(&id)
            .ok_or(ControlError::UnknownController(id))?;
        match &mut entry.kind {
            ControllerKind::Simple { inbound, .. } | ControllerKind::Shadow { inbound, .. } => {
                inbound.pop_front().ok_or(ControlError::NoInput)
            }
            ControllerKind::Composite { children } => {
                let children = children.clone();
                match children.into_iter().find(|c| self.has_input(*c)) {
                    Some(child) => self.read(child),
                    None => Err(ControlError::NoInput),
                }
            }
        }
    }

    /// Delivers one line of output through `id`.
    ///
    /// A composite broadcasts to every child. A shadow hands the line to
    /// its composite's router. Writing to a controller that no longer
    /// exists does nothing.
    pub fn write(&mut self, id: ControllerId, message: impl Into<String>) {
        let message = message.into();
        let Some(entry) = self.controllers.get_mut(&id) else {
            tracing::trace!(controller = %id, "write to unknown controller ignored");
            return;
        };
        match &mut entry.kind {
            ControllerKind::Simple { outbound, .. } => outbound.push_back(message),
            ControllerKind::Composite { children } => {
                let children = children.clone();
                for child in children {
                    self.write(child, message.clone());
                }
            }
            ControllerKind::Shadow { owner, sub, .. } => {
                let (owner, sub) = (*owner, *sub);
                self.route_from_sub(owner, sub, &message);
            }
        }
    }

    /// Whether `id` has output waiting to be delivered.
    ///
    /// A shadow answers for its composite's controller.
    pub fn has_output(&self, id: ControllerId) -> bool {
        match self.controllers.get(&id).map(|e| &e.kind) {
            Some(ControllerKind::Simple { outbound, .. }) => !outbound.is_empty(),
            Some(ControllerKind::Composite { children }) => {
                children.iter().any(|c| self.has_output(*c))
            }
            Some(ControllerKind::Shadow { owner, .. }) => self
                .controller_of(*owner)
                .is_some_and(|c| self.has_output(c)),
            None => false,
        }
    }

    /// Takes all pending output of a simple controller, oldest first.
    ///
    /// Returns nothing for unknown, composite and shadow controllers:
    /// their output already lives in their children's queues.
    pub fn drain_output(&mut self, id: ControllerId) -> Vec<String> {
        match self.controllers.get_mut(&id).map(|e| &mut e.kind) {
            Some(ControllerKind::Simple { outbound, .. }) => outbound.drain(..).collect(),
            _ => Vec::new(),
        }
    }

    // -- Receivers --------------------------------------------------------

    /// Registers a receiver backed by game logic.
    pub fn add_receiver(&mut self, label: impl Into<String>, receiver: impl Receiver) -> ReceiverId {
        self.add_boxed_receiver(label, Box::new(receiver))
    }

    /// Registers an already boxed receiver.
    pub fn add_boxed_receiver(
        &mut self,
        label: impl Into<String>,
        receiver: Box<dyn Receiver>,
    ) -> ReceiverId {
        let id = self.next_receiver_id();
        self.receivers.insert(
            id,
            ReceiverEntry {
                label: label.into(),
                controller: None,
                kind: ReceiverKind::Simple(Some(receiver)),
            },
        );
        id
    }

    /// Registers a composite receiver that drives every one of `subs`
    /// whenever it is updated.
    ///
    /// Each sub-receiver gets a private shadow controller. Subs are only
    /// taken over once the composite itself is attached.
    ///
    /// # Errors
    /// [`ControlError::UnknownReceiver`] for an unregistered sub.
    pub fn add_composite(
        &mut self,
        label: impl Into<String>,
        subs: &[ReceiverId],
        options: CompositeOptions,
    ) -> Result<ReceiverId, ControlError> {
        let mut unique: Vec<ReceiverId> = Vec::with_capacity(subs.len());
        for &sub in subs {
            if !self.receivers.contains_key(&sub) {
                return Err(ControlError::UnknownReceiver(sub));
            }
            if !unique.contains(&sub) {
                unique.push(sub);
            }
        }

        let id = self.next_receiver_id();
        let mut slots = Vec::with_capacity(unique.len());
        for sub in unique {
            let shadow = self.next_controller_id();
            self.controllers.insert(shadow, ControllerEntry::shadow(id, sub));
            slots.push(SubSlot { receiver: sub, shadow });
        }

        tracing::debug!(receiver = %id, subs = slots.len(), "composite receiver created");
        self.receivers.insert(
            id,
            ReceiverEntry {
                label: label.into(),
                controller: None,
                kind: ReceiverKind::Composite(CompositeState {
                    router: MessageRouter::new(options.filter, slots.len()),
                    subs: slots,
                    fragile: options.fragile,
                }),
            },
        );
        Ok(id)
    }

    /// Removes a receiver, detaching it first.
    ///
    /// Removing a composite releases its sub-receivers but keeps them
    /// registered. A removed sub also leaves every composite it was in.
    ///
    /// # Errors
    /// [`ControlError::UnknownReceiver`] if not registered.
    pub fn remove_receiver(&mut self, id: ReceiverId) -> Result<(), ControlError> {
        self.detach(id)?;
        if let Some(entry) = self.receivers.remove(&id) {
            if let ReceiverKind::Composite(state) = entry.kind {
                for slot in state.subs {
                    self.controllers.remove(&slot.shadow);
                }
            }
        }

        let mut orphaned = Vec::new();
        for entry in self.receivers.values_mut() {
            if let Some(state) = entry.composite_state_mut() {
                state.subs.retain(|slot| {
                    if slot.receiver == id {
                        orphaned.push(slot.shadow);
                        false
                    } else {
                        true
                    }
                });
                state.router.set_sources(state.subs.len());
            }
        }
        for shadow in orphaned {
            self.controllers.remove(&shadow);
        }
        Ok(())
    }

    /// Whether `id` is registered.
    pub fn contains_receiver(&self, id: ReceiverId) -> bool {
        self.receivers.contains_key(&id)
    }

    /// The controller `id` is attached to.
    pub fn controller_of(&self, id: ReceiverId) -> Option<ControllerId> {
        self.receivers.get(&id).and_then(|e| e.controller)
    }

    /// The receiver's display label.
    pub fn label(&self, id: ReceiverId) -> Option<&str> {
        self.receivers.get(&id).map(|e| e.label.as_str())
    }

    /// Renames a receiver.
    ///
    /// # Errors
    /// [`ControlError::UnknownReceiver`] if not registered.
    pub fn set_label(&mut self, id: ReceiverId, label: impl Into<String>) -> Result<(), ControlError> {
        let entry = self
            .receivers
            .get_mut(&id)
            .ok_or(ControlError::UnknownReceiver(id))?;
        entry.label = label.into();
        Ok(())
    }

    /// A composite's sub-receivers in declaration order. Empty for a
    /// simple receiver.
    pub fn sub_receivers(&self, id: ReceiverId) -> Vec<ReceiverId> {
        self.receivers
            .get(&id)
            .and_then(ReceiverEntry::composite_state)
            .map(|state| state.subs.iter().map(|slot| slot.receiver).collect())
            .unwrap_or_default()
    }

    /// A composite's message router. `None` for a simple receiver.
    pub fn router(&self, id: ReceiverId) -> Option<&MessageRouter> {
        self.receivers
            .get(&id)
            .and_then(ReceiverEntry::composite_state)
            .map(|state| &state.router)
    }

    /// Number of registered receivers.
    pub fn receiver_count(&self) -> usize {
        self.receivers.len()
    }

    /// Receivers attached to a real (non-shadow) controller, in id order.
    ///
    /// These are the ones the dispatcher updates each tick; sub-receivers
    /// are updated by their composite.
    pub fn top_level_receivers(&self) -> Vec<ReceiverId> {
        let mut ids: Vec<ReceiverId> = self
            .receivers
            .iter()
            .filter(|(_, entry)| {
                entry
                    .controller
                    .and_then(|c| self.controllers.get(&c))
                    .is_some_and(|c| !c.is_shadow())
            })
            .map(|(id, _)| *id)
            .collect();
        ids.sort();
        ids
    }

    // -- Linking ----------------------------------------------------------

    /// Links `receiver` and `controller`.
    ///
    /// Both sides are detached from their previous partners first. If
    /// `controller` is composite, its children are detached from anything
    /// else and point at `receiver` too. Attaching a pair that is already
    /// linked does nothing.
    ///
    /// # Errors
    /// [`ControlError::UnknownReceiver`] or
    /// [`ControlError::UnknownController`] if either side is missing,
    /// [`ControlError::ShadowController`] for a composite's private one.
    pub fn attach(&mut self, receiver: ReceiverId, controller: ControllerId) -> Result<(), ControlError> {
        self.ensure_not_shadow(controller)?;
        self.link(receiver, controller)
    }

    fn link(&mut self, receiver: ReceiverId, controller: ControllerId) -> Result<(), ControlError> {
        let current = self
            .receivers
            .get(&receiver)
            .ok_or(ControlError::UnknownReceiver(receiver))?
            .controller;
        let previous = self
            .controllers
            .get(&controller)
            .ok_or(ControlError::UnknownController(controller))?
            .receiver;
        if current == Some(controller) {
            return Ok(());
        }

        self.detach(receiver)?;
        if let Some(previous) = previous {
            self.detach(previous)?;
        }

        let children = self.children(controller);
        for &child in &children {
            if let Some(other) = self.receiver_of(child) {
                if other != receiver {
                    self.detach(other)?;
                }
            }
            if let Some(entry) = self.controllers.get_mut(&child) {
                entry.receiver = Some(receiver);
            }
        }
        if let Some(entry) = self.controllers.get_mut(&controller) {
            entry.receiver = Some(receiver);
        }

        let subs = match self.receivers.get_mut(&receiver) {
            Some(entry) => {
                entry.controller = Some(controller);
                match &mut entry.kind {
                    ReceiverKind::Simple(Some(behavior)) => {
                        behavior.attach(controller);
                        Vec::new()
                    }
                    ReceiverKind::Simple(None) => Vec::new(),
                    ReceiverKind::Composite(state) => state.subs.clone(),
                }
            }
            None => Vec::new(),
        };
        tracing::debug!(%receiver, %controller, "receiver attached");

        for slot in subs {
            self.seat_sub(slot)?;
        }
        Ok(())
    }

    /// Puts a composite's sub back on its shadow. Commands the shadow
    /// collected while the sub was elsewhere are discarded.
    fn seat_sub(&mut self, slot: SubSlot) -> Result<(), ControlError> {
        if let Some(ControllerEntry {
            kind: ControllerKind::Shadow { inbound, .. },
            ..
        }) = self.controllers.get_mut(&slot.shadow)
        {
            inbound.clear();
        }
        self.detach(slot.receiver)?;
        self.link(slot.receiver, slot.shadow)
    }

    fn ensure_not_shadow(&self, controller: ControllerId) -> Result<(), ControlError> {
        match self.controllers.get(&controller) {
            Some(entry) if entry.is_shadow() => Err(ControlError::ShadowController(controller)),
            Some(_) => Ok(()),
            None => Err(ControlError::UnknownController(controller)),
        }
    }

    /// Unlinks `receiver` from its controller. Safe to call when already
    /// detached.
    ///
    /// A composite also releases every sub-receiver still driven by one of
    /// its shadows.
    ///
    /// # Errors
    /// [`ControlError::UnknownReceiver`] if not registered.
    pub fn detach(&mut self, receiver: ReceiverId) -> Result<(), ControlError> {
        let entry = self
            .receivers
            .get_mut(&receiver)
            .ok_or(ControlError::UnknownReceiver(receiver))?;
        let Some(controller) = entry.controller.take() else {
            return Ok(());
        };
        let subs = match &mut entry.kind {
            ReceiverKind::Simple(Some(behavior)) => {
                behavior.detach();
                Vec::new()
            }
            ReceiverKind::Simple(None) => Vec::new(),
            ReceiverKind::Composite(state) => state.subs.clone(),
        };

        let children = self.children(controller);
        for id in std::iter::once(controller).chain(children) {
            if let Some(entry) = self.controllers.get_mut(&id) {
                if entry.receiver == Some(receiver) {
                    entry.receiver = None;
                }
            }
        }
        tracing::debug!(%receiver, %controller, "receiver detached");

        for slot in subs {
            if self.controller_of(slot.receiver) == Some(slot.shadow) {
                self.detach(slot.receiver)?;
            }
        }
        Ok(())
    }

    /// Makes `controller` take over `receiver`, detaching the receiver
    /// from wherever it was first.
    ///
    /// # Errors
    /// Same as [`attach`](Self::attach).
    pub fn assume_control(&mut self, controller: ControllerId, receiver: ReceiverId) -> Result<(), ControlError> {
        self.ensure_not_shadow(controller)?;
        self.detach(receiver)?;
        self.link(receiver, controller)
    }

    // -- Updates ----------------------------------------------------------

    /// Runs one tick of `receiver`'s game logic.
    ///
    /// A composite first prunes lost sub-receivers (when fragile), then
    /// copies every pending command to all of its subs, then updates each
    /// sub it still drives. A failing sub is logged and skipped.
    ///
    /// # Errors
    /// Whatever the receiver's own `update` returns, or
    /// [`ControlError::UnknownReceiver`].
    pub fn update(&mut self, receiver: ReceiverId) -> Result<(), ReceiverError> {
        let entry = self
            .receivers
            .get_mut(&receiver)
            .ok_or(ControlError::UnknownReceiver(receiver))?;
        let mut behavior = match &mut entry.kind {
            ReceiverKind::Simple(slot) => match slot.take() {
                Some(behavior) => behavior,
                // Already mid-update further up the stack.
                None => return Ok(()),
            },
            ReceiverKind::Composite(_) => return self.update_composite(receiver),
        };

        let result = behavior.update(&mut Link::new(self, receiver));

        // The receiver may have removed itself; then the behavior goes too.
        if let Some(ReceiverEntry {
            kind: ReceiverKind::Simple(slot),
            ..
        }) = self.receivers.get_mut(&receiver)
        {
            *slot = Some(behavior);
        }
        result
    }

    fn update_composite(&mut self, id: ReceiverId) -> Result<(), ReceiverError> {
        let Some((fragile, slots)) = self
            .receivers
            .get(&id)
            .and_then(ReceiverEntry::composite_state)
            .map(|state| (state.fragile, state.subs.clone()))
        else {
            return Ok(());
        };

        let slots = if fragile {
            self.prune_lost_subs(id, slots)
        } else {
            slots
        };

        if let Some(controller) = self.controller_of(id) {
            while self.has_input(controller) {
                let command = self.read(controller)?;
                for slot in &slots {
                    if let Some(ControllerEntry {
                        kind: ControllerKind::Shadow { inbound, .. },
                        ..
                    }) = self.controllers.get_mut(&slot.shadow)
                    {
                        inbound.push_back(command.clone());
                    }
                }
            }
        }

        for slot in slots {
            if self.controller_of(slot.receiver) != Some(slot.shadow) {
                continue;
            }
            if let Err(e) = self.update(slot.receiver) {
                tracing::warn!(
                    composite = %id,
                    sub = %slot.receiver,
                    error = %e,
                    "sub-receiver update failed"
                );
            }
        }
        Ok(())
    }

    /// Drops subs that something else has taken over, telling the player.
    fn prune_lost_subs(&mut self, id: ReceiverId, slots: Vec<SubSlot>) -> Vec<SubSlot> {
        let (kept, lost): (Vec<SubSlot>, Vec<SubSlot>) = slots.into_iter().partition(|slot| {
            match self.controller_of(slot.receiver) {
                Some(c) => c == slot.shadow,
                None => true,
            }
        });
        if lost.is_empty() {
            return kept;
        }

        if let Some(state) = self
            .receivers
            .get_mut(&id)
            .and_then(ReceiverEntry::composite_state_mut)
        {
            state.subs.retain(|slot| !lost.contains(slot));
            state.router.set_sources(state.subs.len());
        }

        let upstream = self.controller_of(id);
        for slot in lost {
            self.controllers.remove(&slot.shadow);
            let label = self.label(slot.receiver).unwrap_or_default().to_string();
            tracing::debug!(composite = %id, sub = %slot.receiver, "sub-receiver lost");
            if let Some(controller) = upstream {
                self.write(controller, format!("Lost connection with {label}"));
            }
        }
        kept
    }

    /// Sends a sub-receiver's output through its composite's router.
    fn route_from_sub(&mut self, owner: ReceiverId, sub: ReceiverId, message: &str) {
        let label = self.label(sub).unwrap_or_default().to_string();
        let Some(entry) = self.receivers.get_mut(&owner) else {
            return;
        };
        let upstream = entry.controller;
        let Some(state) = entry.composite_state_mut() else {
            return;
        };
        let lines = state.router.route(sub, &label, message);

        match upstream {
            Some(controller) => {
                for line in lines {
                    self.write(controller, line);
                }
            }
            None => tracing::trace!(composite = %owner, "output of detached composite dropped"),
        }
    }

    // -- Sessions ---------------------------------------------------------

    /// Creates the controller for a newly connected client.
    ///
    /// Opening the same connection twice returns the existing controller.
    pub fn open_session(&mut self, connection: ConnectionId) -> ControllerId {
        if let Some(&existing) = self.sessions.get(&connection) {
            tracing::warn!(%connection, controller = %existing, "session already open");
            return existing;
        }
        let controller = self.add_controller(Some(connection));
        self.sessions.insert(connection, controller);
        tracing::debug!(%connection, %controller, "session opened");
        controller
    }

    /// The controller of an open session.
    pub fn session(&self, connection: ConnectionId) -> Option<ControllerId> {
        self.sessions.get(&connection).copied()
    }

    /// Tears down a session: detaches its receiver and removes its
    /// controller. Returns the removed controller, if there was one.
    pub fn close_session(&mut self, connection: ConnectionId) -> Option<ControllerId> {
        let controller = self.sessions.remove(&connection)?;
        if let Err(e) = self.remove_controller(controller) {
            tracing::debug!(%connection, error = %e, "session controller already gone");
        }
        tracing::debug!(%connection, %controller, "session closed");
        Some(controller)
    }

    /// All open sessions, ordered by connection id.
    pub fn sessions(&self) -> Vec<(ConnectionId, ControllerId)> {
        let mut sessions: Vec<_> = self.sessions.iter().map(|(k, v)| (*k, *v)).collect();
        sessions.sort();
        sessions
    }

    /// Number of open sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Writes `message` to every open session.
    pub fn broadcast(&mut self, message: &str) {
        for (_, controller) in self.sessions() {
            self.write(controller, message);
        }
    }

    /// Asks the dispatcher to hang up on `connection` once this tick's
    /// output has been sent. The session stays open until the transport
    /// reports the disconnect.
    pub fn request_close(&mut self, connection: ConnectionId) {
        if !self.closing.contains(&connection) {
            self.closing.push(connection);
        }
    }

    /// Takes the pending hang-up requests.
    pub fn take_close_requests(&mut self) -> Vec<ConnectionId> {
        std::mem::take(&mut self.closing)
    }

    // -- Helpers ----------------------------------------------------------

    fn next_controller_id(&mut self) -> ControllerId {
        self.next_controller += 1;
        ControllerId::new(self.next_controller)
    }

    fn next_receiver_id(&mut self) -> ReceiverId {
        self.next_receiver += 1;
        ReceiverId::new(self.next_receiver)
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("controllers", &self.controllers.len())
            .field("receivers", &self.receivers.len())
            .field("sessions", &self.sessions.len())
            .finish()
    }
}
