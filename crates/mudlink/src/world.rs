//! Hooks from the dispatcher into game code.

use mudlink_control::{ControllerId, Registry};
use mudlink_transport::ConnectionId;

/// Game-wide logic that reacts to connections coming and going.
///
/// Per-player logic lives in [`Receiver`](mudlink_control::Receiver)s; a
/// `World` decides which receiver a new connection gets, announces
/// arrivals and departures, and may run global timers in [`tick`](Self::tick).
/// Every method has a default, so `()` is a valid (if silent) world.
pub trait World: Send + 'static {
    /// A client connected and got `controller`. Nothing drives it yet.
    fn on_connect(&mut self, registry: &mut Registry, connection: ConnectionId, controller: ControllerId) {
        let _ = (registry, connection, controller);
    }

    /// The client submitted its name (only when the transport requires one).
    ///
    /// By default the name is queued as an ordinary command.
    fn on_name(
        &mut self,
        registry: &mut Registry,
        connection: ConnectionId,
        controller: ControllerId,
        name: &str,
    ) {
        if let Err(e) = registry.push_command(controller, name) {
            tracing::debug!(%connection, error = %e, "name dropped");
        }
    }

    /// The client is gone. Runs before its session is torn down, so
    /// `controller` and its receiver are still linked.
    fn on_disconnect(&mut self, registry: &mut Registry, connection: ConnectionId, controller: ControllerId) {
        let _ = (registry, connection, controller);
    }

    /// Runs once per tick, before receivers are updated.
    fn tick(&mut self, registry: &mut Registry) {
        let _ = registry;
    }
}

impl World for () {}
