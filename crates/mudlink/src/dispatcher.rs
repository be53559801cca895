//! The dispatcher: one cooperative loop that moves text between the
//! transport and game logic.
//!
//! Each tick runs these phases in order:
//!
//! ```text
//!  admin commands ─→ poll ─→ connects ─→ lines ─→ disconnects
//!        ─→ World::tick ─→ receiver updates ─→ outbound flush ─→ hang-ups
//! ```
//!
//! Nothing in a tick blocks. Socket I/O happens inside the transport's
//! non-blocking `poll`/`send`, and receivers only see what is already
//! queued on their controllers.

use mudlink_control::Registry;
use mudlink_protocol::{AdminCommand, server_notice};
use mudlink_tick::{TickConfig, TickScheduler};
use mudlink_transport::{Transport, TransportEvent};
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::{AdminHandle, World};

/// Sent to every client when an operator stops the server.
pub const SHUTDOWN_NOTICE: &str = "Server shutting down...";

/// Owns the transport, the registry and the world, and drives them one
/// tick at a time.
pub struct Dispatcher<T: Transport, W: World> {
    transport: T,
    world: W,
    registry: Registry,
    admin_tx: mpsc::UnboundedSender<AdminCommand>,
    admin_rx: mpsc::UnboundedReceiver<AdminCommand>,
    running: bool,
}

impl<T: Transport, W: World> Dispatcher<T, W> {
    /// Creates a dispatcher with an empty registry.
    pub fn new(transport: T, world: W) -> Self {
        let (admin_tx, admin_rx) = mpsc::unbounded_channel();
        Self {
            transport,
            world,
            registry: Registry::new(),
            admin_tx,
            admin_rx,
            running: true,
        }
    }

    /// A handle for queueing operator commands from anywhere.
    pub fn admin(&self) -> AdminHandle {
        AdminHandle::new(self.admin_tx.clone())
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The registry, for setting up receivers before the loop starts.
    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn world(&self) -> &W {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut W {
        &mut self.world
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// `false` once a shutdown command has been applied.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Runs one full tick. Returns whether the dispatcher is still running.
    pub fn tick(&mut self) -> bool {
        if !self.running {
            return false;
        }

        self.apply_admin_commands();
        if !self.running {
            return false;
        }

        self.handle_events();

        self.world.tick(&mut self.registry);
        for receiver in self.registry.top_level_receivers() {
            if let Err(e) = self.registry.update(receiver) {
                warn!(%receiver, error = %e, "receiver update failed");
            }
        }

        self.flush_output();
        true
    }

    /// Ticks at the configured rate until a shutdown command arrives, then
    /// shuts the transport down.
    pub async fn run(mut self, tick_config: TickConfig) {
        let mut ticks = TickScheduler::new(tick_config);
        info!(rate_hz = ticks.tick_rate_hz(), "dispatcher running");

        while self.running {
            ticks.wait_for_tick().await;
            self.tick();
            ticks.record_tick_end();
        }

        self.transport.shutdown();
        info!(ticks = ticks.tick_count(), "dispatcher stopped");
    }

    fn apply_admin_commands(&mut self) {
        while let Ok(command) = self.admin_rx.try_recv() {
            debug!(?command, "admin command");
            match command {
                AdminCommand::Broadcast(text) => {
                    self.transport.broadcast(&server_notice(&text));
                }
                AdminCommand::ListPlayers => self.log_players(),
                AdminCommand::Shutdown => {
                    info!("shutdown requested");
                    self.transport.broadcast(&server_notice(SHUTDOWN_NOTICE));
                    self.running = false;
                    return;
                }
            }
        }
    }

    fn log_players(&self) {
        let sessions = self.registry.sessions();
        info!(count = sessions.len(), "players");
        for (connection, controller) in sessions {
            let receiver = self
                .registry
                .receiver_of(controller)
                .and_then(|r| self.registry.label(r))
                .unwrap_or("-");
            info!(%connection, %controller, receiver, "player");
        }
    }

    /// Applies one poll's worth of events: every connect, then every
    /// line, then every disconnect.
    fn handle_events(&mut self) {
        let events = self.transport.poll();
        if events.is_empty() {
            return;
        }
        trace!(count = events.len(), "handling transport events");

        for event in &events {
            if let TransportEvent::Connected { id, addr } = event {
                let controller = self.registry.open_session(*id);
                info!(connection = %id, %addr, %controller, "session opened");
                self.world.on_connect(&mut self.registry, *id, controller);
            }
        }

        for event in &events {
            match event {
                TransportEvent::Line { id, text } => match self.registry.session(*id) {
                    Some(controller) => {
                        if let Err(e) = self.registry.push_command(controller, text.as_str()) {
                            debug!(connection = %id, error = %e, "line dropped");
                        }
                    }
                    None => debug!(connection = %id, "line for unknown session dropped"),
                },
                TransportEvent::NameSubmitted { id, name } => match self.registry.session(*id) {
                    Some(controller) => {
                        self.world.on_name(&mut self.registry, *id, controller, name);
                    }
                    None => debug!(connection = %id, "name for unknown session dropped"),
                },
                _ => {}
            }
        }

        for event in &events {
            if let TransportEvent::Disconnected { id } = event {
                if let Some(controller) = self.registry.session(*id) {
                    self.world.on_disconnect(&mut self.registry, *id, controller);
                }
                if self.registry.close_session(*id).is_some() {
                    info!(connection = %id, "session closed");
                }
            }
        }
    }

    fn flush_output(&mut self) {
        for (connection, controller) in self.registry.sessions() {
            for message in self.registry.drain_output(controller) {
                self.transport.send(connection, &message);
            }
        }
        for connection in self.registry.take_close_requests() {
            debug!(%connection, "closing at game's request");
            self.transport.close(connection);
        }
    }
}
