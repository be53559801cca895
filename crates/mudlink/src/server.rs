//! `MudServer` builder and entry point.
//!
//! Ties the layers together: a [`TelnetTransport`] feeding a
//! [`Dispatcher`] paced by a tick scheduler.

use std::net::SocketAddr;

use mudlink_control::Registry;
use mudlink_tick::TickConfig;
use mudlink_transport::{TelnetTransport, TransportConfig};

use crate::{AdminHandle, Dispatcher, MudlinkError, ServerConfig, World};

/// Builder for configuring and starting a Mudlink server.
///
/// # Example
///
/// ```rust,no_run
/// use mudlink::prelude::*;
///
/// # async fn start() -> Result<(), MudlinkError> {
/// let server = MudServer::builder()
///     .bind("0.0.0.0:4000")
///     .build(())
///     .await?;
/// server.run().await;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MudServerBuilder {
    config: ServerConfig,
}

impl MudServerBuilder {
    /// Creates a builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from a complete configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to listen on.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind = addr.to_string();
        self
    }

    /// Sets the transport configuration.
    pub fn transport_config(mut self, config: TransportConfig) -> Self {
        self.config.transport = config;
        self
    }

    /// Sets the tick rate and budget thresholds.
    pub fn tick_config(mut self, config: TickConfig) -> Self {
        self.config.tick = config;
        self
    }

    /// Binds the listener and assembles the server around `world`.
    ///
    /// # Errors
    /// [`MudlinkError::Transport`] if the address can't be bound.
    pub async fn build<W: World>(self, world: W) -> Result<MudServer<W>, MudlinkError> {
        let ServerConfig {
            bind,
            transport,
            tick,
        } = self.config;
        let transport = TelnetTransport::bind(&bind, transport).await?;

        Ok(MudServer {
            dispatcher: Dispatcher::new(transport, world),
            tick_config: tick,
        })
    }
}

/// A bound Mudlink server, ready to [`run`](Self::run).
pub struct MudServer<W: World> {
    dispatcher: Dispatcher<TelnetTransport, W>,
    tick_config: TickConfig,
}

impl MudServer<()> {
    /// Creates a new builder. The world type is picked by
    /// [`MudServerBuilder::build`].
    pub fn builder() -> MudServerBuilder {
        MudServerBuilder::new()
    }
}

impl<W: World> MudServer<W> {
    /// The address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.dispatcher.transport().local_addr()
    }

    /// A handle for operator commands; stays usable while the server runs.
    pub fn admin(&self) -> AdminHandle {
        self.dispatcher.admin()
    }

    /// The registry, for registering shared receivers before starting.
    pub fn registry_mut(&mut self) -> &mut Registry {
        self.dispatcher.registry_mut()
    }

    pub fn world_mut(&mut self) -> &mut W {
        self.dispatcher.world_mut()
    }

    /// Runs the dispatcher until an operator shuts it down. Every
    /// connection and the listener are closed on return.
    pub async fn run(self) {
        tracing::info!(local_addr = %self.local_addr(), "mudlink server running");
        self.dispatcher.run(self.tick_config).await;
    }
}
