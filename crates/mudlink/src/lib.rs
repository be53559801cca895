//! # Mudlink
//!
//! A tick-driven text server for MUD-style games.
//!
//! Clients connect over raw TCP (Telnet clients work), send lines, and
//! receive lines. Game code never touches sockets: each connection gets a
//! controller in a [`Registry`](mudlink_control::Registry), and game logic
//! implements [`Receiver`](mudlink_control::Receiver) to be driven by one.
//! A [`World`] hands new connections their first receiver.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mudlink::prelude::*;
//!
//! struct Echo;
//!
//! impl Receiver for Echo {
//!     fn update(&mut self, link: &mut Link<'_>) -> Result<(), ReceiverError> {
//!         while link.has_input() {
//!             let line = link.read()?;
//!             link.write(line)?;
//!         }
//!         Ok(())
//!     }
//! }
//!
//! struct EchoWorld;
//!
//! impl World for EchoWorld {
//!     fn on_connect(&mut self, registry: &mut Registry, _: ConnectionId, controller: ControllerId) {
//!         let echo = registry.add_receiver("echo", Echo);
//!         let _ = registry.attach(echo, controller);
//!     }
//! }
//!
//! # async fn start() -> Result<(), MudlinkError> {
//! let server = MudServer::builder().bind("0.0.0.0:4000").build(EchoWorld).await?;
//! server.run().await;
//! # Ok(())
//! # }
//! ```

mod admin;
mod config;
mod dispatcher;
mod error;
mod server;
mod world;

pub use admin::AdminHandle;
pub use config::{DEFAULT_BIND_ADDR, ServerConfig};
pub use dispatcher::{Dispatcher, SHUTDOWN_NOTICE};
pub use error::MudlinkError;
pub use server::{MudServer, MudServerBuilder};
pub use world::World;

pub use mudlink_control as control;
pub use mudlink_protocol as protocol;
pub use mudlink_tick as tick;
pub use mudlink_transport as transport;

/// Installs a `tracing` subscriber that honours `RUST_LOG`, falling back
/// to `default_filter` (e.g. `"info"`).
///
/// Does nothing if a global subscriber is already set.
pub fn init_logging(default_filter: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

pub mod prelude {
    //! Everything a game needs in scope.

    pub use crate::{
        AdminHandle, Dispatcher, MudServer, MudServerBuilder, MudlinkError, ServerConfig, World,
    };
    pub use mudlink_control::{
        CompositeOptions, ControlError, ControllerId, Link, Receiver, ReceiverError, ReceiverId,
        Registry,
    };
    pub use mudlink_protocol::{AdminCommand, server_notice, split_command};
    pub use mudlink_tick::TickConfig;
    pub use mudlink_transport::{ConnectionId, TransportConfig};
}
