//! Control layer for Mudlink.
//!
//! Decouples *who is typing* from *what is being driven*:
//!
//! - A **controller** is a source of commands and a sink for output. Each
//!   connection gets a simple one; several can be [composed](Registry::compose)
//!   into one that reads from whichever player typed and writes to all.
//! - A **receiver** is game logic (a character, a menu, a lobby) updated
//!   once per tick through a [`Link`] to its current controller.
//!   A [composite receiver](Registry::add_composite) drives a whole group
//!   of receivers from one controller, merging their output.
//!
//! Every controller and receiver lives in a [`Registry`] and is referred to
//! by id, so links can be rewired at any point, including from inside a
//! receiver's own update.

mod controller;
mod error;
mod link;
mod receiver;
mod registry;
mod router;

pub use controller::ControllerId;
pub use error::{ControlError, ReceiverError};
pub use link::Link;
pub use receiver::{CompositeOptions, Receiver, ReceiverId};
pub use registry::Registry;
pub use router::MessageRouter;
