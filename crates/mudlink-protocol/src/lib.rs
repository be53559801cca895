//! Wire protocol for Mudlink.
//!
//! Mudlink clients speak plain text over Telnet-ish TCP. This crate holds
//! everything that knows about bytes and text but nothing about sockets:
//!
//! - **Framing** ([`LineFramer`]): turns a raw byte stream into clean
//!   lines, skipping Telnet negotiation.
//! - **Text** ([`encode_line`], [`split_command`], [`server_notice`]):
//!   how outbound messages are terminated and inbound lines are split.
//! - **Admin** ([`AdminCommand`]): the operator side-channel vocabulary.
//!
//! ```text
//! Transport (bytes) → Protocol (lines) → Control (commands)
//! ```
//!
//! # Feature Flags
//!
//! - `json` (default): accept operator commands as JSON via `serde_json`

mod admin;
mod error;
mod framer;
mod text;

pub mod telnet;

pub use admin::{AdminCommand, ADMIN_HELP};
pub use error::ProtocolError;
pub use framer::{FramerState, LineFramer};
pub use text::{encode_line, server_notice, split_command, LINE_ENDING};
