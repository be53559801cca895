//! Unified error type for Mudlink.

use mudlink_control::ControlError;
use mudlink_protocol::ProtocolError;
use mudlink_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attributes let `?` lift sub-crate errors into this one.
#[derive(Debug, thiserror::Error)]
pub enum MudlinkError {
    /// A transport-level error. At this level, only listener setup.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// An operator command could not be parsed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A controller/receiver operation failed.
    #[error(transparent)]
    Control(#[from] ControlError),

    /// The dispatcher is gone, so operator commands have nowhere to go.
    #[error("dispatcher has stopped")]
    DispatcherStopped,
}
