//! Error types for the protocol layer.

/// Errors that can occur while decoding operator input.
///
/// Network text never fails to decode (invalid UTF-8 is replaced), so the
/// only fallible parsing in this crate is the administrative side-channel.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The JSON form of an operator command could not be decoded.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The console form named a command that doesn't exist.
    #[error("invalid command: {0}")]
    InvalidCommand(String),
}
