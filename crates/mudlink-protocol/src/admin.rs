//! Operator commands for the administrative side-channel.
//!
//! An operator (a console on the server host, or any other thread) can ask
//! the running server to broadcast a notice, list who is connected, or shut
//! down. Commands arrive either as JSON or as console words:
//!
//! ```text
//! {"broadcast": "restart in 5 minutes"}     broadcast restart in 5 minutes
//! "listPlayers"                             players
//! "shutdown"                                stop
//! ```

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// A request from the operator to the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AdminCommand {
    /// Send a server notice to every connected client.
    Broadcast(String),
    /// Log every open session with its controller and receiver.
    ListPlayers,
    /// Notify everyone, close all connections, and stop the loop.
    Shutdown,
}

/// Help text for the console words accepted by [`AdminCommand::parse`].
pub const ADMIN_HELP: &str = "Server commands are:\n \
    broadcast [message] - Broadcasts a message to the entire server\n \
    players - Prints a list of all players\n \
    stop - Stops the server";

impl AdminCommand {
    /// Parses one operator input line.
    ///
    /// Lines starting with `{` or `"` are decoded as JSON; anything else is
    /// read as console words.
    ///
    /// # Errors
    /// [`ProtocolError::InvalidCommand`] for unknown words or an empty
    /// line, [`ProtocolError::Decode`] for malformed JSON.
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let line = line.trim();

        #[cfg(feature = "json")]
        if line.starts_with('{') || line.starts_with('"') {
            return serde_json::from_str(line).map_err(ProtocolError::Decode);
        }

        let (verb, rest) = crate::split_command(line);
        match verb.as_str() {
            "broadcast" => Ok(Self::Broadcast(rest.to_string())),
            "players" | "listplayers" => Ok(Self::ListPlayers),
            "stop" | "shutdown" => Ok(Self::Shutdown),
            "" => Err(ProtocolError::InvalidCommand("empty command".into())),
            other => Err(ProtocolError::InvalidCommand(other.to_string())),
        }
    }
}

impl FromStr for AdminCommand {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_broadcast_words() {
        let cmd = AdminCommand::parse("broadcast the swamp floods at dawn").unwrap();
        assert_eq!(
            cmd,
            AdminCommand::Broadcast("the swamp floods at dawn".into())
        );
    }

    #[test]
    fn test_parse_players_and_stop_words() {
        assert_eq!(AdminCommand::parse("players").unwrap(), AdminCommand::ListPlayers);
        assert_eq!(AdminCommand::parse("STOP").unwrap(), AdminCommand::Shutdown);
    }

    #[test]
    fn test_parse_unknown_word_returns_invalid_command() {
        let result = AdminCommand::parse("dance");
        assert!(matches!(result, Err(ProtocolError::InvalidCommand(w)) if w == "dance"));
    }

    #[test]
    fn test_parse_empty_line_returns_invalid_command() {
        assert!(matches!(
            AdminCommand::parse("  "),
            Err(ProtocolError::InvalidCommand(_))
        ));
    }

    #[test]
    fn test_parse_json_broadcast() {
        let cmd: AdminCommand = r#"{"broadcast": "hello"}"#.parse().unwrap();
        assert_eq!(cmd, AdminCommand::Broadcast("hello".into()));
    }

    #[test]
    fn test_parse_json_unit_variants() {
        assert_eq!(
            AdminCommand::parse(r#""listPlayers""#).unwrap(),
            AdminCommand::ListPlayers
        );
        assert_eq!(
            AdminCommand::parse(r#""shutdown""#).unwrap(),
            AdminCommand::Shutdown
        );
    }

    #[test]
    fn test_parse_malformed_json_returns_decode_error() {
        assert!(matches!(
            AdminCommand::parse("{broadcast: oops"),
            Err(ProtocolError::Decode(_))
        ));
    }

    #[test]
    fn test_serialize_matches_parse_shape() {
        let json = serde_json::to_string(&AdminCommand::Broadcast("x".into())).unwrap();
        assert_eq!(json, r#"{"broadcast":"x"}"#);
    }
}
