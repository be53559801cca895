use std::collections::HashMap;
use std::io::BufRead;

use mudlink::prelude::*;
use mudlink::protocol::ADMIN_HELP;
use mudlink::DEFAULT_BIND_ADDR;
use tracing::{debug, info};

const GREETING: &str = "Welcome! What is your name?";

const PLAYER_HELP: &str = "Commands: say <message>, who, help, quit";

// ---------------------------------------------------------------------------
// Per-player logic
// ---------------------------------------------------------------------------

/// A player standing in the lobby.
struct Chatter;

impl Chatter {
    fn say(link: &mut Link<'_>, text: &str) -> Result<(), ReceiverError> {
        if text.is_empty() {
            link.write("Say what?")?;
            return Ok(());
        }
        let own = link.controller();
        let line = format!("{} says: {text}", link.label());
        let registry = link.registry();
        for (_, controller) in registry.sessions() {
            if Some(controller) != own {
                registry.write(controller, line.as_str());
            }
        }
        link.write(format!("You say: {text}"))?;
        Ok(())
    }

    fn who(link: &mut Link<'_>) -> Result<(), ReceiverError> {
        let registry = link.registry();
        let names: Vec<String> = registry
            .sessions()
            .into_iter()
            .filter_map(|(_, controller)| registry.receiver_of(controller))
            .filter_map(|receiver| registry.label(receiver).map(str::to_string))
            .collect();
        link.write(format!("Online: {}", names.join(", ")))?;
        Ok(())
    }

    fn quit(link: &mut Link<'_>) -> Result<(), ReceiverError> {
        link.write("Goodbye!")?;
        let connection = link
            .controller()
            .and_then(|c| link.registry().connection_of(c));
        if let Some(connection) = connection {
            link.registry().request_close(connection);
        }
        Ok(())
    }
}

impl Receiver for Chatter {
    fn update(&mut self, link: &mut Link<'_>) -> Result<(), ReceiverError> {
        while link.has_input() {
            let line = link.read()?;
            let (verb, rest) = split_command(&line);
            match verb.as_str() {
                "say" => Self::say(link, rest)?,
                "who" => Self::who(link)?,
                "help" => link.write(PLAYER_HELP)?,
                "quit" => {
                    Self::quit(link)?;
                    return Ok(());
                }
                other => link.write(format!(
                    "Unknown command '{other}'. Type 'help' for a list of commands."
                ))?,
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

/// Gives each named player a `Chatter` and announces comings and goings.
#[derive(Default)]
struct Lobby {
    players: HashMap<ConnectionId, ReceiverId>,
}

impl Lobby {
    fn tell_others(registry: &mut Registry, except: ControllerId, message: &str) {
        for (_, controller) in registry.sessions() {
            if controller != except {
                registry.write(controller, message);
            }
        }
    }
}

impl World for Lobby {
    fn on_name(
        &mut self,
        registry: &mut Registry,
        connection: ConnectionId,
        controller: ControllerId,
        name: &str,
    ) {
        let chatter = registry.add_receiver(name, Chatter);
        if let Err(e) = registry.attach(chatter, controller) {
            debug!(%connection, error = %e, "could not seat player");
            return;
        }
        self.players.insert(connection, chatter);

        registry.write(controller, format!("Hello, {name}! {PLAYER_HELP}"));
        Self::tell_others(registry, controller, &format!("{name} has arrived."));
        info!(%connection, %name, "player joined");
    }

    fn on_disconnect(
        &mut self,
        registry: &mut Registry,
        connection: ConnectionId,
        controller: ControllerId,
    ) {
        let Some(chatter) = self.players.remove(&connection) else {
            return;
        };
        let name = registry.label(chatter).unwrap_or("someone").to_string();
        if let Err(e) = registry.remove_receiver(chatter) {
            debug!(%connection, error = %e, "player already gone");
        }
        Self::tell_others(registry, controller, &format!("{name} has left."));
        info!(%connection, %name, "player left");
    }
}

// ---------------------------------------------------------------------------
// Operator console
// ---------------------------------------------------------------------------

/// Reads operator commands from stdin on a plain thread.
fn spawn_console(admin: AdminHandle) {
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if line.trim().eq_ignore_ascii_case("help") {
                info!("{ADMIN_HELP}");
                continue;
            }
            match admin.submit(&line) {
                Ok(AdminCommand::Shutdown) => break,
                Ok(_) => {}
                Err(MudlinkError::Protocol(_)) => {
                    info!("Command not recognized. Type help for a list of commands.");
                }
                Err(e) => {
                    debug!(error = %e, "console stopping");
                    break;
                }
            }
        }
        debug!("console closed");
    });
}

// ---------------------------------------------------------------------------
// Server bootstrap
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    mudlink::init_logging("info");

    let bind = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());

    let server = MudServer::builder()
        .bind(&bind)
        .transport_config(TransportConfig {
            require_name: true,
            greeting: Some(GREETING.into()),
            ..TransportConfig::default()
        })
        .build(Lobby::default())
        .await?;

    info!(addr = %server.local_addr(), "lobby open, type 'help' for server commands");
    spawn_console(server.admin());
    server.run().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn join(lobby: &mut Lobby, registry: &mut Registry, n: u64, name: &str) -> ControllerId {
        let connection = ConnectionId::new(n);
        let controller = registry.open_session(connection);
        lobby.on_name(registry, connection, controller, name);
        controller
    }

    fn run(registry: &mut Registry) {
        for receiver in registry.top_level_receivers() {
            registry.update(receiver).unwrap();
        }
    }

    #[test]
    fn test_join_greets_player_and_announces_to_others() {
        let mut lobby = Lobby::default();
        let mut registry = Registry::new();
        let ada = join(&mut lobby, &mut registry, 1, "Ada");
        registry.drain_output(ada);

        let bo = join(&mut lobby, &mut registry, 2, "Bo");

        assert_eq!(registry.drain_output(ada), vec!["Bo has arrived."]);
        assert_eq!(
            registry.drain_output(bo),
            vec![format!("Hello, Bo! {PLAYER_HELP}")]
        );
    }

    #[test]
    fn test_say_reaches_everyone_else() {
        let mut lobby = Lobby::default();
        let mut registry = Registry::new();
        let ada = join(&mut lobby, &mut registry, 1, "Ada");
        let bo = join(&mut lobby, &mut registry, 2, "Bo");
        registry.drain_output(ada);
        registry.drain_output(bo);

        registry.push_command(ada, "say hello there").unwrap();
        run(&mut registry);

        assert_eq!(registry.drain_output(ada), vec!["You say: hello there"]);
        assert_eq!(registry.drain_output(bo), vec!["Ada says: hello there"]);
    }

    #[test]
    fn test_who_lists_named_players() {
        let mut lobby = Lobby::default();
        let mut registry = Registry::new();
        let ada = join(&mut lobby, &mut registry, 1, "Ada");
        join(&mut lobby, &mut registry, 2, "Bo");
        registry.drain_output(ada);

        registry.push_command(ada, "WHO").unwrap();
        run(&mut registry);

        assert_eq!(registry.drain_output(ada), vec!["Online: Ada, Bo"]);
    }

    #[test]
    fn test_unknown_command_is_explained() {
        let mut lobby = Lobby::default();
        let mut registry = Registry::new();
        let ada = join(&mut lobby, &mut registry, 1, "Ada");
        registry.drain_output(ada);

        registry.push_command(ada, "dance").unwrap();
        run(&mut registry);

        assert_eq!(
            registry.drain_output(ada),
            vec!["Unknown command 'dance'. Type 'help' for a list of commands."]
        );
    }

    #[test]
    fn test_quit_says_goodbye_and_requests_close() {
        let mut lobby = Lobby::default();
        let mut registry = Registry::new();
        let ada = join(&mut lobby, &mut registry, 1, "Ada");
        registry.drain_output(ada);

        registry.push_command(ada, "quit").unwrap();
        registry.push_command(ada, "say too late").unwrap();
        run(&mut registry);

        assert_eq!(registry.drain_output(ada), vec!["Goodbye!"]);
        assert_eq!(registry.take_close_requests(), vec![ConnectionId::new(1)]);
    }

    #[test]
    fn test_disconnect_announces_departure_and_removes_player() {
        let mut lobby = Lobby::default();
        let mut registry = Registry::new();
        let ada = join(&mut lobby, &mut registry, 1, "Ada");
        let bo = join(&mut lobby, &mut registry, 2, "Bo");
        registry.drain_output(ada);

        lobby.on_disconnect(&mut registry, ConnectionId::new(2), bo);
        registry.close_session(ConnectionId::new(2));

        assert_eq!(registry.drain_output(ada), vec!["Bo has left."]);
        assert_eq!(registry.receiver_count(), 1);
        assert!(lobby.players.get(&ConnectionId::new(2)).is_none());
    }
}
