//! End-to-end tests: a real `MudServer` on a loopback port and plain TCP
//! clients talking to it.

use std::time::Duration;

use mudlink::prelude::*;
use mudlink::SHUTDOWN_NOTICE;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::OwnedWriteHalf;

// =========================================================================
// Test game
// =========================================================================

/// Repeats each command prefixed with the receiver's label.
struct Parrot;

impl Receiver for Parrot {
    fn update(&mut self, link: &mut Link<'_>) -> Result<(), ReceiverError> {
        while link.has_input() {
            let line = link.read()?;
            let reply = format!("{}: {line}", link.label());
            link.write(reply)?;
        }
        Ok(())
    }
}

struct NamedWorld;

impl World for NamedWorld {
    fn on_name(
        &mut self,
        registry: &mut Registry,
        _connection: ConnectionId,
        controller: ControllerId,
        name: &str,
    ) {
        let parrot = registry.add_receiver(name, Parrot);
        registry.attach(parrot, controller).unwrap();
        registry.write(controller, format!("Welcome, {name}!"));
    }
}

// -- Helpers --

struct Client {
    reader: BufReader<tokio::net::tcp::OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Client {
    async fn connect(server: &MudServer<NamedWorld>) -> Self {
        let stream = TcpStream::connect(server.local_addr()).await.unwrap();
        let (read, writer) = stream.into_split();
        Self {
            reader: BufReader::new(read),
            writer,
        }
    }

    async fn send(&mut self, line: &str) {
        self.writer
            .write_all(format!("{line}\r\n").as_bytes())
            .await
            .unwrap();
    }

    /// Next line without its CRLF, skipping liveness probe bytes.
    async fn recv(&mut self) -> String {
        let mut line = String::new();
        tokio::time::timeout(Duration::from_secs(5), self.reader.read_line(&mut line))
            .await
            .expect("server should answer in time")
            .unwrap();
        line.trim_end_matches(['\r', '\n']).trim_start_matches('\0').to_string()
    }

    async fn expect_eof(&mut self) {
        let mut rest = Vec::new();
        tokio::time::timeout(Duration::from_secs(5), self.reader.read_to_end(&mut rest))
            .await
            .expect("server should hang up in time")
            .unwrap_or(0);
    }
}

async fn start() -> MudServer<NamedWorld> {
    MudServer::builder()
        .bind("127.0.0.1:0")
        .transport_config(TransportConfig {
            require_name: true,
            greeting: Some("What is your name?".into()),
            ..TransportConfig::default()
        })
        .tick_config(TickConfig::with_rate(100))
        .build(NamedWorld)
        .await
        .expect("server should bind")
}

// =========================================================================
// build()
// =========================================================================

#[tokio::test]
async fn test_build_with_unusable_address_returns_transport_error() {
    let result = MudServer::builder().bind("not-an-address").build(()).await;

    assert!(matches!(result, Err(MudlinkError::Transport(_))));
}

#[test]
fn test_builder_config_replaces_everything() {
    let config: ServerConfig =
        serde_json::from_str(r#"{"bind": "127.0.0.1:0", "transport": {"require_name": true}}"#)
            .unwrap();

    let builder = MudServer::builder().config(config);

    let debug = format!("{builder:?}");
    assert!(debug.contains("127.0.0.1:0"));
    assert!(debug.contains("require_name: true"));
}

// =========================================================================
// Full session flow
// =========================================================================

#[tokio::test]
async fn test_client_names_itself_and_is_echoed() {
    let server = start().await;
    let mut client = Client::connect(&server).await;
    let admin = server.admin();
    let running = tokio::spawn(server.run());

    assert_eq!(client.recv().await, "What is your name?");
    client.send("Ada").await;
    assert_eq!(client.recv().await, "Welcome, Ada!");
    client.send("look").await;
    assert_eq!(client.recv().await, "Ada: look");

    admin.shutdown().unwrap();
    running.await.unwrap();
}

#[tokio::test]
async fn test_admin_broadcast_reaches_connected_clients() {
    let server = start().await;
    let mut a = Client::connect(&server).await;
    let mut b = Client::connect(&server).await;
    let admin = server.admin();
    let running = tokio::spawn(server.run());
    assert_eq!(a.recv().await, "What is your name?");
    assert_eq!(b.recv().await, "What is your name?");

    admin.submit("broadcast dinner is served").unwrap();

    let notice = server_notice("dinner is served");
    assert_eq!(a.recv().await, notice);
    assert_eq!(b.recv().await, notice);

    admin.shutdown().unwrap();
    running.await.unwrap();
}

#[tokio::test]
async fn test_shutdown_notifies_then_closes_connections() {
    let server = start().await;
    let addr = server.local_addr();
    let mut client = Client::connect(&server).await;
    let admin = server.admin();
    let running = tokio::spawn(server.run());
    assert_eq!(client.recv().await, "What is your name?");

    admin.shutdown().unwrap();
    running.await.unwrap();

    assert_eq!(client.recv().await, server_notice(SHUTDOWN_NOTICE));
    client.expect_eof().await;
    assert!(TcpStream::connect(addr).await.is_err());
}
