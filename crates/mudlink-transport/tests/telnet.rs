//! Integration tests for the Telnet transport.
//!
//! These tests bind a real listener on an OS-assigned port and talk to it
//! with plain tokio TCP clients. The transport never blocks, so each test
//! polls in a short loop (sleeping between polls lets tokio's reactor
//! notice the new socket readiness) until the expected events show up.

use std::time::Duration;

use mudlink_protocol::telnet::{IAC, SB, SE, WILL};
use mudlink_transport::{
    TelnetTransport, Transport, TransportConfig, TransportError, TransportEvent,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

// -- Helpers ----------------------------------------------------------

/// Probes far apart so they don't show up in the byte stream.
fn quiet_config() -> TransportConfig {
    TransportConfig {
        probe_interval: Duration::from_secs(3600),
        ..TransportConfig::default()
    }
}

async fn bind(config: TransportConfig) -> TelnetTransport {
    TelnetTransport::bind("127.0.0.1:0", config)
        .await
        .expect("should bind")
}

async fn connect(transport: &TelnetTransport) -> TcpStream {
    TcpStream::connect(transport.local_addr())
        .await
        .expect("client should connect")
}

/// Polls until `done` holds for the events collected so far.
async fn poll_until<F>(transport: &mut TelnetTransport, mut done: F) -> Vec<TransportEvent>
where
    F: FnMut(&[TransportEvent]) -> bool,
{
    let mut events = Vec::new();
    for _ in 0..300 {
        events.extend(transport.poll());
        if done(&events) {
            return events;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition never met, events so far: {events:?}");
}

fn count_connected(events: &[TransportEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, TransportEvent::Connected { .. }))
        .count()
}

fn lines(events: &[TransportEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            TransportEvent::Line { text, .. } => Some(text.clone()),
            _ => None,
        })
        .collect()
}

/// Reads from the client until `expected` bytes arrived (or times out).
async fn read_exactly(client: &mut TcpStream, expected: usize) -> Vec<u8> {
    let mut buf = vec![0u8; expected];
    tokio::time::timeout(Duration::from_secs(3), client.read_exact(&mut buf))
        .await
        .expect("read should not time out")
        .expect("read should succeed");
    buf
}

// =====================================================================
// bind()
// =====================================================================

#[tokio::test]
async fn test_bind_invalid_address_is_listener_setup_error() {
    let result = TelnetTransport::bind("definitely not an address", quiet_config()).await;

    assert!(matches!(result, Err(TransportError::ListenerSetup(_))));
}

// =====================================================================
// poll()
// =====================================================================

#[tokio::test]
async fn test_poll_accepts_client_and_reports_lines() {
    let mut transport = bind(quiet_config()).await;
    let mut client = connect(&transport).await;

    let events = poll_until(&mut transport, |ev| count_connected(ev) == 1).await;
    let id = events[0].id();
    assert!(id.into_inner() > 0);
    assert_eq!(transport.connection_ids(), vec![id]);

    client.write_all(b"look\r\nsay hello\n").await.unwrap();
    let events = poll_until(&mut transport, |ev| lines(ev).len() == 2).await;

    assert_eq!(lines(&events), vec!["look", "say hello"]);
    assert!(events.iter().all(|e| e.id() == id));
}

#[tokio::test]
async fn test_poll_assigns_distinct_ids() {
    let mut transport = bind(quiet_config()).await;
    let _a = connect(&transport).await;
    let _b = connect(&transport).await;

    let events = poll_until(&mut transport, |ev| count_connected(ev) == 2).await;

    assert_ne!(events[0].id(), events[1].id());
}

#[tokio::test]
async fn test_poll_strips_negotiation_and_skips_blank_lines() {
    let mut transport = bind(quiet_config()).await;
    let mut client = connect(&transport).await;
    poll_until(&mut transport, |ev| count_connected(ev) == 1).await;

    let mut bytes = vec![IAC, WILL, 31, IAC, SB, 31, 0, 80, 0, 24, IAC, SE];
    bytes.extend_from_slice(b"   \r\n  north  \r\n");
    client.write_all(&bytes).await.unwrap();

    let events = poll_until(&mut transport, |ev| !lines(ev).is_empty()).await;
    assert_eq!(lines(&events), vec!["north"]);
}

#[tokio::test]
async fn test_poll_first_line_is_name_when_required() {
    let config = TransportConfig {
        require_name: true,
        ..quiet_config()
    };
    let mut transport = bind(config).await;
    let mut client = connect(&transport).await;
    poll_until(&mut transport, |ev| count_connected(ev) == 1).await;

    client.write_all(b"Ada\nlook\n").await.unwrap();
    let events = poll_until(&mut transport, |ev| ev.len() == 2).await;

    assert!(matches!(
        &events[0],
        TransportEvent::NameSubmitted { name, .. } if name == "Ada"
    ));
    assert_eq!(lines(&events), vec!["look"]);
    let id = events[0].id();
    assert!(transport.connection(id).unwrap().is_named());
}

#[tokio::test]
async fn test_poll_reports_disconnect_when_client_closes() {
    let mut transport = bind(quiet_config()).await;
    let client = connect(&transport).await;
    let events = poll_until(&mut transport, |ev| count_connected(ev) == 1).await;
    let id = events[0].id();

    drop(client);
    let events = poll_until(&mut transport, |ev| {
        ev.contains(&TransportEvent::Disconnected { id })
    })
    .await;

    assert_eq!(events.len(), 1);
    assert!(transport.connection_ids().is_empty());
}

#[tokio::test]
async fn test_poll_sends_probe_byte_when_interval_elapsed() {
    let config = TransportConfig {
        probe_interval: Duration::ZERO,
        ..TransportConfig::default()
    };
    let mut transport = bind(config).await;
    let mut client = connect(&transport).await;
    poll_until(&mut transport, |ev| count_connected(ev) == 1).await;

    // The first poll after accept probes the new connection.
    transport.poll();

    assert_eq!(read_exactly(&mut client, 1).await, vec![0u8]);
}

// =====================================================================
// send() / broadcast() / close()
// =====================================================================

#[tokio::test]
async fn test_send_delivers_line_with_crlf() {
    let mut transport = bind(quiet_config()).await;
    let mut client = connect(&transport).await;
    let events = poll_until(&mut transport, |ev| count_connected(ev) == 1).await;

    transport.send(events[0].id(), "You see a swamp.");

    assert_eq!(read_exactly(&mut client, 18).await, b"You see a swamp.\r\n");
}

#[tokio::test]
async fn test_greeting_is_sent_on_connect() {
    let config = TransportConfig {
        greeting: Some("What is your name?".into()),
        ..quiet_config()
    };
    let mut transport = bind(config).await;
    let mut client = connect(&transport).await;
    poll_until(&mut transport, |ev| count_connected(ev) == 1).await;

    assert_eq!(read_exactly(&mut client, 20).await, b"What is your name?\r\n");
}

#[tokio::test]
async fn test_send_to_unknown_connection_is_ignored() {
    let mut transport = bind(quiet_config()).await;

    transport.send(mudlink_transport::ConnectionId::new(u64::MAX), "nobody");

    assert!(transport.poll().is_empty());
}

#[tokio::test]
async fn test_broadcast_reaches_every_client() {
    let mut transport = bind(quiet_config()).await;
    let mut a = connect(&transport).await;
    let mut b = connect(&transport).await;
    poll_until(&mut transport, |ev| count_connected(ev) == 2).await;

    transport.broadcast("tick");

    assert_eq!(read_exactly(&mut a, 6).await, b"tick\r\n");
    assert_eq!(read_exactly(&mut b, 6).await, b"tick\r\n");
}

#[tokio::test]
async fn test_close_reports_disconnect_on_next_poll() {
    let mut transport = bind(quiet_config()).await;
    let mut client = connect(&transport).await;
    let events = poll_until(&mut transport, |ev| count_connected(ev) == 1).await;
    let id = events[0].id();

    transport.send(id, "bye");
    transport.close(id);

    assert_eq!(transport.poll(), vec![TransportEvent::Disconnected { id }]);
    // Output queued before the close was still flushed.
    let mut received = Vec::new();
    tokio::time::timeout(Duration::from_secs(3), client.read_to_end(&mut received))
        .await
        .expect("read should not time out")
        .expect("read should succeed");
    assert_eq!(received, b"bye\r\n");
}

// =====================================================================
// shutdown()
// =====================================================================

#[tokio::test]
async fn test_shutdown_closes_clients_and_releases_listener() {
    let mut transport = bind(quiet_config()).await;
    let addr = transport.local_addr();
    let mut client = connect(&transport).await;
    poll_until(&mut transport, |ev| count_connected(ev) == 1).await;

    transport.shutdown();

    assert!(!transport.is_listening());
    assert!(transport.connection_ids().is_empty());

    let mut buf = [0u8; 16];
    let n = tokio::time::timeout(Duration::from_secs(3), client.read(&mut buf))
        .await
        .expect("read should not time out")
        .unwrap_or(0);
    assert_eq!(n, 0, "client should see EOF");

    assert!(TcpStream::connect(addr).await.is_err(), "listener should be gone");
}

#[tokio::test]
async fn test_shutdown_twice_is_harmless() {
    let mut transport = bind(quiet_config()).await;

    transport.shutdown();
    transport.shutdown();

    assert!(!transport.is_listening());
}
