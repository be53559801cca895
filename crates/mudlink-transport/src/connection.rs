//! One client socket plus its framing and buffering state.

use std::collections::VecDeque;
use std::io::ErrorKind;
use std::net::{Shutdown, SocketAddr};
use std::time::{Duration, Instant};

use mudlink_protocol::LineFramer;
use tokio::net::TcpStream;

use crate::{ConnectionId, TransportError};

/// A single accepted client.
///
/// Owned exclusively by the transport. All socket access goes through
/// tokio's `try_read`/`try_write`, so nothing here ever waits.
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    stream: TcpStream,
    addr: SocketAddr,
    framer: LineFramer,
    /// Complete lines decoded but not yet turned into events.
    backlog: VecDeque<String>,
    /// Encoded bytes waiting for the socket to accept them.
    outbound: Vec<u8>,
    last_check: Instant,
    named: bool,
}

impl Connection {
    pub(crate) fn new(id: ConnectionId, stream: TcpStream, addr: SocketAddr) -> Self {
        Self {
            id,
            stream,
            addr,
            framer: LineFramer::new(),
            backlog: VecDeque::new(),
            outbound: Vec::new(),
            last_check: Instant::now(),
            named: false,
        }
    }

    /// The connection's id.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// The peer's address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Whether the client has already submitted its name.
    pub fn is_named(&self) -> bool {
        self.named
    }

    /// Number of bytes still waiting to be written.
    pub fn pending_output(&self) -> usize {
        self.outbound.len()
    }

    /// Marks the connection as named. Returns `true` the first time.
    pub(crate) fn mark_named(&mut self) -> bool {
        !std::mem::replace(&mut self.named, true)
    }

    pub(crate) fn queue(&mut self, bytes: &[u8]) {
        self.outbound.extend_from_slice(bytes);
    }

    pub(crate) fn probe_due(&self, now: Instant, interval: Duration) -> bool {
        now.saturating_duration_since(self.last_check) >= interval
    }

    pub(crate) fn mark_checked(&mut self, now: Instant) {
        self.last_check = now;
    }

    /// Writes as much queued output as the socket takes without blocking.
    pub(crate) fn flush(&mut self) -> Result<(), TransportError> {
        while !self.outbound.is_empty() {
            match self.stream.try_write(&self.outbound) {
                Ok(0) => {
                    return Err(self.io_error(ErrorKind::WriteZero.into()));
                }
                Ok(n) => {
                    self.outbound.drain(..n);
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(self.io_error(e)),
            }
        }
        Ok(())
    }

    /// Reads everything currently available and frames it into lines.
    ///
    /// Returns `Ok(false)` when the peer has closed its end.
    pub(crate) fn read_available(&mut self, chunk_size: usize) -> Result<bool, TransportError> {
        let mut buf = vec![0u8; chunk_size.max(1)];
        loop {
            match self.stream.try_read(&mut buf) {
                Ok(0) => return Ok(false),
                Ok(n) => {
                    let lines = self.framer.feed(&buf[..n]);
                    self.backlog.extend(lines);
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(true),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(self.io_error(e)),
            }
        }
    }

    /// Drains decoded lines in arrival order.
    pub(crate) fn take_lines(&mut self) -> Vec<String> {
        self.backlog.drain(..).collect()
    }

    /// Flushes what it can, then shuts the socket down. Best-effort.
    pub(crate) fn close(mut self) {
        if let Err(e) = self.flush() {
            tracing::debug!(id = %self.id, error = %e, "flush on close failed");
        }
        match self.stream.into_std() {
            Ok(stream) => {
                if let Err(e) = stream.shutdown(Shutdown::Both) {
                    tracing::debug!(id = %self.id, error = %e, "socket shutdown failed");
                }
            }
            Err(e) => {
                tracing::debug!(id = %self.id, error = %e, "could not detach socket");
            }
        }
    }

    fn io_error(&self, source: std::io::Error) -> TransportError {
        TransportError::Io {
            id: self.id,
            source,
        }
    }
}
