//! Byte-to-line decoding for a Telnet-style stream.
//!
//! Clients send plain text terminated by `\n`, with Telnet control
//! sequences mixed in wherever the client feels like it (option
//! negotiation right after connect, keep-alives mid-line). The
//! [`LineFramer`] pulls the text out and throws the control bytes away.
//!
//! ```text
//!            IAC                 SB
//!   Normal ───────→ Command ───────────→ Subnegotiation
//!     ↑               │  │                     │
//!     │   1-byte cmd  │  │ WILL/WONT/DO/DONT   │ SE
//!     ├───────────────┘  └─→ (one option byte) │
//!     └────────────────────────────────────────┘
//! ```
//!
//! The framer keeps its state between calls, so a control sequence or a
//! line may be split across any number of reads.

use crate::telnet::{self, BACKSPACE, IAC, SB, SE};

/// Where the framer is inside the byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FramerState {
    /// Plain text.
    #[default]
    Normal,
    /// The previous byte was IAC. `option_pending` is set after a
    /// WILL/WONT/DO/DONT, whose option byte still has to be swallowed.
    Command { option_pending: bool },
    /// Inside `IAC SB ... SE`. Only SE gets us out.
    Subnegotiation,
}

/// Stateful decoder for one connection.
#[derive(Debug, Default)]
pub struct LineFramer {
    state: FramerState,
    buffer: Vec<u8>,
}

impl LineFramer {
    /// Creates a framer in the [`FramerState::Normal`] state with an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes a chunk of bytes and returns every line it completed.
    ///
    /// Bytes after the last `\n` stay buffered for the next call.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();

        for &byte in bytes {
            self.state = match self.state {
                FramerState::Normal => {
                    match byte {
                        IAC => {
                            FramerState::Command { option_pending: false }
                        }
                        b'\n' => {
                            lines.push(self.take_line());
                            FramerState::Normal
                        }
                        BACKSPACE => {
                            self.erase_last_char();
                            FramerState::Normal
                        }
                        _ => {
                            self.buffer.push(byte);
                            FramerState::Normal
                        }
                    }
                }
                // The option byte of a negotiation verb. Whatever it is,
                // it's not text.
                FramerState::Command { option_pending: true } => {
                    FramerState::Normal
                }
                FramerState::Command { option_pending: false } => {
                    if byte == SB {
                        FramerState::Subnegotiation
                    } else if telnet::takes_option(byte) {
                        FramerState::Command { option_pending: true }
                    } else {
                        FramerState::Normal
                    }
                }
                FramerState::Subnegotiation => {
                    if byte == SE {
                        FramerState::Normal
                    } else {
                        FramerState::Subnegotiation
                    }
                }
            };
        }

        lines
    }

    /// Current decoder state.
    pub fn state(&self) -> FramerState {
        self.state
    }

    /// Bytes of the unfinished line.
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }

    /// Drops the partial line and returns to [`FramerState::Normal`].
    pub fn reset(&mut self) {
        self.state = FramerState::Normal;
        self.buffer.clear();
    }

    fn take_line(&mut self) -> String {
        let mut bytes = std::mem::take(&mut self.buffer);
        if bytes.last() == Some(&b'\r') {
            bytes.pop();
        }
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Removes one displayed character from the end of the buffer: a whole
    /// UTF-8 sequence, or a single byte that isn't part of one.
    fn erase_last_char(&mut self) {
        let len = self.buffer.len();
        let Some(&last) = self.buffer.last() else {
            return;
        };
        if !is_continuation(last) {
            self.buffer.pop();
            return;
        }

        let continuations = self
            .buffer
            .iter()
            .rev()
            .take(3)
            .take_while(|&&b| is_continuation(b))
            .count();
        let cut = match len.checked_sub(continuations + 1) {
            Some(lead) if sequence_len(self.buffer[lead]) > continuations => lead,
            _ => len - 1,
        };
        self.buffer.truncate(cut);
    }
}

/// Continuation bytes look like `0b10xx_xxxx`.
fn is_continuation(byte: u8) -> bool {
    byte & 0xC0 == 0x80
}

/// Length of the sequence a lead byte starts; 0 if `byte` can't lead one.
fn sequence_len(byte: u8) -> usize {
    match byte {
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF7 => 4,
        _ => 0,
    }
}
