//! Telnet byte values the framer needs to recognize.
//!
//! We never answer negotiation requests. These constants exist so the
//! framer can detect and skip them, and so the transport can build its
//! liveness probe.

/// Interpret As Command, the escape byte that starts every control sequence.
pub const IAC: u8 = 255;

/// Subnegotiation End. Closes a region opened by [`SB`].
pub const SE: u8 = 240;

/// No Operation.
pub const NOP: u8 = 241;

/// Are You There.
pub const AYT: u8 = 246;

/// Subnegotiation Begin. Everything up to [`SE`] is opaque option data.
pub const SB: u8 = 250;

/// Option negotiation: sender wants to enable an option.
pub const WILL: u8 = 251;

/// Option negotiation: sender refuses an option.
pub const WONT: u8 = 252;

/// Option negotiation: sender asks the peer to enable an option.
pub const DO: u8 = 253;

/// Option negotiation: sender asks the peer to disable an option.
pub const DONT: u8 = 254;

/// ASCII backspace, sent by clients in character mode.
pub const BACKSPACE: u8 = 0x08;

/// The byte sent as a liveness probe. Terminals render NUL as nothing.
pub const PROBE: u8 = 0x00;

/// Returns `true` for the negotiation commands that carry one option byte.
pub fn takes_option(byte: u8) -> bool {
    matches!(byte, WILL | WONT | DO | DONT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_takes_option_negotiation_verbs() {
        for b in [WILL, WONT, DO, DONT] {
            assert!(takes_option(b));
        }
    }

    #[test]
    fn test_takes_option_single_byte_commands() {
        for b in [NOP, AYT, SE, IAC, SB] {
            assert!(!takes_option(b), "byte {b} should not take an option");
        }
    }
}
