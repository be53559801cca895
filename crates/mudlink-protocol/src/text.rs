//! Helpers for the text side of the wire: outbound line encoding, server
//! notices, and splitting a typed line into a verb and its arguments.

/// Terminator appended to every outbound message.
pub const LINE_ENDING: &str = "\r\n";

const ANSI_GREEN: &str = "\u{1b}[32m";
const ANSI_RESET: &str = "\u{1b}[0m";

/// Encodes one outbound message as bytes, newline-terminated.
pub fn encode_line(text: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(text.len() + LINE_ENDING.len());
    bytes.extend_from_slice(text.as_bytes());
    bytes.extend_from_slice(LINE_ENDING.as_bytes());
    bytes
}

/// Formats an operator announcement, e.g. `[Server] restarting soon`.
///
/// Rendered green on ANSI terminals.
pub fn server_notice(text: &str) -> String {
    format!("{ANSI_GREEN}[Server] {text}{ANSI_RESET}")
}

/// Splits a line into a lowercased verb and the rest of the line.
///
/// ```rust
/// use mudlink_protocol::split_command;
///
/// assert_eq!(split_command("  SAY hello there "), ("say".to_string(), "hello there"));
/// assert_eq!(split_command("look"), ("look".to_string(), ""));
/// ```
pub fn split_command(line: &str) -> (String, &str) {
    let line = line.trim();
    match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb.to_lowercase(), rest.trim()),
        None => (line.to_lowercase(), ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_line_appends_crlf() {
        assert_eq!(encode_line("hi"), b"hi\r\n");
    }

    #[test]
    fn test_encode_line_empty_message() {
        assert_eq!(encode_line(""), b"\r\n");
    }

    #[test]
    fn test_server_notice_wraps_in_color() {
        let notice = server_notice("hello");
        assert!(notice.starts_with("\u{1b}[32m[Server] hello"));
        assert!(notice.ends_with("\u{1b}[0m"));
    }

    #[test]
    fn test_split_command_empty_line() {
        assert_eq!(split_command("   "), (String::new(), ""));
    }

    #[test]
    fn test_split_command_tab_separator() {
        assert_eq!(split_command("Go\tnorth"), ("go".to_string(), "north"));
    }
}
