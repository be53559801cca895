//! Merging the output of several sub-receivers into one stream.

use std::collections::VecDeque;

use crate::ReceiverId;

/// Decides which sub-receiver messages a composite passes upstream.
///
/// With filtering on, the router remembers the last `2 × sources` messages
/// it saw. A message whose text was recently seen from a *different* source
/// is suppressed, so several characters in the same room don't repeat every
/// room event. When the source of forwarded output changes, a `[label]`
/// line goes out first so the player can tell the streams apart.
///
/// With filtering off everything is forwarded unlabelled.
#[derive(Debug, Clone)]
pub struct MessageRouter {
    filter: bool,
    capacity: usize,
    history: VecDeque<(ReceiverId, String)>,
    last_source: Option<ReceiverId>,
}

impl MessageRouter {
    /// Creates a router for `sources` sub-receivers.
    pub fn new(filter: bool, sources: usize) -> Self {
        Self {
            filter,
            capacity: sources * 2,
            history: VecDeque::new(),
            last_source: None,
        }
    }

    /// Whether duplicate suppression and labels are on.
    pub fn is_filtering(&self) -> bool {
        self.filter
    }

    /// How many messages the history holds.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Resizes the history after sub-receivers were added or pruned.
    pub fn set_sources(&mut self, sources: usize) {
        self.capacity = sources * 2;
        self.trim();
    }

    /// Routes one message from `source`.
    ///
    /// Returns the lines to send upstream, in order: nothing when the
    /// message is suppressed, otherwise the message, possibly preceded
    /// by a `[label]` line.
    pub fn route(&mut self, source: ReceiverId, label: &str, message: &str) -> Vec<String> {
        if !self.filter {
            return vec![message.to_string()];
        }

        let seen_elsewhere = self
            .history
            .iter()
            .any(|(from, text)| *from != source && text == message);
        if seen_elsewhere {
            tracing::trace!(%source, message, "suppressed duplicate");
            return Vec::new();
        }

        self.history.push_back((source, message.to_string()));
        self.trim();

        let mut lines = Vec::with_capacity(2);
        if self.last_source != Some(source) {
            lines.push(format!("[{label}]"));
            self.last_source = Some(source);
        }
        lines.push(message.to_string());
        lines
    }

    fn trim(&mut self) {
        while self.history.len() > self.capacity {
            self.history.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> (ReceiverId, ReceiverId) {
        (ReceiverId::new(1), ReceiverId::new(2))
    }

    #[test]
    fn test_route_unfiltered_forwards_everything_without_labels() {
        let (a, b) = ids();
        let mut router = MessageRouter::new(false, 2);

        assert_eq!(router.route(a, "A", "hi"), vec!["hi"]);
        assert_eq!(router.route(b, "B", "hi"), vec!["hi"]);
    }

    #[test]
    fn test_route_labels_first_message_of_each_source() {
        let (a, b) = ids();
        let mut router = MessageRouter::new(true, 2);

        assert_eq!(router.route(a, "Ada", "one"), vec!["[Ada]", "one"]);
        assert_eq!(router.route(a, "Ada", "two"), vec!["two"]);
        assert_eq!(router.route(b, "Bo", "three"), vec!["[Bo]", "three"]);
        assert_eq!(router.route(a, "Ada", "four"), vec!["[Ada]", "four"]);
    }

    #[test]
    fn test_route_suppresses_same_text_from_other_source() {
        let (a, b) = ids();
        let mut router = MessageRouter::new(true, 2);

        let first = router.route(a, "A", "The door creaks open.");
        let second = router.route(b, "B", "The door creaks open.");

        assert_eq!(first, vec!["[A]", "The door creaks open."]);
        assert!(second.is_empty());
    }

    #[test]
    fn test_route_repeats_from_same_source_are_forwarded() {
        let (a, _) = ids();
        let mut router = MessageRouter::new(true, 1);

        router.route(a, "A", "drip");
        assert_eq!(router.route(a, "A", "drip"), vec!["drip"]);
    }

    #[test]
    fn test_route_forgets_messages_beyond_capacity() {
        let (a, b) = ids();
        let mut router = MessageRouter::new(true, 1);

        router.route(a, "A", "old");
        router.route(a, "A", "x");
        router.route(a, "A", "y");

        // "old" has been pushed out of the two-entry history.
        assert_eq!(router.route(b, "B", "old"), vec!["[B]", "old"]);
    }

    #[test]
    fn test_set_sources_shrinks_history() {
        let (a, b) = ids();
        let mut router = MessageRouter::new(true, 2);
        router.route(a, "A", "1");
        router.route(a, "A", "2");
        router.route(a, "A", "3");

        router.set_sources(1);

        assert_eq!(router.capacity(), 2);
        assert!(router.route(b, "B", "1").len() == 2);
        assert!(router.route(b, "B", "3").is_empty());
    }
}
