//! Ordered, id-deduplicated message log.

use serde::{Deserialize, Serialize};
use souk_realtime::{ChatFrame, Sender};

/// One rendered chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub body: String,
    pub sender: Sender,
    pub timestamp: Option<String>,
}

impl From<ChatFrame> for ChatMessage {
    fn from(frame: ChatFrame) -> Self {
        Self {
            id: frame.message_id,
            body: frame.message,
            sender: frame.sender,
            timestamp: frame.timestamp,
        }
    }
}

/// Append-ordered log where each message id appears at most once.
///
/// History and live frames feed the same log; when an id arrives twice
/// (optimistic local echo plus the server copy, or history overlapping the
/// live stream) the later version replaces the earlier one and moves to
/// the tail.
#[derive(Debug, Default)]
pub struct MessageLog {
    messages: Vec<ChatMessage>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace by id; last seen wins.
    pub fn upsert(&mut self, message: ChatMessage) {
        self.messages.retain(|m| m.id != message.id);
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(id: &str, body: &str) -> ChatMessage {
        ChatMessage {
            id: id.to_string(),
            body: body.to_string(),
            sender: Sender::Counterpart,
            timestamp: None,
        }
    }

    #[test]
    fn test_insert_preserves_order() {
        let mut log = MessageLog::new();
        log.upsert(msg("a", "1"));
        log.upsert(msg("b", "2"));
        log.upsert(msg("c", "3"));

        let ids: Vec<&str> = log.messages().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }

    #[test]
    fn test_duplicate_id_renders_once_last_wins() {
        let mut log = MessageLog::new();
        // History copy first, then the live copy of the same message.
        log.upsert(msg("m1", "from history"));
        log.upsert(msg("m2", "other"));
        log.upsert(ChatMessage {
            timestamp: Some("2026-01-05T10:00:00Z".to_string()),
            ..msg("m1", "from live stream")
        });

        assert_eq!(log.len(), 2);
        let last = log.messages().last().unwrap();
        assert_eq!(last.id, "m1");
        assert_eq!(last.body, "from live stream");
        assert!(last.timestamp.is_some());
    }

    #[test]
    fn test_clear() {
        let mut log = MessageLog::new();
        log.upsert(msg("a", "1"));
        assert!(!log.is_empty());

        log.clear();
        assert!(log.is_empty());
    }
}
