//! Conversation state: the ordered message list of one session.

use tether_core::{Role, UiMessage, now_millis};

/// Ordered message list with monotonic timestamps and tool-call lookup.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<UiMessage>,
    last_timestamp: i64,
}

impl Conversation {
    /// Create an empty conversation
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted messages
    pub fn from_messages(messages: Vec<UiMessage>) -> Self {
        let last_timestamp = messages.iter().map(|m| m.timestamp).max().unwrap_or(0);
        Self {
            messages,
            last_timestamp,
        }
    }

    /// Get all messages
    pub fn messages(&self) -> &[UiMessage] {
        &self.messages
    }

    pub fn into_messages(self) -> Vec<UiMessage> {
        self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Next ordering key: wall-clock millis, bumped so it never goes backwards
    pub fn next_timestamp(&mut self) -> i64 {
        let ts = now_millis().max(self.last_timestamp + 1);
        self.last_timestamp = ts;
        ts
    }

    /// Append a message
    pub fn push(&mut self, message: UiMessage) {
        self.last_timestamp = self.last_timestamp.max(message.timestamp);
        self.messages.push(message);
    }

    pub fn get(&self, id: &str) -> Option<&UiMessage> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut UiMessage> {
        self.messages.iter_mut().find(|m| m.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Remove a message by id
    pub fn remove(&mut self, id: &str) -> Option<UiMessage> {
        let pos = self.messages.iter().position(|m| m.id == id)?;
        Some(self.messages.remove(pos))
    }

    /// The message still receiving deltas, if any
    pub fn streaming(&self) -> Option<&UiMessage> {
        self.messages.iter().find(|m| m.is_streaming)
    }

    /// The `tool_call` message for a tool-use id
    pub fn tool_call_mut(&mut self, tool_use_id: &str) -> Option<&mut UiMessage> {
        self.messages
            .iter_mut()
            .find(|m| m.role == Role::ToolCall && m.tool_use_id() == Some(tool_use_id))
    }

    /// Clear the streaming flag everywhere except on `keep`.
    ///
    /// Returns how many messages were changed.
    pub fn settle_streaming(&mut self, keep: Option<&str>) -> usize {
        let mut changed = 0;
        for message in self
            .messages
            .iter_mut()
            .filter(|m| m.is_streaming && Some(m.id.as_str()) != keep)
        {
            message.is_streaming = false;
            changed += 1;
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_timestamps_are_monotonic() {
        let mut conv = Conversation::new();
        let far_future = now_millis() + 60_000;
        conv.push(UiMessage::user("u1", "hi", far_future));
        let next = conv.next_timestamp();
        assert_eq!(next, far_future + 1);
        assert!(conv.next_timestamp() > next);
    }

    #[test]
    fn test_from_messages_tracks_latest_timestamp() {
        let mut conv = Conversation::from_messages(vec![
            UiMessage::user("u1", "a", 50),
            UiMessage::assistant("a1", "b", 40),
        ]);
        assert!(conv.next_timestamp() > 50);
    }

    #[test]
    fn test_tool_call_lookup() {
        let mut conv = Conversation::new();
        conv.push(UiMessage::tool_call("t1", "Read", json!({}), 1));
        conv.push(UiMessage::tool_call("t2", "Bash", json!({}), 2));
        let call = conv.tool_call_mut("t2").unwrap();
        assert_eq!(call.tool_name.as_deref(), Some("Bash"));
        assert!(conv.tool_call_mut("t3").is_none());
    }

    #[test]
    fn test_settle_streaming_keeps_one() {
        let mut conv = Conversation::new();
        conv.push(UiMessage::assistant_streaming("a1", 1));
        conv.push(UiMessage::assistant_streaming("a2", 2));
        assert_eq!(conv.settle_streaming(Some("a2")), 1);
        assert_eq!(conv.streaming().map(|m| m.id.as_str()), Some("a2"));
        assert_eq!(conv.settle_streaming(None), 1);
        assert!(conv.streaming().is_none());
    }

    #[test]
    fn test_remove() {
        let mut conv = Conversation::new();
        conv.push(UiMessage::user("u1", "a", 1));
        assert!(conv.remove("u1").is_some());
        assert!(conv.remove("u1").is_none());
        assert!(conv.is_empty());
    }
}
