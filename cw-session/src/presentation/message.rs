//! Display records and the permanent message list.

use std::collections::HashSet;

use chrono::{DateTime, Local, Utc};
use serde::Serialize;

use cw_socket::Source;

/// Who a rendered message is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
    System,
}

impl std::fmt::Display for Sender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Bot => write!(f, "bot"),
            Self::System => write!(f, "system"),
        }
    }
}

/// A committed message. Never mutated once appended to a `MessageList`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedMessage {
    pub sender: Sender,
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<Source>,
    pub rendered_at: DateTime<Utc>,
    /// Whether the feedback affordance is shown for this message.
    pub feedback_enabled: bool,
}

impl RenderedMessage {
    pub fn new(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            sender,
            text: text.into(),
            sources: Vec::new(),
            rendered_at: Utc::now(),
            feedback_enabled: false,
        }
    }

    pub fn with_sources(mut self, sources: Vec<Source>) -> Self {
        self.sources = sources;
        self
    }

    pub fn with_feedback(mut self, enabled: bool) -> Self {
        self.feedback_enabled = enabled;
        self
    }

    /// Local wall-clock time of display, e.g. "14:05".
    pub fn display_time(&self) -> String {
        self.rendered_at.with_timezone(&Local).format("%H:%M").to_string()
    }
}

/// Append-only list of committed messages plus the set of rated replies.
#[derive(Debug, Clone, Default)]
pub struct MessageList {
    messages: Vec<RenderedMessage>,
    rated: HashSet<usize>,
}

impl MessageList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message and return its index.
    pub fn push(&mut self, message: RenderedMessage) -> usize {
        self.messages.push(message);
        self.messages.len() - 1
    }

    pub fn get(&self, index: usize) -> Option<&RenderedMessage> {
        self.messages.get(index)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RenderedMessage> {
        self.messages.iter()
    }

    pub fn as_slice(&self) -> &[RenderedMessage] {
        &self.messages
    }

    /// Record a rating for the message at `index`.
    ///
    /// Returns false when the message does not exist, does not accept
    /// feedback, or was already rated.
    pub fn record_feedback(&mut self, index: usize) -> bool {
        match self.messages.get(index) {
            Some(message) if message.sender == Sender::Bot && message.feedback_enabled => {
                self.rated.insert(index)
            }
            _ => false,
        }
    }

    pub fn is_rated(&self, index: usize) -> bool {
        self.rated.contains(&index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_returns_index() {
        let mut list = MessageList::new();
        assert!(list.is_empty());
        assert_eq!(list.push(RenderedMessage::new(Sender::User, "hi")), 0);
        assert_eq!(list.push(RenderedMessage::new(Sender::Bot, "hello")), 1);
        assert_eq!(list.len(), 2);
        assert_eq!(list.get(1).map(|m| m.text.as_str()), Some("hello"));
    }

    #[test]
    fn test_feedback_once_per_bot_reply() {
        let mut list = MessageList::new();
        let user = list.push(RenderedMessage::new(Sender::User, "q"));
        let plain = list.push(RenderedMessage::new(Sender::Bot, "welcome"));
        let reply = list.push(RenderedMessage::new(Sender::Bot, "a").with_feedback(true));

        assert!(!list.record_feedback(user));
        assert!(!list.record_feedback(plain));
        assert!(list.record_feedback(reply));
        assert!(!list.record_feedback(reply));
        assert!(list.is_rated(reply));
        assert!(!list.record_feedback(99));
    }

    #[test]
    fn test_serialized_shape() {
        let message = RenderedMessage::new(Sender::Bot, "Merhaba");
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["sender"], "bot");
        assert_eq!(json["text"], "Merhaba");
        assert!(json.get("sources").is_none());
        assert!(json.get("renderedAt").is_some());
        assert_eq!(json["feedbackEnabled"], false);
    }

    #[test]
    fn test_display_time_format() {
        let message = RenderedMessage::new(Sender::System, "x");
        let time = message.display_time();
        assert_eq!(time.len(), 5);
        assert_eq!(&time[2..3], ":");
    }
}
