//! Message and conversation-history domain types.
//!
//! The caller owns the conversation: every chat turn sends the whole
//! history, and nothing here is persisted between turns.

use serde::{Deserialize, Serialize};

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The AI assistant
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single message in a conversation. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Who sent this message
    pub role: Role,

    /// The text content
    pub content: String,
}

impl Message {
    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Conversation history as callers may supply it.
///
/// Clients send either a plain message list, a wrapper object
/// `{ "messages": [...] }`, or a transcript they already formatted
/// themselves. Absence is modelled as `Option<HistoryInput>` at the
/// call site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HistoryInput {
    /// Already-formatted transcript, passed through untouched.
    Text(String),
    /// Ordered list of messages.
    Messages(Vec<Message>),
    /// A list wrapped in an object.
    Wrapped { messages: Vec<Message> },
}

impl HistoryInput {
    /// Borrow the message list, if this history is structured.
    pub fn messages(&self) -> Option<&[Message]> {
        match self {
            HistoryInput::Text(_) => None,
            HistoryInput::Messages(messages) | HistoryInput::Wrapped { messages } => {
                Some(messages)
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            HistoryInput::Text(text) => text.is_empty(),
            HistoryInput::Messages(messages) | HistoryInput::Wrapped { messages } => {
                messages.is_empty()
            }
        }
    }
}

impl From<Vec<Message>> for HistoryInput {
    fn from(messages: Vec<Message>) -> Self {
        HistoryInput::Messages(messages)
    }
}

impl From<String> for HistoryInput {
    fn from(text: String) -> Self {
        HistoryInput::Text(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_user_message() {
        let msg = Message::user("Hello, there!");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "Hello, there!");
    }

    #[test]
    fn role_serializes_lowercase() {
        let json = serde_json::to_string(&Message::assistant("hi")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"hi"}"#);
    }

    #[test]
    fn history_accepts_plain_list() {
        let json = r#"[{"role":"user","content":"a"},{"role":"assistant","content":"b"}]"#;
        let history: HistoryInput = serde_json::from_str(json).unwrap();
        assert_eq!(history.messages().unwrap().len(), 2);
    }

    #[test]
    fn history_accepts_wrapped_list() {
        let json = r#"{"messages":[{"role":"user","content":"a"}]}"#;
        let history: HistoryInput = serde_json::from_str(json).unwrap();
        assert!(matches!(history, HistoryInput::Wrapped { .. }));
        assert_eq!(history.messages().unwrap()[0].content, "a");
    }

    #[test]
    fn history_accepts_preformatted_text() {
        let history: HistoryInput = serde_json::from_str(r#""user: hi""#).unwrap();
        assert_eq!(history, HistoryInput::Text("user: hi".into()));
        assert!(history.messages().is_none());
    }

    #[test]
    fn history_rejects_unknown_role() {
        let json = r#"[{"role":"system","content":"x"}]"#;
        assert!(serde_json::from_str::<HistoryInput>(json).is_err());
    }

    #[test]
    fn empty_history_detection() {
        assert!(HistoryInput::Messages(vec![]).is_empty());
        assert!(HistoryInput::Text(String::new()).is_empty());
        assert!(!HistoryInput::Wrapped { messages: vec![Message::user("x")] }.is_empty());
    }
}
