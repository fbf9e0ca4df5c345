//! History formatting.

use ragdesk_core::message::{HistoryInput, Message, Role};

/// Render a caller-supplied history as one text block.
///
/// Absent or empty history renders as the empty string. Pre-formatted
/// text is returned unchanged. Message lists render one
/// `"<role>: <content>"` line per message, in order.
pub fn format_history(history: Option<&HistoryInput>) -> String {
    match history {
        None => String::new(),
        Some(HistoryInput::Text(text)) => text.clone(),
        Some(HistoryInput::Messages(messages)) | Some(HistoryInput::Wrapped { messages }) => {
            format_messages(messages)
        }
    }
}

/// Render a message list; see [`format_history`].
pub fn format_messages(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|m| format!("{}: {}", m.role, m.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Drop a trailing user message that repeats `current`.
///
/// Clients differ on whether the message being asked is already
/// appended to the history they send; it must be counted once.
pub fn strip_current_message<'a>(messages: &'a [Message], current: &str) -> &'a [Message] {
    match messages.split_last() {
        Some((last, rest)) if last.role == Role::User && last.content.trim() == current.trim() => {
            rest
        }
        _ => messages,
    }
}
