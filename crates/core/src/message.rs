//! Message and conversation history types.
//!
//! History arrives from the web front end as a JSON array of
//! `{ "role": ..., "content": ... }` objects. Parsing is lenient per entry
//! (unknown roles are kept as [`Role::Unknown`] so the assembler can drop
//! them) but strict about the document itself.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::InputError;

/// Number of prior turns kept when building a prompt.
pub const HISTORY_WINDOW: usize = 5;

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions (persona, reply rules)
    System,
    /// The person tending their garden
    User,
    /// The AI companion
    Assistant,
    /// Anything else a caller sent us
    #[default]
    #[serde(other)]
    Unknown,
}

impl Role {
    /// Whether turns with this role are forwarded from caller history.
    pub fn is_conversational(self) -> bool {
        matches!(self, Role::User | Role::Assistant)
    }
}

/// A single message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Who sent this message
    #[serde(default)]
    pub role: Role,

    /// The text content
    #[serde(default)]
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }
}

/// The bounded window of prior turns used for one request.
///
/// Holds at most [`HISTORY_WINDOW`] entries; older turns are evicted
/// oldest-first. Roles are not filtered here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationContext {
    messages: Vec<Message>,
}

impl ConversationContext {
    /// Keep the most recent [`HISTORY_WINDOW`] entries of `history`.
    pub fn from_history(history: Vec<Message>) -> Self {
        Self::with_window(history, HISTORY_WINDOW)
    }

    /// Keep the most recent `window` entries of `history`.
    pub fn with_window(mut history: Vec<Message>, window: usize) -> Self {
        if history.len() > window {
            let evicted = history.len() - window;
            debug!(evicted, window, "Dropping oldest history entries");
            history.drain(..evicted);
        }
        Self { messages: history }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Entries that are forwarded to an oracle, in original order.
    pub fn conversational(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(|m| m.role.is_conversational())
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Parse a caller-supplied history document.
///
/// `""` and `"null"` mean "no history". Anything else must be a JSON
/// array; entries that are not objects are skipped.
pub fn parse_history(raw: &str) -> Result<Vec<Message>, InputError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }

    let value: serde_json::Value =
        serde_json::from_str(trimmed).map_err(|e| InputError::InvalidHistory(e.to_string()))?;

    let entries = value
        .as_array()
        .ok_or_else(|| InputError::InvalidHistory("expected a JSON array".into()))?;

    Ok(entries
        .iter()
        .filter_map(|entry| {
            if !entry.is_object() {
                debug!(%entry, "Skipping non-object history entry");
                return None;
            }
            // Field-level problems degrade to defaults rather than failing the batch.
            Some(serde_json::from_value::<Message>(entry.clone()).unwrap_or_else(|_| Message {
                role: Role::Unknown,
                content: entry["content"].as_str().unwrap_or_default().to_string(),
            }))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turns(n: usize) -> Vec<Message> {
        (0..n)
            .map(|i| {
                if i % 2 == 0 {
                    Message::user(format!("u{i}"))
                } else {
                    Message::assistant(format!("a{i}"))
                }
            })
            .collect()
    }

    #[test]
    fn unknown_roles_deserialize() {
        let msg: Message = serde_json::from_str(r#"{"role":"tool","content":"x"}"#).unwrap();
        assert_eq!(msg.role, Role::Unknown);
        assert!(!msg.role.is_conversational());
    }

    #[test]
    fn missing_role_defaults_to_unknown() {
        let msg: Message = serde_json::from_str(r#"{"content":"orphan"}"#).unwrap();
        assert_eq!(msg.role, Role::Unknown);
    }

    #[test]
    fn window_keeps_most_recent_in_order() {
        let ctx = ConversationContext::from_history(turns(8));
        let contents: Vec<_> = ctx.messages().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["a3", "u4", "a5", "u6", "a7"]);
    }

    #[test]
    fn short_history_is_untouched() {
        let ctx = ConversationContext::from_history(turns(3));
        assert_eq!(ctx.len(), 3);
    }

    #[test]
    fn conversational_skips_system_without_reordering() {
        let ctx = ConversationContext::from_history(vec![
            Message::user("one"),
            Message::system("rules"),
            Message::assistant("two"),
            Message::new(Role::Unknown, "noise"),
            Message::user("three"),
        ]);
        let kept: Vec<_> = ctx.conversational().map(|m| m.content.as_str()).collect();
        assert_eq!(kept, vec!["one", "two", "three"]);
    }

    #[test]
    fn parse_history_accepts_null_and_empty() {
        assert!(parse_history("null").unwrap().is_empty());
        assert!(parse_history("  ").unwrap().is_empty());
        assert!(parse_history("[]").unwrap().is_empty());
    }

    #[test]
    fn parse_history_rejects_malformed_json() {
        assert!(matches!(
            parse_history("[{\"role\":"),
            Err(InputError::InvalidHistory(_))
        ));
        assert!(parse_history(r#"{"role":"user"}"#).is_err());
    }

    #[test]
    fn parse_history_is_lenient_per_entry() {
        let parsed =
            parse_history(r#"[{"role":"user","content":"hi"}, 42, {"role":7,"content":"odd"}]"#)
                .unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0], Message::user("hi"));
        assert_eq!(parsed[1].role, Role::Unknown);
        assert_eq!(parsed[1].content, "odd");
    }
}
