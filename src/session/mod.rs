//! Conversation and session types
//!
//! This module defines the core conversation model: a tagged [`Sender`],
//! immutable [`Turn`] records, and the in-memory [`Conversation`] that holds
//! the active session's turns and system prompt. Persistence lives in the
//! [`store`] submodule.

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod store;

pub use store::{SessionStore, SessionSummary};

/// Default system prompt for new conversations
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// Maximum length (in characters) of a derived session title
const TITLE_MAX_CHARS: usize = 35;

/// Sender of a conversation turn
///
/// Serialized as `"You"` / `"AI"` so session files written by earlier
/// versions of the application load unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sender {
    /// The human participant
    #[serde(rename = "You")]
    User,
    /// The model
    #[serde(rename = "AI")]
    Assistant,
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "You"),
            Self::Assistant => write!(f, "AI"),
        }
    }
}

/// One message in a conversation, attributed to a sender
///
/// Turns are immutable once appended; conversation order is insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Who produced this turn
    pub sender: Sender,
    /// The turn's text
    #[serde(rename = "message")]
    pub text: String,
}

impl Turn {
    /// Creates a new user turn
    ///
    /// # Examples
    ///
    /// ```
    /// use tangerine::session::{Sender, Turn};
    ///
    /// let turn = Turn::user("Hello!");
    /// assert_eq!(turn.sender, Sender::User);
    /// ```
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            text: text.into(),
        }
    }

    /// Creates a new assistant turn
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::Assistant,
            text: text.into(),
        }
    }
}

/// In-memory state of the active session
///
/// Holds the ordered turn list and the system prompt. The conversation knows
/// nothing about files; the [`store::SessionStore`] turns it into a durable
/// session document and back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    system_prompt: String,
    turns: Vec<Turn>,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

impl Conversation {
    /// Creates an empty conversation with the default system prompt
    ///
    /// # Examples
    ///
    /// ```
    /// use tangerine::session::Conversation;
    ///
    /// let conversation = Conversation::new();
    /// assert!(conversation.is_empty());
    /// ```
    pub fn new() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            turns: Vec::new(),
        }
    }

    /// Creates a conversation from existing parts
    ///
    /// Used by the store when loading a session document.
    pub fn from_parts(system_prompt: impl Into<String>, turns: Vec<Turn>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            turns,
        }
    }

    /// Appends a turn to the conversation
    ///
    /// Text that is empty after trimming is silently dropped rather than
    /// appended; this is how a cancelled generation that produced zero
    /// tokens avoids leaving an empty assistant turn behind. The original
    /// (untrimmed) text is stored when the turn is kept.
    ///
    /// # Returns
    ///
    /// `true` when the turn was appended, `false` when it was dropped.
    ///
    /// # Examples
    ///
    /// ```
    /// use tangerine::session::{Conversation, Sender};
    ///
    /// let mut conversation = Conversation::new();
    /// assert!(conversation.append_turn(Sender::User, "Hello"));
    /// assert!(!conversation.append_turn(Sender::Assistant, "   "));
    /// assert_eq!(conversation.len(), 1);
    /// ```
    pub fn append_turn(&mut self, sender: Sender, text: impl Into<String>) -> bool {
        let text = text.into();
        if text.trim().is_empty() {
            return false;
        }
        self.turns.push(Turn { sender, text });
        true
    }

    /// Returns the system prompt
    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Replaces the system prompt
    pub fn set_system_prompt(&mut self, prompt: impl Into<String>) {
        self.system_prompt = prompt.into();
    }

    /// Returns the ordered turns
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Number of turns in the conversation
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// True when the conversation has no turns
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Resets to an empty, title-less, unsaved conversation
    ///
    /// The system prompt reverts to the default.
    pub fn clear(&mut self) {
        self.turns.clear();
        self.system_prompt = DEFAULT_SYSTEM_PROMPT.to_string();
    }

    /// Derives a human-readable title from the conversation
    ///
    /// The title is the first user turn's text, trimmed and truncated to 35
    /// characters; conversations without a usable user turn are titled
    /// "New Chat".
    ///
    /// # Examples
    ///
    /// ```
    /// use tangerine::session::{Conversation, Sender};
    ///
    /// let mut conversation = Conversation::new();
    /// conversation.append_turn(Sender::User, "What is the capital of France?");
    /// assert_eq!(conversation.title(), "What is the capital of France?");
    /// ```
    pub fn title(&self) -> String {
        for turn in &self.turns {
            if turn.sender == Sender::User {
                let clean: String = turn.text.trim().chars().take(TITLE_MAX_CHARS).collect();
                return if clean.is_empty() {
                    "New Chat".to_string()
                } else {
                    clean
                };
            }
        }
        "New Chat".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sender_serializes_to_legacy_strings() {
        assert_eq!(serde_json::to_string(&Sender::User).unwrap(), "\"You\"");
        assert_eq!(serde_json::to_string(&Sender::Assistant).unwrap(), "\"AI\"");
    }

    #[test]
    fn test_sender_deserializes_from_legacy_strings() {
        let sender: Sender = serde_json::from_str("\"You\"").unwrap();
        assert_eq!(sender, Sender::User);
        let sender: Sender = serde_json::from_str("\"AI\"").unwrap();
        assert_eq!(sender, Sender::Assistant);
    }

    #[test]
    fn test_turn_serializes_message_field() {
        let turn = Turn::user("hi");
        let json = serde_json::to_string(&turn).unwrap();
        assert_eq!(json, r#"{"sender":"You","message":"hi"}"#);
    }

    #[test]
    fn test_append_turn_keeps_order() {
        let mut conversation = Conversation::new();
        conversation.append_turn(Sender::User, "one");
        conversation.append_turn(Sender::Assistant, "two");
        conversation.append_turn(Sender::User, "three");

        let texts: Vec<&str> = conversation.turns().iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["one", "two", "three"]);
    }

    #[test]
    fn test_append_turn_drops_empty_assistant_text() {
        let mut conversation = Conversation::new();
        assert!(!conversation.append_turn(Sender::Assistant, ""));
        assert!(!conversation.append_turn(Sender::Assistant, " \n\t "));
        assert!(conversation.is_empty());
    }

    #[test]
    fn test_append_turn_preserves_untrimmed_text() {
        let mut conversation = Conversation::new();
        assert!(conversation.append_turn(Sender::Assistant, " spaced out "));
        assert_eq!(conversation.turns()[0].text, " spaced out ");
    }

    #[test]
    fn test_clear_resets_system_prompt() {
        let mut conversation = Conversation::new();
        conversation.set_system_prompt("Talk like a pirate.");
        conversation.append_turn(Sender::User, "ahoy");

        conversation.clear();
        assert!(conversation.is_empty());
        assert_eq!(conversation.system_prompt(), DEFAULT_SYSTEM_PROMPT);
    }

    #[test]
    fn test_title_from_first_user_turn() {
        let mut conversation = Conversation::new();
        conversation.append_turn(Sender::Assistant, "Ready.");
        conversation.append_turn(Sender::User, "  Tell me about rust  ");
        assert_eq!(conversation.title(), "Tell me about rust");
    }

    #[test]
    fn test_title_truncates_to_35_chars() {
        let mut conversation = Conversation::new();
        let long = "x".repeat(80);
        conversation.append_turn(Sender::User, long);
        assert_eq!(conversation.title().chars().count(), 35);
    }

    #[test]
    fn test_title_defaults_to_new_chat() {
        let conversation = Conversation::new();
        assert_eq!(conversation.title(), "New Chat");

        let mut assistant_only = Conversation::new();
        assistant_only.append_turn(Sender::Assistant, "hello");
        assert_eq!(assistant_only.title(), "New Chat");
    }

    #[test]
    fn test_title_handles_multibyte_text() {
        let mut conversation = Conversation::new();
        conversation.append_turn(Sender::User, "héllo wörld ".repeat(10));
        // Truncation must respect char boundaries, not byte offsets.
        assert_eq!(conversation.title().chars().count(), 35);
    }
}
