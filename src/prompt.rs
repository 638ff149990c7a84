//! Prompt construction
//!
//! Renders a bounded window of the conversation into the single text prompt
//! the model runtime completes. Truncation is by turn count, not token
//! count: very long turns can still overflow the runtime's context window.
//! That is a documented limitation of the format, not something this module
//! guards against.

use crate::session::{Conversation, Sender};

/// Default window size, in exchanges (one exchange = user turn + assistant turn)
pub const DEFAULT_WINDOW_SIZE: usize = 10;

/// Stop sequences passed to the runtime alongside every generated prompt
pub const STOP_SEQUENCES: [&str; 3] = ["<|user|>", "</s>", "<|system|>"];

/// Build the model prompt from a conversation
///
/// Renders the system prompt block, then the last `2 * window_size` turns
/// of history (all of it when the history is shorter), each tagged with a
/// role marker, and finally an open `<|assistant|>` marker with no trailing
/// text so the runtime completes it.
///
/// # Arguments
///
/// * `conversation` - The conversation to render
/// * `window_size` - Number of exchanges to keep; the turn cap is twice this
///
/// # Examples
///
/// ```
/// use tangerine::prompt::build_prompt;
/// use tangerine::session::{Conversation, Sender};
///
/// let mut conversation = Conversation::new();
/// conversation.append_turn(Sender::User, "Hi");
/// let prompt = build_prompt(&conversation, 10);
/// assert!(prompt.starts_with("<|system|>\n"));
/// assert!(prompt.ends_with("<|assistant|>\n"));
/// ```
pub fn build_prompt(conversation: &Conversation, window_size: usize) -> String {
    let mut prompt = format!("<|system|>\n{}\n", conversation.system_prompt());

    let turns = conversation.turns();
    let window = turns.len().saturating_sub(window_size * 2);
    for turn in &turns[window..] {
        let role = match turn.sender {
            Sender::User => "user",
            Sender::Assistant => "assistant",
        };
        prompt.push_str(&format!("<|{}|>\n{}\n", role, turn.text));
    }

    prompt.push_str("<|assistant|>\n");
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conversation_with_turns(count: usize) -> Conversation {
        let mut conversation = Conversation::new();
        for i in 0..count {
            if i % 2 == 0 {
                conversation.append_turn(Sender::User, format!("question {}", i));
            } else {
                conversation.append_turn(Sender::Assistant, format!("answer {}", i));
            }
        }
        conversation
    }

    fn count_turn_markers(prompt: &str) -> usize {
        prompt.matches("<|user|>").count() + prompt.matches("<|assistant|>").count() - 1
    }

    #[test]
    fn test_empty_history_is_system_block_and_open_marker() {
        let conversation = Conversation::new();
        let prompt = build_prompt(&conversation, 10);
        assert_eq!(
            prompt,
            "<|system|>\nYou are a helpful assistant.\n<|assistant|>\n"
        );
    }

    #[test]
    fn test_prompt_includes_system_prompt_text() {
        let mut conversation = Conversation::new();
        conversation.set_system_prompt("Answer in French.");
        let prompt = build_prompt(&conversation, 10);
        assert!(prompt.starts_with("<|system|>\nAnswer in French.\n"));
    }

    #[test]
    fn test_short_history_is_rendered_in_full() {
        let conversation = conversation_with_turns(4);
        let prompt = build_prompt(&conversation, 10);
        assert_eq!(count_turn_markers(&prompt), 4);
        assert!(prompt.contains("question 0"));
        assert!(prompt.contains("answer 3"));
    }

    #[test]
    fn test_long_history_keeps_last_window() {
        let conversation = conversation_with_turns(25);
        let prompt = build_prompt(&conversation, 10);

        // Exactly the last 20 turns: turns 5..=24.
        assert_eq!(count_turn_markers(&prompt), 20);
        assert!(!prompt.contains("question 4\n"));
        assert!(prompt.contains("answer 5"));
        assert!(prompt.contains("question 24"));
    }

    #[test]
    fn test_marker_cap_holds_for_any_history_length() {
        for len in [0, 1, 19, 20, 21, 50, 200] {
            let conversation = conversation_with_turns(len);
            let prompt = build_prompt(&conversation, 10);
            assert!(
                count_turn_markers(&prompt) <= 20,
                "history of {} turns leaked past the window",
                len
            );
        }
    }

    #[test]
    fn test_roles_map_to_markers() {
        let mut conversation = Conversation::new();
        conversation.append_turn(Sender::User, "ping");
        conversation.append_turn(Sender::Assistant, "pong");
        let prompt = build_prompt(&conversation, 10);
        assert!(prompt.contains("<|user|>\nping\n"));
        assert!(prompt.contains("<|assistant|>\npong\n"));
    }

    #[test]
    fn test_prompt_ends_with_open_assistant_marker() {
        let conversation = conversation_with_turns(3);
        let prompt = build_prompt(&conversation, 10);
        assert!(prompt.ends_with("<|assistant|>\n"));
    }

    #[test]
    fn test_zero_window_drops_all_history() {
        let conversation = conversation_with_turns(6);
        let prompt = build_prompt(&conversation, 0);
        assert_eq!(count_turn_markers(&prompt), 0);
    }
}
