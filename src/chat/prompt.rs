//! Prompt assembly for character chat

use crate::types::{Conversation, HistoryMessage, PromptMessage};

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant.";

const MEMORY_HEADER: &str = "\n\nRelevant context from previous conversations:\n";

/// The character's system prompt, or the generic assistant prompt
pub fn system_prompt(conversation: &Conversation) -> String {
    conversation
        .character
        .system_prompt
        .as_deref()
        .filter(|p| !p.trim().is_empty())
        .unwrap_or(DEFAULT_SYSTEM_PROMPT)
        .to_string()
}

/// History in order, then the current message with any memories appended
/// as a bulleted context block.
///
/// Only the chat service's `USER` role maps to `user`; every other role is
/// sent as `assistant`.
pub fn build_messages(
    history: &[HistoryMessage],
    message: &str,
    memories: &[String],
) -> Vec<PromptMessage> {
    let mut messages: Vec<PromptMessage> = history
        .iter()
        .map(|m| {
            if m.role == "USER" {
                PromptMessage::user(m.content.as_str())
            } else {
                PromptMessage::assistant(m.content.as_str())
            }
        })
        .collect();

    let mut current = message.to_string();
    if !memories.is_empty() {
        current.push_str(MEMORY_HEADER);
        let bullets: Vec<String> = memories.iter().map(|m| format!("- {}", m)).collect();
        current.push_str(&bullets.join("\n"));
    }
    messages.push(PromptMessage::user(current));
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Character;
    use pretty_assertions::assert_eq;

    fn history(role: &str, content: &str) -> HistoryMessage {
        HistoryMessage {
            role: role.to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn test_roles_and_order() {
        let messages = build_messages(
            &[
                history("USER", "hi"),
                history("ASSISTANT", "hello"),
                history("SYSTEM", "note"),
                history("user", "lowercase is not USER"),
            ],
            "how are you?",
            &[],
        );
        assert_eq!(
            messages,
            vec![
                PromptMessage::user("hi"),
                PromptMessage::assistant("hello"),
                PromptMessage::assistant("note"),
                PromptMessage::assistant("lowercase is not USER"),
                PromptMessage::user("how are you?"),
            ]
        );
    }

    #[test]
    fn test_memory_suffix() {
        let messages = build_messages(
            &[],
            "what do I like?",
            &["likes tea".to_string(), "has a cat".to_string()],
        );
        assert_eq!(
            messages,
            vec![PromptMessage::user(
                "what do I like?\n\nRelevant context from previous conversations:\n- likes tea\n- has a cat"
            )]
        );
    }

    #[test]
    fn test_system_prompt_fallback() {
        assert_eq!(system_prompt(&Conversation::default()), DEFAULT_SYSTEM_PROMPT);

        let conversation = Conversation {
            id: Some("c1".into()),
            character: Character {
                name: Some("Ada".into()),
                system_prompt: Some("You are Ada Lovelace.".into()),
            },
        };
        assert_eq!(system_prompt(&conversation), "You are Ada Lovelace.");
    }
}
