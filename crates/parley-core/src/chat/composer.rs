//! Composer line parsing for interactive front ends.

use parley_types::conversation::{Conversation, Message, Sender};

const IMAGINE_PREFIX: &str = "/imagine ";

/// Largest image a user may attach, in bytes.
pub const MAX_ATTACHMENT_BYTES: usize = 2 * 1024 * 1024;

/// What a submitted composer line asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposerInput {
    /// Plain text to send.
    Message(String),
    /// `/imagine <prompt>`: generate an image.
    Imagine(String),
    /// `/summarize`: append a summary of the conversation.
    Summarize,
    /// Nothing to do (blank line, or `/imagine` with a blank prompt).
    Empty,
}

impl ComposerInput {
    /// Classify a composer line. The `/imagine ` prefix is case-insensitive.
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        if text.is_empty() {
            return ComposerInput::Empty;
        }

        let has_imagine_prefix = text
            .get(..IMAGINE_PREFIX.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(IMAGINE_PREFIX));
        if has_imagine_prefix {
            let prompt = text[IMAGINE_PREFIX.len()..].trim();
            return if prompt.is_empty() {
                ComposerInput::Empty
            } else {
                ComposerInput::Imagine(prompt.to_string())
            };
        }

        if text.eq_ignore_ascii_case("/summarize") {
            return ComposerInput::Summarize;
        }

        ComposerInput::Message(text.to_string())
    }
}

/// The most recent message the contact sent, the one reply suggestions answer.
pub fn last_received(conversation: &Conversation) -> Option<&Message> {
    conversation
        .messages
        .iter()
        .rev()
        .find(|m| m.sender == Sender::Other)
}

#[cfg(test)]
mod tests {
    use parley_types::conversation::{ConversationId, MessageId};

    use super::*;

    #[test]
    fn plain_text_is_a_message() {
        assert_eq!(
            ComposerInput::parse("  hello there "),
            ComposerInput::Message("hello there".to_string())
        );
    }

    #[test]
    fn imagine_prefix_is_case_insensitive() {
        assert_eq!(
            ComposerInput::parse("/Imagine a red fox"),
            ComposerInput::Imagine("a red fox".to_string())
        );
        assert_eq!(
            ComposerInput::parse("/IMAGINE   neon city "),
            ComposerInput::Imagine("neon city".to_string())
        );
    }

    #[test]
    fn imagine_without_prompt_does_nothing() {
        assert_eq!(ComposerInput::parse("/imagine    "), ComposerInput::Empty);
    }

    #[test]
    fn imagine_without_separator_is_plain_text() {
        assert_eq!(
            ComposerInput::parse("/imagined"),
            ComposerInput::Message("/imagined".to_string())
        );
    }

    #[test]
    fn summarize_command() {
        assert_eq!(ComposerInput::parse("/summarize"), ComposerInput::Summarize);
        assert_eq!(ComposerInput::parse("/Summarize "), ComposerInput::Summarize);
    }

    #[test]
    fn blank_line_is_empty() {
        assert_eq!(ComposerInput::parse("   "), ComposerInput::Empty);
    }

    #[test]
    fn non_ascii_text_near_prefix_length_is_safe() {
        assert_eq!(
            ComposerInput::parse("héllo wörld"),
            ComposerInput::Message("héllo wörld".to_string())
        );
    }

    #[test]
    fn last_received_skips_own_and_system_messages() {
        let mut conversation = Conversation::new(ConversationId(1), "Alice");
        conversation.messages = vec![
            Message::new(MessageId(1), Sender::Other, "first", "10:00 AM"),
            Message::new(MessageId(2), Sender::Other, "second", "10:01 AM"),
            Message::new(MessageId(3), Sender::Me, "mine", "10:02 AM"),
            Message::new(MessageId(4), Sender::System, "summary", "10:03 AM"),
        ];
        assert_eq!(last_received(&conversation).map(|m| m.id), Some(MessageId(2)));
    }

    #[test]
    fn last_received_none_without_contact_messages() {
        let conversation = Conversation::new(ConversationId(1), "Alice");
        assert!(last_received(&conversation).is_none());
    }
}
