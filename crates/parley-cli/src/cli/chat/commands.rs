//! Slash command parsing for the chat loop.
//!
//! `/imagine` and `/summarize` are composer inputs handled by
//! [`ComposerInput`](parley_core::chat::ComposerInput); everything else
//! starting with `/` lands here.

use console::style;

use parley_core::generation::prompt::REWRITE_TONES;
use parley_types::conversation::MessageId;

/// Available slash commands in the chat loop.
#[derive(Debug, PartialEq)]
pub enum ChatCommand {
    /// Show available commands.
    Help,
    /// Clear the terminal screen.
    Clear,
    /// Exit the chat.
    Exit,
    /// Toggle web search for the next message.
    Search,
    /// Quote a message in the next send; `None` cancels.
    Reply(Option<MessageId>),
    /// Suggest replies to the contact's latest message.
    Suggest,
    /// Rewrite a draft in the given tone.
    Tone { tone: String, text: String },
    /// Send suggestion or rewrite number N (1-based).
    Pick(usize),
    /// Reprint the whole conversation.
    History,
    /// Unknown command or bad usage.
    Unknown(String),
}

/// Match `name` against the offered tones, case-insensitively.
pub fn canonical_tone(name: &str) -> Option<&'static str> {
    REWRITE_TONES
        .iter()
        .copied()
        .find(|tone| tone.eq_ignore_ascii_case(name))
}

/// Parse user input as a slash command.
///
/// Returns `None` if the input doesn't start with `/`.
pub fn parse(input: &str) -> Option<ChatCommand> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let (cmd, arg) = match trimmed.split_once(char::is_whitespace) {
        Some((cmd, arg)) => (cmd.to_lowercase(), arg.trim()),
        None => (trimmed.to_lowercase(), ""),
    };

    let command = match cmd.as_str() {
        "/help" | "/h" | "/?" => ChatCommand::Help,
        "/clear" | "/cls" => ChatCommand::Clear,
        "/exit" | "/quit" | "/q" => ChatCommand::Exit,
        "/search" | "/web" => ChatCommand::Search,
        "/suggest" => ChatCommand::Suggest,
        "/history" => ChatCommand::History,
        "/reply" if arg.is_empty() => ChatCommand::Reply(None),
        "/reply" => match arg.parse::<u64>() {
            Ok(id) => ChatCommand::Reply(Some(MessageId(id))),
            Err(_) => ChatCommand::Unknown("/reply takes a message id".to_string()),
        },
        "/pick" => match arg.parse::<usize>() {
            Ok(n) if n >= 1 => ChatCommand::Pick(n),
            _ => ChatCommand::Unknown("/pick takes a number from the list".to_string()),
        },
        "/tone" => {
            let (tone, text) = arg.split_once(char::is_whitespace).unwrap_or((arg, ""));
            match canonical_tone(tone) {
                Some(tone) if !text.trim().is_empty() => ChatCommand::Tone {
                    tone: tone.to_string(),
                    text: text.trim().to_string(),
                },
                _ => ChatCommand::Unknown(format!(
                    "/tone takes one of {} and a message",
                    REWRITE_TONES.join(", ")
                )),
            }
        }
        other => ChatCommand::Unknown(other.to_string()),
    };
    Some(command)
}

/// Help text listing all available commands.
pub fn help_lines() -> Vec<String> {
    let rows = [
        ("/imagine <prompt>", "Generate an image"),
        ("/summarize", "Append a summary of this chat"),
        ("/search", "Toggle web search for the next message"),
        ("/reply <id>", "Quote message #id in the next message (/reply cancels)"),
        ("/suggest", "Suggest replies to the latest message"),
        ("/tone <tone> <text>", "Rewrite a draft (Professional, Casual, Friendly, Excited)"),
        ("/pick <n>", "Send suggestion or rewrite n"),
        ("/history", "Reprint the conversation"),
        ("/clear", "Clear the screen"),
        ("/help", "Show this help message"),
        ("/exit", "End the chat"),
    ];

    let mut lines = vec![String::new(), format!("  {}", style("Available commands:").bold())];
    for (command, description) in rows {
        lines.push(format!("  {:<22}{}", style(command).cyan(), description));
    }
    lines.push(String::new());
    lines.push(format!(
        "  {}",
        style("Ctrl+D to exit. Replies still streaming are cut short on exit.").dim()
    ));
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_help() {
        assert_eq!(parse("/help"), Some(ChatCommand::Help));
        assert_eq!(parse("/h"), Some(ChatCommand::Help));
        assert_eq!(parse("/?"), Some(ChatCommand::Help));
    }

    #[test]
    fn test_parse_exit() {
        assert_eq!(parse("/exit"), Some(ChatCommand::Exit));
        assert_eq!(parse("/quit"), Some(ChatCommand::Exit));
        assert_eq!(parse("/Q"), Some(ChatCommand::Exit));
    }

    #[test]
    fn test_parse_reply() {
        assert_eq!(parse("/reply 42"), Some(ChatCommand::Reply(Some(MessageId(42)))));
        assert_eq!(parse("/reply"), Some(ChatCommand::Reply(None)));
        assert!(matches!(parse("/reply abc"), Some(ChatCommand::Unknown(_))));
    }

    #[test]
    fn test_parse_tone_is_case_insensitive() {
        assert_eq!(
            parse("/tone professional see you at 5"),
            Some(ChatCommand::Tone {
                tone: "Professional".to_string(),
                text: "see you at 5".to_string(),
            })
        );
    }

    #[test]
    fn test_parse_tone_requires_known_tone_and_text() {
        assert!(matches!(parse("/tone Grumpy hi"), Some(ChatCommand::Unknown(_))));
        assert!(matches!(parse("/tone Casual"), Some(ChatCommand::Unknown(_))));
    }

    #[test]
    fn test_parse_pick() {
        assert_eq!(parse("/pick 2"), Some(ChatCommand::Pick(2)));
        assert!(matches!(parse("/pick 0"), Some(ChatCommand::Unknown(_))));
    }

    #[test]
    fn test_parse_not_command() {
        assert_eq!(parse("hello world"), None);
    }

    #[test]
    fn test_parse_unknown() {
        assert_eq!(parse("/foo"), Some(ChatCommand::Unknown("/foo".to_string())));
    }

    #[test]
    fn test_help_mentions_composer_commands() {
        let text = console::strip_ansi_codes(&help_lines().join("\n")).to_string();
        assert!(text.contains("/imagine"));
        assert!(text.contains("/summarize"));
    }
}
