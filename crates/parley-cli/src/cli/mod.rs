//! CLI command definitions for the `parley` binary.
//!
//! Uses clap derive macros for argument parsing. Conversations and messages
//! are addressed by their numeric ids as shown by `parley list` and
//! `parley show`.

pub mod chat;
pub mod conversation;
pub mod message;
pub mod status;

use anyhow::anyhow;
use clap::{Parser, Subcommand};
use clap_complete::Shell;

use parley_types::conversation::{Conversation, ConversationId};

use crate::state::AppState;

/// Chat with AI contacts from your terminal.
#[derive(Parser)]
#[command(name = "parley", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all log output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed log output (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Write logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Export tracing spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List conversations (pinned first).
    #[command(alias = "ls")]
    List {
        /// Show archived conversations instead.
        #[arg(long)]
        archived: bool,
    },

    /// Show a conversation's messages.
    Show {
        /// Conversation id.
        id: u64,
    },

    /// Send a message and wait for the reply.
    Send {
        /// Conversation id.
        id: u64,

        /// Message text.
        text: String,

        /// Ground the reply with web search.
        #[arg(long)]
        search: bool,

        /// Quote an earlier message by id.
        #[arg(long, value_name = "MESSAGE_ID")]
        reply_to: Option<u64>,
    },

    /// Send an image file and wait for the contact's reaction.
    Image {
        /// Conversation id.
        id: u64,

        /// Path to a PNG, JPEG, GIF or WebP file (at most 2 MB).
        path: std::path::PathBuf,
    },

    /// Generate an image from a prompt inside a conversation.
    Imagine {
        /// Conversation id.
        id: u64,

        /// What to draw.
        prompt: String,
    },

    /// Append an AI summary of the conversation.
    Summarize {
        /// Conversation id.
        id: u64,
    },

    /// Start a conversation with a new contact.
    New,

    /// Pin or unpin a conversation.
    Pin {
        /// Conversation id.
        id: u64,
    },

    /// Archive or unarchive a conversation.
    Archive {
        /// Conversation id.
        id: u64,
    },

    /// Replace a message's text.
    Edit {
        /// Conversation id.
        id: u64,

        /// Message id.
        message_id: u64,

        /// New text.
        text: String,
    },

    /// Delete a message.
    #[command(alias = "rm")]
    Delete {
        /// Conversation id.
        id: u64,

        /// Message id.
        message_id: u64,

        /// Skip confirmation prompt.
        #[arg(long)]
        force: bool,
    },

    /// Suggest replies to the contact's latest message.
    Suggest {
        /// Conversation id.
        id: u64,
    },

    /// Rewrite a draft in another tone.
    Rewrite {
        /// Draft text.
        text: String,

        /// Professional, Casual, Friendly or Excited (prompted when omitted).
        #[arg(long)]
        tone: Option<String>,
    },

    /// Start an interactive chat with live replies.
    Chat {
        /// Conversation id.
        id: u64,
    },

    /// Show data directory, models and API key status.
    Status,

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

/// Look up a conversation in the current snapshot or fail with a hint.
pub fn require_conversation(state: &AppState, id: u64) -> anyhow::Result<Conversation> {
    state.store.conversation(ConversationId(id)).ok_or_else(|| {
        anyhow!("Conversation {id} not found. Run `parley list` to see conversation ids.")
    })
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_send_with_options() {
        let cli = Cli::try_parse_from([
            "parley", "send", "2", "hello there", "--search", "--reply-to", "7",
        ])
        .unwrap();
        match cli.command {
            Commands::Send {
                id,
                text,
                search,
                reply_to,
            } => {
                assert_eq!(id, 2);
                assert_eq!(text, "hello there");
                assert!(search);
                assert_eq!(reply_to, Some(7));
            }
            _ => panic!("expected send"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["parley", "list", "--archived", "--json", "-vv"]).unwrap();
        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Commands::List { archived: true }));
    }

    #[test]
    fn test_rewrite_tone_is_optional() {
        let cli = Cli::try_parse_from(["parley", "rewrite", "see you"]).unwrap();
        assert!(matches!(cli.command, Commands::Rewrite { tone: None, .. }));
    }
}
