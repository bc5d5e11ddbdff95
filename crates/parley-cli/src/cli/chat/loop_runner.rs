//! Main chat loop orchestration.
//!
//! A render task follows store snapshots and prints whatever is new for the
//! open conversation, so replies, image results and summaries appear as
//! they land. The input loop only mutates the store; it never prints
//! conversation content itself.

use std::io::Write;
use std::sync::Arc;

use anyhow::anyhow;
use console::style;
use rustyline_async::SharedWriter;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use parley_core::chat::{ComposerInput, ConversationList, SendOptions, last_received};
use parley_core::workflow::{ComposeAssist, SummaryOutcome};
use parley_types::conversation::{ConversationId, MessageId};

use crate::cli::require_conversation;
use crate::state::AppState;

use super::banner::print_welcome_banner;
use super::commands::{self, ChatCommand};
use super::input::{ChatInput, InputEvent};
use super::renderer::{TranscriptRenderer, message_block};

enum Flow {
    Continue,
    Exit,
}

/// Per-chat composer state that outlives a single line.
struct ChatSession<'a> {
    state: &'a AppState,
    id: ConversationId,
    writer: SharedWriter,
    assist: ComposeAssist,
    web_search: bool,
    reply_to: Option<MessageId>,
    /// Suggestions or rewrites offered to `/pick`.
    candidates: Vec<String>,
}

/// Run the interactive chat loop for a conversation.
pub async fn run_chat_loop(state: &AppState, id: u64) -> anyhow::Result<()> {
    let conversation = require_conversation(state, id)?;
    let id = conversation.id;
    print_welcome_banner(&conversation, &state.config.models.text, state.api_key_configured);

    let (mut input, writer) = ChatInput::new(prompt(false, None))
        .map_err(|e| anyhow!("Failed to initialize input: {e}"))?;

    let mut renderer = TranscriptRenderer::new();
    let mut initial_writer = writer.clone();
    write_lines(&mut initial_writer, renderer.render(&conversation));
    let render_task = spawn_render_task(state.store.subscribe(), id, renderer, writer.clone());
    info!(conversation_id = %id, "chat started");

    let mut session = ChatSession {
        state,
        id,
        writer,
        assist: state.store.compose_assist(),
        web_search: false,
        reply_to: None,
        candidates: Vec::new(),
    };

    loop {
        let flow = match input.read_line().await {
            InputEvent::Eof => Flow::Exit,
            InputEvent::Interrupted => {
                session.say(style("Press Ctrl+D to exit, or keep chatting.").dim());
                Flow::Continue
            }
            InputEvent::Line(line) => match ComposerInput::parse(&line) {
                ComposerInput::Empty => Flow::Continue,
                ComposerInput::Imagine(prompt) => session.imagine(prompt),
                ComposerInput::Summarize => {
                    session.summarize();
                    Flow::Continue
                }
                ComposerInput::Message(text) => match commands::parse(&text) {
                    Some(command) => session.handle_command(command, &mut input).await,
                    None => session.send(text),
                },
            },
        };

        if matches!(flow, Flow::Exit) {
            break;
        }
        input.update_prompt(&prompt(session.web_search, session.reply_to));
    }

    session.say(style("Chat ended.").dim());
    input.flush();
    render_task.abort();
    info!(conversation_id = %id, "chat ended");
    Ok(())
}

fn prompt(web_search: bool, reply_to: Option<MessageId>) -> String {
    let mut markers = String::new();
    if web_search {
        markers.push_str(&format!("{} ", style("[web]").blue()));
    }
    if let Some(message_id) = reply_to {
        markers.push_str(&format!("{} ", style(format!("[\u{21aa} #{message_id}]")).dim()));
    }
    format!("  {markers}{} ", style("You >").green().bold())
}

fn write_lines(writer: &mut SharedWriter, lines: Vec<String>) {
    for line in lines {
        let _ = writeln!(writer, "{line}");
    }
}

fn spawn_render_task(
    mut rx: watch::Receiver<Arc<ConversationList>>,
    id: ConversationId,
    mut renderer: TranscriptRenderer,
    mut writer: SharedWriter,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let snapshot = rx.borrow_and_update().clone();
            let Some(conversation) = snapshot.find(id) else {
                debug!(conversation_id = %id, "conversation gone, render task stopping");
                break;
            };
            write_lines(&mut writer, renderer.render(conversation));
        }
    })
}

impl ChatSession<'_> {
    fn say(&mut self, line: impl std::fmt::Display) {
        let _ = writeln!(self.writer, "  {line}");
    }

    fn warn(&mut self, message: impl std::fmt::Display) {
        self.say(format!("{} {message}", style("!").yellow().bold()));
    }

    fn send(&mut self, text: String) -> Flow {
        let options = SendOptions {
            use_web_search: std::mem::take(&mut self.web_search),
            reply_to: self.reply_to.take(),
        };
        self.candidates.clear();
        match self.state.store.add_message(self.id, text, options) {
            Some(_reply) => Flow::Continue,
            None => {
                self.warn("This conversation no longer exists.");
                Flow::Exit
            }
        }
    }

    fn imagine(&mut self, prompt: String) -> Flow {
        match self.state.store.generate_image_for_prompt(self.id, prompt) {
            Some(_generation) => Flow::Continue,
            None => {
                self.warn("This conversation no longer exists.");
                Flow::Exit
            }
        }
    }

    fn summarize(&mut self) {
        let store = self.state.store.clone();
        let id = self.id;
        let mut writer = self.writer.clone();
        tokio::spawn(async move {
            let note = match store.summarize_conversation(id).await {
                SummaryOutcome::Appended(_) => return,
                SummaryOutcome::Failed(e) => format!("Could not summarize: {e}"),
                SummaryOutcome::NotFound => "This conversation no longer exists.".to_string(),
            };
            let _ = writeln!(writer, "  {} {note}", style("!").yellow().bold());
        });
    }

    fn offer(&mut self, heading: &str, candidates: Vec<String>) {
        self.say(style(heading).bold());
        for (n, candidate) in candidates.iter().enumerate() {
            self.say(format!("  {} {candidate}", style(format!("{}.", n + 1)).cyan()));
        }
        self.say(style("Send one with /pick <n>.").dim());
        self.candidates = candidates;
    }

    async fn handle_command(&mut self, command: ChatCommand, input: &mut ChatInput) -> Flow {
        match command {
            ChatCommand::Help => {
                write_lines(&mut self.writer, commands::help_lines());
            }
            ChatCommand::Clear => input.clear(),
            ChatCommand::Exit => return Flow::Exit,
            ChatCommand::Search => {
                self.web_search = !self.web_search;
                let state = if self.web_search { "on" } else { "off" };
                self.say(style(format!("Web search {state} for the next message.")).dim());
            }
            ChatCommand::Reply(None) => {
                self.reply_to = None;
            }
            ChatCommand::Reply(Some(message_id)) => {
                let exists = self
                    .state
                    .store
                    .conversation(self.id)
                    .is_some_and(|c| c.message(message_id).is_some());
                if exists {
                    self.reply_to = Some(message_id);
                } else {
                    self.warn(format!("No message #{message_id} in this chat."));
                }
            }
            ChatCommand::Suggest => {
                let latest = self
                    .state
                    .store
                    .conversation(self.id)
                    .and_then(|c| last_received(&c).map(|m| m.text.clone()));
                let Some(latest) = latest else {
                    self.warn("Nothing to reply to yet.");
                    return Flow::Continue;
                };
                self.say(style("thinking\u{2026}").dim());
                match self.assist.suggest_replies(&latest).await {
                    Ok(suggestions) if !suggestions.is_empty() => self.offer("Suggestions:", suggestions),
                    Ok(_) => self.warn("No suggestions this time."),
                    Err(e) => {
                        debug!(error = %e, "suggestions failed");
                        self.warn("Could not generate replies.");
                    }
                }
            }
            ChatCommand::Tone { tone, text } => {
                self.say(style("rewriting\u{2026}").dim());
                match self.assist.rewrite_message(&text, &tone).await {
                    Ok(rewritten) => self.offer(&format!("{tone}:"), vec![rewritten]),
                    Err(e) => self.warn(format!("Could not rewrite message: {e}")),
                }
            }
            ChatCommand::Pick(n) => match self.candidates.get(n - 1).cloned() {
                Some(text) => return self.send(text),
                None => self.warn(format!("Nothing numbered {n} to pick.")),
            },
            ChatCommand::History => {
                if let Some(conversation) = self.state.store.conversation(self.id) {
                    for message in &conversation.messages {
                        write_lines(&mut self.writer, message_block(&conversation, message));
                    }
                }
            }
            ChatCommand::Unknown(what) => {
                self.say(format!(
                    "{} Unknown command: {}. Type /help for available commands.",
                    style("?").yellow().bold(),
                    style(what).dim()
                ));
            }
        }
        Flow::Continue
    }
}
