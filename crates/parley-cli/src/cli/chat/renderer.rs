//! Terminal rendering of conversation transcripts.
//!
//! `TranscriptRenderer` turns successive snapshots of one conversation into
//! the lines that are new since the last snapshot. A streaming reply is
//! emitted a whole line at a time; the rest follows once it settles.

use std::collections::HashMap;

use console::style;

use parley_core::generation::prompt::parse_data_url;
use parley_types::conversation::{Conversation, DeliveryStatus, Message, MessageId, Sender};

const INDENT: &str = "    ";

/// Header line: `#id Name · time`.
pub fn header_line(conversation: &Conversation, message: &Message) -> String {
    let name = match message.sender {
        Sender::Me => style("You".to_string()).green().bold(),
        Sender::Other => style(conversation.name.clone()).cyan().bold(),
        Sender::System => style("System".to_string()).yellow().bold(),
    };
    format!(
        "  {} {} {} {}",
        style(format!("#{}", message.id)).dim(),
        name,
        style("\u{00b7}").dim(),
        style(&message.timestamp).dim()
    )
}

/// Quote line for a message that replies to another.
fn quote_line(message: &Message) -> Option<String> {
    let text = message.reply_to_text.as_deref()?;
    let sender = message.reply_to_sender.as_deref().unwrap_or("?");
    Some(format!(
        "{INDENT}{}",
        style(format!("\u{21aa} {sender}: \"{}\"", truncate(text, 60))).dim()
    ))
}

fn text_lines(text: &str) -> impl Iterator<Item = String> + '_ {
    text.lines().map(|line| format!("{INDENT}{line}"))
}

/// Attachments, citations and delivery status shown under a settled message.
fn trailer_lines(message: &Message) -> Vec<String> {
    let mut lines = Vec::new();

    if let Some(url) = &message.image_url {
        let label = match parse_data_url(url) {
            Some(image) => format!(
                "\u{1f4f7} image ({}, {})",
                image.mime_type,
                format_size(image.data.len() / 4 * 3)
            ),
            None => "\u{1f4f7} image".to_string(),
        };
        lines.push(format!("{INDENT}{}", style(label).magenta()));
    }

    if let Some(sources) = message.sources.as_ref().filter(|s| !s.is_empty()) {
        lines.push(format!("{INDENT}{}", style("Sources:").dim()));
        for (n, source) in sources.iter().enumerate() {
            lines.push(format!(
                "{INDENT}  {}. {} {}",
                n + 1,
                source.title,
                style(format!("<{}>", source.uri)).dim().underlined()
            ));
        }
    }

    if message.sender == Sender::Me {
        if let Some(status) = message.status {
            let ticks = match status {
                DeliveryStatus::Sent => "\u{2713}",
                DeliveryStatus::Delivered | DeliveryStatus::Read => "\u{2713}\u{2713}",
            };
            lines.push(format!("{INDENT}{}", style(format!("{ticks} {status}")).dim()));
        }
    }

    lines
}

/// Every line of one settled message.
pub fn message_block(conversation: &Conversation, message: &Message) -> Vec<String> {
    let mut lines = vec![header_line(conversation, message)];
    lines.extend(quote_line(message));
    lines.extend(text_lines(&message.text));
    lines.extend(trailer_lines(message));
    lines
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Progress {
    /// Header printed for an in-flight placeholder.
    Pending,
    /// Partially printed; holds exactly the text already emitted.
    Streaming(String),
    Done,
}

/// Incremental renderer for one conversation.
#[derive(Debug, Default)]
pub struct TranscriptRenderer {
    progress: HashMap<MessageId, Progress>,
    typing_announced: bool,
}

impl TranscriptRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Treat everything currently in `conversation` as already shown.
    pub fn skip_existing(&mut self, conversation: &Conversation) {
        for message in &conversation.messages {
            self.progress.insert(message.id, Progress::Done);
        }
        self.typing_announced = conversation.is_typing;
    }

    /// Lines that are new since the previous call.
    pub fn render(&mut self, conversation: &Conversation) -> Vec<String> {
        let mut out = Vec::new();
        let streaming_id = conversation
            .is_typing
            .then(|| conversation.last())
            .flatten()
            .filter(|m| m.sender == Sender::Other)
            .map(|m| m.id);

        for message in &conversation.messages {
            let previous = self.progress.get(&message.id).cloned();
            if previous == Some(Progress::Done) {
                continue;
            }

            if previous.is_none() {
                out.push(header_line(conversation, message));
                out.extend(quote_line(message));
            }

            if message.is_loading() {
                if previous.is_none() {
                    out.extend(text_lines(&message.text).map(|l| style(l).dim().to_string()));
                    self.progress.insert(message.id, Progress::Pending);
                }
                continue;
            }

            let emitted = match previous {
                Some(Progress::Streaming(emitted)) => emitted,
                _ => String::new(),
            };
            let rest = match message.text.strip_prefix(emitted.as_str()) {
                Some(rest) => rest,
                None => {
                    out.push(format!("{INDENT}{}", style("(revised)").dim()));
                    message.text.as_str()
                }
            };

            if Some(message.id) == streaming_id {
                let complete = rest.rfind('\n').map(|end| &rest[..=end]).unwrap_or("");
                out.extend(text_lines(complete));
                let shown = message.text.len() - rest.len() + complete.len();
                self.progress
                    .insert(message.id, Progress::Streaming(message.text[..shown].to_string()));
            } else {
                out.extend(text_lines(rest));
                out.extend(trailer_lines(message));
                self.progress.insert(message.id, Progress::Done);
            }
        }

        if conversation.is_typing && !self.typing_announced {
            out.push(format!(
                "  {}",
                style(format!("{} is typing\u{2026}", conversation.name)).dim().italic()
            ));
        }
        self.typing_announced = conversation.is_typing;

        out
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

fn format_size(bytes: usize) -> String {
    if bytes >= 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else if bytes >= 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{bytes} B")
    }
}
