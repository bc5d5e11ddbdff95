//! Conversation CLI commands: list, show, new, pin, archive, edit, delete.

use anyhow::{Result, bail};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use dialoguer::Confirm;
use serde::Serialize;

use parley_types::conversation::{Conversation, ConversationId, MessageId};

use crate::cli::chat::renderer::message_block;
use crate::cli::require_conversation;
use crate::state::AppState;

/// One row of `parley list --json`.
#[derive(Debug, Serialize)]
struct ConversationRow<'a> {
    id: ConversationId,
    name: &'a str,
    last_message: &'a str,
    last_message_timestamp: &'a str,
    message_count: usize,
    is_pinned: bool,
    is_archived: bool,
}

impl<'a> From<&'a Conversation> for ConversationRow<'a> {
    fn from(c: &'a Conversation) -> Self {
        Self {
            id: c.id,
            name: &c.name,
            last_message: &c.last_message,
            last_message_timestamp: &c.last_message_timestamp,
            message_count: c.messages.len(),
            is_pinned: c.is_pinned,
            is_archived: c.is_archived,
        }
    }
}

/// List conversations in display order (pinned first), or the archive.
pub fn list_conversations(state: &AppState, archived: bool, json: bool) -> Result<()> {
    let snapshot = state.store.snapshot();
    let conversations = if archived {
        snapshot.archived()
    } else {
        snapshot.display_order()
    };

    if json {
        let rows: Vec<ConversationRow<'_>> = conversations.iter().map(|c| (*c).into()).collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if conversations.is_empty() {
        println!();
        if archived {
            println!("  {} No archived conversations.", style("i").blue().bold());
        } else {
            println!(
                "  {} No conversations. Start one with: {}",
                style("i").blue().bold(),
                style("parley new").yellow()
            );
        }
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("ID").fg(Color::White),
        Cell::new("Name").fg(Color::White),
        Cell::new("Last Message").fg(Color::White),
        Cell::new("Time").fg(Color::White),
        Cell::new("").fg(Color::White),
    ]);

    for conversation in &conversations {
        let flags = match (conversation.is_pinned, conversation.is_archived) {
            (true, true) => "📌 archived",
            (true, false) => "📌",
            (false, true) => "archived",
            (false, false) => "",
        };
        let preview = if conversation.is_typing {
            Cell::new("typing…").fg(Color::Green)
        } else {
            Cell::new(&conversation.last_message)
        };
        table.add_row(vec![
            Cell::new(conversation.id).fg(Color::DarkGrey),
            Cell::new(&conversation.name).fg(Color::Cyan),
            preview,
            Cell::new(&conversation.last_message_timestamp).fg(Color::DarkGrey),
            Cell::new(flags).fg(Color::Yellow),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    Ok(())
}

/// Print every message of a conversation.
pub fn show_conversation(state: &AppState, id: u64, json: bool) -> Result<()> {
    let conversation = require_conversation(state, id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&conversation)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} {}",
        style(&conversation.name).cyan().bold(),
        style(format!("(#{})", conversation.id)).dim()
    );
    if let Some(personality) = &conversation.personality {
        println!("  {}", style(personality).dim().italic());
    }
    println!();

    if conversation.messages.is_empty() {
        println!("  {}", style("No messages yet.").dim());
    }
    for message in &conversation.messages {
        for line in message_block(&conversation, message) {
            println!("{line}");
        }
    }
    println!();
    Ok(())
}

/// Create a conversation with a new contact.
pub fn new_conversation(state: &AppState, json: bool) -> Result<()> {
    let id = state.store.start_new_conversation();
    let conversation = require_conversation(state, id.0)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&conversation)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} Started a conversation with {} {}",
        style("✓").green().bold(),
        style(&conversation.name).cyan().bold(),
        style(format!("(#{id})")).dim()
    );
    println!(
        "  Say hello: {}",
        style(format!("parley chat {id}")).yellow()
    );
    println!();
    Ok(())
}

/// Flip the pinned flag.
pub fn toggle_pin(state: &AppState, id: u64, json: bool) -> Result<()> {
    require_conversation(state, id)?;
    state.store.toggle_pin_conversation(ConversationId(id));
    let conversation = require_conversation(state, id)?;
    report_flag(&conversation, "pinned", conversation.is_pinned, json)
}

/// Flip the archived flag.
pub fn toggle_archive(state: &AppState, id: u64, json: bool) -> Result<()> {
    require_conversation(state, id)?;
    state.store.toggle_archive_conversation(ConversationId(id));
    let conversation = require_conversation(state, id)?;
    report_flag(&conversation, "archived", conversation.is_archived, json)
}

fn report_flag(conversation: &Conversation, flag: &str, value: bool, json: bool) -> Result<()> {
    if json {
        let body = serde_json::json!({ "id": conversation.id, flag: value });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }
    let verb = if value { flag.to_string() } else { format!("un{flag}") };
    println!(
        "  {} {} {verb}",
        style("✓").green().bold(),
        style(&conversation.name).cyan()
    );
    Ok(())
}

/// Replace a message's text.
pub fn edit_message(state: &AppState, id: u64, message_id: u64, text: String, json: bool) -> Result<()> {
    require_conversation(state, id)?;
    if !state
        .store
        .edit_message(ConversationId(id), MessageId(message_id), text)
    {
        bail!("Message {message_id} not found in conversation {id}.");
    }

    let conversation = require_conversation(state, id)?;
    if json {
        let message = conversation.message(MessageId(message_id));
        println!("{}", serde_json::to_string_pretty(&message)?);
        return Ok(());
    }
    println!("  {} Message #{message_id} updated", style("✓").green().bold());
    Ok(())
}

/// Delete a message, confirming first unless forced.
pub fn delete_message(state: &AppState, id: u64, message_id: u64, force: bool, json: bool) -> Result<()> {
    let conversation = require_conversation(state, id)?;
    let Some(message) = conversation.message(MessageId(message_id)) else {
        bail!("Message {message_id} not found in conversation {id}.");
    };

    if !force && !json {
        println!();
        for line in message_block(&conversation, message) {
            println!("{line}");
        }
        println!();
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Delete this message from {}?",
                style(&conversation.name).red().bold()
            ))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("  {}", style("Cancelled.").dim());
            return Ok(());
        }
    }

    let deleted = state
        .store
        .delete_message(ConversationId(id), MessageId(message_id));

    if json {
        let body = serde_json::json!({ "id": id, "message_id": message_id, "deleted": deleted });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }
    println!("  {} Message #{message_id} deleted", style("✓").green().bold());
    Ok(())
}
