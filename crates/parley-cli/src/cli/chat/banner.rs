//! Welcome banner display for chat sessions.

use console::style;

use parley_types::conversation::Conversation;

/// Print the welcome banner at the start of a chat.
///
/// Shows the contact, the text model, and the pinned/archived state, with a
/// hint about slash commands.
pub fn print_welcome_banner(conversation: &Conversation, model: &str, api_key_configured: bool) {
    let mut flags = Vec::new();
    if conversation.is_pinned {
        flags.push("pinned");
    }
    if conversation.is_archived {
        flags.push("archived");
    }

    println!();
    println!(
        "  {} {}",
        style(format!("#{}", conversation.id)).dim(),
        style(&conversation.name).cyan().bold()
    );
    if let Some(personality) = &conversation.personality {
        println!("  {}", style(personality).dim());
    }
    println!();
    println!("  {}  {}", style("Model:").bold(), style(model).dim());
    if !flags.is_empty() {
        println!("  {}  {}", style("State:").bold(), style(flags.join(", ")).dim());
    }
    if !api_key_configured {
        println!(
            "  {} {}",
            style("!").yellow().bold(),
            style("GEMINI_API_KEY is not set; replies will fail.").yellow()
        );
    }
    println!();
    println!("  {}", style("Type /help for commands, Ctrl+D to exit").dim());
    println!("  {}", style("---").dim());
}
