//! System status dashboard command.

use anyhow::Result;
use console::style;

use parley_infra::config::API_KEY_VARS;
use parley_infra::sqlite::pool::DATABASE_FILE;

use crate::state::AppState;

/// Display system status dashboard.
///
/// Shows conversation counts, models, retry policy, storage location and
/// whether an API key was found.
pub fn status(state: &AppState, json: bool) -> Result<()> {
    let snapshot = state.store.snapshot();
    let total = snapshot.len();
    let archived = snapshot.archived().len();
    let pinned = snapshot.iter().filter(|c| c.is_pinned).count();
    let messages: usize = snapshot.iter().map(|c| c.messages.len()).sum();
    let database = state.data_dir.join(DATABASE_FILE);
    let config = &state.config;

    if json {
        let status = serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "data_dir": state.data_dir.display().to_string(),
            "database": database.display().to_string(),
            "api_key_configured": state.api_key_configured,
            "models": config.models,
            "retry": config.retry,
            "history": config.history,
            "conversations": {
                "total": total,
                "pinned": pinned,
                "archived": archived,
                "messages": messages,
            },
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!();
    println!("  {} Parley v{}", style("💬").bold(), env!("CARGO_PKG_VERSION"));
    println!();

    println!("  {}", style("── Conversations ──").dim());
    println!("  Total:    {}", style(total).bold());
    if pinned > 0 {
        println!("  Pinned:   {}", style(pinned).cyan());
    }
    if archived > 0 {
        println!("  Archived: {}", style(archived).dim());
    }
    println!("  Messages: {}", style(messages).bold());
    println!();

    println!("  {}", style("── Generation ──").dim());
    let key_state = if state.api_key_configured {
        style("configured".to_string()).green()
    } else {
        style(format!("missing (set {})", API_KEY_VARS.join(" or "))).red()
    };
    println!("  API key:  {key_state}");
    println!("  Text:     {}", style(&config.models.text).cyan());
    println!("  Image:    {}", style(&config.models.image).cyan());
    println!(
        "  Retry:    {} retries, {}ms initial delay, x{} backoff",
        config.retry.max_retries, config.retry.initial_delay_ms, config.retry.backoff_factor
    );
    println!(
        "  History:  {} messages per reply, {} per summary",
        config.history.reply_window, config.history.summary_window
    );
    println!();

    println!("  {}", style("── Storage ──").dim());
    println!("  Data dir: {}", style(state.data_dir.display()).dim());
    println!("  Database: {}", style(database.display()).dim());
    println!();

    Ok(())
}
