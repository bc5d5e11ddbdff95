//! Parley CLI entry point.
//!
//! Binary name: `parley`
//!
//! Parses CLI arguments, sets up tracing, opens the conversation store,
//! then dispatches to the appropriate command handler. The store is shut
//! down before exit so in-flight work settles and the final snapshot is
//! persisted.

mod cli;
mod state;

use anyhow::anyhow;
use clap::Parser;
use clap_complete::generate;

use parley_observe::{LogOptions, init_tracing, shutdown_tracing};

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(&LogOptions {
        verbosity: cli.verbose,
        quiet: cli.quiet,
        json: cli.log_json,
        otel: cli.otel,
    })
    .map_err(|e| anyhow!("failed to initialize logging: {e}"))?;

    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "parley", &mut std::io::stdout());
        return Ok(());
    }

    let state = AppState::init().await?;
    let result = dispatch(&state, cli).await;
    state.shutdown().await;
    shutdown_tracing();
    result
}

async fn dispatch(state: &AppState, cli: Cli) -> anyhow::Result<()> {
    let json = cli.json;
    match cli.command {
        Commands::List { archived } => cli::conversation::list_conversations(state, archived, json),
        Commands::Show { id } => cli::conversation::show_conversation(state, id, json),
        Commands::New => cli::conversation::new_conversation(state, json),
        Commands::Pin { id } => cli::conversation::toggle_pin(state, id, json),
        Commands::Archive { id } => cli::conversation::toggle_archive(state, id, json),
        Commands::Edit {
            id,
            message_id,
            text,
        } => cli::conversation::edit_message(state, id, message_id, text, json),
        Commands::Delete {
            id,
            message_id,
            force,
        } => cli::conversation::delete_message(state, id, message_id, force, json),

        Commands::Send {
            id,
            text,
            search,
            reply_to,
        } => cli::message::send_message(state, id, text, search, reply_to, json).await,
        Commands::Image { id, path } => cli::message::send_image(state, id, &path, json).await,
        Commands::Imagine { id, prompt } => cli::message::imagine(state, id, prompt, json).await,
        Commands::Summarize { id } => cli::message::summarize(state, id, json).await,
        Commands::Suggest { id } => cli::message::suggest(state, id, json).await,
        Commands::Rewrite { text, tone } => cli::message::rewrite(state, text, tone, json).await,

        Commands::Chat { id } => cli::chat::loop_runner::run_chat_loop(state, id).await,
        Commands::Status => cli::status::status(state, json),

        // Handled before state initialization.
        Commands::Completions { .. } => Ok(()),
    }
}
