//! Message CLI commands: send, image, imagine, summarize, suggest, rewrite.
//!
//! Commands that start background work follow the store's snapshots and
//! print new transcript lines as they land, then report how the work
//! ended.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use console::style;
use dialoguer::Select;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use parley_core::chat::composer::MAX_ATTACHMENT_BYTES;
use parley_core::chat::{ConversationList, ReplyOutcome, SendOptions, last_received};
use parley_core::generation::prompt::REWRITE_TONES;
use parley_core::workflow::{ImageOutcome, SummaryOutcome};
use parley_types::conversation::{ConversationId, MessageId};

use crate::cli::chat::commands::canonical_tone;
use crate::cli::chat::renderer::TranscriptRenderer;
use crate::cli::require_conversation;
use crate::state::AppState;

/// Prints transcript lines for one conversation while a task runs.
struct Follower {
    id: ConversationId,
    rx: watch::Receiver<Arc<ConversationList>>,
    renderer: TranscriptRenderer,
    quiet: bool,
}

impl Follower {
    /// Start following before the mutation so nothing is missed.
    fn start(state: &AppState, id: ConversationId, quiet: bool) -> Self {
        let mut rx = state.store.subscribe();
        let mut renderer = TranscriptRenderer::new();
        if let Some(conversation) = rx.borrow_and_update().find(id) {
            renderer.skip_existing(conversation);
        }
        Self {
            id,
            rx,
            renderer,
            quiet,
        }
    }

    fn print_latest(&mut self) {
        let snapshot = self.rx.borrow_and_update().clone();
        if self.quiet {
            return;
        }
        if let Some(conversation) = snapshot.find(self.id) {
            for line in self.renderer.render(conversation) {
                println!("{line}");
            }
        }
    }

    async fn until<T>(mut self, mut task: JoinHandle<T>) -> Result<T> {
        loop {
            tokio::select! {
                result = &mut task => {
                    self.print_latest();
                    return result.map_err(|e| anyhow!("background task failed: {e}"));
                }
                changed = self.rx.changed() => {
                    if changed.is_err() {
                        return task.await.map_err(|e| anyhow!("background task failed: {e}"));
                    }
                    self.print_latest();
                }
            }
        }
    }
}

/// Send a text message and stream the reply.
pub async fn send_message(
    state: &AppState,
    id: u64,
    text: String,
    search: bool,
    reply_to: Option<u64>,
    json: bool,
) -> Result<()> {
    let conversation = require_conversation(state, id)?;
    let reply_to = reply_to.map(MessageId);
    if let Some(target) = reply_to {
        if conversation.message(target).is_none() {
            bail!("Message {target} not found in conversation {id}.");
        }
    }

    let follower = Follower::start(state, conversation.id, json);
    let options = SendOptions {
        use_web_search: search,
        reply_to,
    };
    let task = state
        .store
        .add_message(conversation.id, text, options)
        .ok_or_else(|| anyhow!("Conversation {id} no longer exists."))?;
    let outcome = follower.until(task).await?;
    report_reply(state, conversation.id, outcome, json)
}

/// Send an image file and stream the contact's reaction.
pub async fn send_image(state: &AppState, id: u64, path: &Path, json: bool) -> Result<()> {
    let conversation = require_conversation(state, id)?;

    let mime_type = image_mime_type(path).ok_or_else(|| {
        anyhow!("Unsupported image type: {}. Use PNG, JPEG, GIF or WebP.", path.display())
    })?;
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    if bytes.len() > MAX_ATTACHMENT_BYTES {
        bail!(
            "{} is too large ({} bytes). Images must be at most 2 MB.",
            path.display(),
            bytes.len()
        );
    }
    let data_url = format!("data:{mime_type};base64,{}", STANDARD.encode(&bytes));
    tracing::debug!(path = %path.display(), bytes = bytes.len(), "sending image");

    let follower = Follower::start(state, conversation.id, json);
    let task = state
        .store
        .add_image_message(conversation.id, data_url)
        .ok_or_else(|| anyhow!("Conversation {id} no longer exists."))?;
    let outcome = follower.until(task).await?;
    report_reply(state, conversation.id, outcome, json)
}

/// Mime type for an attachment, from its file extension.
fn image_mime_type(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

fn report_reply(state: &AppState, id: ConversationId, outcome: ReplyOutcome, json: bool) -> Result<()> {
    if json {
        let reply = state
            .store
            .conversation(id)
            .and_then(|c| c.last().cloned());
        let body = serde_json::json!({
            "outcome": format!("{outcome:?}").to_lowercase(),
            "reply": reply,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    match outcome {
        ReplyOutcome::Finalized => {}
        ReplyOutcome::Failed => {
            if !state.api_key_configured {
                println!(
                    "  {} No API key configured. Set {} to get replies.",
                    style("!").yellow().bold(),
                    style("GEMINI_API_KEY").yellow()
                );
            }
        }
        ReplyOutcome::Cancelled => {
            println!("  {}", style("Reply interrupted; partial text kept.").dim());
        }
        ReplyOutcome::Skipped => bail!("Conversation {id} no longer exists."),
    }
    Ok(())
}

/// Generate an image from a prompt.
pub async fn imagine(state: &AppState, id: u64, prompt: String, json: bool) -> Result<()> {
    let conversation = require_conversation(state, id)?;
    if prompt.trim().is_empty() {
        bail!("Describe the image to generate.");
    }

    let follower = Follower::start(state, conversation.id, json);
    let task = state
        .store
        .generate_image_for_prompt(conversation.id, prompt.trim())
        .ok_or_else(|| anyhow!("Conversation {id} no longer exists."))?;
    let outcome = follower.until(task).await?;

    if json {
        let (status, error) = match &outcome {
            ImageOutcome::Delivered => ("delivered", None),
            ImageOutcome::Failed(e) => ("failed", Some(e.to_string())),
            ImageOutcome::Discarded => ("discarded", None),
        };
        let body = serde_json::json!({ "outcome": status, "error": error });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    match outcome {
        ImageOutcome::Delivered => {
            println!("  {} Image ready", style("✓").green().bold());
        }
        ImageOutcome::Failed(e) => {
            println!("  {} {}", style("!").yellow().bold(), style(e).dim());
        }
        ImageOutcome::Discarded => {
            println!("  {}", style("The placeholder was removed before the image arrived.").dim());
        }
    }
    Ok(())
}

/// Append a summary of the conversation.
pub async fn summarize(state: &AppState, id: u64, json: bool) -> Result<()> {
    let conversation = require_conversation(state, id)?;
    let mut follower = Follower::start(state, conversation.id, json);

    if !json {
        println!("  {}", style("Summarizing…").dim());
    }
    match state.store.summarize_conversation(conversation.id).await {
        SummaryOutcome::Appended(message_id) => {
            if json {
                let summary = state
                    .store
                    .conversation(conversation.id)
                    .and_then(|c| c.message(message_id).cloned());
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                follower.print_latest();
            }
            Ok(())
        }
        SummaryOutcome::Failed(e) => bail!("Could not summarize the conversation: {e}"),
        SummaryOutcome::NotFound => bail!("Conversation {id} no longer exists."),
    }
}

/// Suggest replies to the contact's latest message.
pub async fn suggest(state: &AppState, id: u64, json: bool) -> Result<()> {
    let conversation = require_conversation(state, id)?;
    let Some(latest) = last_received(&conversation) else {
        bail!("{} hasn't said anything yet.", conversation.name);
    };

    let suggestions = state
        .store
        .compose_assist()
        .suggest_replies(&latest.text)
        .await
        .map_err(|e| anyhow!("Could not generate replies: {e}"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&suggestions)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} {}",
        style("Replies to").bold(),
        style(format!("\"{}\"", latest.text)).dim()
    );
    for (n, suggestion) in suggestions.iter().enumerate() {
        println!("  {} {suggestion}", style(format!("{}.", n + 1)).cyan());
    }
    println!();
    Ok(())
}

/// Rewrite a draft in another tone.
pub async fn rewrite(state: &AppState, text: String, tone: Option<String>, json: bool) -> Result<()> {
    let tone = match tone {
        Some(name) => canonical_tone(&name).ok_or_else(|| {
            anyhow!("Unknown tone '{name}'. Choose one of: {}.", REWRITE_TONES.join(", "))
        })?,
        None if json => bail!("--tone is required with --json."),
        None => {
            let selection = Select::new()
                .with_prompt("Tone")
                .items(&REWRITE_TONES)
                .default(0)
                .interact()?;
            REWRITE_TONES[selection]
        }
    };

    let rewritten = state
        .store
        .compose_assist()
        .rewrite_message(&text, tone)
        .await
        .map_err(|e| anyhow!("Could not rewrite message: {e}"))?;

    if json {
        let body = serde_json::json!({ "tone": tone, "text": rewritten });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    println!();
    println!("  {} {rewritten}", style(format!("{tone}:")).cyan().bold());
    println!();
    Ok(())
}
