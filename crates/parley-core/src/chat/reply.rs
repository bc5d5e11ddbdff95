//! ReplyOrchestrator -- streams one AI reply into a conversation.
//!
//! Lifecycle per run:
//! `Idle -> TypingSet -> PlaceholderInserted -> Streaming -> Finalized | Failed -> TypingCleared`.
//!
//! Each step is a separate atomic store update that re-resolves the
//! conversation by id, so a reply tolerates concurrent edits and deletes.
//! Runs for the same conversation are serialized through the store's reply
//! gate.

use std::sync::Arc;

use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use parley_types::conversation::{Conversation, ConversationId, Message, MessageId, Sender, preview_text};
use parley_types::generation::{GenerationError, StreamChunk};

use crate::generation::BoxGenerationClient;
use crate::generation::prompt::reply_request;

use super::stamp::clock_label;
use super::store::ConversationStore;

/// Text written into the reply placeholder when generation fails.
pub const REPLY_APOLOGY: &str = "Sorry, I'm having trouble connecting. Please try again in a moment.";

/// How a reply run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyOutcome {
    /// The stream was consumed to the end.
    Finalized,
    /// Generation failed; the placeholder holds the apology.
    Failed,
    /// Shutdown interrupted the stream; partial text is kept.
    Cancelled,
    /// The conversation no longer exists.
    Skipped,
}

enum StreamEnd {
    Exhausted,
    Cancelled,
}

/// Drives the reply lifecycle against explicit store and client handles.
pub struct ReplyOrchestrator {
    store: ConversationStore,
    client: Arc<BoxGenerationClient>,
    window: usize,
}

impl ReplyOrchestrator {
    pub fn new(store: ConversationStore, client: Arc<BoxGenerationClient>, window: usize) -> Self {
        Self {
            store,
            client,
            window,
        }
    }

    /// Run one reply for conversation `id`, answering `trigger`.
    ///
    /// The prompt sees only the messages up to and including `trigger`, so
    /// a reply queued behind another still answers the message that
    /// started it. `None` answers the newest message.
    ///
    /// Never returns an error: failures are written into the conversation
    /// and reported through the outcome.
    #[tracing::instrument(name = "reply", skip(self, cancel), fields(conversation_id = %id))]
    pub async fn run(
        &self,
        id: ConversationId,
        trigger: Option<MessageId>,
        use_web_search: bool,
        cancel: CancellationToken,
    ) -> ReplyOutcome {
        let gate = self.store.reply_gate(id);
        let _turn = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("cancelled while queued");
                return ReplyOutcome::Cancelled;
            }
            turn = gate.lock() => turn,
        };
        if cancel.is_cancelled() {
            return ReplyOutcome::Cancelled;
        }

        self.set_typing(id, true);

        let Some(conversation) = self.store.conversation(id) else {
            debug!("conversation vanished before reply");
            self.set_typing(id, false);
            return ReplyOutcome::Skipped;
        };

        let placeholder = Message::new(self.store.next_message_id(), Sender::Other, "", clock_label());
        let placeholder_id = placeholder.id;
        let timestamp = placeholder.timestamp.clone();
        if !self.store.update_conversation(id, move |c| {
            c.messages.push(placeholder);
            true
        }) {
            self.set_typing(id, false);
            return ReplyOutcome::Skipped;
        }

        let outcome = match self
            .stream_into(id, placeholder_id, &timestamp, &conversation, trigger, use_web_search, &cancel)
            .await
        {
            Ok(StreamEnd::Exhausted) => {
                info!("reply finalized");
                self.settle_empty_placeholder(id, placeholder_id, false);
                ReplyOutcome::Finalized
            }
            Ok(StreamEnd::Cancelled) => {
                info!("reply cancelled");
                self.settle_empty_placeholder(id, placeholder_id, true);
                ReplyOutcome::Cancelled
            }
            Err(e) => {
                warn!(error = %e, "reply failed");
                self.store.update_conversation(id, |c| {
                    let Some(message) = c.message_mut(placeholder_id) else {
                        return false;
                    };
                    message.text = REPLY_APOLOGY.to_string();
                    if c.last().is_some_and(|m| m.id == placeholder_id) {
                        c.refresh_preview();
                    }
                    true
                });
                ReplyOutcome::Failed
            }
        };

        self.store.update_conversation_to_front(id, |c| {
            c.is_typing = false;
            true
        });
        outcome
    }

    /// Handle a placeholder that never received text.
    ///
    /// A cancelled run removes it; an exhausted one keeps it and mirrors it
    /// into the preview. Either way the preview tracks the last message.
    fn settle_empty_placeholder(&self, id: ConversationId, placeholder_id: MessageId, remove: bool) {
        self.store.update_conversation(id, |c| {
            let Some(index) = c
                .messages
                .iter()
                .position(|m| m.id == placeholder_id && m.text.is_empty() && m.sources.is_none())
            else {
                return false;
            };
            let was_last = index + 1 == c.messages.len();
            if remove {
                c.messages.remove(index);
            }
            if was_last {
                c.refresh_preview();
            }
            was_last || remove
        });
    }

    async fn stream_into(
        &self,
        id: ConversationId,
        placeholder_id: MessageId,
        timestamp: &str,
        conversation: &Conversation,
        trigger: Option<MessageId>,
        use_web_search: bool,
        cancel: &CancellationToken,
    ) -> Result<StreamEnd, GenerationError> {
        let request = reply_request(conversation, trigger, use_web_search, self.window)?;
        let mut stream = self.client.generate_text_stream(request);

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(StreamEnd::Cancelled),
                next = stream.next() => next,
            };
            match next {
                None => return Ok(StreamEnd::Exhausted),
                Some(Err(e)) => return Err(e),
                Some(Ok(chunk)) => self.apply_chunk(id, placeholder_id, timestamp, chunk),
            }
        }
    }

    /// Append a chunk to the placeholder and mirror it into the preview.
    fn apply_chunk(&self, id: ConversationId, placeholder_id: MessageId, timestamp: &str, chunk: StreamChunk) {
        debug!(bytes = chunk.text.len(), citations = chunk.citations.len(), "reply chunk");
        let applied = self.store.update_conversation(id, |c| {
            let Some(message) = c.message_mut(placeholder_id) else {
                return false;
            };
            message.text.push_str(&chunk.text);
            if !chunk.citations.is_empty() {
                message
                    .sources
                    .get_or_insert_with(Vec::new)
                    .extend(chunk.citations);
            }
            let preview = preview_text(&message.text);
            c.last_message = preview;
            c.last_message_timestamp = timestamp.to_string();
            true
        });
        if !applied {
            debug!("placeholder gone, chunk dropped");
        }
    }

    fn set_typing(&self, id: ConversationId, typing: bool) {
        self.store.update_conversation(id, |c| {
            if c.is_typing == typing {
                return false;
            }
            c.is_typing = typing;
            true
        });
    }
}
