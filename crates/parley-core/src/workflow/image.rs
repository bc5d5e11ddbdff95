//! ImageRequestWorkflow -- the `/imagine <prompt>` command.
//!
//! `begin` synchronously appends the echoed command and a loading
//! placeholder; `complete` generates the image through the retry policy
//! and swaps it into the placeholder, or writes the failure text.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use parley_types::conversation::{ConversationId, DeliveryStatus, Message, MessageId, Sender};
use parley_types::generation::{GeneratedImage, GenerationError};

use crate::chat::stamp::clock_label;
use crate::chat::store::ConversationStore;
use crate::generation::BoxGenerationClient;

use super::retry::RetryPolicy;

pub const IMAGE_PLACEHOLDER: &str = "🎨 Generating your image...";
pub const IMAGE_READY_PREVIEW: &str = "📷 Here's the image you requested!";
pub const IMAGE_FAILURE: &str = "Sorry, I couldn't create the image. Please try again.";

/// How an image request ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageOutcome {
    /// The placeholder now holds the image.
    Delivered,
    /// Generation failed; the placeholder holds the failure text.
    Failed(GenerationError),
    /// The placeholder was deleted before the result arrived.
    Discarded,
}

/// Encode generated bytes as a `data:` URI.
pub fn image_data_url(image: &GeneratedImage) -> String {
    format!("data:{};base64,{}", image.mime_type, STANDARD.encode(&image.bytes))
}

pub struct ImageRequestWorkflow {
    store: ConversationStore,
    client: Arc<BoxGenerationClient>,
    retry: RetryPolicy,
}

impl ImageRequestWorkflow {
    pub fn new(store: ConversationStore, client: Arc<BoxGenerationClient>, retry: RetryPolicy) -> Self {
        Self {
            store,
            client,
            retry,
        }
    }

    /// Append the echoed command and the loading placeholder.
    ///
    /// Returns the placeholder id, or `None` if the conversation is unknown.
    pub fn begin(&self, id: ConversationId, prompt: &str) -> Option<MessageId> {
        let timestamp = clock_label();
        let echo = Message::new(
            self.store.next_message_id(),
            Sender::Me,
            format!("/imagine {prompt}"),
            timestamp.clone(),
        )
        .with_status(DeliveryStatus::Sent);
        let mut placeholder = Message::new(
            self.store.next_message_id(),
            Sender::System,
            IMAGE_PLACEHOLDER,
            timestamp,
        );
        placeholder.is_loading = Some(true);
        let placeholder_id = placeholder.id;

        let inserted = self.store.update_conversation_to_front(id, move |c| {
            c.messages.push(echo);
            c.messages.push(placeholder);
            c.refresh_preview();
            true
        });
        inserted.then_some(placeholder_id)
    }

    /// Generate the image and resolve the placeholder.
    #[tracing::instrument(name = "imagine", skip(self, prompt, cancel), fields(conversation_id = %id))]
    pub async fn complete(
        &self,
        id: ConversationId,
        placeholder_id: MessageId,
        prompt: String,
        cancel: CancellationToken,
    ) -> ImageOutcome {
        let generated = tokio::select! {
            result = self.retry.run_while(
                || self.client.generate_image(&prompt),
                GenerationError::is_transient,
            ) => result,
            _ = cancel.cancelled() => Err(GenerationError::Transient("cancelled by shutdown".to_string())),
        };

        match generated {
            Ok(image) => {
                let url = image_data_url(&image);
                let timestamp = clock_label();
                let applied = self.store.update_conversation(id, move |c| {
                    let Some(message) = c.message_mut(placeholder_id) else {
                        return false;
                    };
                    message.sender = Sender::Other;
                    message.text = String::new();
                    message.image_url = Some(url);
                    message.is_loading = Some(false);
                    message.timestamp = timestamp.clone();
                    c.last_message = IMAGE_READY_PREVIEW.to_string();
                    c.last_message_timestamp = timestamp;
                    true
                });
                if applied {
                    info!(bytes = image.bytes.len(), "image delivered");
                    ImageOutcome::Delivered
                } else {
                    info!("image placeholder deleted, result discarded");
                    ImageOutcome::Discarded
                }
            }
            Err(e) => {
                warn!(error = %e, "image generation failed");
                let applied = self.store.update_conversation(id, |c| {
                    let Some(message) = c.message_mut(placeholder_id) else {
                        return false;
                    };
                    message.text = IMAGE_FAILURE.to_string();
                    message.is_loading = Some(false);
                    if c.last().is_some_and(|m| m.id == placeholder_id) {
                        c.refresh_preview();
                    }
                    true
                });
                if applied {
                    ImageOutcome::Failed(e)
                } else {
                    ImageOutcome::Discarded
                }
            }
        }
    }
}
