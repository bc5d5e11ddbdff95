//! SummaryWorkflow -- condenses a conversation into a system message.

use std::sync::Arc;

use tracing::{info, warn};

use parley_types::conversation::{ConversationId, Message, MessageId, Sender};
use parley_types::generation::GenerationError;

use crate::chat::stamp::clock_label;
use crate::chat::store::ConversationStore;
use crate::generation::BoxGenerationClient;
use crate::generation::prompt::summary_request;

use super::retry::RetryPolicy;

/// How a summary request ended.
///
/// A failure adds nothing to the conversation; callers decide whether to
/// surface it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryOutcome {
    Appended(MessageId),
    Failed(GenerationError),
    NotFound,
}

pub struct SummaryWorkflow {
    store: ConversationStore,
    client: Arc<BoxGenerationClient>,
    retry: RetryPolicy,
    window: usize,
}

impl SummaryWorkflow {
    pub fn new(
        store: ConversationStore,
        client: Arc<BoxGenerationClient>,
        retry: RetryPolicy,
        window: usize,
    ) -> Self {
        Self {
            store,
            client,
            retry,
            window,
        }
    }

    #[tracing::instrument(name = "summarize", skip(self), fields(conversation_id = %id))]
    pub async fn run(&self, id: ConversationId) -> SummaryOutcome {
        let Some(conversation) = self.store.conversation(id) else {
            return SummaryOutcome::NotFound;
        };
        let request = summary_request(&conversation, self.window);

        let summary = match self
            .retry
            .run_while(|| self.client.generate_text(&request), GenerationError::is_transient)
            .await
        {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                warn!(error = %e, "summarization failed");
                return SummaryOutcome::Failed(e);
            }
        };

        let message = Message::new(self.store.next_message_id(), Sender::System, summary, clock_label());
        let message_id = message.id;
        let appended = self.store.update_conversation_to_front(id, move |c| {
            c.messages.push(message);
            c.refresh_preview();
            true
        });

        if appended {
            info!(%message_id, "summary appended");
            SummaryOutcome::Appended(message_id)
        } else {
            SummaryOutcome::NotFound
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::seed::seed_conversations;
    use crate::chat::store::StoreConfig;
    use crate::testing::{Script, ScriptedClient};

    fn seeded() -> (ConversationStore, Arc<Script>) {
        let (client, script) = ScriptedClient::new();
        let store = ConversationStore::new(
            seed_conversations(),
            Arc::new(BoxGenerationClient::new(client)),
            StoreConfig::default(),
        );
        (store, script)
    }

    #[tokio::test]
    async fn success_appends_trimmed_system_message() {
        let (store, script) = seeded();
        script.push_text(Ok("  Bob confirmed the 3 PM meeting.\n".to_string()));

        let outcome = store.summarize_conversation(ConversationId(2)).await;

        let SummaryOutcome::Appended(message_id) = outcome else {
            panic!("expected summary, got {outcome:?}");
        };
        let bob = store.conversation(ConversationId(2)).unwrap();
        let summary = bob.last().unwrap();
        assert_eq!(summary.id, message_id);
        assert_eq!(summary.sender, Sender::System);
        assert_eq!(summary.text, "Bob confirmed the 3 PM meeting.");
        assert_eq!(
            script.requests()[0].prompt_text(),
            "Please provide a concise, one-paragraph summary of the following conversation:\n\nBob: Meeting is at 3 PM tomorrow.\nUser: Sounds good, see you then."
        );
    }

    #[tokio::test(start_paused = true)]
    async fn failure_adds_nothing() {
        let (store, script) = seeded();
        for _ in 0..3 {
            script.push_text(Err(GenerationError::Transient("503".into())));
        }
        let before = store.conversation(ConversationId(2)).unwrap();

        let outcome = store.summarize_conversation(ConversationId(2)).await;

        assert!(matches!(outcome, SummaryOutcome::Failed(GenerationError::Transient(_))));
        assert_eq!(script.text_calls(), 3);
        assert_eq!(store.conversation(ConversationId(2)).unwrap(), before);
    }

    #[tokio::test]
    async fn unknown_conversation_is_not_found() {
        let (store, script) = seeded();
        assert_eq!(
            store.summarize_conversation(ConversationId(50)).await,
            SummaryOutcome::NotFound
        );
        assert_eq!(script.text_calls(), 0);
    }
}
