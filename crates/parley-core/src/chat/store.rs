//! ConversationStore -- the single write surface for conversation state.
//!
//! Every mutation derives a new [`ConversationList`] from the current one
//! and publishes it through the [`SnapshotBus`] in one atomic step. The
//! published value is never mutated afterwards. Replies, image requests
//! and summaries run as tracked background tasks that re-enter the store
//! through the same atomic update path.

use std::sync::{Arc, Mutex, PoisonError};

use dashmap::DashMap;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use parley_types::config::ParleyConfig;
use parley_types::conversation::{
    Conversation, ConversationId, DeliveryStatus, IMAGE_PREVIEW, Message, MessageId, Sender,
};

use crate::event::SnapshotBus;
use crate::generation::BoxGenerationClient;
use crate::storage::KvStore;
use crate::workflow::assist::ComposeAssist;
use crate::workflow::image::{ImageOutcome, ImageRequestWorkflow};
use crate::workflow::retry::RetryPolicy;
use crate::workflow::summary::{SummaryOutcome, SummaryWorkflow};

use super::list::ConversationList;
use super::persistence::{load_snapshot, spawn_observer};
use super::reply::{ReplyOrchestrator, ReplyOutcome};
use super::stamp::{MessageIdGenerator, clock_label};

/// Names handed to new contacts, first unused wins.
pub const NAME_POOL: [&str; 6] = ["Eva", "Daniel", "Olivia", "Leo", "Mia", "Noah"];

/// Personality given to contacts created by `start_new_conversation`.
pub const NEW_CONTACT_PERSONALITY: &str =
    "You are a helpful AI assistant. Introduce yourself and ask how you can help.";

/// Label recorded as `reply_to_sender` when quoting the user's own message.
const SELF_LABEL: &str = "You";

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Runtime knobs for the store and its orchestrations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub retry: RetryPolicy,
    /// Trailing messages fed to reply prompts.
    pub reply_window: usize,
    /// Trailing non-system messages fed to summary prompts.
    pub summary_window: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::from(&ParleyConfig::default())
    }
}

impl From<&ParleyConfig> for StoreConfig {
    fn from(config: &ParleyConfig) -> Self {
        Self {
            retry: RetryPolicy::from(&config.retry),
            reply_window: config.history.reply_window,
            summary_window: config.history.summary_window,
        }
    }
}

/// Options for [`ConversationStore::add_message`].
#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    /// Ground the reply with web search.
    pub use_web_search: bool,
    /// Message being replied to.
    pub reply_to: Option<MessageId>,
}

/// A user message waiting to be appended.
struct Outgoing {
    text: String,
    image_url: Option<String>,
    preview_override: Option<&'static str>,
    reply_to: Option<MessageId>,
}

// ---------------------------------------------------------------------------
// ConversationStore
// ---------------------------------------------------------------------------

struct Persistence {
    stop: CancellationToken,
    handle: JoinHandle<()>,
}

struct StoreInner {
    bus: SnapshotBus,
    client: Arc<BoxGenerationClient>,
    config: StoreConfig,
    ids: MessageIdGenerator,
    reply_gates: DashMap<ConversationId, Arc<tokio::sync::Mutex<()>>>,
    shutdown: CancellationToken,
    tasks: TaskTracker,
    persistence: Mutex<Option<Persistence>>,
}

/// Cheap-to-clone handle to the shared conversation state.
///
/// Operations that start background work (`add_message`,
/// `add_image_message`, `generate_image_for_prompt`) must be called from
/// within a tokio runtime.
#[derive(Clone)]
pub struct ConversationStore {
    inner: Arc<StoreInner>,
}

impl ConversationStore {
    /// Create a store over `initial` with no persistence attached.
    pub fn new(
        initial: ConversationList,
        client: Arc<BoxGenerationClient>,
        config: StoreConfig,
    ) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                bus: SnapshotBus::new(initial),
                client,
                config,
                ids: MessageIdGenerator::new(),
                reply_gates: DashMap::new(),
                shutdown: CancellationToken::new(),
                tasks: TaskTracker::new(),
                persistence: Mutex::new(None),
            }),
        }
    }

    /// Load the saved list from `kv` (or the seed set) and persist every
    /// subsequent snapshot back to it.
    pub async fn open<K: KvStore + 'static>(
        kv: Arc<K>,
        client: Arc<BoxGenerationClient>,
        config: StoreConfig,
    ) -> Self {
        let initial = load_snapshot(kv.as_ref()).await;
        let store = Self::new(initial, client, config);
        store.attach_persistence(kv);
        store
    }

    /// Register the persistence observer. Replaces any previous one.
    pub fn attach_persistence<K: KvStore + 'static>(&self, kv: Arc<K>) {
        let stop = CancellationToken::new();
        let handle = spawn_observer(kv, self.inner.bus.subscribe(), stop.clone());
        let previous = self
            .inner
            .persistence
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(Persistence { stop, handle });
        if let Some(previous) = previous {
            previous.stop.cancel();
        }
    }

    // -- Reads --------------------------------------------------------------

    /// The current snapshot.
    pub fn snapshot(&self) -> Arc<ConversationList> {
        self.inner.bus.current()
    }

    /// Observe snapshots as they are published.
    pub fn subscribe(&self) -> watch::Receiver<Arc<ConversationList>> {
        self.inner.bus.subscribe()
    }

    /// A copy of one conversation from the current snapshot.
    pub fn conversation(&self, id: ConversationId) -> Option<Conversation> {
        self.snapshot().find(id).cloned()
    }

    pub fn client(&self) -> Arc<BoxGenerationClient> {
        Arc::clone(&self.inner.client)
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    /// Reply suggestions and tone rewrites over this store's client.
    pub fn compose_assist(&self) -> ComposeAssist {
        ComposeAssist::new(self.client(), self.inner.config.retry)
    }

    // -- Mutations ----------------------------------------------------------

    /// Append a user message and start the contact's reply.
    ///
    /// Returns the reply task, or `None` when the conversation is unknown.
    pub fn add_message(
        &self,
        id: ConversationId,
        text: impl Into<String>,
        options: SendOptions,
    ) -> Option<JoinHandle<ReplyOutcome>> {
        let outgoing = Outgoing {
            text: text.into(),
            image_url: None,
            preview_override: None,
            reply_to: options.reply_to,
        };
        self.send(id, outgoing, options.use_web_search)
    }

    /// Append a user image (a `data:` URI) and start the contact's reaction.
    pub fn add_image_message(
        &self,
        id: ConversationId,
        image_url: impl Into<String>,
    ) -> Option<JoinHandle<ReplyOutcome>> {
        let outgoing = Outgoing {
            text: String::new(),
            image_url: Some(image_url.into()),
            preview_override: Some(IMAGE_PREVIEW),
            reply_to: None,
        };
        self.send(id, outgoing, false)
    }

    fn send(
        &self,
        id: ConversationId,
        outgoing: Outgoing,
        use_web_search: bool,
    ) -> Option<JoinHandle<ReplyOutcome>> {
        let message_id = self.next_message_id();
        let timestamp = clock_label();

        let appended = self.update_conversation_to_front(id, move |conversation| {
            for message in &mut conversation.messages {
                if message.sender == Sender::Me {
                    message.status = Some(DeliveryStatus::Read);
                }
            }

            let mut message = Message::new(message_id, Sender::Me, outgoing.text, timestamp)
                .with_status(DeliveryStatus::Sent);
            message.image_url = outgoing.image_url;

            if let Some(target) = outgoing.reply_to.and_then(|r| conversation.message(r)) {
                message.reply_to_message_id = Some(target.id);
                message.reply_to_text = Some(target.quote_text());
                message.reply_to_sender = Some(conversation.speaker_label(target.sender, SELF_LABEL));
            }

            conversation.last_message = match outgoing.preview_override {
                Some(preview) => preview.to_string(),
                None => message.preview(),
            };
            conversation.last_message_timestamp = message.timestamp.clone();
            conversation.messages.push(message);
            true
        });

        if !appended {
            debug!(conversation_id = %id, "send ignored, conversation not found");
            return None;
        }
        Some(self.spawn_reply(id, message_id, use_web_search))
    }

    /// Remove a message, recomputing the preview if it was the last one.
    pub fn delete_message(&self, id: ConversationId, message_id: MessageId) -> bool {
        self.update_conversation(id, |conversation| {
            let Some(index) = conversation.messages.iter().position(|m| m.id == message_id) else {
                return false;
            };
            let was_last = index + 1 == conversation.messages.len();
            conversation.messages.remove(index);
            if was_last {
                conversation.refresh_preview();
            }
            true
        })
    }

    /// Replace a message's text in place.
    pub fn edit_message(
        &self,
        id: ConversationId,
        message_id: MessageId,
        new_text: impl Into<String>,
    ) -> bool {
        let new_text = new_text.into();
        self.update_conversation(id, |conversation| {
            let is_last = conversation.last().is_some_and(|m| m.id == message_id);
            let Some(message) = conversation.message_mut(message_id) else {
                return false;
            };
            message.text = new_text;
            if is_last {
                conversation.refresh_preview();
            }
            true
        })
    }

    pub fn toggle_pin_conversation(&self, id: ConversationId) -> bool {
        self.update_conversation(id, |conversation| {
            conversation.is_pinned = !conversation.is_pinned;
            true
        })
    }

    pub fn toggle_archive_conversation(&self, id: ConversationId) -> bool {
        self.update_conversation(id, |conversation| {
            conversation.is_archived = !conversation.is_archived;
            true
        })
    }

    /// Handle `/imagine <prompt>`. Returns the generation task, or `None`
    /// when the conversation is unknown.
    pub fn generate_image_for_prompt(
        &self,
        id: ConversationId,
        prompt: impl Into<String>,
    ) -> Option<JoinHandle<ImageOutcome>> {
        let workflow = ImageRequestWorkflow::new(self.clone(), self.client(), self.inner.config.retry);
        let prompt = prompt.into();
        let placeholder_id = workflow.begin(id, &prompt)?;
        let cancel = self.inner.shutdown.child_token();
        Some(
            self.inner
                .tasks
                .spawn(async move { workflow.complete(id, placeholder_id, prompt, cancel).await }),
        )
    }

    /// Summarize a conversation into a system message.
    pub async fn summarize_conversation(&self, id: ConversationId) -> SummaryOutcome {
        SummaryWorkflow::new(
            self.clone(),
            self.client(),
            self.inner.config.retry,
            self.inner.config.summary_window,
        )
        .run(id)
        .await
    }

    /// Create a new contact at the head of the list and return its id.
    pub fn start_new_conversation(&self) -> ConversationId {
        let mut created = ConversationId(0);
        self.inner.bus.update(|list| {
            let id = ConversationId(list.max_id() + 1);
            let name = NAME_POOL
                .iter()
                .find(|candidate| !list.iter().any(|c| c.name == **candidate))
                .map(|name| name.to_string())
                .unwrap_or_else(|| format!("New Contact {id}"));

            let mut conversation = Conversation::new(id, name);
            conversation.personality = Some(NEW_CONTACT_PERSONALITY.to_string());
            created = id;
            Some(list.with_prepended(conversation))
        });
        info!(conversation_id = %created, "started new conversation");
        created
    }

    /// Cancel in-flight work, wait for it to settle, and flush persistence.
    pub async fn shutdown(&self) {
        self.inner.shutdown.cancel();
        self.inner.tasks.close();
        self.inner.tasks.wait().await;

        let persistence = self
            .inner
            .persistence
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(persistence) = persistence {
            persistence.stop.cancel();
            if let Err(e) = persistence.handle.await {
                warn!(error = %e, "persistence observer did not stop cleanly");
            }
        }
        debug!("conversation store shut down");
    }

    // -- Crate-internal plumbing ---------------------------------------------

    pub(crate) fn next_message_id(&self) -> MessageId {
        self.inner.ids.next_id()
    }

    /// Apply `mutator` to conversation `id` and publish. `false` if nothing changed.
    pub(crate) fn update_conversation<F>(&self, id: ConversationId, mutator: F) -> bool
    where
        F: FnOnce(&mut Conversation) -> bool,
    {
        self.inner
            .bus
            .update(|list| list.with_updated_conversation(id, mutator))
    }

    /// As [`Self::update_conversation`], also moving the conversation to the head.
    pub(crate) fn update_conversation_to_front<F>(&self, id: ConversationId, mutator: F) -> bool
    where
        F: FnOnce(&mut Conversation) -> bool,
    {
        self.inner.bus.update(|list| {
            list.with_updated_conversation(id, mutator)
                .and_then(|updated| updated.with_moved_to_front(id))
        })
    }

    /// The gate serializing replies within one conversation.
    pub(crate) fn reply_gate(&self, id: ConversationId) -> Arc<tokio::sync::Mutex<()>> {
        self.inner.reply_gates.entry(id).or_default().value().clone()
    }

    fn spawn_reply(
        &self,
        id: ConversationId,
        trigger: MessageId,
        use_web_search: bool,
    ) -> JoinHandle<ReplyOutcome> {
        let orchestrator =
            ReplyOrchestrator::new(self.clone(), self.client(), self.inner.config.reply_window);
        let cancel = self.inner.shutdown.child_token();
        self.inner
            .tasks
            .spawn(async move { orchestrator.run(id, Some(trigger), use_web_search, cancel).await })
    }
}

impl std::fmt::Debug for ConversationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationStore")
            .field("bus", &self.inner.bus)
            .field("client", &self.inner.client)
            .field("in_flight", &self.inner.tasks.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
