//! Snapshot persistence: load on startup, save on every publish.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::storage::KvStore;

use super::list::ConversationList;
use super::seed::seed_conversations;

/// Durable key holding the serialized conversation list.
pub const STORAGE_KEY: &str = "chat-conversations";

/// Load the persisted list, falling back to the seed set when the key is
/// absent, unreadable or unparsable.
///
/// Typing indicators are cleared: no reply survives a restart.
pub async fn load_snapshot<K: KvStore>(kv: &K) -> ConversationList {
    let value = match kv.get(STORAGE_KEY).await {
        Ok(Some(value)) => value,
        Ok(None) => {
            info!("no saved conversations, using seed set");
            return seed_conversations();
        }
        Err(e) => {
            warn!(error = %e, "failed to read saved conversations, using seed set");
            return seed_conversations();
        }
    };

    match serde_json::from_value::<Vec<parley_types::conversation::Conversation>>(value) {
        Ok(mut conversations) => {
            for conversation in &mut conversations {
                conversation.is_typing = false;
            }
            info!(conversations = conversations.len(), "loaded saved conversations");
            ConversationList::new(conversations)
        }
        Err(e) => {
            warn!(error = %e, "saved conversations unparsable, using seed set");
            seed_conversations()
        }
    }
}

async fn save_snapshot<K: KvStore>(kv: &K, snapshot: &ConversationList) {
    let value = match serde_json::to_value(snapshot) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, "failed to serialize conversations");
            return;
        }
    };
    match kv.set(STORAGE_KEY, &value).await {
        Ok(()) => debug!(conversations = snapshot.len(), "conversations saved"),
        Err(e) => warn!(error = %e, "failed to save conversations"),
    }
}

/// Spawn the observer that writes every published snapshot to `kv`.
///
/// Writes happen off the caller's path. Snapshots published faster than
/// they can be written are coalesced; the newest one is always written.
/// When `stop` fires, a pending snapshot is flushed before the task ends.
pub(crate) fn spawn_observer<K: KvStore + 'static>(
    kv: Arc<K>,
    mut rx: watch::Receiver<Arc<ConversationList>>,
    stop: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let initial = rx.borrow_and_update().clone();
        save_snapshot(kv.as_ref(), &initial).await;

        loop {
            tokio::select! {
                changed = rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let snapshot = rx.borrow_and_update().clone();
                    save_snapshot(kv.as_ref(), &snapshot).await;
                }
                _ = stop.cancelled() => {
                    if rx.has_changed().unwrap_or(false) {
                        let snapshot = rx.borrow_and_update().clone();
                        save_snapshot(kv.as_ref(), &snapshot).await;
                    }
                    break;
                }
            }
        }
        debug!("persistence observer stopped");
    })
}
