//! Snapshot bus publishing conversation lists to observers.
//!
//! Built on `tokio::sync::watch`: observers always see the latest
//! snapshot, intermediate snapshots may be skipped, and publishing with
//! no observers still updates the current value.

use std::sync::Arc;

use tokio::sync::watch;

use crate::chat::list::ConversationList;

/// Single-writer, multi-reader holder of the current `ConversationList`.
pub struct SnapshotBus {
    sender: watch::Sender<Arc<ConversationList>>,
}

impl SnapshotBus {
    pub fn new(initial: ConversationList) -> Self {
        let (sender, _) = watch::channel(Arc::new(initial));
        Self { sender }
    }

    /// Observe every future snapshot. The receiver starts at the current one.
    pub fn subscribe(&self) -> watch::Receiver<Arc<ConversationList>> {
        self.sender.subscribe()
    }

    /// The current snapshot.
    pub fn current(&self) -> Arc<ConversationList> {
        self.sender.borrow().clone()
    }

    /// Atomically derive and publish the next snapshot.
    ///
    /// `derive` sees the current snapshot under the channel lock; returning
    /// `None` publishes nothing. Returns whether a snapshot was published.
    pub fn update<F>(&self, derive: F) -> bool
    where
        F: FnOnce(&ConversationList) -> Option<ConversationList>,
    {
        self.sender.send_if_modified(|current| match derive(current) {
            Some(next) => {
                *current = Arc::new(next);
                true
            }
            None => false,
        })
    }
}

impl std::fmt::Debug for SnapshotBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotBus")
            .field("receiver_count", &self.sender.receiver_count())
            .field("conversations", &self.sender.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_types::conversation::{Conversation, ConversationId};

    fn bus() -> SnapshotBus {
        SnapshotBus::new(ConversationList::new(vec![Conversation::new(
            ConversationId(1),
            "Alice",
        )]))
    }

    #[tokio::test]
    async fn update_notifies_subscribers() {
        let bus = bus();
        let mut rx = bus.subscribe();

        let published = bus.update(|list| {
            Some(list.with_prepended(Conversation::new(ConversationId(2), "Bob")))
        });
        assert!(published);

        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().len(), 2);
    }

    #[tokio::test]
    async fn declined_update_publishes_nothing() {
        let bus = bus();
        let rx = bus.subscribe();
        let before = bus.current();

        assert!(!bus.update(|_| None));
        assert!(!rx.has_changed().unwrap());
        assert!(Arc::ptr_eq(&before, &bus.current()));
    }

    #[test]
    fn update_without_subscribers_still_applies() {
        let bus = bus();
        bus.update(|list| list.with_moved_to_front(ConversationId(1)));
        assert_eq!(bus.current().len(), 1);
        bus.update(|list| Some(list.with_prepended(Conversation::new(ConversationId(5), "Mia"))));
        assert_eq!(bus.current().len(), 2);
    }

    #[test]
    fn debug_impl() {
        let bus = bus();
        let _rx = bus.subscribe();
        let debug = format!("{bus:?}");
        assert!(debug.contains("SnapshotBus"));
        assert!(debug.contains("receiver_count"));
    }
}
