//! Immutable conversation snapshots.
//!
//! A `ConversationList` is the value published by the store. Conversations
//! are shared behind `Arc`, so deriving a new snapshot clones only the
//! conversation being changed; every other entry is pointer-shared with
//! the previous snapshot.

use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use parley_types::conversation::{Conversation, ConversationId};

/// Ordered conversation snapshot. Index 0 is the most recently active.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationList {
    conversations: Vec<Arc<Conversation>>,
}

impl ConversationList {
    pub fn new(conversations: Vec<Conversation>) -> Self {
        Self {
            conversations: conversations.into_iter().map(Arc::new).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    /// Conversations in stored (recency) order.
    pub fn iter(&self) -> impl Iterator<Item = &Conversation> {
        self.conversations.iter().map(|c| c.as_ref())
    }

    pub fn find(&self, id: ConversationId) -> Option<&Conversation> {
        self.iter().find(|c| c.id == id)
    }

    pub fn position(&self, id: ConversationId) -> Option<usize> {
        self.conversations.iter().position(|c| c.id == id)
    }

    /// Whether `other` holds the very same allocation for `id`.
    pub fn shares_conversation(&self, other: &ConversationList, id: ConversationId) -> bool {
        let mine = self.conversations.iter().find(|c| c.id == id);
        let theirs = other.conversations.iter().find(|c| c.id == id);
        matches!((mine, theirs), (Some(a), Some(b)) if Arc::ptr_eq(a, b))
    }

    /// Non-archived conversations, pinned first, recency order otherwise.
    pub fn display_order(&self) -> Vec<&Conversation> {
        let (pinned, rest): (Vec<_>, Vec<_>) = self
            .iter()
            .filter(|c| !c.is_archived)
            .partition(|c| c.is_pinned);
        pinned.into_iter().chain(rest).collect()
    }

    pub fn archived(&self) -> Vec<&Conversation> {
        self.iter().filter(|c| c.is_archived).collect()
    }

    /// Largest conversation id, or 0 for an empty list.
    pub fn max_id(&self) -> u64 {
        self.iter().map(|c| c.id.0).max().unwrap_or(0)
    }

    /// Derive a snapshot with conversation `id` changed by `mutator`.
    ///
    /// Returns `None` (nothing to publish) when `id` is unknown or the
    /// mutator reports that it changed nothing.
    pub fn with_updated_conversation<F>(&self, id: ConversationId, mutator: F) -> Option<Self>
    where
        F: FnOnce(&mut Conversation) -> bool,
    {
        let index = self.position(id)?;
        let mut conversations = self.conversations.clone();
        let mut updated = Conversation::clone(&conversations[index]);
        if !mutator(&mut updated) {
            return None;
        }
        conversations[index] = Arc::new(updated);
        Some(Self { conversations })
    }

    /// Derive a snapshot with `id` moved to index 0.
    ///
    /// Returns a snapshot even when `id` is already first; `None` if unknown.
    pub fn with_moved_to_front(&self, id: ConversationId) -> Option<Self> {
        let index = self.position(id)?;
        let mut conversations = self.conversations.clone();
        let conversation = conversations.remove(index);
        conversations.insert(0, conversation);
        Some(Self { conversations })
    }

    /// Derive a snapshot with `conversation` inserted at index 0.
    pub fn with_prepended(&self, conversation: Conversation) -> Self {
        let mut conversations = Vec::with_capacity(self.conversations.len() + 1);
        conversations.push(Arc::new(conversation));
        conversations.extend(self.conversations.iter().cloned());
        Self { conversations }
    }
}

impl Serialize for ConversationList {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de> Deserialize<'de> for ConversationList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<Conversation>::deserialize(deserializer).map(Self::new)
    }
}
