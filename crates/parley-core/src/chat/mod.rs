//! Conversation state: snapshots, the store, and reply streaming.

pub mod composer;
pub mod list;
pub mod persistence;
pub mod reply;
pub mod seed;
pub mod stamp;
pub mod store;

pub use composer::{ComposerInput, last_received};
pub use list::ConversationList;
pub use reply::{ReplyOrchestrator, ReplyOutcome};
pub use store::{ConversationStore, SendOptions, StoreConfig};
