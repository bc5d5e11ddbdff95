//! Conversation and message types for Parley.
//!
//! These types model the locally persisted chat state: conversations with
//! AI contacts, the messages inside them, and the denormalized preview
//! fields the conversation list renders. Field names serialize in camelCase
//! so the persisted JSON snapshot stays stable across versions.

use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

/// Preview shown for a conversation with no messages.
pub const EMPTY_PREVIEW: &str = "Say hi to start the conversation!";

/// Timestamp label paired with [`EMPTY_PREVIEW`].
pub const JUST_NOW: &str = "Just now";

/// Preview and reply-quote text used in place of an image attachment.
pub const IMAGE_PREVIEW: &str = "📷 Image";

/// Maximum number of characters kept in a text preview before truncation.
pub const PREVIEW_MAX_CHARS: usize = 30;

/// Unique identifier for a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(pub u64);

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ConversationId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().parse()?))
    }
}

/// Identifier of a message, unique within its conversation.
///
/// Generated from a microsecond timestamp (see `MessageIdGenerator` in
/// parley-core). Seeded messages use small sequential values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MessageId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().parse()?))
    }
}

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// The local user.
    Me,
    /// The AI contact.
    Other,
    /// Generated notices (summaries, image placeholders).
    System,
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sender::Me => write!(f, "me"),
            Sender::Other => write!(f, "other"),
            Sender::System => write!(f, "system"),
        }
    }
}

impl FromStr for Sender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "me" => Ok(Sender::Me),
            "other" => Ok(Sender::Other),
            "system" => Ok(Sender::System),
            other => Err(format!("invalid sender: '{other}'")),
        }
    }
}

/// Delivery state of a message sent by the local user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Sent,
    Delivered,
    Read,
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryStatus::Sent => write!(f, "sent"),
            DeliveryStatus::Delivered => write!(f, "delivered"),
            DeliveryStatus::Read => write!(f, "read"),
        }
    }
}

/// A web citation attached to a grounded reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub title: String,
    pub uri: String,
}

/// A single message inside a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub text: String,
    /// Display label (e.g. "10:42 AM", "Yesterday").
    pub timestamp: String,
    pub sender: Sender,
    /// Only meaningful for `Sender::Me`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<DeliveryStatus>,
    /// Attached image as a `data:` URI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Marks an in-flight placeholder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_loading: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<Source>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to_message_id: Option<MessageId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to_sender: Option<String>,
}

impl Message {
    /// Create a plain text message with no optional fields set.
    pub fn new(id: MessageId, sender: Sender, text: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            timestamp: timestamp.into(),
            sender,
            status: None,
            image_url: None,
            is_loading: None,
            sources: None,
            reply_to_message_id: None,
            reply_to_text: None,
            reply_to_sender: None,
        }
    }

    /// Builder-style setter for the delivery status.
    pub fn with_status(mut self, status: DeliveryStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Whether this message carries an image attachment.
    pub fn has_image(&self) -> bool {
        self.image_url.is_some()
    }

    /// Whether this message is an in-flight placeholder.
    pub fn is_loading(&self) -> bool {
        self.is_loading.unwrap_or(false)
    }

    /// Text shown in the conversation list when this is the last message.
    pub fn preview(&self) -> String {
        if self.has_image() {
            IMAGE_PREVIEW.to_string()
        } else {
            preview_text(&self.text)
        }
    }

    /// Text used when another message quotes this one.
    pub fn quote_text(&self) -> String {
        if self.has_image() {
            IMAGE_PREVIEW.to_string()
        } else {
            self.text.clone()
        }
    }
}

/// Truncate `text` to [`PREVIEW_MAX_CHARS`] characters, appending `...`
/// when anything was cut. Counts chars, so multi-byte text never splits.
pub fn preview_text(text: &str) -> String {
    match text.char_indices().nth(PREVIEW_MAX_CHARS) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// A named thread of messages with an AI contact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: ConversationId,
    pub name: String,
    #[serde(default)]
    pub avatar_url: String,
    pub last_message: String,
    pub last_message_timestamp: String,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub is_typing: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personality: Option<String>,
    #[serde(default)]
    pub is_pinned: bool,
    #[serde(default)]
    pub is_archived: bool,
}

impl Conversation {
    /// Create an empty conversation showing the empty-state preview.
    pub fn new(id: ConversationId, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id,
            avatar_url: avatar_url_for(&name),
            name,
            last_message: EMPTY_PREVIEW.to_string(),
            last_message_timestamp: JUST_NOW.to_string(),
            messages: Vec::new(),
            is_typing: false,
            personality: None,
            is_pinned: false,
            is_archived: false,
        }
    }

    /// The most recent message, if any.
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn message(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn message_mut(&mut self, id: MessageId) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| m.id == id)
    }

    /// Recompute `last_message` / `last_message_timestamp` from the tail,
    /// falling back to the empty-state values.
    pub fn refresh_preview(&mut self) {
        match self.messages.last() {
            Some(last) => {
                self.last_message = last.preview();
                self.last_message_timestamp = last.timestamp.clone();
            }
            None => {
                self.last_message = EMPTY_PREVIEW.to_string();
                self.last_message_timestamp = JUST_NOW.to_string();
            }
        }
    }

    /// Label used for this contact's lines in prompts.
    pub fn speaker_label(&self, sender: Sender, me_label: &str) -> String {
        match sender {
            Sender::Me => me_label.to_string(),
            _ => self.name.clone(),
        }
    }
}

/// Placeholder avatar URL derived from a contact name.
pub fn avatar_url_for(name: &str) -> String {
    let seed: String = name
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    format!("https://picsum.photos/seed/{seed}/100/100")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_text_short_is_unchanged() {
        assert_eq!(preview_text("hello"), "hello");
    }

    #[test]
    fn test_preview_text_exactly_thirty_chars() {
        let text = "a".repeat(30);
        assert_eq!(preview_text(&text), text);
    }

    #[test]
    fn test_preview_text_truncates_long_text() {
        let text = "The quick brown fox jumps over the lazy dog";
        assert_eq!(preview_text(text), "The quick brown fox jumps over...");
    }

    #[test]
    fn test_preview_text_multibyte_does_not_split() {
        let text = "é".repeat(40);
        let preview = preview_text(&text);
        assert_eq!(preview.chars().count(), 33);
        assert!(preview.ends_with("..."));
    }

    #[test]
    fn test_image_message_preview() {
        let mut message = Message::new(MessageId(1), Sender::Me, "", "10:00 AM");
        message.image_url = Some("data:image/png;base64,AAAA".to_string());
        assert_eq!(message.preview(), IMAGE_PREVIEW);
        assert_eq!(message.quote_text(), IMAGE_PREVIEW);
    }

    #[test]
    fn test_refresh_preview_empty_conversation() {
        let mut convo = Conversation::new(ConversationId(1), "Eva");
        convo.last_message = "stale".to_string();
        convo.refresh_preview();
        assert_eq!(convo.last_message, EMPTY_PREVIEW);
        assert_eq!(convo.last_message_timestamp, JUST_NOW);
    }

    #[test]
    fn test_sender_roundtrip() {
        for sender in [Sender::Me, Sender::Other, Sender::System] {
            let parsed: Sender = sender.to_string().parse().unwrap();
            assert_eq!(parsed, sender);
        }
    }

    #[test]
    fn test_message_serializes_camel_case_and_skips_none() {
        let mut message = Message::new(MessageId(7), Sender::Me, "hi", "10:00 AM")
            .with_status(DeliveryStatus::Sent);
        message.reply_to_message_id = Some(MessageId(3));
        let json = serde_json::to_string(&message).unwrap();
        assert!(json.contains("\"replyToMessageId\":3"));
        assert!(json.contains("\"status\":\"sent\""));
        assert!(!json.contains("imageUrl"));
        assert!(!json.contains("isLoading"));
    }

    #[test]
    fn test_conversation_deserializes_with_missing_flags() {
        let json = r#"{
            "id": 2,
            "name": "Bob",
            "lastMessage": "Sounds good",
            "lastMessageTimestamp": "Yesterday",
            "messages": [
                {"id": 1, "text": "Meeting at 3", "timestamp": "Yesterday", "sender": "other"}
            ]
        }"#;
        let convo: Conversation = serde_json::from_str(json).unwrap();
        assert_eq!(convo.id, ConversationId(2));
        assert!(!convo.is_pinned);
        assert!(!convo.is_typing);
        assert_eq!(convo.messages[0].sender, Sender::Other);
    }

    #[test]
    fn test_avatar_url_for_name() {
        assert_eq!(
            avatar_url_for("Design Team"),
            "https://picsum.photos/seed/designteam/100/100"
        );
    }
}
