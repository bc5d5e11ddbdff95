//! Sample conversations shown on first launch.

use parley_types::conversation::{
    Conversation, ConversationId, DeliveryStatus, Message, MessageId, Sender,
};

use super::list::ConversationList;

fn message(id: u64, sender: Sender, text: &str, timestamp: &str) -> Message {
    let message = Message::new(MessageId(id), sender, text, timestamp);
    if sender == Sender::Me {
        message.with_status(DeliveryStatus::Read)
    } else {
        message
    }
}

fn contact(id: u64, name: &str, personality: &str, messages: Vec<Message>) -> Conversation {
    let mut conversation = Conversation::new(ConversationId(id), name);
    conversation.personality = Some(personality.to_string());
    conversation.messages = messages;
    conversation.refresh_preview();
    conversation
}

/// The four starter conversations used when nothing is persisted yet.
pub fn seed_conversations() -> ConversationList {
    let mut alice = contact(
        1,
        "Alice",
        "You are Alice, a friendly and slightly sarcastic friend. You enjoy witty banter.",
        vec![
            message(1, Sender::Other, "Hey, how is it going?", "10:40 AM"),
            message(2, Sender::Me, "Pretty good! Just finishing up some work. You?", "10:41 AM"),
            message(3, Sender::Other, "Hey, are we still on for tonight?", "10:42 AM"),
        ],
    );
    alice.is_pinned = true;

    let bob = contact(
        2,
        "Bob",
        "You are Bob, a helpful and professional colleague. You are direct and to the point.",
        vec![
            message(1, Sender::Other, "Meeting is at 3 PM tomorrow.", "Yesterday"),
            message(2, Sender::Me, "Sounds good, see you then.", "Yesterday"),
        ],
    );

    let design_team = contact(
        3,
        "Design Team",
        "You are a creative assistant for a design team. You are enthusiastic and encouraging.",
        vec![message(1, Sender::Other, "I pushed the latest mockups to Figma.", "Yesterday")],
    );

    let charlie = contact(
        4,
        "Charlie",
        "You are Charlie, a casual and easy-going acquaintance.",
        vec![
            message(1, Sender::Me, "Have a great weekend!", "2 days ago"),
            message(2, Sender::Other, "You too!", "2 days ago"),
        ],
    );

    ConversationList::new(vec![alice, bob, design_team, charlie])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_has_four_contacts_in_order() {
        let seed = seed_conversations();
        let names: Vec<_> = seed.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Alice", "Bob", "Design Team", "Charlie"]);
    }

    #[test]
    fn seed_previews_mirror_last_message() {
        for conversation in seed_conversations().iter() {
            let last = conversation.last().unwrap();
            assert_eq!(conversation.last_message, last.text);
            assert_eq!(conversation.last_message_timestamp, last.timestamp);
            assert!(!conversation.is_typing);
        }
    }

    #[test]
    fn alice_is_pinned_and_user_messages_are_read() {
        let seed = seed_conversations();
        let alice = seed.find(ConversationId(1)).unwrap();
        assert!(alice.is_pinned);
        assert_eq!(alice.messages[1].status, Some(DeliveryStatus::Read));
        assert_eq!(alice.messages[0].status, None);
    }
}
