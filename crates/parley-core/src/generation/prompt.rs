//! Prompt construction for replies, summaries and compose assistance.
//!
//! Every request the orchestrators send is assembled here from a
//! conversation snapshot, so the exact wording lives in one place.

use parley_types::conversation::{Conversation, Message, MessageId, Sender};
use parley_types::generation::{ContentPart, GenerationError, GenerationRequest};

/// Label substituted for image messages in prompt transcripts.
const IMAGE_LINE: &str = "[Sent an image]";

const IMAGE_REACTION_PROMPT: &str = "The user just sent this image. Describe it or react to it.";

/// Tones offered by the rewrite assistant.
pub const REWRITE_TONES: [&str; 4] = ["Professional", "Casual", "Friendly", "Excited"];

/// Inline image payload parsed from a `data:` URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: String,
    pub data: String,
}

/// Split a `data:<mime>;base64,<payload>` URI into its parts.
///
/// Returns `None` for anything else, including empty mime or payload.
pub fn parse_data_url(url: &str) -> Option<InlineImage> {
    let rest = url.strip_prefix("data:")?;
    let (mime_type, data) = rest.split_once(";base64,")?;
    if mime_type.is_empty() || data.is_empty() {
        return None;
    }
    Some(InlineImage {
        mime_type: mime_type.to_string(),
        data: data.to_string(),
    })
}

/// Messages visible to the reply started by `trigger`: everything up to
/// and including it. Without a trigger, the whole conversation.
///
/// A trigger deleted before the reply ran is matched by id order instead,
/// since message ids grow monotonically.
fn replying_to(conversation: &Conversation, trigger: Option<MessageId>) -> &[Message] {
    let messages = conversation.messages.as_slice();
    let Some(trigger) = trigger else {
        return messages;
    };
    let end = match messages.iter().position(|m| m.id == trigger) {
        Some(index) => index + 1,
        None => messages.iter().take_while(|m| m.id < trigger).count(),
    };
    &messages[..end]
}

/// Build the streaming request for the contact's reply to `trigger`.
///
/// When the triggering message is an image from the user the request
/// carries the image inline and asks for a reaction. Otherwise the last
/// `window` messages up to the trigger become a transcript prompt, with web
/// grounding if requested.
pub fn reply_request(
    conversation: &Conversation,
    trigger: Option<MessageId>,
    use_web_search: bool,
    window: usize,
) -> Result<GenerationRequest, GenerationError> {
    let visible = replying_to(conversation, trigger);
    let last = visible.last();

    if let Some(message) = last.filter(|m| m.sender == Sender::Me && m.has_image()) {
        let url = message.image_url.as_deref().unwrap_or_default();
        let image = parse_data_url(url)
            .ok_or_else(|| GenerationError::InvalidRequest("Invalid image format.".to_string()))?;
        let instruction = conversation.personality.clone().unwrap_or_else(|| {
            format!(
                "You are acting as {}. Your personality is friendly and a bit witty. Keep your response to 1-2 short sentences.",
                conversation.name
            )
        });
        return Ok(GenerationRequest {
            parts: vec![
                ContentPart::Text {
                    text: IMAGE_REACTION_PROMPT.to_string(),
                },
                ContentPart::InlineData {
                    mime_type: image.mime_type,
                    data: image.data,
                },
            ],
            ..Default::default()
        }
        .with_system_instruction(instruction));
    }

    let history = transcript(conversation, visible.iter(), window, "You");
    let context = last.map(reply_context).unwrap_or_default();
    let prompt = format!(
        "{context}Based on the last few messages, continue the conversation naturally. Do not repeat what was just said.\n\nRecent conversation:\n{history}\n\nYour turn to reply as {}:",
        conversation.name
    );
    let instruction = conversation.personality.clone().unwrap_or_else(|| {
        format!(
            "You are {}, having a casual chat. Your personality is friendly and a bit witty. Keep your response to 1-2 short sentences.",
            conversation.name
        )
    });

    Ok(GenerationRequest::text(prompt)
        .with_system_instruction(instruction)
        .with_web_search(use_web_search))
}

/// Prefix describing the quoted message when the trigger is a reply.
fn reply_context(message: &Message) -> String {
    if message.reply_to_message_id.is_none() {
        return String::new();
    }
    let quoted = match message.reply_to_text.as_deref() {
        Some(text) => format!("\"{text}\""),
        None => "a previous message".to_string(),
    };
    format!(
        "Context: You are replying to a message from {} that said: {quoted}.\n\n",
        message.reply_to_sender.as_deref().unwrap_or_default()
    )
}

/// Build the one-shot summary request over the last `window` non-system messages.
pub fn summary_request(conversation: &Conversation, window: usize) -> GenerationRequest {
    let visible = conversation.messages.iter().filter(|m| m.sender != Sender::System);
    let history = transcript(conversation, visible, window, "User");
    GenerationRequest::text(format!(
        "Please provide a concise, one-paragraph summary of the following conversation:\n\n{history}"
    ))
}

pub fn suggestions_prompt(message: &str) -> String {
    format!(
        "Generate 3 short, casual, and friendly reply suggestions for this message. Each suggestion should be a single sentence and not enclosed in quotes. Message: \"{message}\""
    )
}

pub fn rewrite_prompt(message: &str, tone: &str) -> String {
    format!(
        "Rewrite the following message in a {tone} tone. Return only the rewritten message, without any extra text or quotes. Original message: \"{message}\""
    )
}

/// Render the trailing `window` messages as `Speaker: text` lines.
fn transcript<'a>(
    conversation: &Conversation,
    messages: impl DoubleEndedIterator<Item = &'a Message>,
    window: usize,
    me_label: &str,
) -> String {
    let mut tail: Vec<&Message> = messages.rev().take(window).collect();
    tail.reverse();
    tail.iter()
        .map(|m| {
            let text = if m.has_image() { IMAGE_LINE } else { m.text.as_str() };
            format!("{}: {text}", conversation.speaker_label(m.sender, me_label))
        })
        .collect::<Vec<_>>()
        .join("\n")
}
