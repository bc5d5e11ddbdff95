//! Generation request/response types for Parley.
//!
//! These types model the data shapes exchanged with a generative-AI
//! backend: one-shot and streaming text requests, streamed chunks with
//! optional web citations, generated images, and the error taxonomy.

use serde::{Deserialize, Serialize};

use crate::conversation::Source;

/// One piece of request content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    /// Base64-encoded inline binary data (e.g. an image the user sent).
    InlineData { mime_type: String, data: String },
}

/// Request for one-shot or streaming text generation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub parts: Vec<ContentPart>,
    /// Persona / system instruction forwarded verbatim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<String>,
    /// Ask the backend to ground the answer with web search.
    #[serde(default)]
    pub web_search: bool,
    /// JSON schema constraining the output to structured JSON.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<serde_json::Value>,
}

impl GenerationRequest {
    /// A request consisting of a single text prompt.
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            parts: vec![ContentPart::Text {
                text: prompt.into(),
            }],
            ..Default::default()
        }
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    pub fn with_web_search(mut self, enabled: bool) -> Self {
        self.web_search = enabled;
        self
    }

    pub fn with_response_schema(mut self, schema: serde_json::Value) -> Self {
        self.response_schema = Some(schema);
        self
    }

    /// Concatenated text of all text parts (inline data is skipped).
    pub fn prompt_text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                ContentPart::Text { text } => Some(text.as_str()),
                ContentPart::InlineData { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// An incremental piece of a streamed reply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamChunk {
    /// Text delta to append.
    pub text: String,
    /// Web citations surfaced with this chunk (may be empty).
    #[serde(default)]
    pub citations: Vec<Source>,
}

impl StreamChunk {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            citations: Vec::new(),
        }
    }
}

/// A single generated image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Errors from generation backend operations.
///
/// `Configuration` fails fast and is never retried; `Transient` is the only
/// class the retry policy re-attempts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    #[error("generation unavailable: {0}")]
    Configuration(String),

    #[error("transient failure: {0}")]
    Transient(String),

    #[error("stream error: {0}")]
    Stream(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl GenerationError {
    /// Whether retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, GenerationError::Transient(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_request_prompt_text() {
        let request = GenerationRequest::text("hello").with_system_instruction("be nice");
        assert_eq!(request.prompt_text(), "hello");
        assert_eq!(request.system_instruction.as_deref(), Some("be nice"));
        assert!(!request.web_search);
    }

    #[test]
    fn test_prompt_text_skips_inline_data() {
        let request = GenerationRequest {
            parts: vec![
                ContentPart::Text {
                    text: "look".to_string(),
                },
                ContentPart::InlineData {
                    mime_type: "image/png".to_string(),
                    data: "AAAA".to_string(),
                },
            ],
            ..Default::default()
        };
        assert_eq!(request.prompt_text(), "look");
    }

    #[test]
    fn test_only_transient_is_retryable() {
        assert!(GenerationError::Transient("timeout".into()).is_transient());
        assert!(!GenerationError::Configuration("no key".into()).is_transient());
        assert!(!GenerationError::Stream("reset".into()).is_transient());
        assert!(!GenerationError::InvalidResponse("empty".into()).is_transient());
    }

    #[test]
    fn test_generation_error_display() {
        let err = GenerationError::Configuration("API key missing".to_string());
        assert_eq!(err.to_string(), "generation unavailable: API key missing");
    }

    #[test]
    fn test_content_part_serde_tag() {
        let part = ContentPart::Text {
            text: "hi".to_string(),
        };
        let json = serde_json::to_string(&part).unwrap();
        assert_eq!(json, r#"{"type":"text","text":"hi"}"#);
    }
}
