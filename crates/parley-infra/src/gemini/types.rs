//! Gemini REST API types.
//!
//! Wire structures for `generateContent`, `streamGenerateContent` and the
//! Imagen `predict` endpoint. They are NOT the generic generation types from
//! parley-types; [`super::client`] converts between the two.

use serde::{Deserialize, Serialize};

use parley_types::conversation::Source;
use parley_types::generation::{ContentPart, GenerationRequest};

// ---------------------------------------------------------------------------
// generateContent request
// ---------------------------------------------------------------------------

/// Request body for `generateContent` and `streamGenerateContent`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiRequest {
    pub contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<GeminiTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GeminiGenerationConfig>,
}

impl From<&GenerationRequest> for GeminiRequest {
    fn from(request: &GenerationRequest) -> Self {
        let parts = request.parts.iter().map(GeminiPart::from).collect();
        let tools = if request.web_search {
            vec![GeminiTool {
                google_search: Some(GoogleSearch {}),
            }]
        } else {
            Vec::new()
        };
        let generation_config = request
            .response_schema
            .clone()
            .map(|schema| GeminiGenerationConfig {
                response_mime_type: Some("application/json".to_string()),
                response_json_schema: Some(schema),
            });

        Self {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts,
            }],
            system_instruction: request.system_instruction.as_ref().map(|text| GeminiContent {
                role: None,
                parts: vec![GeminiPart::text(text.clone())],
            }),
            tools,
            generation_config,
        }
    }
}

/// A turn of content: a role plus ordered parts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<GeminiPart>,
}

/// One part of a content turn. Exactly one field is set on the wire.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<GeminiBlob>,
}

impl GeminiPart {
    pub fn text(text: String) -> Self {
        Self {
            text: Some(text),
            inline_data: None,
        }
    }
}

impl From<&ContentPart> for GeminiPart {
    fn from(part: &ContentPart) -> Self {
        match part {
            ContentPart::Text { text } => GeminiPart::text(text.clone()),
            ContentPart::InlineData { mime_type, data } => GeminiPart {
                text: None,
                inline_data: Some(GeminiBlob {
                    mime_type: mime_type.clone(),
                    data: data.clone(),
                }),
            },
        }
    }
}

/// Base64 inline binary data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiBlob {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiTool {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_search: Option<GoogleSearch>,
}

/// Enables search grounding. Serializes as `{}`.
#[derive(Debug, Clone, Serialize)]
pub struct GoogleSearch {}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_json_schema: Option<serde_json::Value>,
}

// ---------------------------------------------------------------------------
// generateContent response (also the payload of each SSE event)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate's parts.
    pub fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }

    /// Web sources from the first candidate's grounding metadata.
    ///
    /// Chunks without a web source (or without a URI) are skipped.
    pub fn citations(&self) -> Vec<Source> {
        self.candidates
            .first()
            .and_then(|c| c.grounding_metadata.as_ref())
            .map(|meta| {
                meta.grounding_chunks
                    .iter()
                    .filter_map(|chunk| chunk.web.as_ref())
                    .filter_map(|web| {
                        let uri = web.uri.clone()?;
                        Some(Source {
                            title: web.title.clone().unwrap_or_else(|| uri.clone()),
                            uri,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Reason the prompt was rejected, if it was.
    pub fn block_reason(&self) -> Option<&str> {
        self.prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<GeminiContent>,
    #[serde(default)]
    pub grounding_metadata: Option<GroundingMetadata>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroundingMetadata {
    #[serde(default)]
    pub grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroundingChunk {
    #[serde(default)]
    pub web: Option<WebSource>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebSource {
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}

// ---------------------------------------------------------------------------
// Imagen predict
// ---------------------------------------------------------------------------

/// Request body for `models/{image_model}:predict`.
#[derive(Debug, Clone, Serialize)]
pub struct PredictRequest {
    pub instances: Vec<PredictInstance>,
    pub parameters: PredictParameters,
}

impl PredictRequest {
    /// One square JPEG for `prompt`.
    pub fn single_image(prompt: &str) -> Self {
        Self {
            instances: vec![PredictInstance {
                prompt: prompt.to_string(),
            }],
            parameters: PredictParameters {
                sample_count: 1,
                output_mime_type: "image/jpeg".to_string(),
                aspect_ratio: "1:1".to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PredictInstance {
    pub prompt: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictParameters {
    pub sample_count: u32,
    pub output_mime_type: String,
    pub aspect_ratio: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PredictResponse {
    #[serde(default)]
    pub predictions: Vec<Prediction>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    #[serde(default)]
    pub bytes_base64_encoded: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
}

// ---------------------------------------------------------------------------
// Error envelope
// ---------------------------------------------------------------------------

/// `{"error": {"code": 400, "message": "...", "status": "INVALID_ARGUMENT"}}`
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorEnvelope {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_request_shape() {
        let request = GenerationRequest::text("Hi there").with_system_instruction("Be Alice");
        let body = serde_json::to_value(GeminiRequest::from(&request)).unwrap();

        assert_eq!(
            body,
            json!({
                "contents": [{"role": "user", "parts": [{"text": "Hi there"}]}],
                "systemInstruction": {"parts": [{"text": "Be Alice"}]}
            })
        );
    }

    #[test]
    fn test_web_search_adds_google_search_tool() {
        let request = GenerationRequest::text("news?").with_web_search(true);
        let body = serde_json::to_value(GeminiRequest::from(&request)).unwrap();
        assert_eq!(body["tools"], json!([{"googleSearch": {}}]));
    }

    #[test]
    fn test_inline_image_part_shape() {
        let request = GenerationRequest {
            parts: vec![
                ContentPart::Text {
                    text: "what is this?".to_string(),
                },
                ContentPart::InlineData {
                    mime_type: "image/png".to_string(),
                    data: "iVBORw0".to_string(),
                },
            ],
            ..Default::default()
        };
        let body = serde_json::to_value(GeminiRequest::from(&request)).unwrap();
        assert_eq!(
            body["contents"][0]["parts"][1],
            json!({"inlineData": {"mimeType": "image/png", "data": "iVBORw0"}})
        );
    }

    #[test]
    fn test_response_schema_sets_json_mime_type() {
        let schema = json!({"type": "object"});
        let request = GenerationRequest::text("suggest").with_response_schema(schema.clone());
        let body = serde_json::to_value(GeminiRequest::from(&request)).unwrap();
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(body["generationConfig"]["responseJsonSchema"], schema);
    }

    #[test]
    fn test_response_text_concatenates_parts() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Hel"}, {"text": "lo"}]},
                "finishReason": "STOP"
            }]
        }))
        .unwrap();
        assert_eq!(response.text(), "Hello");
        assert!(response.citations().is_empty());
    }

    #[test]
    fn test_citations_skip_non_web_chunks() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {"parts": [{"text": "It rained."}]},
                "groundingMetadata": {"groundingChunks": [
                    {"web": {"uri": "https://weather.example/today", "title": "Weather"}},
                    {"retrievedContext": {"uri": "gs://bucket/doc"}},
                    {"web": {"uri": "https://news.example/"}}
                ]}
            }]
        }))
        .unwrap();

        let citations = response.citations();
        assert_eq!(citations.len(), 2);
        assert_eq!(citations[0].title, "Weather");
        assert_eq!(citations[1].title, "https://news.example/");
    }

    #[test]
    fn test_empty_response_has_no_text() {
        let response: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(response.text(), "");
        assert!(response.block_reason().is_none());
    }

    #[test]
    fn test_predict_request_shape() {
        let body = serde_json::to_value(PredictRequest::single_image("a red fox")).unwrap();
        assert_eq!(
            body,
            json!({
                "instances": [{"prompt": "a red fox"}],
                "parameters": {"sampleCount": 1, "outputMimeType": "image/jpeg", "aspectRatio": "1:1"}
            })
        );
    }
}
