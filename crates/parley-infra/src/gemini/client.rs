//! GeminiClient -- concrete [`GenerationClient`] implementation for Gemini.
//!
//! Text goes through `models/{model}:generateContent` (one-shot) and
//! `models/{model}:streamGenerateContent?alt=sse` (streaming). Images go
//! through the Imagen `models/{model}:predict` endpoint.
//!
//! The API key is wrapped in [`secrecy::SecretString`] and is only exposed
//! when building request headers.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};

use parley_core::generation::{ChunkStream, GenerationClient};
use parley_types::config::ModelConfig;
use parley_types::generation::{GeneratedImage, GenerationError, GenerationRequest};

use super::streaming::create_gemini_stream;
use super::types::{ApiErrorEnvelope, GeminiRequest, GenerateContentResponse, PredictRequest, PredictResponse};

/// Header carrying the API key.
pub(crate) const API_KEY_HEADER: &str = "x-goog-api-key";

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const MISSING_KEY: &str = "AI service not available. API key might be missing.";

/// Gemini generation backend.
///
/// Constructs without a key; every call then fails with
/// [`GenerationError::Configuration`].
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: Option<SecretString>,
    base_url: String,
    text_model: String,
    image_model: String,
}

// No Debug: keeps the client out of `{:?}` dumps alongside its key.

impl GeminiClient {
    /// Create a client for `models`, authenticating with `api_key`.
    pub fn new(api_key: Option<SecretString>, models: &ModelConfig) -> Self {
        if api_key.is_none() {
            tracing::warn!("no Gemini API key configured; generation calls will fail");
        }
        Self {
            client: http_client(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            text_model: models.text.clone(),
            image_model: models.image.clone(),
        }
    }

    /// A client with no key and default models.
    pub fn unconfigured() -> Self {
        Self::new(None, &ModelConfig::default())
    }

    /// Override the base URL (useful for testing or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn text_model(&self) -> &str {
        &self.text_model
    }

    pub fn image_model(&self) -> &str {
        &self.image_model
    }

    fn model_url(&self, model: &str, method: &str) -> String {
        format!("{}/models/{model}:{method}", self.base_url)
    }

    fn key(&self) -> Result<&SecretString, GenerationError> {
        self.api_key
            .as_ref()
            .ok_or_else(|| GenerationError::Configuration(MISSING_KEY.to_string()))
    }

    async fn post_json<T, R>(&self, url: &str, body: &T) -> Result<R, GenerationError>
    where
        T: serde::Serialize + ?Sized,
        R: serde::de::DeserializeOwned,
    {
        let key = self.key()?;
        let response = self
            .client
            .post(url)
            .header(API_KEY_HEADER, key.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(map_status(status, &error_body));
        }

        response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(format!("failed to parse response: {e}")))
    }
}

impl GenerationClient for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    #[tracing::instrument(
        name = "generate_content",
        skip_all,
        fields(
            gen_ai.provider.name = "gemini",
            gen_ai.request.model = %self.text_model,
            web_search = request.web_search,
        )
    )]
    async fn generate_text(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let url = self.model_url(&self.text_model, "generateContent");

        let response: GenerateContentResponse =
            self.post_json(&url, &GeminiRequest::from(request)).await?;

        if let Some(reason) = response.block_reason() {
            return Err(GenerationError::InvalidRequest(format!("prompt blocked: {reason}")));
        }
        if response.candidates.is_empty() {
            return Err(GenerationError::InvalidResponse("no candidates returned".to_string()));
        }
        Ok(response.text())
    }

    #[tracing::instrument(
        name = "predict",
        skip_all,
        fields(gen_ai.provider.name = "gemini", gen_ai.request.model = %self.image_model)
    )]
    async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage, GenerationError> {
        let url = self.model_url(&self.image_model, "predict");

        let response: PredictResponse = self
            .post_json(&url, &PredictRequest::single_image(prompt))
            .await?;
        decode_prediction(response)
    }

    fn generate_text_stream(&self, request: GenerationRequest) -> ChunkStream {
        let key = match self.key() {
            Ok(key) => key.clone(),
            Err(e) => return Box::pin(futures_util::stream::once(async move { Err(e) })),
        };
        let url = format!(
            "{}?alt=sse",
            self.model_url(&self.text_model, "streamGenerateContent")
        );
        tracing::debug!(
            gen_ai.provider.name = "gemini",
            gen_ai.request.model = %self.text_model,
            web_search = request.web_search,
            "streamGenerateContent"
        );

        create_gemini_stream(self.client.clone(), url, GeminiRequest::from(&request), key)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(300))
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!("failed to build HTTP client with timeouts: {e}");
            reqwest::Client::new()
        })
}

/// First prediction's image bytes. Imagen answers JPEG unless told otherwise.
fn decode_prediction(response: PredictResponse) -> Result<GeneratedImage, GenerationError> {
    let prediction = response
        .predictions
        .into_iter()
        .find(|p| p.bytes_base64_encoded.is_some())
        .ok_or_else(|| GenerationError::InvalidResponse("No image was generated.".to_string()))?;

    let encoded = prediction.bytes_base64_encoded.unwrap_or_default();
    let bytes = STANDARD
        .decode(encoded.as_bytes())
        .map_err(|e| GenerationError::InvalidResponse(format!("invalid image data: {e}")))?;

    Ok(GeneratedImage {
        mime_type: prediction.mime_type.unwrap_or_else(|| "image/jpeg".to_string()),
        bytes,
    })
}

/// Map a non-success HTTP status to the generation error taxonomy.
pub(crate) fn map_status(status: StatusCode, body: &str) -> GenerationError {
    let message = serde_json::from_str::<ApiErrorEnvelope>(body)
        .map(|envelope| match envelope.error.status {
            Some(code) => format!("{code}: {}", envelope.error.message),
            None => envelope.error.message,
        })
        .unwrap_or_else(|_| body.trim().to_string());
    let detail = format!("HTTP {}: {message}", status.as_u16());

    match status.as_u16() {
        401 | 403 => GenerationError::Configuration(detail),
        408 | 429 | 500..=599 => GenerationError::Transient(detail),
        400..=499 => GenerationError::InvalidRequest(detail),
        _ => GenerationError::InvalidResponse(detail),
    }
}

/// Transport failures (connect, timeout, reset) are worth retrying; a body
/// that fails to decode is not.
pub(crate) fn map_transport_error(err: reqwest::Error) -> GenerationError {
    if err.is_decode() {
        GenerationError::InvalidResponse(format!("HTTP response unreadable: {err}"))
    } else {
        GenerationError::Transient(format!("HTTP request failed: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use futures_util::StreamExt;

    use super::*;
    use crate::gemini::types::Prediction;

    fn make_client() -> GeminiClient {
        GeminiClient::new(
            Some(SecretString::from("test-key-not-real")),
            &ModelConfig::default(),
        )
    }

    #[test]
    fn test_client_name() {
        assert_eq!(make_client().name(), "gemini");
    }

    #[test]
    fn test_default_models() {
        let client = make_client();
        assert!(client.is_configured());
        assert_eq!(client.text_model(), "gemini-2.5-flash");
        assert_eq!(client.image_model(), "imagen-4.0-generate-001");
    }

    #[test]
    fn test_model_urls() {
        let client = make_client().with_base_url("http://localhost:8080/v1beta/");
        assert_eq!(
            client.model_url("gemini-2.5-flash", "generateContent"),
            "http://localhost:8080/v1beta/models/gemini-2.5-flash:generateContent"
        );
        assert_eq!(
            client.model_url("imagen-4.0-generate-001", "predict"),
            "http://localhost:8080/v1beta/models/imagen-4.0-generate-001:predict"
        );
    }

    #[tokio::test]
    async fn test_missing_key_fails_fast_on_every_call() {
        let client = GeminiClient::unconfigured();
        assert!(!client.is_configured());

        let text = client.generate_text(&GenerationRequest::text("hi")).await;
        assert!(matches!(text, Err(GenerationError::Configuration(_))));

        let image = client.generate_image("a cat").await;
        assert!(matches!(image, Err(GenerationError::Configuration(_))));

        let items: Vec<_> = client
            .generate_text_stream(GenerationRequest::text("hi"))
            .collect()
            .await;
        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Err(GenerationError::Configuration(_))));
    }

    #[test]
    fn test_status_mapping() {
        let auth = map_status(StatusCode::FORBIDDEN, "");
        assert!(matches!(auth, GenerationError::Configuration(_)));

        let unauthorized = map_status(StatusCode::UNAUTHORIZED, "");
        assert!(matches!(unauthorized, GenerationError::Configuration(_)));

        assert!(map_status(StatusCode::TOO_MANY_REQUESTS, "").is_transient());
        assert!(map_status(StatusCode::SERVICE_UNAVAILABLE, "").is_transient());
        assert!(map_status(StatusCode::REQUEST_TIMEOUT, "").is_transient());

        let bad = map_status(StatusCode::BAD_REQUEST, "");
        assert!(matches!(bad, GenerationError::InvalidRequest(_)));
    }

    #[test]
    fn test_status_message_from_error_envelope() {
        let body = r#"{"error": {"code": 400, "message": "API key not valid.", "status": "INVALID_ARGUMENT"}}"#;
        let err = map_status(StatusCode::BAD_REQUEST, body);
        assert_eq!(
            err,
            GenerationError::InvalidRequest(
                "HTTP 400: INVALID_ARGUMENT: API key not valid.".to_string()
            )
        );
    }

    #[test]
    fn test_status_message_falls_back_to_raw_body() {
        let err = map_status(StatusCode::BAD_GATEWAY, "upstream down\n");
        assert_eq!(err, GenerationError::Transient("HTTP 502: upstream down".to_string()));
    }

    #[test]
    fn test_decode_prediction() {
        let response = PredictResponse {
            predictions: vec![Prediction {
                bytes_base64_encoded: Some(STANDARD.encode([0xFF, 0xD8, 0xFF])),
                mime_type: None,
            }],
        };
        let image = decode_prediction(response).unwrap();
        assert_eq!(image.mime_type, "image/jpeg");
        assert_eq!(image.bytes, vec![0xFF, 0xD8, 0xFF]);
    }

    #[test]
    fn test_decode_prediction_without_images() {
        let err = decode_prediction(PredictResponse::default()).unwrap_err();
        assert_eq!(err, GenerationError::InvalidResponse("No image was generated.".to_string()));
    }

    #[test]
    fn test_decode_prediction_rejects_bad_base64() {
        let response = PredictResponse {
            predictions: vec![Prediction {
                bytes_base64_encoded: Some("***".to_string()),
                mime_type: Some("image/png".to_string()),
            }],
        };
        assert!(matches!(
            decode_prediction(response),
            Err(GenerationError::InvalidResponse(_))
        ));
    }
}
