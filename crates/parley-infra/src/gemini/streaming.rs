//! SSE stream creation for `streamGenerateContent?alt=sse`.
//!
//! Each SSE `data:` payload is a complete `GenerateContentResponse` holding
//! the next text delta and, when search grounding ran, the grounding chunks
//! seen so far. There is no terminal sentinel; the stream simply ends.

use eventsource_stream::Eventsource;
use futures_util::{Stream, StreamExt};
use secrecy::{ExposeSecret, SecretString};

use parley_core::generation::ChunkStream;
use parley_types::generation::{GenerationError, StreamChunk};

use super::client::{API_KEY_HEADER, map_status, map_transport_error};
use super::types::{GeminiRequest, GenerateContentResponse};

/// Open a streaming connection and yield reply chunks.
///
/// Connection and HTTP status failures surface as the first (and only)
/// item. A malformed event ends the stream with an error.
pub fn create_gemini_stream(
    client: reqwest::Client,
    url: String,
    body: GeminiRequest,
    api_key: SecretString,
) -> ChunkStream {
    Box::pin(async_stream::try_stream! {
        let response = client
            .post(&url)
            .header(API_KEY_HEADER, api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let response = if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            Err::<reqwest::Response, _>(map_status(status, &error_body))?
        } else {
            response
        };

        let mut chunks = Box::pin(chunks_from_sse(response.bytes_stream()));
        while let Some(chunk) = chunks.next().await {
            yield chunk?;
        }
    })
}

/// Decode an SSE byte stream into reply chunks, skipping empty events.
pub fn chunks_from_sse<S, B, E>(
    bytes: S,
) -> impl Stream<Item = Result<StreamChunk, GenerationError>> + Send
where
    S: Stream<Item = Result<B, E>> + Send,
    B: AsRef<[u8]> + Send,
    E: std::fmt::Display + Send,
{
    bytes.eventsource().filter_map(|event| async move {
        match event {
            Ok(event) => parse_event(&event.data).transpose(),
            Err(e) => Some(Err(GenerationError::Stream(e.to_string()))),
        }
    })
}

/// Parse one SSE data payload. `Ok(None)` for keepalives and empty deltas.
pub fn parse_event(data: &str) -> Result<Option<StreamChunk>, GenerationError> {
    let data = data.trim();
    if data.is_empty() {
        return Ok(None);
    }

    let response: GenerateContentResponse = serde_json::from_str(data)
        .map_err(|e| GenerationError::InvalidResponse(format!("bad stream event: {e}")))?;

    if let Some(reason) = response.block_reason() {
        return Err(GenerationError::InvalidRequest(format!("prompt blocked: {reason}")));
    }

    let chunk = StreamChunk {
        text: response.text(),
        citations: response.citations(),
    };
    if chunk.text.is_empty() && chunk.citations.is_empty() {
        return Ok(None);
    }
    Ok(Some(chunk))
}
