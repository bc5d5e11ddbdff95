//! GenerationClient trait definition.
//!
//! The single seam between the conversation store and a generative-AI
//! backend. Uses RPITIT for the one-shot calls and `Pin<Box<dyn Stream>>`
//! for streaming so the trait can be wrapped by `BoxGenerationClient`.

use std::pin::Pin;

use futures_util::Stream;

use parley_types::generation::{GeneratedImage, GenerationError, GenerationRequest, StreamChunk};

/// Boxed stream of reply chunks.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, GenerationError>> + Send + 'static>>;

/// Trait for generation backends (Gemini, test doubles).
///
/// Implementations live in parley-infra. An implementation that cannot
/// reach its backend (missing API key) still constructs, and fails every
/// call with `GenerationError::Configuration`.
pub trait GenerationClient: Send + Sync {
    /// Human-readable backend name (e.g., "gemini").
    fn name(&self) -> &str;

    /// Generate a complete text response.
    fn generate_text(
        &self,
        request: &GenerationRequest,
    ) -> impl std::future::Future<Output = Result<String, GenerationError>> + Send;

    /// Generate a single image from a text prompt.
    fn generate_image(
        &self,
        prompt: &str,
    ) -> impl std::future::Future<Output = Result<GeneratedImage, GenerationError>> + Send;

    /// Stream a text response chunk by chunk.
    ///
    /// The stream ends after the final chunk; a failure is delivered as an
    /// `Err` item and nothing follows it.
    fn generate_text_stream(&self, request: GenerationRequest) -> ChunkStream;
}
