//! BoxGenerationClient -- object-safe dynamic dispatch wrapper for GenerationClient.
//!
//! 1. `GenerationClientDyn` is the object-safe twin with boxed futures
//! 2. Blanket-impl `GenerationClientDyn` for all `T: GenerationClient`
//! 3. `BoxGenerationClient` wraps `Box<dyn GenerationClientDyn>` and delegates

use std::future::Future;
use std::pin::Pin;

use parley_types::generation::{GeneratedImage, GenerationError, GenerationRequest};

use super::client::{ChunkStream, GenerationClient};

/// Object-safe version of [`GenerationClient`] with boxed futures.
pub trait GenerationClientDyn: Send + Sync {
    fn name(&self) -> &str;

    fn generate_text_boxed<'a>(
        &'a self,
        request: &'a GenerationRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String, GenerationError>> + Send + 'a>>;

    fn generate_image_boxed<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<GeneratedImage, GenerationError>> + Send + 'a>>;

    fn generate_text_stream_boxed(&self, request: GenerationRequest) -> ChunkStream;
}

impl<T: GenerationClient> GenerationClientDyn for T {
    fn name(&self) -> &str {
        GenerationClient::name(self)
    }

    fn generate_text_boxed<'a>(
        &'a self,
        request: &'a GenerationRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String, GenerationError>> + Send + 'a>> {
        Box::pin(self.generate_text(request))
    }

    fn generate_image_boxed<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<GeneratedImage, GenerationError>> + Send + 'a>> {
        Box::pin(self.generate_image(prompt))
    }

    fn generate_text_stream_boxed(&self, request: GenerationRequest) -> ChunkStream {
        self.generate_text_stream(request)
    }
}

/// Type-erased generation client.
///
/// `GenerationClient` uses RPITIT and cannot be a trait object directly;
/// this wrapper is what the store, orchestrators and CLI hold.
pub struct BoxGenerationClient {
    inner: Box<dyn GenerationClientDyn + Send + Sync>,
}

impl BoxGenerationClient {
    pub fn new<T: GenerationClient + 'static>(client: T) -> Self {
        Self {
            inner: Box::new(client),
        }
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub async fn generate_text(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        self.inner.generate_text_boxed(request).await
    }

    pub async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage, GenerationError> {
        self.inner.generate_image_boxed(prompt).await
    }

    pub fn generate_text_stream(&self, request: GenerationRequest) -> ChunkStream {
        self.inner.generate_text_stream_boxed(request)
    }
}

impl std::fmt::Debug for BoxGenerationClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxGenerationClient")
            .field("name", &self.name())
            .finish()
    }
}
