//! Scripted generation client shared by the unit tests in this crate.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use parley_types::generation::{GeneratedImage, GenerationError, GenerationRequest, StreamChunk};
use tokio::sync::oneshot;

use crate::generation::client::{ChunkStream, GenerationClient};

type ChunkResult = Result<StreamChunk, GenerationError>;

/// How a scripted stream behaves.
pub enum ScriptedStream {
    /// Yield every item, then end.
    Items(Vec<ChunkResult>),
    /// Yield `first`, wait for the gate to fire (or drop), then yield `rest`.
    Gated {
        first: Vec<ChunkResult>,
        gate: oneshot::Receiver<()>,
        rest: Vec<ChunkResult>,
    },
    /// Yield `first`, then never finish.
    Stalled(Vec<ChunkResult>),
}

/// Queued responses and recorded requests.
#[derive(Default)]
pub struct Script {
    texts: Mutex<VecDeque<Result<String, GenerationError>>>,
    images: Mutex<VecDeque<Result<GeneratedImage, GenerationError>>>,
    streams: Mutex<VecDeque<ScriptedStream>>,
    requests: Mutex<Vec<GenerationRequest>>,
    image_prompts: Mutex<Vec<String>>,
    text_calls: AtomicUsize,
    image_calls: AtomicUsize,
}

impl Script {
    pub fn push_text(&self, response: Result<String, GenerationError>) {
        self.texts.lock().unwrap().push_back(response);
    }

    pub fn push_image(&self, response: Result<GeneratedImage, GenerationError>) {
        self.images.lock().unwrap().push_back(response);
    }

    pub fn push_stream(&self, items: Vec<ChunkResult>) {
        self.push_scripted_stream(ScriptedStream::Items(items));
    }

    pub fn push_scripted_stream(&self, stream: ScriptedStream) {
        self.streams.lock().unwrap().push_back(stream);
    }

    /// Every text and stream request received, in order.
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn image_prompts(&self) -> Vec<String> {
        self.image_prompts.lock().unwrap().clone()
    }

    pub fn text_calls(&self) -> usize {
        self.text_calls.load(Ordering::SeqCst)
    }

    pub fn image_calls(&self) -> usize {
        self.image_calls.load(Ordering::SeqCst)
    }
}

/// A `GenerationClient` that replays a [`Script`].
pub struct ScriptedClient {
    script: Arc<Script>,
}

impl ScriptedClient {
    pub fn new() -> (Self, Arc<Script>) {
        let script = Arc::new(Script::default());
        (
            Self {
                script: Arc::clone(&script),
            },
            script,
        )
    }
}

impl GenerationClient for ScriptedClient {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate_text(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        self.script.text_calls.fetch_add(1, Ordering::SeqCst);
        self.script.requests.lock().unwrap().push(request.clone());
        let next = self.script.texts.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Err(GenerationError::InvalidResponse("script exhausted".into())))
    }

    async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage, GenerationError> {
        self.script.image_calls.fetch_add(1, Ordering::SeqCst);
        self.script.image_prompts.lock().unwrap().push(prompt.to_string());
        let next = self.script.images.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Err(GenerationError::InvalidResponse("script exhausted".into())))
    }

    fn generate_text_stream(&self, request: GenerationRequest) -> ChunkStream {
        self.script.requests.lock().unwrap().push(request);
        let next = self.script.streams.lock().unwrap().pop_front();
        match next.unwrap_or(ScriptedStream::Items(Vec::new())) {
            ScriptedStream::Items(items) => Box::pin(futures_util::stream::iter(items)),
            ScriptedStream::Gated { first, gate, rest } => Box::pin(async_stream::stream! {
                for item in first {
                    yield item;
                }
                let _ = gate.await;
                for item in rest {
                    yield item;
                }
            }),
            ScriptedStream::Stalled(first) => Box::pin(async_stream::stream! {
                for item in first {
                    yield item;
                }
                std::future::pending::<()>().await;
            }),
        }
    }
}
