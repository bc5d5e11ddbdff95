//! Generation backend abstraction and prompt assembly.

pub mod box_client;
pub mod client;
pub mod prompt;

pub use box_client::BoxGenerationClient;
pub use client::{ChunkStream, GenerationClient};
