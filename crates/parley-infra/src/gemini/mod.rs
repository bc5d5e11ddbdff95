//! Gemini generation backend.
//!
//! This module provides the [`GeminiClient`] which implements the
//! [`GenerationClient`](parley_core::generation::GenerationClient) trait over
//! the Gemini REST API, including SSE streaming and Imagen image generation.

pub mod client;
pub mod streaming;
pub mod types;

pub use client::GeminiClient;
