//! Global configuration types for Parley.
//!
//! `ParleyConfig` represents the top-level `config.toml` that controls the
//! generation models, the one-shot retry policy, and the history windows
//! used when building prompts.

use serde::{Deserialize, Serialize};

/// Top-level configuration for Parley.
///
/// Loaded from `~/.parley/config.toml`. All fields have sensible defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParleyConfig {
    #[serde(default)]
    pub models: ModelConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub history: HistoryConfig,
}

/// Model identifiers used by the generation backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model for chat replies, summaries, suggestions and rewrites.
    #[serde(default = "default_text_model")]
    pub text: String,
    /// Model for `/imagine`.
    #[serde(default = "default_image_model")]
    pub image: String,
}

fn default_text_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_image_model() -> String {
    "imagen-4.0-generate-001".to_string()
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            text: default_text_model(),
            image: default_image_model(),
        }
    }
}

/// Bounded exponential backoff for one-shot generation calls.
///
/// `max_retries` counts retries, so a call is attempted `max_retries + 1`
/// times in total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: u32,
}

fn default_max_retries() -> u32 {
    2
}

fn default_initial_delay_ms() -> u64 {
    1000
}

fn default_backoff_factor() -> u32 {
    2
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay_ms(),
            backoff_factor: default_backoff_factor(),
        }
    }
}

/// How many trailing messages feed each prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_reply_window")]
    pub reply_window: usize,
    #[serde(default = "default_summary_window")]
    pub summary_window: usize,
}

fn default_reply_window() -> usize {
    10
}

fn default_summary_window() -> usize {
    20
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            reply_window: default_reply_window(),
            summary_window: default_summary_window(),
        }
    }
}
