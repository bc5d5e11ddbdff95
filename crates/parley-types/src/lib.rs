//! Shared domain types for Parley.
//!
//! This crate contains the core domain types used across the Parley crates:
//! conversations, messages, generation requests/results, configuration, and
//! their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, thiserror.

pub mod config;
pub mod conversation;
pub mod error;
pub mod generation;
