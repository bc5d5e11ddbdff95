//! Infrastructure layer for Parley.
//!
//! Contains implementations of the traits defined in `parley-core`:
//! SQLite key-value persistence, the Gemini generation client, the
//! `config.toml` loader, and data-directory resolution.

pub mod config;
pub mod filesystem;
pub mod gemini;
pub mod sqlite;
