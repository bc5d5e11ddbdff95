//! Interactive CLI chat for Parley.
//!
//! Renders a conversation live from store snapshots while reading composer
//! lines: plain messages, `/imagine`, `/summarize`, and chat-only slash
//! commands. Entry point: `loop_runner::run_chat_loop`.

pub mod banner;
pub mod commands;
pub mod input;
pub mod loop_runner;
pub mod renderer;
