//! Conversation state engine and AI orchestration for Parley.
//!
//! This crate owns the conversation store, the reply/image/summary
//! orchestrations and the "ports" the infrastructure layer implements
//! (`GenerationClient`, `KvStore`). It depends only on `parley-types`,
//! never on `parley-infra` or any HTTP/database crate.

pub mod chat;
pub mod event;
pub mod generation;
pub mod storage;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testing;
