//! One-shot orchestrations and the retry policy they share.

pub mod assist;
pub mod image;
pub mod retry;
pub mod summary;

pub use assist::ComposeAssist;
pub use image::{ImageOutcome, ImageRequestWorkflow};
pub use retry::RetryPolicy;
pub use summary::{SummaryOutcome, SummaryWorkflow};
