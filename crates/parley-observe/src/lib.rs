//! Observability for Parley: structured logging via `tracing`, with an
//! optional OpenTelemetry bridge for local span inspection.

pub mod tracing_setup;

pub use tracing_setup::{LogOptions, init_tracing, shutdown_tracing};
