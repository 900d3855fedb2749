//! Observability setup for Entrance: tracing subscriber initialization.

pub mod tracing_setup;

pub use tracing_setup::{LogFormat, default_directive, init_tracing};
