//! Observability for Capsule.
//! `tracing` crate with `EnvFilter`, named structured events.

pub mod events;
pub mod setup;

pub use setup::{init_tracing, init_tracing_json};
