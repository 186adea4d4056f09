//! Tracing initialization and configuration.

use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static INIT: Once = Once::new();

fn filter() -> EnvFilter {
    EnvFilter::try_from_env("CAPSULE_LOG").unwrap_or_else(|_| EnvFilter::new("capsule=info"))
}

/// Initialize human-readable logging.
///
/// Reads `CAPSULE_LOG` for per-module levels, e.g.
/// `CAPSULE_LOG=capsule_storage=debug,capsule_batch=info`.
/// Falls back to `capsule=info`. Safe to call more than once.
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .with(filter())
            .init();
    });
}

/// Initialize structured JSON logging, for log shippers.
pub fn init_tracing_json() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_target(true)
            .json()
            .init();
    });
}
