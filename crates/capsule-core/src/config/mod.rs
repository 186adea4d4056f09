//! Configuration system for Capsule.
//! TOML-based, layered resolution: overrides > env > project > user > defaults.

pub mod auth_config;
pub mod batch_config;
pub mod capsule_config;
pub mod check_config;
pub mod store_config;

pub use auth_config::AuthConfig;
pub use batch_config::BatchConfig;
pub use capsule_config::{CapsuleConfig, ConfigOverrides};
pub use check_config::CheckConfig;
pub use store_config::StoreConfig;

use chrono::Duration;

/// Convert a configured span with `convert`, falling back to `default` units
/// when the value is unset or not representable.
pub(crate) fn span_or(
    value: Option<i64>,
    default: i64,
    convert: fn(i64) -> Option<Duration>,
) -> Duration {
    value
        .and_then(convert)
        .or_else(|| convert(default))
        .unwrap_or_else(Duration::zero)
}
