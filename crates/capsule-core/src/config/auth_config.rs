//! Authorization and command surface configuration.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use super::span_or;
use crate::constants::DEFAULT_RESTART_COOLDOWN_SECS;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AuthConfig {
    /// Callers allowed to run user-tier commands once admins exist.
    pub user_allow_list: Vec<String>,
    /// Minimum seconds between gateway restart requests. Default: 300.
    pub restart_cooldown_secs: Option<i64>,
}

impl AuthConfig {
    pub fn effective_restart_cooldown(&self) -> Duration {
        span_or(
            self.restart_cooldown_secs,
            DEFAULT_RESTART_COOLDOWN_SECS,
            Duration::try_seconds,
        )
    }
}
