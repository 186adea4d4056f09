//! Check engine configuration.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use super::span_or;
use crate::constants::{DEFAULT_CROSS_REF_TOLERANCE, DEFAULT_STATUS_STALE_DAYS};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CheckConfig {
    /// Status artifact age that counts as stale. Default: 3 days.
    pub status_stale_days: Option<i64>,
    /// Dangling backlog references tolerated. Default: 1.
    pub cross_ref_tolerance: Option<usize>,
}

impl CheckConfig {
    pub fn effective_status_stale(&self) -> Duration {
        span_or(self.status_stale_days, DEFAULT_STATUS_STALE_DAYS, Duration::try_days)
    }

    pub fn effective_cross_ref_tolerance(&self) -> usize {
        self.cross_ref_tolerance.unwrap_or(DEFAULT_CROSS_REF_TOLERANCE)
    }
}
