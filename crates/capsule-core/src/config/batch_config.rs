//! Batch pass and eligibility configuration.

use std::time::Duration as StdDuration;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use super::span_or;
use crate::constants::{
    AUTO_SNOOZE_DAYS, DEFAULT_CHECK_COOLDOWN_HOURS, DEFAULT_DELIVERY_SPACING_MS,
    DEFAULT_ERROR_LIST_CAP, DEFAULT_HEALTH_CHECK_COOLDOWN_MINS, DEFAULT_INACTIVITY_DAYS,
    DEFAULT_REPORT_COOLDOWN_MINS, SILENCE_THRESHOLD,
};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct BatchConfig {
    /// Days without activity before a tenant is skipped. Default: 7.
    pub inactivity_days: Option<i64>,
    /// Per-tenant cooldown between delivered health reports. Default: 24h.
    pub check_cooldown_hours: Option<i64>,
    /// Global cooldown between health-check passes. Default: 60 min.
    pub health_check_cooldown_mins: Option<i64>,
    /// Global cooldown between report passes. Default: 60 min.
    pub report_cooldown_mins: Option<i64>,
    /// Spacing between deliveries. Default: 1100 ms.
    pub delivery_spacing_ms: Option<u64>,
    /// Errors listed in a summary before collapsing. Default: 10.
    pub error_list_cap: Option<usize>,
    /// Silent checks before auto-snooze. Default: 3.
    pub silence_threshold: Option<u32>,
    /// Auto-snooze duration in days. Default: 30.
    pub auto_snooze_days: Option<i64>,
}

impl BatchConfig {
    pub fn effective_inactivity(&self) -> Duration {
        span_or(self.inactivity_days, DEFAULT_INACTIVITY_DAYS, Duration::try_days)
    }

    pub fn effective_check_cooldown(&self) -> Duration {
        span_or(self.check_cooldown_hours, DEFAULT_CHECK_COOLDOWN_HOURS, Duration::try_hours)
    }

    pub fn effective_health_check_cooldown(&self) -> Duration {
        span_or(
            self.health_check_cooldown_mins,
            DEFAULT_HEALTH_CHECK_COOLDOWN_MINS,
            Duration::try_minutes,
        )
    }

    pub fn effective_report_cooldown(&self) -> Duration {
        span_or(self.report_cooldown_mins, DEFAULT_REPORT_COOLDOWN_MINS, Duration::try_minutes)
    }

    pub fn effective_delivery_spacing(&self) -> StdDuration {
        StdDuration::from_millis(self.delivery_spacing_ms.unwrap_or(DEFAULT_DELIVERY_SPACING_MS))
    }

    pub fn effective_error_list_cap(&self) -> usize {
        self.error_list_cap.unwrap_or(DEFAULT_ERROR_LIST_CAP)
    }

    pub fn effective_silence_threshold(&self) -> u32 {
        self.silence_threshold.unwrap_or(SILENCE_THRESHOLD)
    }

    pub fn effective_auto_snooze(&self) -> Duration {
        span_or(self.auto_snooze_days, AUTO_SNOOZE_DAYS, Duration::try_days)
    }
}
