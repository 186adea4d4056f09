//! Pure per-entry eligibility decision. First matching rule wins.

use std::fmt;

use capsule_core::config::BatchConfig;
use capsule_core::constants::{DEFAULT_CHECK_COOLDOWN_HOURS, DEFAULT_INACTIVITY_DAYS};
use capsule_core::models::{TenantEntry, TenantStatus};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Which pass is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PassKind {
    HealthCheck,
    DailyReport,
}

impl PassKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PassKind::HealthCheck => "health-check",
            PassKind::DailyReport => "daily-report",
        }
    }
}

impl fmt::Display for PassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    Archived,
    Snoozed,
    Inactive,
    RecentlyChecked,
    AlreadyReportedToday,
}

impl SkipReason {
    pub fn as_str(self) -> &'static str {
        match self {
            SkipReason::Archived => "archived",
            SkipReason::Snoozed => "snoozed",
            SkipReason::Inactive => "inactive",
            SkipReason::RecentlyChecked => "recently-checked",
            SkipReason::AlreadyReportedToday => "already-reported-today",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EligibilityResult {
    pub eligible: bool,
    pub skip_reason: Option<SkipReason>,
}

impl EligibilityResult {
    pub const ELIGIBLE: Self = Self {
        eligible: true,
        skip_reason: None,
    };

    pub fn skipped(reason: SkipReason) -> Self {
        Self {
            eligible: false,
            skip_reason: Some(reason),
        }
    }
}

/// Thresholds for the eligibility rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EligibilityPolicy {
    pub inactivity: Duration,
    pub check_cooldown: Duration,
}

impl Default for EligibilityPolicy {
    fn default() -> Self {
        Self {
            inactivity: Duration::days(DEFAULT_INACTIVITY_DAYS),
            check_cooldown: Duration::hours(DEFAULT_CHECK_COOLDOWN_HOURS),
        }
    }
}

impl EligibilityPolicy {
    pub fn from_config(config: &BatchConfig) -> Self {
        Self {
            inactivity: config.effective_inactivity(),
            check_cooldown: config.effective_check_cooldown(),
        }
    }
}

/// Decide whether `entry` takes part in a `pass` at `now`.
///
/// `freshness_override` is a content-derived activity timestamp; the later
/// of it and `lastMessageAt` counts as the tenant's last activity. The
/// health-check cooldown runs from the later of `lastCheckReportAt` and
/// `lastCheckRunAt`.
pub fn eligible(
    entry: &TenantEntry,
    now: DateTime<Utc>,
    freshness_override: Option<DateTime<Utc>>,
    pass: PassKind,
    policy: &EligibilityPolicy,
) -> EligibilityResult {
    if entry.status == TenantStatus::Archived {
        return EligibilityResult::skipped(SkipReason::Archived);
    }
    if entry.snooze_until.is_some_and(|until| until > now) {
        return EligibilityResult::skipped(SkipReason::Snoozed);
    }

    let recency = entry.last_message_at.max(freshness_override);
    match recency {
        Some(at) if now - at <= policy.inactivity => {}
        _ => return EligibilityResult::skipped(SkipReason::Inactive),
    }

    match pass {
        PassKind::HealthCheck => {
            // Healthy tenants get no report, so the last check counts too.
            let last_checked = entry.last_check_report_at.max(entry.last_check_run_at);
            if last_checked.is_some_and(|at| now - at < policy.check_cooldown) {
                return EligibilityResult::skipped(SkipReason::RecentlyChecked);
            }
        }
        PassKind::DailyReport => {
            if entry
                .last_daily_report_at
                .is_some_and(|at| at.date_naive() == now.date_naive())
            {
                return EligibilityResult::skipped(SkipReason::AlreadyReportedToday);
            }
        }
    }
    EligibilityResult::ELIGIBLE
}
