//! What a pass did, in numbers and in plain text.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::eligibility::{PassKind, SkipReason};

/// Outcome of one batch pass. Always carries counts, even when some tenants
/// failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PassSummary {
    pub kind: PassKind,
    pub started_at: DateTime<Utc>,
    /// Eligible tenants whose unit of work ran.
    pub processed: usize,
    /// Units of work that returned an error or panicked.
    pub failed: usize,
    /// Messages accepted by the delivery channel.
    pub delivered: usize,
    /// Messages the delivery channel rejected.
    pub delivery_failures: usize,
    /// `(key, reason)` for every skipped tenant.
    pub skipped: Vec<(String, SkipReason)>,
    /// Every per-tenant error, as `key: message`. See [`visible_errors`](Self::visible_errors).
    pub errors: Vec<String>,
    #[serde(skip)]
    pub error_list_cap: usize,
    /// Groups where every delivery failed; likely changed on the platform side.
    pub suspect_groups: Vec<String>,
    pub auto_snoozed: Vec<String>,
    pub woken: Vec<String>,
    /// Set when the pass did not run because of the global cooldown.
    pub throttled: Option<String>,
}

impl PassSummary {
    pub fn new(kind: PassKind, started_at: DateTime<Utc>, error_list_cap: usize) -> Self {
        Self {
            kind,
            started_at,
            processed: 0,
            failed: 0,
            delivered: 0,
            delivery_failures: 0,
            skipped: Vec::new(),
            errors: Vec::new(),
            error_list_cap,
            suspect_groups: Vec::new(),
            auto_snoozed: Vec::new(),
            woken: Vec::new(),
            throttled: None,
        }
    }

    pub fn throttled(
        kind: PassKind,
        started_at: DateTime<Utc>,
        error_list_cap: usize,
        message: impl Into<String>,
    ) -> Self {
        let mut summary = Self::new(kind, started_at, error_list_cap);
        summary.throttled = Some(message.into());
        summary
    }

    pub fn is_throttled(&self) -> bool {
        self.throttled.is_some()
    }

    pub fn record_error(&mut self, key: &str, message: impl AsRef<str>) {
        self.errors.push(format!("{key}: {}", message.as_ref()));
    }

    pub fn skip_count(&self, reason: SkipReason) -> usize {
        self.skipped.iter().filter(|(_, r)| *r == reason).count()
    }

    /// The first `error_list_cap` errors and how many more were left out.
    pub fn visible_errors(&self) -> (&[String], usize) {
        let shown = self.errors.len().min(self.error_list_cap);
        (&self.errors[..shown], self.errors.len() - shown)
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        if let Some(ref message) = self.throttled {
            let _ = write!(out, "{} pass skipped: {message}", self.kind);
            return out;
        }

        let _ = writeln!(
            out,
            "{} pass: {} processed, {} skipped, {} failed, {} delivered, {} delivery failures",
            self.kind,
            self.processed,
            self.skipped.len(),
            self.failed,
            self.delivered,
            self.delivery_failures
        );

        let reasons = [
            SkipReason::Archived,
            SkipReason::Snoozed,
            SkipReason::Inactive,
            SkipReason::RecentlyChecked,
            SkipReason::AlreadyReportedToday,
        ];
        let breakdown: Vec<String> = reasons
            .iter()
            .map(|r| (r, self.skip_count(*r)))
            .filter(|(_, n)| *n > 0)
            .map(|(r, n)| format!("{r}: {n}"))
            .collect();
        if !breakdown.is_empty() {
            let _ = writeln!(out, "Skipped: {}", breakdown.join(", "));
        }

        if !self.auto_snoozed.is_empty() {
            let _ = writeln!(out, "Auto-snoozed: {}", self.auto_snoozed.join(", "));
        }
        if !self.woken.is_empty() {
            let _ = writeln!(out, "Woken from snooze: {}", self.woken.join(", "));
        }
        if !self.suspect_groups.is_empty() {
            let _ = writeln!(
                out,
                "All deliveries failed in group(s) {}; the group may have been migrated",
                self.suspect_groups.join(", ")
            );
        }

        let (shown, more) = self.visible_errors();
        if !shown.is_empty() {
            let _ = writeln!(out, "Errors:");
            for err in shown {
                let _ = writeln!(out, "- {err}");
            }
            if more > 0 {
                let _ = writeln!(out, "and {more} more");
            }
        }
        out.trim_end().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_list_is_capped() {
        let mut summary = PassSummary::new(PassKind::HealthCheck, Utc::now(), 10);
        for i in 0..13 {
            summary.record_error(&format!("g:{i}"), "boom");
        }
        let (shown, more) = summary.visible_errors();
        assert_eq!(shown.len(), 10);
        assert_eq!(more, 3);
        let text = summary.render();
        assert!(text.contains("- g:9: boom"));
        assert!(!text.contains("g:10"));
        assert!(text.ends_with("and 3 more"));
    }

    #[test]
    fn throttled_summary_renders_message_only() {
        let summary =
            PassSummary::throttled(PassKind::DailyReport, Utc::now(), 10, "last run 5 minutes ago");
        assert!(summary.is_throttled());
        assert_eq!(summary.render(), "daily-report pass skipped: last run 5 minutes ago");
    }

    #[test]
    fn skip_breakdown_lists_nonzero_reasons() {
        let mut summary = PassSummary::new(PassKind::HealthCheck, Utc::now(), 10);
        summary.skipped.push(("g:1".into(), SkipReason::Inactive));
        summary.skipped.push(("g:2".into(), SkipReason::Inactive));
        summary.skipped.push(("g:3".into(), SkipReason::Archived));
        assert!(summary.render().contains("Skipped: archived: 1, inactive: 2"));
    }
}
