//! Turning check reports and artifacts into outbound messages.

use capsule_core::constants::STATUS_ARTIFACT;
use capsule_core::models::{InteractiveControl, OutboundMessage, TenantArtifacts, TenantEntry};
use capsule_validation::checks::status::{CURRENT_STATE_HEADINGS, NEXT_ACTIONS_HEADINGS};
use capsule_validation::markdown;
use capsule_validation::CheckReport;

/// Builds the messages a pass delivers. Implementations own tone and layout.
pub trait ReportComposer: Send + Sync {
    /// Message for a tenant whose health check found problems.
    fn health(&self, entry: &TenantEntry, report: &CheckReport) -> OutboundMessage;

    /// The daily report for a tenant.
    fn daily(&self, entry: &TenantEntry, artifacts: &TenantArtifacts) -> OutboundMessage;
}

/// Plain-text composer used when no richer one is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainComposer;

impl PlainComposer {
    const MAX_SECTION_LINES: usize = 12;

    fn excerpt(body: &str) -> String {
        body.lines()
            .map(str::trim_end)
            .filter(|l| !l.trim().is_empty())
            .take(Self::MAX_SECTION_LINES)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl ReportComposer for PlainComposer {
    fn health(&self, entry: &TenantEntry, report: &CheckReport) -> OutboundMessage {
        let mut content = format!("Health check for {}: {}\n", entry.name, report.summary_line());
        for finding in &report.findings {
            content.push_str(&format!("\n{finding}"));
            if let Some(ref hint) = finding.remediation {
                content.push_str(&format!(" ({hint})"));
            }
        }

        let key = entry.key();
        let mut message = OutboundMessage::text(content);
        if report.fixable().next().is_some() {
            message = message.with_control(InteractiveControl::new("Doctor", format!("doctor:{key}")));
        }
        message.with_control(InteractiveControl::new("Snooze 7d", format!("snooze:{key}:7")))
    }

    fn daily(&self, entry: &TenantEntry, artifacts: &TenantArtifacts) -> OutboundMessage {
        let mut content = format!("Daily report: {}\n", entry.name);
        let status = artifacts.content(STATUS_ARTIFACT).unwrap_or_default();
        for (title, headings) in [
            ("Current state", CURRENT_STATE_HEADINGS),
            ("Next actions", NEXT_ACTIONS_HEADINGS),
        ] {
            let body = markdown::section(status, headings)
                .map(Self::excerpt)
                .filter(|b| !b.is_empty())
                .unwrap_or_else(|| "(none recorded)".to_string());
            content.push_str(&format!("\n{title}:\n{body}\n"));
        }
        if let Some(fresh) = artifacts.status_freshness() {
            content.push_str(&format!("\nLast activity: {}\n", fresh.format("%Y-%m-%d")));
        }
        OutboundMessage::text(content)
    }
}
