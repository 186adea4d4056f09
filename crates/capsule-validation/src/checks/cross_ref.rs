//! Stage 3: task ids in next actions must exist in the backlog.

use capsule_core::constants::{BACKLOG_ARTIFACT, STATUS_ARTIFACT};
use capsule_core::models::{Finding, Severity, TenantArtifacts, TenantEntry};

use super::status::NEXT_ACTIONS_HEADINGS;
use crate::engine::CheckContext;
use crate::markdown;

pub const CROSS_REF: &str = "backlog.cross_ref";

pub fn check(artifacts: &TenantArtifacts, _entry: &TenantEntry, ctx: &CheckContext<'_>) -> Vec<Finding> {
    let (Some(status), Some(backlog)) = (
        artifacts.content(STATUS_ARTIFACT),
        artifacts.content(BACKLOG_ARTIFACT),
    ) else {
        return Vec::new();
    };
    let Some(next_actions) = markdown::section(status, NEXT_ACTIONS_HEADINGS) else {
        return Vec::new();
    };

    let known = markdown::task_ids(backlog);
    let missing: Vec<String> = markdown::task_ids(next_actions)
        .into_iter()
        .filter(|id| !known.contains(id))
        .collect();
    if missing.is_empty() {
        return Vec::new();
    }

    let severity = if missing.len() <= ctx.settings.cross_ref_tolerance {
        Severity::Info
    } else {
        Severity::Warn
    };
    vec![Finding::new(
        severity,
        CROSS_REF,
        format!("next actions reference tasks missing from TODO.md: {}", missing.join(", ")),
    )
    .with_hint("add the tasks to TODO.md or fix the ids")]
}
