//! Stage 2: status artifact quality.

use capsule_core::constants::STATUS_ARTIFACT;
use capsule_core::models::{Finding, TenantArtifacts, TenantEntry, TenantStatus};

use crate::engine::CheckContext;
use crate::markdown;

pub const CURRENT_STATE: &str = "status.current_state";
pub const NEXT_ACTIONS: &str = "status.next_actions";

pub const CURRENT_STATE_HEADINGS: &[&str] = &["current state"];
pub const NEXT_ACTIONS_HEADINGS: &[&str] = &["next actions", "next steps"];

pub fn check(artifacts: &TenantArtifacts, entry: &TenantEntry, ctx: &CheckContext<'_>) -> Vec<Finding> {
    let Some(content) = artifacts.content(STATUS_ARTIFACT) else {
        return Vec::new();
    };
    let mut findings = Vec::new();

    if !markdown::has_heading(content, CURRENT_STATE_HEADINGS) {
        findings.push(
            Finding::warn(CURRENT_STATE, "STATUS.md has no \"Current state\" section")
                .with_hint("add a `## Current state` heading"),
        );
    }

    // Staleness only matters for tenants expected to be moving.
    if entry.status == TenantStatus::Active {
        if let Some(fresh) = artifacts.status_freshness() {
            let age = ctx.now - fresh;
            if age > ctx.settings.status_stale {
                findings.push(
                    Finding::warn(
                        CURRENT_STATE,
                        format!("STATUS.md last updated {} days ago", age.num_days()),
                    )
                    .with_hint("refresh the current state and the `Last activity:` line"),
                );
            }
        }
    }

    match markdown::section(content, NEXT_ACTIONS_HEADINGS) {
        None => findings.push(
            Finding::warn(NEXT_ACTIONS, "STATUS.md has no \"Next actions\" section")
                .with_hint("add a `## Next actions` heading"),
        ),
        Some(body) if !markdown::has_content(body) => {
            findings.push(Finding::warn(NEXT_ACTIONS, "\"Next actions\" is empty"));
        }
        Some(_) => {}
    }
    findings
}
