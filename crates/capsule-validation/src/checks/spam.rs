//! Stage 7: tenants that have stayed silent across consecutive checks.

use capsule_core::models::{Finding, TenantArtifacts, TenantEntry};

use crate::engine::CheckContext;

pub const SILENCE: &str = "spam.silence";

pub fn check(_artifacts: &TenantArtifacts, entry: &TenantEntry, ctx: &CheckContext<'_>) -> Vec<Finding> {
    let threshold = ctx.settings.silence_threshold;
    if entry.consecutive_silent_checks < threshold {
        return Vec::new();
    }
    vec![Finding::info(
        SILENCE,
        format!(
            "{} health checks in a row without activity",
            entry.consecutive_silent_checks
        ),
    )
    .with_hint("consider `snooze` or `archive`")]
}
