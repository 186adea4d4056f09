//! Stage 1: required and optional artifacts, scaffold version.

use capsule_core::constants::{OPTIONAL_ARTIFACTS, REQUIRED_ARTIFACTS};
use capsule_core::models::{Finding, TenantArtifacts, TenantEntry};

use crate::engine::CheckContext;

pub const REQUIRED: &str = "artifacts.required";
pub const OPTIONAL: &str = "artifacts.optional";
pub const VERSION: &str = "capsule.version";

pub fn check(artifacts: &TenantArtifacts, entry: &TenantEntry, ctx: &CheckContext<'_>) -> Vec<Finding> {
    let mut findings = Vec::new();

    for name in REQUIRED_ARTIFACTS {
        if !artifacts.contains(name) {
            findings.push(
                Finding::error(REQUIRED, format!("{name} is missing"))
                    .fixable(format!("re-create {name} from the scaffold")),
            );
        }
    }
    for name in OPTIONAL_ARTIFACTS {
        if !artifacts.contains(name) {
            findings.push(Finding::info(OPTIONAL, format!("{name} not present")));
        }
    }

    let current = ctx.settings.current_capsule_version;
    if entry.capsule_version < current {
        findings.push(
            Finding::warn(
                VERSION,
                format!("capsule version {} is behind current {current}", entry.capsule_version),
            )
            .fixable("run `upgrade`"),
        );
    }
    findings
}
