//! Stages 5 and 6: the tenant's block in the generated config, and whether
//! that config still matches the registry.

use capsule_core::constants::REQUIRED_CONFIG_FIELDS;
use capsule_core::models::{Finding, TenantArtifacts, TenantEntry};

use crate::engine::CheckContext;

pub const BLOCK: &str = "config.block";
pub const DRIFT: &str = "config.drift";

pub fn check_block(_artifacts: &TenantArtifacts, entry: &TenantEntry, ctx: &CheckContext<'_>) -> Vec<Finding> {
    let Some(config) = ctx.generated_config else {
        return Vec::new();
    };
    // Archived tenants are left out of the generated config.
    if entry.is_archived() {
        return Vec::new();
    }

    let key = entry.key().to_string();
    let Some(block) = config.block(&key) else {
        return vec![Finding::error(BLOCK, format!("no config block for {key}"))
            .fixable("run `sync-config`")];
    };
    let Some(fields) = block.as_object() else {
        return vec![Finding::error(BLOCK, format!("config block for {key} is not an object"))
            .fixable("run `sync-config`")];
    };

    REQUIRED_CONFIG_FIELDS
        .iter()
        .filter(|field| fields.get(**field).map_or(true, |v| v.is_null()))
        .map(|field| {
            Finding::error(BLOCK, format!("config block for {key} lacks `{field}`"))
                .with_hint("run `sync-config`")
        })
        .collect()
}

pub fn check_drift(_artifacts: &TenantArtifacts, _entry: &TenantEntry, ctx: &CheckContext<'_>) -> Vec<Finding> {
    let (Some(config), Some(current)) = (ctx.generated_config, ctx.registry_hash) else {
        return Vec::new();
    };
    if config.registry_hash.as_deref() == Some(current) {
        return Vec::new();
    }
    vec![Finding::warn(DRIFT, "generated config is out of date with the registry")
        .fixable("run `sync-config`")]
}
