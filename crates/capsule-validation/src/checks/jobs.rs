//! Stage 4: scheduled jobs referenced by the tenant must be registered.

use std::collections::BTreeSet;

use capsule_core::constants::JOBS_ARTIFACT;
use capsule_core::models::{Finding, TenantArtifacts, TenantEntry};

use crate::engine::CheckContext;
use crate::markdown;

pub const JOBS: &str = "jobs.registry";

/// Job ids known to the external scheduler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobRegistry {
    ids: BTreeSet<String>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for JobRegistry {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().map(Into::into).collect(),
        }
    }
}

pub fn check(artifacts: &TenantArtifacts, entry: &TenantEntry, ctx: &CheckContext<'_>) -> Vec<Finding> {
    let Some(registry) = ctx.jobs else {
        return Vec::new();
    };
    let mut referenced = artifacts
        .content(JOBS_ARTIFACT)
        .map(markdown::job_ids)
        .unwrap_or_default();
    if let Some(ref id) = entry.cron_job_id {
        referenced.insert(id.clone());
    }

    referenced
        .into_iter()
        .filter(|id| !registry.contains(id))
        .map(|id| {
            Finding::warn(JOBS, format!("scheduled job {id} is not registered"))
                .with_hint("recreate the job or remove the reference")
        })
        .collect()
}
