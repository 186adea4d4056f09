//! CheckEngine: runs the ordered validator pipeline and aggregates findings.

use std::time::Instant;

use capsule_core::config::CapsuleConfig;
use capsule_core::constants::{
    CURRENT_CAPSULE_VERSION, DEFAULT_CROSS_REF_TOLERANCE, DEFAULT_STATUS_STALE_DAYS,
    SILENCE_THRESHOLD,
};
use capsule_core::models::{Finding, Severity, TenantArtifacts, TenantEntry};
use capsule_storage::GeneratedConfig;
use chrono::{DateTime, Duration, Utc};

use crate::checks::{config, cross_ref, jobs, spam, status, structure, JobRegistry};

/// Every validator has this shape. A validator whose input is absent returns
/// no findings.
pub type Validator = fn(&TenantArtifacts, &TenantEntry, &CheckContext<'_>) -> Vec<Finding>;

/// The pipeline, in execution order.
pub const PIPELINE: &[(&str, Validator)] = &[
    ("structure", structure::check),
    ("status", status::check),
    ("cross_ref", cross_ref::check),
    ("jobs", jobs::check),
    ("config_block", config::check_block),
    ("config_drift", config::check_drift),
    ("spam", spam::check),
];

/// Thresholds the validators compare against.
#[derive(Debug, Clone, Copy)]
pub struct CheckSettings {
    pub status_stale: Duration,
    pub cross_ref_tolerance: usize,
    pub silence_threshold: u32,
    pub current_capsule_version: u32,
}

impl Default for CheckSettings {
    fn default() -> Self {
        Self {
            status_stale: Duration::days(DEFAULT_STATUS_STALE_DAYS),
            cross_ref_tolerance: DEFAULT_CROSS_REF_TOLERANCE,
            silence_threshold: SILENCE_THRESHOLD,
            current_capsule_version: CURRENT_CAPSULE_VERSION,
        }
    }
}

impl CheckSettings {
    pub fn from_config(config: &CapsuleConfig) -> Self {
        Self {
            status_stale: config.checks.effective_status_stale(),
            cross_ref_tolerance: config.checks.effective_cross_ref_tolerance(),
            silence_threshold: config.batch.effective_silence_threshold(),
            current_capsule_version: CURRENT_CAPSULE_VERSION,
        }
    }
}

/// External inputs shared by every validator in one run.
///
/// Optional inputs that are `None` switch the dependent validators off.
#[derive(Debug, Clone, Copy)]
pub struct CheckContext<'a> {
    pub now: DateTime<Utc>,
    pub settings: CheckSettings,
    pub generated_config: Option<&'a GeneratedConfig>,
    /// Hash of the registry as it is now, for drift detection.
    pub registry_hash: Option<&'a str>,
    pub jobs: Option<&'a JobRegistry>,
}

impl<'a> CheckContext<'a> {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now,
            settings: CheckSettings::default(),
            generated_config: None,
            registry_hash: None,
            jobs: None,
        }
    }

    pub fn with_settings(mut self, settings: CheckSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_generated_config(mut self, config: &'a GeneratedConfig, registry_hash: &'a str) -> Self {
        self.generated_config = Some(config);
        self.registry_hash = Some(registry_hash);
        self
    }

    pub fn with_jobs(mut self, jobs: &'a JobRegistry) -> Self {
        self.jobs = Some(jobs);
        self
    }
}

/// Aggregated findings for one tenant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckReport {
    pub tenant_key: String,
    pub findings: Vec<Finding>,
}

impl CheckReport {
    pub fn count(&self, severity: Severity) -> usize {
        self.findings.iter().filter(|f| f.severity == severity).count()
    }

    /// Healthy iff there is no ERROR or WARN finding.
    pub fn is_healthy(&self) -> bool {
        !self.findings.iter().any(|f| f.severity.is_problem())
    }

    pub fn has_errors(&self) -> bool {
        self.count(Severity::Error) > 0
    }

    pub fn fixable(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| f.fixable)
    }

    /// e.g. `1 error, 2 warnings, 0 info`.
    pub fn summary_line(&self) -> String {
        let plural = |n: usize, word: &str| {
            if n == 1 {
                format!("{n} {word}")
            } else {
                format!("{n} {word}s")
            }
        };
        format!(
            "{}, {}, {} info",
            plural(self.count(Severity::Error), "error"),
            plural(self.count(Severity::Warn), "warning"),
            self.count(Severity::Info)
        )
    }
}

/// Runs validators in a fixed order.
#[derive(Clone)]
pub struct CheckEngine {
    validators: Vec<(&'static str, Validator)>,
}

impl std::fmt::Debug for CheckEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.validators.iter().map(|(name, _)| name))
            .finish()
    }
}

impl Default for CheckEngine {
    fn default() -> Self {
        Self {
            validators: PIPELINE.to_vec(),
        }
    }
}

impl CheckEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine running only `validators`, in the order given.
    pub fn with_validators(validators: Vec<(&'static str, Validator)>) -> Self {
        Self { validators }
    }

    pub fn run(
        &self,
        artifacts: &TenantArtifacts,
        entry: &TenantEntry,
        ctx: &CheckContext<'_>,
    ) -> CheckReport {
        let mut findings = Vec::new();
        for (name, validator) in &self.validators {
            let started = Instant::now();
            let produced = validator(artifacts, entry, ctx);
            tracing::debug!(
                validator = *name,
                tenant = %entry.slug,
                findings = produced.len(),
                elapsed_us = started.elapsed().as_micros() as u64,
                "validator finished"
            );
            findings.extend(produced);
        }
        CheckReport {
            tenant_key: entry.key().to_string(),
            findings,
        }
    }
}
