//! Tests for the check pipeline, one section per stage.

use capsule_core::constants::CURRENT_CAPSULE_VERSION;
use capsule_core::models::{
    ArtifactFile, Finding, Registry, Severity, TenantArtifacts, TenantEntry, TenantKey,
    TenantStatus, TenantType,
};
use capsule_storage::config_artifact::{registry_hash, render};
use capsule_storage::GeneratedConfig;
use capsule_validation::checks::{config, cross_ref, jobs, spam, status, structure};
use capsule_validation::{CheckContext, CheckEngine, JobRegistry};
use chrono::{Duration, TimeZone, Utc};

fn now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 17, 12, 0, 0).unwrap()
}

fn entry() -> TenantEntry {
    TenantEntry::new(
        &TenantKey::new("-100", "5"),
        "alpha",
        "Alpha",
        TenantType::Coding,
        CURRENT_CAPSULE_VERSION,
    )
}

const HEALTHY_STATUS: &str = "# Alpha\n\nLast activity: 2026-10-16\n\n## Current state\nAPI done.\n\n## Next actions\n- T-1 ship\n";

fn healthy_artifacts() -> TenantArtifacts {
    TenantArtifacts::new()
        .with("STATUS.md", ArtifactFile::new(HEALTHY_STATUS))
        .with("TODO.md", ArtifactFile::new("- [ ] T-1 ship\n"))
        .with("LEARNINGS.md", ArtifactFile::new("# Learnings\n"))
        .with("CRON.md", ArtifactFile::new("# Jobs\n"))
}

fn ids(findings: &[Finding]) -> Vec<&str> {
    findings.iter().map(|f| f.check_id.as_str()).collect()
}

// ─── engine ───

#[test]
fn healthy_tenant_produces_no_problems() {
    let report = CheckEngine::new().run(&healthy_artifacts(), &entry(), &CheckContext::new(now()));
    assert!(report.is_healthy(), "{:?}", report.findings);
    assert!(report.findings.is_empty());
    assert_eq!(report.tenant_key, "-100:5");
}

#[test]
fn findings_follow_pipeline_order() {
    let mut e = entry();
    e.capsule_version = 1;
    e.consecutive_silent_checks = 5;
    let artifacts = TenantArtifacts::new().with("STATUS.md", ArtifactFile::new("# Alpha\n"));
    let report = CheckEngine::new().run(&artifacts, &e, &CheckContext::new(now()));
    let order: Vec<&str> = ids(&report.findings);
    let first_status = order.iter().position(|id| id.starts_with("status.")).unwrap();
    let last_structure = order.iter().rposition(|id| id.starts_with("artifacts.") || *id == "capsule.version").unwrap();
    assert!(last_structure < first_status);
    assert_eq!(order.last(), Some(&"spam.silence"));
    assert!(!report.is_healthy());
    assert!(report.has_errors());
    assert_eq!(report.summary_line(), "1 error, 3 warnings, 3 info");
}

#[test]
fn info_only_report_is_healthy() {
    let artifacts = TenantArtifacts::new()
        .with("STATUS.md", ArtifactFile::new(HEALTHY_STATUS))
        .with("TODO.md", ArtifactFile::new("T-1\n"));
    let report = CheckEngine::new().run(&artifacts, &entry(), &CheckContext::new(now()));
    assert_eq!(report.count(Severity::Info), 2);
    assert!(report.is_healthy());
}

// ─── stage 1: structure ───

#[test]
fn missing_required_artifacts_are_fixable_errors() {
    let findings = structure::check(&TenantArtifacts::new(), &entry(), &CheckContext::new(now()));
    let required: Vec<_> = findings.iter().filter(|f| f.check_id == structure::REQUIRED).collect();
    assert_eq!(required.len(), 2);
    assert!(required.iter().all(|f| f.severity == Severity::Error && f.fixable));
    assert_eq!(findings.iter().filter(|f| f.check_id == structure::OPTIONAL).count(), 2);
}

#[test]
fn outdated_capsule_version_warns() {
    let mut e = entry();
    e.capsule_version = CURRENT_CAPSULE_VERSION - 1;
    let findings = structure::check(&healthy_artifacts(), &e, &CheckContext::new(now()));
    assert_eq!(ids(&findings), vec![structure::VERSION]);
    assert!(findings[0].fixable);
}

// ─── stage 2: status ───

#[test]
fn stale_status_warns_only_for_active_tenants() {
    let old = "## Current state\nx\n## Next actions\n- go\nLast activity: 2026-10-01\n";
    let artifacts = TenantArtifacts::new().with("STATUS.md", ArtifactFile::new(old));
    let ctx = CheckContext::new(now());

    let findings = status::check(&artifacts, &entry(), &ctx);
    assert_eq!(ids(&findings), vec![status::CURRENT_STATE]);
    assert!(findings[0].message.contains("16 days"));

    let mut snoozed = entry();
    snoozed.snooze(now() + Duration::days(3));
    assert!(status::check(&artifacts, &snoozed, &ctx).is_empty());
}

#[test]
fn mtime_is_used_without_marker() {
    let body = "## Current state\nx\n## Next steps\n- go\n";
    let artifacts = TenantArtifacts::new().with(
        "STATUS.md",
        ArtifactFile::new(body).modified(now() - Duration::days(4)),
    );
    let findings = status::check(&artifacts, &entry(), &CheckContext::new(now()));
    assert_eq!(ids(&findings), vec![status::CURRENT_STATE]);
}

#[test]
fn missing_and_empty_sections_warn() {
    let artifacts = TenantArtifacts::new().with("STATUS.md", ArtifactFile::new("# Alpha\n"));
    let findings = status::check(&artifacts, &entry(), &CheckContext::new(now()));
    assert_eq!(ids(&findings), vec![status::CURRENT_STATE, status::NEXT_ACTIONS]);

    let empty = TenantArtifacts::new().with(
        "STATUS.md",
        ArtifactFile::new("## Current state\nok\n## Next actions\n- \n## Log\n"),
    );
    let findings = status::check(&empty, &entry(), &CheckContext::new(now()));
    assert_eq!(ids(&findings), vec![status::NEXT_ACTIONS]);
    assert_eq!(findings[0].severity, Severity::Warn);
}

#[test]
fn status_checks_skip_without_status_file() {
    assert!(status::check(&TenantArtifacts::new(), &entry(), &CheckContext::new(now())).is_empty());
}

// ─── stage 3: cross reference ───

fn with_next_actions(actions: &str, backlog: &str) -> TenantArtifacts {
    TenantArtifacts::new()
        .with(
            "STATUS.md",
            ArtifactFile::new(format!("## Next actions\n{actions}\n")),
        )
        .with("TODO.md", ArtifactFile::new(backlog))
}

#[test]
fn one_dangling_reference_is_info_two_are_warn() {
    let ctx = CheckContext::new(now());
    let one = cross_ref::check(&with_next_actions("- T-1\n- T-2", "T-1"), &entry(), &ctx);
    assert_eq!(one.len(), 1);
    assert_eq!(one[0].severity, Severity::Info);

    let two = cross_ref::check(&with_next_actions("- T-2\n- T-3", "T-1"), &entry(), &ctx);
    assert_eq!(two[0].severity, Severity::Warn);
    assert!(two[0].message.contains("T-2, T-3"));

    assert!(cross_ref::check(&with_next_actions("- T-1", "T-1"), &entry(), &ctx).is_empty());
}

#[test]
fn cross_ref_needs_both_artifacts() {
    let artifacts = TenantArtifacts::new().with("STATUS.md", ArtifactFile::new("## Next actions\n- T-9\n"));
    assert!(cross_ref::check(&artifacts, &entry(), &CheckContext::new(now())).is_empty());
}

// ─── stage 4: jobs ───

#[test]
fn unregistered_jobs_warn_once_each() {
    let artifacts = TenantArtifacts::new().with(
        "CRON.md",
        ArtifactFile::new("- job:nightly (registered)\n- job:weekly\n- job:weekly again\n"),
    );
    let mut e = entry();
    e.cron_job_id = Some("job:daily-report".into());
    let registry: JobRegistry = ["job:nightly"].into_iter().collect();
    let ctx = CheckContext::new(now()).with_jobs(&registry);

    let findings = jobs::check(&artifacts, &e, &ctx);
    assert_eq!(findings.len(), 2);
    assert!(findings.iter().all(|f| f.check_id == jobs::JOBS && f.severity == Severity::Warn));
}

#[test]
fn jobs_check_skips_without_registry() {
    let mut e = entry();
    e.cron_job_id = Some("job:x".into());
    assert!(jobs::check(&TenantArtifacts::new(), &e, &CheckContext::new(now())).is_empty());
}

// ─── stages 5 & 6: generated config ───

fn registry_with(e: &TenantEntry) -> Registry {
    let mut reg = Registry::new("s");
    reg.insert(e.clone());
    reg
}

#[test]
fn present_block_and_matching_hash_are_clean() {
    let e = entry();
    let reg = registry_with(&e);
    let generated = render(&reg).unwrap();
    let hash = registry_hash(&reg).unwrap();
    let ctx = CheckContext::new(now()).with_generated_config(&generated, &hash);
    assert!(config::check_block(&healthy_artifacts(), &e, &ctx).is_empty());
    assert!(config::check_drift(&healthy_artifacts(), &e, &ctx).is_empty());
}

#[test]
fn missing_block_is_fixable_error() {
    let e = entry();
    let generated = GeneratedConfig::default();
    let ctx = CheckContext::new(now()).with_generated_config(&generated, "abc");
    let findings = config::check_block(&healthy_artifacts(), &e, &ctx);
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].severity, Severity::Error);
    assert!(findings[0].fixable);
}

#[test]
fn missing_sub_fields_are_errors() {
    let e = entry();
    let generated = GeneratedConfig::parse(
        r#"{"registryHash": "h", "topics": {"-100:5": {"slug": "alpha", "enabled": null}}}"#,
    )
    .unwrap();
    let ctx = CheckContext::new(now()).with_generated_config(&generated, "h");
    let findings = config::check_block(&healthy_artifacts(), &e, &ctx);
    let messages: Vec<&str> = findings.iter().map(|f| f.message.as_str()).collect();
    assert_eq!(findings.len(), 2, "{messages:?}");
    assert!(messages.iter().any(|m| m.contains("`type`")));
    assert!(messages.iter().any(|m| m.contains("`enabled`")));
}

#[test]
fn archived_tenant_is_not_expected_in_config() {
    let mut e = entry();
    e.archive();
    let generated = GeneratedConfig::default();
    let ctx = CheckContext::new(now()).with_generated_config(&generated, "h");
    assert!(config::check_block(&healthy_artifacts(), &e, &ctx).is_empty());
}

#[test]
fn hash_mismatch_is_drift() {
    let e = entry();
    let reg = registry_with(&e);
    let generated = render(&reg).unwrap();

    let mut renamed = reg.clone();
    renamed.get_mut(&e.key()).unwrap().name = "Alpha 2".into();
    let current = registry_hash(&renamed).unwrap();

    let ctx = CheckContext::new(now()).with_generated_config(&generated, &current);
    let findings = config::check_drift(&healthy_artifacts(), &e, &ctx);
    assert_eq!(ids(&findings), vec![config::DRIFT]);
    assert_eq!(findings[0].severity, Severity::Warn);
    assert!(findings[0].fixable);
}

// ─── stage 7: spam ───

#[test]
fn silence_at_threshold_is_info() {
    let ctx = CheckContext::new(now());
    let mut e = entry();
    e.consecutive_silent_checks = ctx.settings.silence_threshold - 1;
    assert!(spam::check(&healthy_artifacts(), &e, &ctx).is_empty());
    e.consecutive_silent_checks += 1;
    let findings = spam::check(&healthy_artifacts(), &e, &ctx);
    assert_eq!(findings[0].severity, Severity::Info);
    assert_eq!(e.status, TenantStatus::Active);
}
