//! BatchOrchestrator: one algorithm, two pass kinds.
//!
//! 1. read the registry; bail out early inside the global cooldown
//! 2. partition entries with the eligibility filter
//! 3. run each eligible tenant's unit of work inside an error boundary
//! 4. deliver outputs one at a time through the pacer
//! 5. flag groups where every delivery failed
//! 6. fold everything back into the registry with a single `mutate`

use std::collections::{BTreeMap, BTreeSet};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::time::Duration as StdDuration;

use capsule_core::config::CapsuleConfig;
use capsule_core::constants::MAX_DELIVERY_ERROR_LEN;
use capsule_core::errors::{ArtifactError, BatchError, StoreError};
use capsule_core::models::{
    truncate_chars, OutboundMessage, Registry, TenantArtifacts, TenantEntry, TenantStatus,
};
use capsule_core::tracing::events;
use capsule_core::traits::{ArtifactSource, Clock, DeliveryChannel};
use capsule_storage::{registry_hash, GeneratedConfig, RegistryStore};
use capsule_validation::{CheckContext, CheckEngine, CheckSettings, JobRegistry};
use chrono::{DateTime, Duration, Utc};
use tracing::{info_span, Instrument};

use crate::composer::{PlainComposer, ReportComposer};
use crate::eligibility::{eligible, EligibilityPolicy, PassKind};
use crate::pacer::DeliveryPacer;
use crate::summary::PassSummary;

/// Thresholds and pacing for both pass kinds.
#[derive(Debug, Clone, Copy)]
pub struct BatchSettings {
    pub policy: EligibilityPolicy,
    pub health_check_cooldown: Duration,
    pub report_cooldown: Duration,
    pub delivery_spacing: StdDuration,
    pub error_list_cap: usize,
    pub silence_threshold: u32,
    pub auto_snooze: Duration,
    pub checks: CheckSettings,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self::from_config(&CapsuleConfig::default())
    }
}

impl BatchSettings {
    pub fn from_config(config: &CapsuleConfig) -> Self {
        let batch = &config.batch;
        Self {
            policy: EligibilityPolicy::from_config(batch),
            health_check_cooldown: batch.effective_health_check_cooldown(),
            report_cooldown: batch.effective_report_cooldown(),
            delivery_spacing: batch.effective_delivery_spacing(),
            error_list_cap: batch.effective_error_list_cap(),
            silence_threshold: batch.effective_silence_threshold(),
            auto_snooze: batch.effective_auto_snooze(),
            checks: CheckSettings::from_config(config),
        }
    }

    fn cooldown(&self, kind: PassKind) -> Duration {
        match kind {
            PassKind::HealthCheck => self.health_check_cooldown,
            PassKind::DailyReport => self.report_cooldown,
        }
    }
}

/// Tenant selected for this pass, as it looked when the pass started.
struct Selected {
    key: String,
    entry: TenantEntry,
    /// Artifacts loaded while probing freshness; reused by the unit of work.
    preloaded: Option<TenantArtifacts>,
}

/// Result of one tenant's unit of work.
struct WorkOutput {
    message: Option<OutboundMessage>,
    /// A side effect failed; recorded without failing the tenant.
    note: Option<String>,
}

#[derive(Default)]
struct GroupStats {
    attempts: usize,
    failures: usize,
}

/// Delivery outcomes, keyed by registry key.
#[derive(Default)]
struct Deliveries {
    delivered: BTreeSet<String>,
    failed: BTreeMap<String, String>,
}

pub struct BatchOrchestrator<A, D, C, R = PlainComposer> {
    store: RegistryStore,
    artifacts: A,
    channel: D,
    clock: C,
    composer: R,
    engine: CheckEngine,
    settings: BatchSettings,
    generated_config_path: Option<PathBuf>,
    jobs: Option<JobRegistry>,
}

impl<A, D, C> BatchOrchestrator<A, D, C, PlainComposer>
where
    A: ArtifactSource,
    D: DeliveryChannel,
    C: Clock,
{
    pub fn new(store: RegistryStore, artifacts: A, channel: D, clock: C) -> Self {
        Self {
            store,
            artifacts,
            channel,
            clock,
            composer: PlainComposer,
            engine: CheckEngine::new(),
            settings: BatchSettings::default(),
            generated_config_path: None,
            jobs: None,
        }
    }
}

impl<A, D, C, R> BatchOrchestrator<A, D, C, R>
where
    A: ArtifactSource,
    D: DeliveryChannel,
    C: Clock,
    R: ReportComposer,
{
    pub fn with_composer<R2: ReportComposer>(self, composer: R2) -> BatchOrchestrator<A, D, C, R2> {
        BatchOrchestrator {
            store: self.store,
            artifacts: self.artifacts,
            channel: self.channel,
            clock: self.clock,
            composer,
            engine: self.engine,
            settings: self.settings,
            generated_config_path: self.generated_config_path,
            jobs: self.jobs,
        }
    }

    pub fn with_settings(mut self, settings: BatchSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_engine(mut self, engine: CheckEngine) -> Self {
        self.engine = engine;
        self
    }

    /// Check tenants against the generated config artifact at `path`.
    pub fn with_generated_config(mut self, path: impl Into<PathBuf>) -> Self {
        self.generated_config_path = Some(path.into());
        self
    }

    /// Check scheduled-job references against `jobs`.
    pub fn with_jobs(mut self, jobs: JobRegistry) -> Self {
        self.jobs = Some(jobs);
        self
    }

    pub fn settings(&self) -> &BatchSettings {
        &self.settings
    }

    pub async fn run_health_check(&self) -> Result<PassSummary, BatchError> {
        self.run_pass(PassKind::HealthCheck).await
    }

    pub async fn run_daily_report(&self) -> Result<PassSummary, BatchError> {
        self.run_pass(PassKind::DailyReport).await
    }

    /// Run one pass. Only the initial read and the final mutation can fail
    /// the pass; everything per tenant is recorded in the summary.
    pub async fn run_pass(&self, kind: PassKind) -> Result<PassSummary, BatchError> {
        let span = info_span!("batch_pass", kind = kind.as_str());
        self.run_pass_inner(kind).instrument(span).await
    }

    async fn run_pass_inner(&self, kind: PassKind) -> Result<PassSummary, BatchError> {
        let now = self.clock.now();
        let cap = self.settings.error_list_cap;
        let registry = self.store.read().map_err(BatchError::Read)?;

        if let Some(message) = self.cooldown_message(kind, &registry, now) {
            tracing::info!(kind = kind.as_str(), %message, "pass throttled");
            return Ok(PassSummary::throttled(kind, now, cap, message));
        }

        let mut summary = PassSummary::new(kind, now, cap);
        let selected = self.partition(kind, &registry, now, &mut summary);

        let generated = self.load_generated_config();
        let hash = if generated.is_some() {
            registry_hash(&registry)
                .map_err(|e| tracing::warn!(error = %e, "registry hash unavailable"))
                .ok()
        } else {
            None
        };
        let mut ctx = CheckContext::new(now).with_settings(self.settings.checks);
        if let (Some(config), Some(hash)) = (generated.as_ref(), hash.as_deref()) {
            ctx = ctx.with_generated_config(config, hash);
        }
        if let Some(ref jobs) = self.jobs {
            ctx = ctx.with_jobs(jobs);
        }

        let mut outbox: Vec<(&Selected, OutboundMessage)> = Vec::new();
        for tenant in &selected {
            summary.processed += 1;
            let outcome = catch_unwind(AssertUnwindSafe(|| self.unit_of_work(kind, tenant, &ctx)));
            match outcome {
                Ok(Ok(output)) => {
                    if let Some(note) = output.note {
                        summary.record_error(&tenant.key, note);
                    }
                    if let Some(message) = output.message {
                        outbox.push((tenant, message));
                    }
                }
                Ok(Err(err)) => {
                    summary.failed += 1;
                    events::tenant_failed(&tenant.key, &err.to_string());
                    summary.record_error(&tenant.key, err.to_string());
                }
                Err(panic) => {
                    let message = panic_message(panic.as_ref());
                    summary.failed += 1;
                    events::tenant_failed(&tenant.key, &message);
                    summary.record_error(&tenant.key, format!("panicked: {message}"));
                }
            }
        }

        let deliveries = self.deliver_all(&outbox, &mut summary).await;

        let eligible_entries: Vec<(&str, &TenantEntry)> = selected
            .iter()
            .map(|s| (s.key.as_str(), &s.entry))
            .collect();
        let (auto_snoozed, woken) = self
            .reconcile(kind, now, &eligible_entries, &deliveries)
            .await
            .map_err(BatchError::Reconcile)?;
        summary.auto_snoozed = auto_snoozed;
        summary.woken = woken;

        events::pass_completed(
            kind.as_str(),
            summary.processed,
            summary.skipped.len(),
            summary.failed,
        );
        Ok(summary)
    }

    fn cooldown_message(&self, kind: PassKind, registry: &Registry, now: DateTime<Utc>) -> Option<String> {
        let last = match kind {
            PassKind::HealthCheck => registry.last_batch_run_at,
            PassKind::DailyReport => registry.last_report_run_at,
        }?;
        let cooldown = self.settings.cooldown(kind);
        let elapsed = now - last;
        if elapsed >= cooldown {
            return None;
        }
        Some(format!(
            "last run {} minutes ago, cooldown is {} minutes",
            elapsed.num_minutes().max(0),
            cooldown.num_minutes()
        ))
    }

    fn partition(
        &self,
        kind: PassKind,
        registry: &Registry,
        now: DateTime<Utc>,
        summary: &mut PassSummary,
    ) -> Vec<Selected> {
        let mut selected = Vec::new();
        for (key, entry) in &registry.entries {
            let snoozed = entry.snooze_until.is_some_and(|until| until > now);
            // A load that fails or panics here just gets no override; the
            // unit of work retries it inside its own error boundary.
            let preloaded = if entry.is_archived() || snoozed {
                None
            } else {
                catch_unwind(AssertUnwindSafe(|| self.artifacts.load(entry).ok())).unwrap_or(None)
            };
            let freshness = preloaded.as_ref().and_then(|loaded| {
                catch_unwind(AssertUnwindSafe(|| self.artifacts.freshness(entry, loaded))).unwrap_or(None)
            });
            let result = eligible(entry, now, freshness, kind, &self.settings.policy);
            match result.skip_reason {
                Some(reason) => summary.skipped.push((key.clone(), reason)),
                None => selected.push(Selected {
                    key: key.clone(),
                    entry: entry.clone(),
                    preloaded,
                }),
            }
        }
        selected
    }

    fn load_generated_config(&self) -> Option<GeneratedConfig> {
        let path = self.generated_config_path.as_ref()?;
        match GeneratedConfig::load(path) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "generated config unreadable");
                None
            }
        }
    }

    fn unit_of_work(
        &self,
        kind: PassKind,
        tenant: &Selected,
        ctx: &CheckContext<'_>,
    ) -> Result<WorkOutput, ArtifactError> {
        let entry = &tenant.entry;
        let loaded;
        let artifacts = match &tenant.preloaded {
            Some(preloaded) => preloaded,
            None => {
                loaded = self.artifacts.load(entry)?;
                &loaded
            }
        };
        match kind {
            PassKind::HealthCheck => {
                let report = self.engine.run(artifacts, entry, ctx);
                if !report.is_healthy() {
                    return Ok(WorkOutput {
                        message: Some(self.composer.health(entry, &report)),
                        note: None,
                    });
                }
                let note = self
                    .artifacts
                    .snapshot_healthy(entry)
                    .err()
                    .map(|e| format!("healthy snapshot failed: {e}"));
                Ok(WorkOutput {
                    message: None,
                    note,
                })
            }
            PassKind::DailyReport => Ok(WorkOutput {
                message: Some(self.composer.daily(entry, artifacts)),
                note: None,
            }),
        }
    }

    async fn deliver_all(
        &self,
        outbox: &[(&Selected, OutboundMessage)],
        summary: &mut PassSummary,
    ) -> Deliveries {
        let mut pacer = DeliveryPacer::new(self.settings.delivery_spacing);
        let mut groups: BTreeMap<&str, GroupStats> = BTreeMap::new();
        let mut out = Deliveries::default();

        for (tenant, message) in outbox {
            pacer.ready().await;
            let entry = &tenant.entry;
            let stats = groups.entry(entry.group_id.as_str()).or_default();
            stats.attempts += 1;
            match self
                .channel
                .deliver(&entry.group_id, &entry.thread_id, message)
                .await
            {
                Ok(()) => {
                    summary.delivered += 1;
                    out.delivered.insert(tenant.key.clone());
                }
                Err(err) => {
                    stats.failures += 1;
                    summary.delivery_failures += 1;
                    let text = truncate_chars(&err.to_string(), MAX_DELIVERY_ERROR_LEN);
                    events::delivery_failed(&tenant.key, &text);
                    summary.record_error(&tenant.key, &text);
                    out.failed.insert(tenant.key.clone(), text);
                }
            }
        }

        for (group, stats) in &groups {
            if stats.attempts > 0 && stats.failures == stats.attempts {
                events::group_migration_suspected(group, stats.attempts);
                summary.suspect_groups.push((*group).to_string());
            }
        }
        out
    }

    /// The single end-of-pass mutation. Returns `(auto_snoozed, woken)` keys.
    async fn reconcile(
        &self,
        kind: PassKind,
        now: DateTime<Utc>,
        eligible_entries: &[(&str, &TenantEntry)],
        deliveries: &Deliveries,
    ) -> Result<(Vec<String>, Vec<String>), StoreError> {
        let threshold = self.settings.silence_threshold;
        let snooze_for = self.settings.auto_snooze;

        self.store
            .mutate(|reg| {
                match kind {
                    PassKind::HealthCheck => reg.last_batch_run_at = Some(now),
                    PassKind::DailyReport => reg.last_report_run_at = Some(now),
                }

                let mut auto_snoozed = Vec::new();
                let mut woken = Vec::new();
                for (key, before) in eligible_entries {
                    // Entries removed or renamed concurrently are left alone.
                    let Some(entry) = reg.entries.get_mut(*key) else {
                        continue;
                    };

                    if entry.status == TenantStatus::Snoozed
                        && entry.snooze_until.map_or(true, |until| until <= now)
                    {
                        entry.wake();
                        woken.push(key.to_string());
                    }

                    if kind == PassKind::HealthCheck {
                        let active_since_last_check = match (entry.last_message_at, before.last_check_run_at) {
                            (Some(message), Some(checked)) => message > checked,
                            (Some(_), None) => true,
                            (None, _) => false,
                        };
                        if active_since_last_check {
                            entry.consecutive_silent_checks = 0;
                        } else {
                            entry.consecutive_silent_checks += 1;
                        }
                        entry.last_check_run_at = Some(now);

                        if entry.status == TenantStatus::Active
                            && entry.consecutive_silent_checks >= threshold
                        {
                            let until = now
                                .checked_add_signed(snooze_for)
                                .unwrap_or(DateTime::<Utc>::MAX_UTC);
                            entry.snooze(until);
                            entry.consecutive_silent_checks = 0;
                            events::tenant_auto_snoozed(key, &until.to_rfc3339());
                            auto_snoozed.push(key.to_string());
                        }
                    }

                    if deliveries.delivered.contains(*key) {
                        match kind {
                            PassKind::HealthCheck => entry.last_check_report_at = Some(now),
                            PassKind::DailyReport => entry.last_daily_report_at = Some(now),
                        }
                        entry.last_delivery_error = None;
                    } else if let Some(err) = deliveries.failed.get(*key) {
                        entry.record_delivery_error(err);
                    }
                }
                Ok::<_, StoreError>((auto_snoozed, woken))
            })
            .await
    }
}

/// Best-effort text of a panic payload.
fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl<A, D, C, R> std::fmt::Debug for BatchOrchestrator<A, D, C, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchOrchestrator")
            .field("store", &self.store.path())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
