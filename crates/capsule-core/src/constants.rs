//! Shared constants for the Capsule registry, checks, and batch passes.

/// Capsule version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ---- Registry ----

/// Highest registry schema version this build understands.
pub const SCHEMA_VERSION: u32 = 4;

/// Current tenant artifact scaffold ("capsule") version.
pub const CURRENT_CAPSULE_VERSION: u32 = 3;

/// Default maximum number of tenant entries per workspace.
pub const DEFAULT_MAX_ENTRIES: u32 = 100;

/// Default timeout for acquiring the registry lock.
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 5_000;

/// Interval between lock acquisition attempts.
pub const LOCK_POLL_INTERVAL_MS: u64 = 25;

/// Upper bound on a persisted delivery error message, in characters.
pub const MAX_DELIVERY_ERROR_LEN: usize = 500;

/// Upper bound on a tenant display name, in characters.
pub const MAX_NAME_LEN: usize = 128;

/// Default registry file name.
pub const DEFAULT_REGISTRY_FILE: &str = "registry.json";

/// Default generated config artifact file name.
pub const DEFAULT_CONFIG_ARTIFACT_FILE: &str = "topics.generated.json";

// ---- Eligibility & batch passes ----

/// Tenants without activity for this many days are skipped as inactive.
pub const DEFAULT_INACTIVITY_DAYS: i64 = 7;

/// Per-tenant cooldown between delivered health-check reports.
pub const DEFAULT_CHECK_COOLDOWN_HOURS: i64 = 24;

/// Global cooldown between two health-check passes.
pub const DEFAULT_HEALTH_CHECK_COOLDOWN_MINS: i64 = 60;

/// Global cooldown between two report passes.
pub const DEFAULT_REPORT_COOLDOWN_MINS: i64 = 60;

/// Minimum spacing between two outbound deliveries.
pub const DEFAULT_DELIVERY_SPACING_MS: u64 = 1_100;

/// How many per-tenant errors a pass summary lists before collapsing the rest.
pub const DEFAULT_ERROR_LIST_CAP: usize = 10;

/// Consecutive silent health checks before a tenant is auto-snoozed.
pub const SILENCE_THRESHOLD: u32 = 3;

/// Duration of an automatic snooze.
pub const AUTO_SNOOZE_DAYS: i64 = 30;

/// Longest span any configured threshold or cooldown may cover.
pub const MAX_CONFIG_SPAN_DAYS: i64 = 3650;

/// Upper bound for the configured delivery spacing.
pub const MAX_DELIVERY_SPACING_MS: u64 = 60_000;

/// Upper bound for the configured store lock timeout.
pub const MAX_LOCK_TIMEOUT_MS: u64 = 600_000;

// ---- Commands ----

/// Snooze duration when `snooze` is given no argument.
pub const DEFAULT_SNOOZE_DAYS: i64 = 7;

/// Longest snooze a user may request.
pub const MAX_SNOOZE_DAYS: i64 = 365;

/// Minimum time between two gateway restart requests.
pub const DEFAULT_RESTART_COOLDOWN_SECS: i64 = 300;

// ---- Check engine ----

/// A status artifact older than this is flagged for active tenants.
pub const DEFAULT_STATUS_STALE_DAYS: i64 = 3;

/// Dangling backlog references tolerated before a warning is raised.
pub const DEFAULT_CROSS_REF_TOLERANCE: usize = 1;

/// Primary state artifact.
pub const STATUS_ARTIFACT: &str = "STATUS.md";

/// Backlog artifact.
pub const BACKLOG_ARTIFACT: &str = "TODO.md";

/// Accumulated learnings artifact.
pub const LEARNINGS_ARTIFACT: &str = "LEARNINGS.md";

/// Scheduled-job notes artifact.
pub const JOBS_ARTIFACT: &str = "CRON.md";

/// Artifacts every tenant must have.
pub const REQUIRED_ARTIFACTS: &[&str] = &[STATUS_ARTIFACT, BACKLOG_ARTIFACT];

/// Artifacts a tenant may have.
pub const OPTIONAL_ARTIFACTS: &[&str] = &[LEARNINGS_ARTIFACT, JOBS_ARTIFACT];

/// Sub-fields every tenant block in the generated config must carry.
pub const REQUIRED_CONFIG_FIELDS: &[&str] = &["slug", "type", "enabled"];
