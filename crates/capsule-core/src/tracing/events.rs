//! Structured log events for key registry and batch operations.
//!
//! Each function emits a `tracing` event with structured fields.

/// An entry failed validation on read and was dropped from the snapshot.
pub fn entry_quarantined(key: &str, reason: &str) {
    ::tracing::error!(
        event = "entry_quarantined",
        key = %key,
        reason = %reason,
        "registry entry quarantined"
    );
}

/// A registry migration step was applied in memory.
pub fn migration_applied(from: u32, to: u32) {
    ::tracing::info!(event = "migration_applied", from = from, to = to, "applied registry migration");
}

/// A registry document was written.
pub fn registry_written(path: &str, entries: usize) {
    ::tracing::debug!(event = "registry_written", path = %path, entries = entries, "registry persisted");
}

/// A delivery attempt failed; the error is recorded on the entry.
pub fn delivery_failed(key: &str, error: &str) {
    ::tracing::warn!(event = "delivery_failed", key = %key, error = %error, "delivery failed");
}

/// A tenant's unit of work failed inside its error boundary.
pub fn tenant_failed(key: &str, error: &str) {
    ::tracing::warn!(event = "tenant_failed", key = %key, error = %error, "tenant work failed");
}

/// A tenant hit the silence threshold and was snoozed.
pub fn tenant_auto_snoozed(key: &str, until: &str) {
    ::tracing::info!(event = "tenant_auto_snoozed", key = %key, until = %until, "tenant auto-snoozed");
}

/// Every delivery into a group failed during one pass.
pub fn group_migration_suspected(group_id: &str, attempts: usize) {
    ::tracing::warn!(
        event = "group_migration_suspected",
        group_id = %group_id,
        attempts = attempts,
        "all deliveries to group failed; probable platform-side group change"
    );
}

/// A batch pass finished.
pub fn pass_completed(kind: &str, processed: usize, skipped: usize, failed: usize) {
    ::tracing::info!(
        event = "pass_completed",
        kind = %kind,
        processed = processed,
        skipped = skipped,
        failed = failed,
        "batch pass completed"
    );
}

/// A command was denied by the authorization gate.
pub fn command_denied(command: &str, caller_id: &str) {
    ::tracing::info!(event = "command_denied", command = %command, caller_id = %caller_id, "command denied");
}
