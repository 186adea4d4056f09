//! Registry schema migrations.
//!
//! Each migration is a pure `fn(&mut Value)` that upgrades the raw document by
//! one version. Migrations run in memory during `read()`; the upgraded shape
//! is persisted by the next `mutate()`.

pub mod v002_silence_counters;
pub mod v003_coding_type;
pub mod v004_report_cooldown;

use capsule_core::constants::SCHEMA_VERSION;
use capsule_core::errors::{StoreError, StoreResult};
use capsule_core::tracing::events;
use serde_json::{Map, Value};

/// Oldest schema version a document may declare.
pub const BASE_VERSION: u32 = 1;

type Migration = fn(&mut Value);

/// Ordered chain: entry `(to, f)` upgrades a document from `to - 1` to `to`.
const MIGRATIONS: &[(u32, Migration)] = &[
    (2, v002_silence_counters::migrate),
    (3, v003_coding_type::migrate),
    (4, v004_report_cooldown::migrate),
];

/// Read the declared schema version of a raw document.
pub fn declared_version(doc: &Value) -> StoreResult<u32> {
    let raw = doc
        .get("schemaVersion")
        .ok_or_else(|| StoreError::Validation {
            message: "document has no schemaVersion".to_string(),
        })?;
    let version = raw.as_u64().ok_or_else(|| StoreError::Validation {
        message: format!("schemaVersion must be a non-negative integer, got {raw}"),
    })?;
    u32::try_from(version).map_err(|_| StoreError::SchemaTooNew {
        found: u32::MAX,
        supported: SCHEMA_VERSION,
    })
}

/// Upgrade `doc` to [`SCHEMA_VERSION`], returning the version it started at.
pub fn run_migrations(doc: &mut Value) -> StoreResult<u32> {
    let start = declared_version(doc)?;
    if start > SCHEMA_VERSION {
        return Err(StoreError::SchemaTooNew {
            found: start,
            supported: SCHEMA_VERSION,
        });
    }
    if start < BASE_VERSION {
        return Err(StoreError::Validation {
            message: format!("unsupported schemaVersion {start}"),
        });
    }
    if !doc.is_object() {
        return Err(StoreError::Validation {
            message: "registry document must be a JSON object".to_string(),
        });
    }

    let mut current = start;
    for &(to, migrate) in MIGRATIONS {
        if to <= current {
            continue;
        }
        if to != current + 1 {
            return Err(StoreError::Migration {
                from: current,
                to,
                message: "gap in migration chain".to_string(),
            });
        }
        migrate(doc);
        doc["schemaVersion"] = Value::from(to);
        events::migration_applied(current, to);
        current = to;
    }

    if current != SCHEMA_VERSION {
        return Err(StoreError::Migration {
            from: current,
            to: SCHEMA_VERSION,
            message: "no migration registered".to_string(),
        });
    }
    Ok(start)
}

/// Apply `f` to every entry that is a JSON object. Malformed entries are left
/// for quarantine.
pub(crate) fn for_each_entry(doc: &mut Value, mut f: impl FnMut(&str, &mut Map<String, Value>)) {
    if let Some(entries) = doc.get_mut("entries").and_then(Value::as_object_mut) {
        for (key, entry) in entries.iter_mut() {
            if let Some(obj) = entry.as_object_mut() {
                f(key, obj);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn v1_doc() -> Value {
        json!({
            "schemaVersion": 1,
            "adminIds": ["1"],
            "sharedSecret": "s",
            "lastBatchRunAt": null,
            "maxEntries": 100,
            "entries": {
                "g:1": {
                    "groupId": "g", "threadId": "1", "name": "Web App",
                    "type": "dev", "status": "active", "capsuleVersion": 1,
                    "snoozeUntil": "2026-01-01T00:00:00Z"
                }
            }
        })
    }

    #[test]
    fn chain_is_contiguous_and_ends_at_current() {
        let mut expected = BASE_VERSION + 1;
        for &(to, _) in MIGRATIONS {
            assert_eq!(to, expected);
            expected += 1;
        }
        assert_eq!(expected - 1, SCHEMA_VERSION);
    }

    #[test]
    fn v1_document_is_fully_upgraded() {
        let mut doc = v1_doc();
        assert_eq!(run_migrations(&mut doc).unwrap(), 1);
        let entry = &doc["entries"]["g:1"];
        assert_eq!(doc["schemaVersion"], json!(SCHEMA_VERSION));
        assert_eq!(doc["lastReportRunAt"], Value::Null);
        assert_eq!(entry["consecutiveSilentChecks"], json!(0));
        assert_eq!(entry["type"], json!("coding"));
        assert_eq!(entry["slug"], json!("web-app"));
        assert_eq!(entry["snoozeUntil"], Value::Null);
    }

    #[test]
    fn current_version_is_a_no_op() {
        let mut doc = v1_doc();
        run_migrations(&mut doc).unwrap();
        let once = doc.clone();
        run_migrations(&mut doc).unwrap();
        assert_eq!(doc, once);
    }

    #[test]
    fn each_migration_is_idempotent() {
        let mut doc = v1_doc();
        for &(to, migrate) in MIGRATIONS {
            migrate(&mut doc);
            let once = doc.clone();
            migrate(&mut doc);
            assert_eq!(doc, once, "migration to v{to} is not idempotent");
        }
    }

    #[test]
    fn version_errors() {
        assert!(matches!(
            run_migrations(&mut json!({"entries": {}})),
            Err(StoreError::Validation { .. })
        ));
        assert!(matches!(
            run_migrations(&mut json!({"schemaVersion": "4"})),
            Err(StoreError::Validation { .. })
        ));
        assert!(matches!(
            run_migrations(&mut json!({"schemaVersion": 0})),
            Err(StoreError::Validation { .. })
        ));
        assert!(matches!(
            run_migrations(&mut json!({"schemaVersion": SCHEMA_VERSION + 1})),
            Err(StoreError::SchemaTooNew { .. })
        ));
    }
}
