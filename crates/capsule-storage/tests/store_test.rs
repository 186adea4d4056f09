//! Registry store tests: persistence, locking, quarantine, and migrations.
//!
//! Every test works against a real file in a temp directory.

use std::sync::Arc;
use std::time::Duration;

use capsule_core::constants::SCHEMA_VERSION;
use capsule_core::errors::{CapsuleErrorCode, StoreError};
use capsule_core::models::{Registry, TenantEntry, TenantKey, TenantStatus, TenantType};
use capsule_storage::lock;
use capsule_storage::RegistryStore;
use chrono::{TimeZone, Utc};
use serde_json::json;

fn entry(thread: &str, slug: &str) -> TenantEntry {
    TenantEntry::new(
        &TenantKey::new("-100", thread),
        slug,
        slug.to_uppercase(),
        TenantType::Coding,
        2,
    )
}

fn seeded() -> Registry {
    let mut reg = Registry::new("secret");
    reg.admin_ids.insert("7".into());
    reg.insert(entry("1", "alpha"));
    reg.insert(entry("2", "beta"));
    reg
}

fn store_in(dir: &tempfile::TempDir) -> RegistryStore {
    RegistryStore::new(dir.path().join("registry.json"))
}

// ═══════════════════════════════════════════════════════════════════════════
// READ / WRITE
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn write_then_read_returns_document() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    let doc = seeded();
    store.write(&doc).await.unwrap();
    assert_eq!(store.read().unwrap(), doc);
}

#[test]
fn read_missing_file_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let err = store_in(&dir).read().unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }));
    assert_eq!(err.error_code(), "NOT_FOUND");
}

#[tokio::test]
async fn create_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    assert!(store.create(seeded()).await.unwrap());
    assert!(!store.create(Registry::new("other")).await.unwrap());
    assert_eq!(store.read().unwrap().shared_secret, "secret");
}

#[test]
fn future_schema_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    let doc = json!({"schemaVersion": SCHEMA_VERSION + 1, "maxEntries": 1, "entries": {}});
    std::fs::write(store.path(), doc.to_string()).unwrap();
    assert!(matches!(
        store.read(),
        Err(StoreError::SchemaTooNew { found, supported }) if found == SCHEMA_VERSION + 1 && supported == SCHEMA_VERSION
    ));
}

#[test]
fn missing_version_is_a_validation_error() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    std::fs::write(store.path(), r#"{"maxEntries": 1, "entries": {}}"#).unwrap();
    assert!(matches!(store.read(), Err(StoreError::Validation { .. })));
}

// ═══════════════════════════════════════════════════════════════════════════
// MUTATE
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn mutation_is_visible_to_next_read() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    store.write(&seeded()).await.unwrap();

    let renamed: Result<String, StoreError> = store
        .mutate(|reg| {
            let e = reg.get_mut(&TenantKey::new("-100", "1")).unwrap();
            e.name = "Renamed".into();
            Ok(e.slug.clone())
        })
        .await;
    assert_eq!(renamed.unwrap(), "alpha");

    let back = store.read().unwrap();
    assert_eq!(back.get(&TenantKey::new("-100", "1")).unwrap().name, "Renamed");
}

#[tokio::test]
async fn mutate_without_document_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let result: Result<(), StoreError> = store_in(&dir).mutate(|_| Ok(())).await;
    assert!(matches!(result, Err(StoreError::NotFound { .. })));
}

#[tokio::test]
async fn closure_error_aborts_write() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    store.write(&seeded()).await.unwrap();
    let result: Result<(), StoreError> = store
        .mutate(|reg| {
            reg.entries.clear();
            Err(StoreError::Validation {
                message: "nope".into(),
            })
        })
        .await;
    assert!(result.is_err());
    assert_eq!(store.read().unwrap().entries.len(), 2);
}

#[tokio::test]
async fn invalid_result_is_not_written() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    store.write(&seeded()).await.unwrap();
    let result: Result<(), StoreError> = store
        .mutate(|reg| {
            let e = reg.get_mut(&TenantKey::new("-100", "1")).unwrap();
            e.snooze_until = Some(Utc::now());
            Ok(())
        })
        .await;
    assert!(matches!(result, Err(StoreError::Validation { .. })));
    assert!(store.read().unwrap().entries.values().all(|e| e.snooze_until.is_none()));
}

#[tokio::test]
async fn capsule_version_regression_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    store.write(&seeded()).await.unwrap();
    let result: Result<(), StoreError> = store
        .mutate(|reg| {
            reg.get_mut(&TenantKey::new("-100", "1")).unwrap().capsule_version = 1;
            Ok(())
        })
        .await;
    assert!(matches!(result, Err(StoreError::Validation { .. })));
}

#[tokio::test]
async fn dropping_an_entry_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    store.write(&seeded()).await.unwrap();
    let result: Result<(), StoreError> = store
        .mutate(|reg| {
            reg.entries.remove("-100:2");
            Ok(())
        })
        .await;
    match result {
        Err(StoreError::Validation { message }) => assert!(message.contains("-100:2"), "{message}"),
        other => panic!("expected validation error, got {other:?}"),
    }
    assert_eq!(store.read().unwrap().entries.len(), 2);
}

#[tokio::test]
async fn async_mutation_holds_lock_across_awaits() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    store.write(&seeded()).await.unwrap();
    let count: Result<usize, StoreError> = store
        .mutate_async(|mut reg| async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            reg.insert(entry("3", "gamma"));
            let n = reg.entries.len();
            Ok((reg, n))
        })
        .await;
    assert_eq!(count.unwrap(), 3);
    assert!(store.read().unwrap().find_by_slug("gamma").is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_mutations_are_serialized() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(store_in(&dir));
    store.write(&seeded()).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store
                .mutate(|reg| {
                    let e = reg.get_mut(&TenantKey::new("-100", "1")).unwrap();
                    e.consecutive_silent_checks += 1;
                    Ok::<_, StoreError>(())
                })
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }
    let back = store.read().unwrap();
    assert_eq!(
        back.get(&TenantKey::new("-100", "1")).unwrap().consecutive_silent_checks,
        8
    );
}

#[tokio::test]
async fn held_lock_times_out() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir).with_lock_timeout(Duration::from_millis(80));
    store.write(&seeded()).await.unwrap();

    let mut other = lock::open(store.lock_path()).unwrap();
    let _held = other.try_write().unwrap();

    let result: Result<(), StoreError> = store.mutate(|_| Ok(())).await;
    let err = result.unwrap_err();
    assert!(matches!(err, StoreError::LockTimeout { .. }));
    assert!(err.is_retryable());
}

// ═══════════════════════════════════════════════════════════════════════════
// QUARANTINE & MIGRATION
// ═══════════════════════════════════════════════════════════════════════════

fn raw_entry(group: &str, thread: &str, slug: &str) -> serde_json::Value {
    json!({
        "groupId": group, "threadId": thread, "slug": slug, "name": slug,
        "type": "general", "status": "active", "capsuleVersion": 1
    })
}

#[tokio::test]
async fn bad_entries_are_quarantined_and_preserved() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    let doc = json!({
        "schemaVersion": SCHEMA_VERSION,
        "adminIds": [], "sharedSecret": "", "lastBatchRunAt": null,
        "lastReportRunAt": null, "maxEntries": 10,
        "entries": {
            "g:1": raw_entry("g", "1", "one"),
            "g:2": raw_entry("g", "2", "one"),
            "g:3": raw_entry("g", "9", "three"),
            "g:4": raw_entry("g", "4", "Not A Slug")
        }
    });
    std::fs::write(store.path(), doc.to_string()).unwrap();

    let snapshot = store.read_snapshot().unwrap();
    assert_eq!(snapshot.registry.entries.keys().collect::<Vec<_>>(), vec!["g:1"]);
    assert_eq!(snapshot.quarantined.len(), 3);

    // A later write keeps the quarantined records on disk.
    let result: Result<(), StoreError> = store
        .mutate(|reg| {
            reg.admin_ids.insert("1".into());
            Ok(())
        })
        .await;
    result.unwrap();
    let on_disk: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
    assert_eq!(on_disk["entries"].as_object().unwrap().len(), 4);
    assert_eq!(store.read().unwrap().entries.len(), 1);
}

#[tokio::test]
async fn old_document_is_migrated_and_persisted_on_mutate() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    let v1 = json!({
        "schemaVersion": 1,
        "adminIds": ["7"], "sharedSecret": "s", "lastBatchRunAt": null, "maxEntries": 5,
        "entries": {
            "g:1": {
                "groupId": "g", "threadId": "1", "name": "Old Project", "type": "dev",
                "status": "archived", "capsuleVersion": 1,
                "snoozeUntil": "2026-01-01T00:00:00Z"
            }
        }
    });
    std::fs::write(store.path(), v1.to_string()).unwrap();

    let snapshot = store.read_snapshot().unwrap();
    assert_eq!(snapshot.stored_version, 1);
    let e = snapshot.registry.get(&TenantKey::new("g", "1")).unwrap();
    assert_eq!(e.slug, "old-project");
    assert_eq!(e.tenant_type, TenantType::Coding);
    assert_eq!(e.status, TenantStatus::Archived);
    assert!(e.snooze_until.is_none());

    let result: Result<(), StoreError> = store.mutate(|_| Ok(())).await;
    result.unwrap();
    let on_disk: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
    assert_eq!(on_disk["schemaVersion"], json!(SCHEMA_VERSION));
    assert_eq!(store.read_snapshot().unwrap().stored_version, SCHEMA_VERSION);
}

#[tokio::test]
async fn timestamps_survive_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    let mut doc = seeded();
    let at = Utc.with_ymd_and_hms(2026, 10, 15, 6, 0, 0).unwrap();
    doc.last_batch_run_at = Some(at);
    doc.get_mut(&TenantKey::new("-100", "2")).unwrap().last_message_at = Some(at);
    store.write(&doc).await.unwrap();
    let back = store.read().unwrap();
    assert_eq!(back.last_batch_run_at, Some(at));
    assert_eq!(
        back.get(&TenantKey::new("-100", "2")).unwrap().last_message_at,
        Some(at)
    );
}

fn quarantined_doc() -> serde_json::Value {
    let mut broken = raw_entry("g", "2", "two");
    broken["status"] = json!("deleted");
    broken["extras"] = json!({"precious": "history"});
    json!({
        "schemaVersion": SCHEMA_VERSION,
        "adminIds": [], "sharedSecret": "", "lastBatchRunAt": null,
        "lastReportRunAt": null, "maxEntries": 10,
        "entries": {
            "g:1": raw_entry("g", "1", "one"),
            "g:2": broken
        }
    })
}

#[tokio::test]
async fn claiming_a_quarantined_key_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    std::fs::write(store.path(), quarantined_doc().to_string()).unwrap();
    assert_eq!(store.quarantined_keys().unwrap(), vec!["g:2".to_string()]);

    let result: Result<(), StoreError> = store
        .mutate(|reg| {
            reg.insert(TenantEntry::new(
                &TenantKey::new("g", "2"),
                "fresh",
                "Fresh",
                TenantType::General,
                1,
            ));
            Ok(())
        })
        .await;
    assert!(matches!(result, Err(StoreError::Validation { .. })));

    let on_disk: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
    assert_eq!(on_disk["entries"]["g:2"]["extras"]["precious"], "history");
}

#[tokio::test]
async fn overwrite_keeps_quarantined_records() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    std::fs::write(store.path(), quarantined_doc().to_string()).unwrap();

    let reg = store.read().unwrap();
    store.write(&reg).await.unwrap();

    let on_disk: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
    assert_eq!(on_disk["entries"]["g:2"]["extras"]["precious"], "history");
    assert_eq!(store.quarantined_keys().unwrap().len(), 1);
}

#[test]
fn missing_store_has_no_quarantine() {
    let dir = tempfile::tempdir().unwrap();
    assert!(store_in(&dir).quarantined_keys().unwrap().is_empty());
}
