//! Tests for the registry data model and its JSON shape.

use capsule_core::errors::{CapsuleErrorCode, StoreError};
use capsule_core::models::{Finding, Registry, Severity, TenantEntry, TenantKey, TenantStatus, TenantType};
use chrono::{TimeZone, Utc};
use serde_json::json;

fn sample_entry() -> TenantEntry {
    let mut entry = TenantEntry::new(
        &TenantKey::new("-1009", "12"),
        "web-app",
        "Web App",
        TenantType::Coding,
        2,
    );
    entry.last_message_at = Some(Utc.with_ymd_and_hms(2026, 10, 1, 9, 0, 0).unwrap());
    entry.extras.insert("pinned".into(), json!({"messageId": 77}));
    entry
}

#[test]
fn entry_serializes_with_camel_case_keys() {
    let value = serde_json::to_value(sample_entry()).unwrap();
    assert_eq!(value["groupId"], "-1009");
    assert_eq!(value["threadId"], "12");
    assert_eq!(value["type"], "coding");
    assert_eq!(value["status"], "active");
    assert_eq!(value["capsuleVersion"], 2);
    assert_eq!(value["consecutiveSilentChecks"], 0);
    assert_eq!(value["extras"]["pinned"]["messageId"], 77);
}

#[test]
fn unknown_status_value_fails_to_deserialize() {
    let mut value = serde_json::to_value(sample_entry()).unwrap();
    value["status"] = json!("deleted");
    assert!(serde_json::from_value::<TenantEntry>(value).is_err());
}

#[test]
fn registry_json_roundtrip_is_lossless() {
    let mut reg = Registry::new("secret");
    reg.admin_ids.insert("1001".into());
    reg.insert(sample_entry());
    let text = serde_json::to_string_pretty(&reg).unwrap();
    let back: Registry = serde_json::from_str(&text).unwrap();
    assert_eq!(back, reg);
    assert!(back.get(&TenantKey::new("-1009", "12")).is_some());
    assert_eq!(back.find_by_slug("web-app").map(|e| e.status), Some(TenantStatus::Active));
}

#[test]
fn severity_orders_error_highest() {
    let mut findings = vec![
        Finding::info("a", "x"),
        Finding::error("b", "y"),
        Finding::warn("c", "z"),
    ];
    findings.sort_by(|l, r| r.severity.cmp(&l.severity));
    assert_eq!(findings[0].severity, Severity::Error);
    assert!(Severity::Warn.is_problem());
    assert!(!Severity::Info.is_problem());
    assert_eq!(serde_json::to_value(Severity::Warn).unwrap(), json!("WARN"));
}

#[test]
fn lock_timeout_is_the_only_retryable_store_error() {
    let timeout = StoreError::LockTimeout {
        path: "r.lock".into(),
        waited_ms: 10,
    };
    assert!(timeout.is_retryable());
    assert_eq!(timeout.error_code(), "LOCK_TIMEOUT");
    let newer = StoreError::SchemaTooNew { found: 9, supported: 4 };
    assert!(!newer.is_retryable());
    assert!(newer.coded_string().starts_with("[SCHEMA_TOO_NEW]"));
}
