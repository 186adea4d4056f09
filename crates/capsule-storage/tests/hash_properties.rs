//! Property tests for the registry hash.

use capsule_core::models::{Registry, TenantEntry, TenantKey, TenantStatus, TenantType};
use capsule_storage::registry_hash;
use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;

fn registry(names: &[String]) -> Registry {
    let mut reg = Registry::new("s");
    for (i, name) in names.iter().enumerate() {
        reg.insert(TenantEntry::new(
            &TenantKey::new("g", i.to_string()),
            format!("t{i}"),
            name.clone(),
            TenantType::ALL[i % TenantType::ALL.len()],
            1,
        ));
    }
    reg
}

fn names() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[A-Za-z][A-Za-z ]{0,20}", 1..6)
}

proptest! {
    #[test]
    fn hash_is_stable(names in names()) {
        let reg = registry(&names);
        prop_assert_eq!(registry_hash(&reg).unwrap(), registry_hash(&reg.clone()).unwrap());
    }

    #[test]
    fn volatile_fields_do_not_change_hash(names in names(), hours in 0i64..10_000, silent in 0u32..50) {
        let reg = registry(&names);
        let before = registry_hash(&reg).unwrap();
        let mut touched = reg.clone();
        let at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap() + Duration::hours(hours);
        touched.last_batch_run_at = Some(at);
        for e in touched.entries.values_mut() {
            e.last_message_at = Some(at);
            e.last_check_run_at = Some(at);
            e.last_check_report_at = Some(at);
            e.last_daily_report_at = Some(at);
            e.consecutive_silent_checks = silent;
            e.record_delivery_error("timeout");
        }
        prop_assert_eq!(before, registry_hash(&touched).unwrap());
    }

    #[test]
    fn renaming_changes_hash(names in names(), suffix in "[a-z]{1,5}") {
        let reg = registry(&names);
        let mut renamed = reg.clone();
        let first = renamed.entries.values_mut().next().unwrap();
        first.name = format!("{}{}", first.name, suffix);
        prop_assert_ne!(registry_hash(&reg).unwrap(), registry_hash(&renamed).unwrap());
    }

    #[test]
    fn status_and_version_change_hash(names in names()) {
        let reg = registry(&names);
        let base = registry_hash(&reg).unwrap();

        let mut archived = reg.clone();
        archived.entries.values_mut().next().unwrap().status = TenantStatus::Archived;
        prop_assert_ne!(&base, &registry_hash(&archived).unwrap());

        let mut upgraded = reg.clone();
        upgraded.entries.values_mut().next().unwrap().capsule_version += 1;
        prop_assert_ne!(&base, &registry_hash(&upgraded).unwrap());
    }
}
