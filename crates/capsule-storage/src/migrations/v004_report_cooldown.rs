//! v004: separate report-pass cooldown, required slugs, snooze cleanup.
//!
//! - adds top-level `lastReportRunAt`;
//! - entries without a slug get one derived from their name, suffixed with
//!   `-2`, `-3`, ... when the derived slug is already taken;
//! - `snoozeUntil` is cleared on entries that are not snoozed.

use std::collections::BTreeSet;

use capsule_core::models::slugify;
use serde_json::Value;

use super::for_each_entry;

pub fn migrate(doc: &mut Value) {
    if let Some(obj) = doc.as_object_mut() {
        obj.entry("lastReportRunAt").or_insert(Value::Null);
    }

    let mut taken: BTreeSet<String> = BTreeSet::new();
    for_each_entry(doc, |_, entry| {
        if let Some(slug) = entry.get("slug").and_then(Value::as_str) {
            taken.insert(slug.to_string());
        }
    });

    for_each_entry(doc, |key, entry| {
        let has_slug = entry.get("slug").and_then(Value::as_str).is_some();
        if !has_slug {
            let base = entry
                .get("name")
                .and_then(Value::as_str)
                .map(slugify)
                .unwrap_or_else(|| slugify(key));
            let slug = unique_slug(&base, &taken);
            taken.insert(slug.clone());
            entry.insert("slug".to_string(), Value::from(slug));
        }

        let snoozed = entry.get("status").and_then(Value::as_str) == Some("snoozed");
        if !snoozed && entry.get("snoozeUntil").is_some_and(|v| !v.is_null()) {
            entry.insert("snoozeUntil".to_string(), Value::Null);
        }
    });
}

fn unique_slug(base: &str, taken: &BTreeSet<String>) -> String {
    if !taken.contains(base) {
        return base.to_string();
    }
    let mut n = 2;
    loop {
        let suffix = format!("-{n}");
        let mut candidate = base.to_string();
        candidate.truncate(48 - suffix.len());
        let candidate = format!("{}{suffix}", candidate.trim_end_matches('-'));
        if !taken.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn derived_slugs_do_not_collide() {
        let mut doc = json!({
            "schemaVersion": 3,
            "entries": {
                "g:1": {"name": "Alpha", "slug": "alpha", "status": "active"},
                "g:2": {"name": "Alpha!", "status": "active"},
            }
        });
        migrate(&mut doc);
        assert_eq!(doc["entries"]["g:2"]["slug"], json!("alpha-2"));
        assert_eq!(doc["lastReportRunAt"], Value::Null);
    }

    #[test]
    fn snoozed_entries_keep_their_deadline() {
        let mut doc = json!({
            "entries": {
                "g:1": {"slug": "a", "status": "snoozed", "snoozeUntil": "2026-12-01T00:00:00Z"}
            }
        });
        migrate(&mut doc);
        assert_eq!(doc["entries"]["g:1"]["snoozeUntil"], json!("2026-12-01T00:00:00Z"));
    }
}
