//! v002: per-entry silence counter and last delivery error.

use serde_json::Value;

use super::for_each_entry;

pub fn migrate(doc: &mut Value) {
    for_each_entry(doc, |_, entry| {
        entry
            .entry("consecutiveSilentChecks")
            .or_insert_with(|| Value::from(0));
        entry.entry("lastDeliveryError").or_insert(Value::Null);
    });
}
