//! v003: the `dev` tenant type is now `coding`.

use serde_json::Value;

use super::for_each_entry;

pub fn migrate(doc: &mut Value) {
    for_each_entry(doc, |_, entry| {
        if entry.get("type").and_then(Value::as_str) == Some("dev") {
            entry.insert("type".to_string(), Value::from("coding"));
        }
    });
}
