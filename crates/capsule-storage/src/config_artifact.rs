//! Machine-generated topic config and the registry hash embedded in it.
//!
//! The artifact is derived state: it can always be regenerated from the
//! registry. The embedded hash lets the check engine detect when the two have
//! drifted apart.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use capsule_core::constants::VERSION;
use capsule_core::errors::{StoreError, StoreResult};
use capsule_core::models::{Registry, TenantStatus, TenantType};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::atomic::write_atomic;

/// Non-volatile fields of one entry, in a fixed field order.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HashedEntry<'a> {
    key: &'a str,
    group_id: &'a str,
    thread_id: &'a str,
    slug: &'a str,
    name: &'a str,
    #[serde(rename = "type")]
    tenant_type: TenantType,
    status: TenantStatus,
    capsule_version: u32,
    cron_job_id: Option<&'a str>,
    extras: &'a BTreeMap<String, Value>,
}

/// blake3 over the canonical projection of every entry, in key order.
///
/// Timestamps, snooze deadline, silence counter, and last delivery error are
/// excluded, as are top-level settings; changing them never changes the hash.
pub fn registry_hash(doc: &Registry) -> StoreResult<String> {
    let projection: Vec<HashedEntry<'_>> = doc
        .entries
        .iter()
        .map(|(key, e)| HashedEntry {
            key,
            group_id: &e.group_id,
            thread_id: &e.thread_id,
            slug: &e.slug,
            name: &e.name,
            tenant_type: e.tenant_type,
            status: e.status,
            capsule_version: e.capsule_version,
            cron_job_id: e.cron_job_id.as_deref(),
            extras: &e.extras,
        })
        .collect();
    let serialized = serde_json::to_string(&projection).map_err(|e| StoreError::Serialization {
        message: e.to_string(),
    })?;
    Ok(blake3::hash(serialized.as_bytes()).to_hex().to_string())
}

/// Parsed generated config artifact.
///
/// Topic blocks are kept as raw JSON so consumers can report exactly which
/// sub-fields are missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedConfig {
    #[serde(default)]
    pub generated_by: Option<String>,
    #[serde(default)]
    pub registry_hash: Option<String>,
    #[serde(default)]
    pub topics: BTreeMap<String, Value>,
}

impl GeneratedConfig {
    pub fn parse(text: &str) -> StoreResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Load the artifact at `path`; `Ok(None)` when it does not exist.
    pub fn load(path: &Path) -> StoreResult<Option<Self>> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::parse(&text).map(Some),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StoreError::io(path, err)),
        }
    }

    /// The tenant block for registry key `key`, if any.
    pub fn block(&self, key: &str) -> Option<&Value> {
        self.topics.get(key)
    }
}

/// Build the artifact for `doc`: one block per non-archived entry.
pub fn render(doc: &Registry) -> StoreResult<GeneratedConfig> {
    let topics = doc
        .entries
        .iter()
        .filter(|(_, e)| !e.is_archived())
        .map(|(key, e)| {
            let mut block = json!({
                "slug": e.slug,
                "name": e.name,
                "type": e.tenant_type,
                "enabled": e.status == TenantStatus::Active,
                "capsuleVersion": e.capsule_version,
            });
            if let Some(ref job) = e.cron_job_id {
                block["cronJobId"] = Value::from(job.as_str());
            }
            (key.clone(), block)
        })
        .collect();

    Ok(GeneratedConfig {
        generated_by: Some(format!("capsule {VERSION}")),
        registry_hash: Some(registry_hash(doc)?),
        topics,
    })
}

/// Path of the backup kept for the previous artifact.
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".bak");
    path.with_file_name(name)
}

/// Render `doc` and atomically replace the artifact at `path`, first copying
/// any existing artifact to `<path>.bak`. Returns the config it wrote.
pub fn regenerate(path: &Path, doc: &Registry) -> StoreResult<GeneratedConfig> {
    let config = render(doc)?;
    if path.exists() {
        let backup = backup_path(path);
        std::fs::copy(path, &backup).map_err(|e| StoreError::io(&backup, e))?;
    }
    let bytes = serde_json::to_vec_pretty(&config).map_err(|e| StoreError::Serialization {
        message: e.to_string(),
    })?;
    write_atomic(path, &bytes)?;
    tracing::info!(
        path = %path.display(),
        topics = config.topics.len(),
        "regenerated topic config"
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use capsule_core::models::{TenantEntry, TenantKey};

    fn doc() -> Registry {
        let mut reg = Registry::new("s");
        reg.insert(TenantEntry::new(
            &TenantKey::new("g", "1"),
            "alpha",
            "Alpha",
            TenantType::Coding,
            2,
        ));
        let mut archived = TenantEntry::new(
            &TenantKey::new("g", "2"),
            "beta",
            "Beta",
            TenantType::General,
            1,
        );
        archived.archive();
        reg.insert(archived);
        reg
    }

    #[test]
    fn render_skips_archived_entries() {
        let config = render(&doc()).unwrap();
        assert_eq!(config.topics.len(), 1);
        let block = config.block("g:1").unwrap();
        assert_eq!(block["slug"], "alpha");
        assert_eq!(block["enabled"], true);
        assert!(block.get("cronJobId").is_none());
    }

    #[test]
    fn regenerate_keeps_a_backup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("topics.generated.json");
        let first = regenerate(&path, &doc()).unwrap().registry_hash.unwrap();

        let mut changed = doc();
        changed.get_mut(&TenantKey::new("g", "1")).unwrap().name = "Alpha Two".into();
        let second = regenerate(&path, &changed).unwrap();
        assert_eq!(second.topics.len(), 1);
        let second = second.registry_hash.unwrap();
        assert_ne!(first, second);

        let backup = GeneratedConfig::load(&backup_path(&path)).unwrap().unwrap();
        assert_eq!(backup.registry_hash.as_deref(), Some(first.as_str()));
        let current = GeneratedConfig::load(&path).unwrap().unwrap();
        assert_eq!(current.registry_hash.as_deref(), Some(second.as_str()));
    }

    #[test]
    fn missing_artifact_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(GeneratedConfig::load(&dir.path().join("nope.json")).unwrap(), None);
    }
}
