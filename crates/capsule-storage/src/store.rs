//! `RegistryStore`: the one place that reads and writes the registry file.

use std::collections::BTreeMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use capsule_core::config::StoreConfig;
use capsule_core::constants::{DEFAULT_LOCK_TIMEOUT_MS, LOCK_POLL_INTERVAL_MS, SCHEMA_VERSION};
use capsule_core::errors::{EntryError, StoreError, StoreResult};
use capsule_core::models::Registry;
use capsule_core::tracing::events;
use capsule_core::TenantEntry;
use serde_json::{Map, Value};
use tracing::{debug, info_span, Instrument};

use crate::atomic::write_atomic;
use crate::lock;

/// A validated view of the persisted document.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Entries that passed validation, plus all top-level settings.
    pub registry: Registry,
    /// Raw JSON of entries that failed validation, keyed by registry key.
    /// They are excluded from `registry` but carried through writes so a
    /// later repair can recover them.
    pub quarantined: BTreeMap<String, Value>,
    /// Schema version declared on disk before in-memory migration.
    pub stored_version: u32,
}

/// Durable single-file registry with an exclusive companion lock.
#[derive(Debug, Clone)]
pub struct RegistryStore {
    path: PathBuf,
    lock_path: PathBuf,
    lock_timeout: Duration,
}

impl RegistryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            lock_path: lock::lock_path_for(&path),
            path,
            lock_timeout: Duration::from_millis(DEFAULT_LOCK_TIMEOUT_MS),
        }
    }

    /// Store for the workspace rooted at `root`, as configured.
    pub fn from_config(root: &Path, config: &StoreConfig) -> Self {
        Self::new(config.effective_path(root)).with_lock_timeout(config.effective_lock_timeout())
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load, migrate, and validate the persisted document. Invalid entries
    /// are quarantined. Takes no lock.
    pub fn read(&self) -> StoreResult<Registry> {
        self.read_snapshot().map(|s| s.registry)
    }

    /// Like [`read`](Self::read) but also reports what was quarantined.
    pub fn read_snapshot(&self) -> StoreResult<Snapshot> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound {
                    path: self.path.display().to_string(),
                });
            }
            Err(err) => return Err(StoreError::io(&self.path, err)),
        };
        decode(&text)
    }

    /// Apply `f` to the latest document under the exclusive lock and persist
    /// the result. An error from `f` aborts the write.
    pub async fn mutate<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Registry) -> Result<T, E>,
        E: From<StoreError>,
    {
        self.mutate_async(|mut doc| async move {
            let value = f(&mut doc)?;
            Ok::<_, E>((doc, value))
        })
        .await
    }

    /// Asynchronous form of [`mutate`](Self::mutate): `f` receives the
    /// document by value and hands back the next document with its result.
    /// The lock is held across `f`'s await points.
    pub async fn mutate_async<T, E, F, Fut>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(Registry) -> Fut,
        Fut: Future<Output = Result<(Registry, T), E>>,
        E: From<StoreError>,
    {
        let span = info_span!("registry_mutate", path = %self.path.display());
        self.with_lock(|| async move {
            let current = self.read_snapshot()?;
            let previous = current.registry.clone();
            let (next, value) = f(current.registry).await?;
            next.check_monotonic(&previous).map_err(StoreError::from)?;
            self.persist(&next, &current.quarantined)?;
            Ok::<T, E>(value)
        })
        .instrument(span)
        .await
    }

    /// Write `seed` if no document exists yet. Returns whether it was written.
    pub async fn create(&self, seed: Registry) -> StoreResult<bool> {
        self.with_lock(|| async move {
            if self.exists() {
                debug!(path = %self.path.display(), "registry already exists");
                return Ok(false);
            }
            self.persist(&seed, &BTreeMap::new())?;
            Ok::<bool, StoreError>(true)
        })
        .await
    }

    /// Overwrite the document under the lock. Quarantined records already on
    /// disk are carried over.
    pub async fn write(&self, doc: &Registry) -> StoreResult<()> {
        self.with_lock(|| async move {
            let quarantined = match self.read_snapshot() {
                Ok(snapshot) => snapshot.quarantined,
                Err(StoreError::NotFound { .. }) => BTreeMap::new(),
                Err(err) => return Err(err),
            };
            self.persist(doc, &quarantined)
        })
        .await
    }

    /// Keys of records currently held in quarantine.
    pub fn quarantined_keys(&self) -> StoreResult<Vec<String>> {
        match self.read_snapshot() {
            Ok(snapshot) => Ok(snapshot.quarantined.into_keys().collect()),
            Err(StoreError::NotFound { .. }) => Ok(Vec::new()),
            Err(err) => Err(err),
        }
    }

    /// Run `op` while holding the exclusive lock. The guard drops on every
    /// exit path, including unwinding.
    async fn with_lock<T, E, F, Fut>(&self, op: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<StoreError>,
    {
        let mut file_lock = lock::open(&self.lock_path)?;
        let started = Instant::now();
        let poll = Duration::from_millis(LOCK_POLL_INTERVAL_MS);
        let _guard = loop {
            match file_lock.try_write() {
                Ok(guard) => break guard,
                Err(err) if lock::is_contended(&err) => {}
                Err(err) => return Err(StoreError::io(&self.lock_path, err).into()),
            }
            let waited = started.elapsed();
            if waited >= self.lock_timeout {
                return Err(StoreError::LockTimeout {
                    path: self.lock_path.display().to_string(),
                    waited_ms: waited.as_millis() as u64,
                }
                .into());
            }
            tokio::time::sleep(poll.min(self.lock_timeout - waited)).await;
        };
        op().await
    }

    /// Validate and atomically write `doc` with the quarantined entries
    /// re-attached. A document that claims a quarantined key is refused.
    fn persist(&self, doc: &Registry, quarantined: &BTreeMap<String, Value>) -> StoreResult<()> {
        if doc.schema_version != SCHEMA_VERSION {
            return Err(StoreError::Validation {
                message: format!(
                    "refusing to write schemaVersion {} (current is {SCHEMA_VERSION})",
                    doc.schema_version
                ),
            });
        }
        doc.validate()?;
        if let Some(key) = quarantined.keys().find(|k| doc.entries.contains_key(*k)) {
            return Err(EntryError::QuarantinedKey { key: key.clone() }.into());
        }

        let mut value = serde_json::to_value(doc).map_err(|e| StoreError::Serialization {
            message: e.to_string(),
        })?;
        if !quarantined.is_empty() {
            if let Some(entries) = value.get_mut("entries").and_then(Value::as_object_mut) {
                for (key, raw) in quarantined {
                    entries.insert(key.clone(), raw.clone());
                }
            }
        }
        let bytes = serde_json::to_vec_pretty(&value).map_err(|e| StoreError::Serialization {
            message: e.to_string(),
        })?;
        write_atomic(&self.path, &bytes)?;
        events::registry_written(&self.path.display().to_string(), doc.entries.len());
        Ok(())
    }
}

/// Parse, migrate, and validate a raw document.
pub fn decode(text: &str) -> StoreResult<Snapshot> {
    let mut value: Value = serde_json::from_str(text)?;
    let stored_version = crate::migrations::run_migrations(&mut value)?;

    let raw_entries = match value.as_object_mut().and_then(|o| o.remove("entries")) {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map,
        Some(_) => {
            return Err(StoreError::Validation {
                message: "entries must be an object".to_string(),
            });
        }
    };
    let mut registry: Registry = serde_json::from_value(value)?;

    let mut seen_slugs: BTreeMap<String, String> = BTreeMap::new();
    let mut quarantined = BTreeMap::new();
    for (key, raw) in raw_entries {
        match accept_entry(&key, &raw, &seen_slugs) {
            Ok(entry) => {
                seen_slugs.insert(entry.slug.clone(), key.clone());
                registry.entries.insert(key, entry);
            }
            Err(err) => {
                events::entry_quarantined(&key, &err.to_string());
                quarantined.insert(key, raw);
            }
        }
    }

    Ok(Snapshot {
        registry,
        quarantined,
        stored_version,
    })
}

fn accept_entry(
    key: &str,
    raw: &Value,
    seen_slugs: &BTreeMap<String, String>,
) -> Result<TenantEntry, EntryError> {
    let entry: TenantEntry =
        serde_json::from_value(raw.clone()).map_err(|e| EntryError::Malformed {
            key: key.to_string(),
            message: e.to_string(),
        })?;
    Registry::validate_entry(key, &entry, seen_slugs)?;
    Ok(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn malformed_entry_is_quarantined_not_fatal() {
        let text = json!({
            "schemaVersion": SCHEMA_VERSION,
            "adminIds": [],
            "sharedSecret": "",
            "lastBatchRunAt": null,
            "lastReportRunAt": null,
            "maxEntries": 10,
            "entries": {
                "g:1": {"groupId": "g", "threadId": "1", "slug": "ok", "name": "Ok",
                        "type": "general", "status": "active", "capsuleVersion": 1},
                "g:2": {"groupId": "g", "threadId": "2", "slug": "bad", "name": "Bad",
                        "type": "general", "status": "deleted", "capsuleVersion": 1}
            }
        })
        .to_string();
        let snapshot = decode(&text).unwrap();
        assert_eq!(snapshot.registry.entries.len(), 1);
        assert!(snapshot.quarantined.contains_key("g:2"));
    }

    #[test]
    fn entries_of_wrong_shape_reject_document() {
        let text = json!({"schemaVersion": SCHEMA_VERSION, "maxEntries": 1, "entries": []})
            .to_string();
        assert!(matches!(decode(&text), Err(StoreError::Validation { .. })));
    }

    #[test]
    fn garbage_is_a_validation_error() {
        assert!(matches!(decode("{not json"), Err(StoreError::Validation { .. })));
    }
}
