//! The registry document: workspace settings plus every tenant entry.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::tenant::{TenantEntry, TenantKey};
use crate::constants::{DEFAULT_MAX_ENTRIES, SCHEMA_VERSION};
use crate::errors::EntryError;

/// Singleton document per workspace.
///
/// `entries` is keyed by the `group:thread` string form of [`TenantKey`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registry {
    pub schema_version: u32,
    #[serde(default)]
    pub admin_ids: BTreeSet<String>,
    #[serde(default)]
    pub shared_secret: String,
    /// Start time of the last health-check pass.
    #[serde(default)]
    pub last_batch_run_at: Option<DateTime<Utc>>,
    /// Start time of the last report pass.
    #[serde(default)]
    pub last_report_run_at: Option<DateTime<Utc>>,
    pub max_entries: u32,
    #[serde(default)]
    pub entries: BTreeMap<String, TenantEntry>,
}

impl Registry {
    /// An empty document at the current schema version.
    pub fn new(shared_secret: impl Into<String>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            admin_ids: BTreeSet::new(),
            shared_secret: shared_secret.into(),
            last_batch_run_at: None,
            last_report_run_at: None,
            max_entries: DEFAULT_MAX_ENTRIES,
            entries: BTreeMap::new(),
        }
    }

    pub fn get(&self, key: &TenantKey) -> Option<&TenantEntry> {
        self.entries.get(&key.to_string())
    }

    pub fn get_mut(&mut self, key: &TenantKey) -> Option<&mut TenantEntry> {
        self.entries.get_mut(&key.to_string())
    }

    pub fn find_by_slug(&self, slug: &str) -> Option<&TenantEntry> {
        self.entries.values().find(|e| e.slug == slug)
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.max_entries as usize
    }

    /// Insert a new entry under its own key. Returns false if the key is taken.
    pub fn insert(&mut self, entry: TenantEntry) -> bool {
        let key = entry.key().to_string();
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, entry);
        true
    }

    pub fn is_admin(&self, caller_id: &str) -> bool {
        self.admin_ids.contains(caller_id)
    }

    /// Validate one entry in the context of its map key and of the slugs
    /// already accepted.
    pub fn validate_entry(
        key: &str,
        entry: &TenantEntry,
        seen_slugs: &BTreeMap<String, String>,
    ) -> Result<(), EntryError> {
        entry.validate()?;
        if entry.key().to_string() != key {
            return Err(EntryError::KeyMismatch {
                key: key.to_string(),
            });
        }
        if let Some(other) = seen_slugs.get(&entry.slug) {
            return Err(EntryError::DuplicateSlug {
                key: key.to_string(),
                slug: entry.slug.clone(),
                other: other.clone(),
            });
        }
        Ok(())
    }

    /// Validate every entry; the first failure is returned.
    pub fn validate(&self) -> Result<(), EntryError> {
        let mut seen = BTreeMap::new();
        for (key, entry) in &self.entries {
            Self::validate_entry(key, entry, &seen)?;
            seen.insert(entry.slug.clone(), key.clone());
        }
        Ok(())
    }

    /// Reject removed entries and capsule version regressions relative to
    /// `previous`.
    pub fn check_monotonic(&self, previous: &Registry) -> Result<(), EntryError> {
        if let Some(key) = previous.entries.keys().find(|k| !self.entries.contains_key(*k)) {
            return Err(EntryError::Removed { key: key.clone() });
        }
        for (key, entry) in &self.entries {
            if let Some(before) = previous.entries.get(key) {
                if entry.capsule_version < before.capsule_version {
                    return Err(EntryError::CapsuleVersionRegressed {
                        key: key.clone(),
                        previous: before.capsule_version,
                        next: entry.capsule_version,
                    });
                }
            }
        }
        Ok(())
    }
}
