//! Registry store configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_CONFIG_ARTIFACT_FILE, DEFAULT_LOCK_TIMEOUT_MS, DEFAULT_MAX_ENTRIES,
    DEFAULT_REGISTRY_FILE,
};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StoreConfig {
    /// Registry file path, relative to the workspace root. Default: `registry.json`.
    pub path: Option<String>,
    /// Generated config artifact path. Default: `topics.generated.json`.
    pub config_artifact_path: Option<String>,
    /// Directory holding per-tenant artifact folders. Default: `topics`.
    pub artifacts_dir: Option<String>,
    /// Lock acquisition bound in milliseconds. Default: 5000.
    pub lock_timeout_ms: Option<u64>,
    /// Maximum tenant entries for new registries. Default: 100.
    pub max_entries: Option<u32>,
}

impl StoreConfig {
    pub fn effective_path(&self, root: &Path) -> PathBuf {
        root.join(self.path.as_deref().unwrap_or(DEFAULT_REGISTRY_FILE))
    }

    pub fn effective_config_artifact_path(&self, root: &Path) -> PathBuf {
        root.join(
            self.config_artifact_path
                .as_deref()
                .unwrap_or(DEFAULT_CONFIG_ARTIFACT_FILE),
        )
    }

    pub fn effective_artifacts_dir(&self, root: &Path) -> PathBuf {
        root.join(self.artifacts_dir.as_deref().unwrap_or("topics"))
    }

    pub fn effective_lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms.unwrap_or(DEFAULT_LOCK_TIMEOUT_MS))
    }

    pub fn effective_max_entries(&self) -> u32 {
        self.max_entries.unwrap_or(DEFAULT_MAX_ENTRIES)
    }
}
