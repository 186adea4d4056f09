//! Top-level Capsule configuration with layered resolution.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{AuthConfig, BatchConfig, CheckConfig, StoreConfig};
use crate::constants::{MAX_CONFIG_SPAN_DAYS, MAX_DELIVERY_SPACING_MS, MAX_LOCK_TIMEOUT_MS};
use crate::errors::ConfigError;

/// Top-level configuration aggregating all sub-configs.
///
/// Resolution order (highest priority first):
/// 1. Explicit overrides (applied via `apply_overrides`)
/// 2. Environment variables (`CAPSULE_*`)
/// 3. Project config (`capsule.toml` in the workspace root)
/// 4. User config (`~/.capsule/config.toml`)
/// 5. Compiled defaults
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CapsuleConfig {
    pub store: StoreConfig,
    pub batch: BatchConfig,
    pub checks: CheckConfig,
    pub auth: AuthConfig,
}

/// Caller-supplied overrides, e.g. from a scheduler invocation.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub store_path: Option<String>,
    pub lock_timeout_ms: Option<u64>,
    pub delivery_spacing_ms: Option<u64>,
}

impl CapsuleConfig {
    /// Load configuration with layered resolution rooted at `root`.
    pub fn load(root: &Path, overrides: Option<&ConfigOverrides>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        // Layer 4 (lowest priority): user config
        if let Some(user_config_path) = Self::user_config_path() {
            if user_config_path.exists() {
                match Self::merge_toml_file(&mut config, &user_config_path) {
                    Ok(()) => {}
                    Err(err @ ConfigError::ParseError { .. }) => return Err(err),
                    Err(err) => {
                        tracing::warn!(error = %err, "ignoring unreadable user config");
                    }
                }
            }
        }

        // Layer 3: project config
        let project_config_path = root.join("capsule.toml");
        if project_config_path.exists() {
            Self::merge_toml_file(&mut config, &project_config_path)?;
        }

        // Layer 2: environment variables
        Self::apply_env_overrides(&mut config);

        // Layer 1 (highest priority): explicit overrides
        if let Some(o) = overrides {
            Self::apply_overrides(&mut config, o);
        }

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str).map_err(|e| ConfigError::ParseError {
            path: "<string>".to_string(),
            message: e.to_string(),
        })?;
        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate the configuration values. Every span must convert to a
    /// duration no longer than `MAX_CONFIG_SPAN_DAYS`.
    pub fn validate(config: &CapsuleConfig) -> Result<(), ConfigError> {
        fn invalid(field: &str, message: String) -> ConfigError {
            ConfigError::ValidationFailed {
                field: field.to_string(),
                message,
            }
        }

        fn within(field: &str, value: Option<i64>, min: i64, max: i64) -> Result<(), ConfigError> {
            match value {
                Some(v) if v < min || v > max => {
                    Err(invalid(field, format!("must be between {min} and {max}")))
                }
                _ => Ok(()),
            }
        }

        fn at_most(field: &str, value: Option<u64>, max: u64) -> Result<(), ConfigError> {
            match value {
                Some(0) => Err(invalid(field, "must be greater than 0".to_string())),
                Some(v) if v > max => Err(invalid(field, format!("must be at most {max}"))),
                _ => Ok(()),
            }
        }

        let days = MAX_CONFIG_SPAN_DAYS;
        let hours = days * 24;
        let minutes = hours * 60;
        let seconds = minutes * 60;

        at_most("store.lock_timeout_ms", config.store.lock_timeout_ms, MAX_LOCK_TIMEOUT_MS)?;
        if config.store.max_entries == Some(0) {
            return Err(invalid("store.max_entries", "must be greater than 0".to_string()));
        }
        if config.batch.silence_threshold == Some(0) {
            return Err(invalid(
                "batch.silence_threshold",
                "must be greater than 0".to_string(),
            ));
        }
        if matches!(config.batch.delivery_spacing_ms, Some(v) if v > MAX_DELIVERY_SPACING_MS) {
            return Err(invalid(
                "batch.delivery_spacing_ms",
                format!("must be at most {MAX_DELIVERY_SPACING_MS}"),
            ));
        }
        within("batch.inactivity_days", config.batch.inactivity_days, 1, days)?;
        within("batch.auto_snooze_days", config.batch.auto_snooze_days, 1, days)?;
        within("checks.status_stale_days", config.checks.status_stale_days, 1, days)?;
        within("batch.check_cooldown_hours", config.batch.check_cooldown_hours, 0, hours)?;
        within(
            "batch.health_check_cooldown_mins",
            config.batch.health_check_cooldown_mins,
            0,
            minutes,
        )?;
        within("batch.report_cooldown_mins", config.batch.report_cooldown_mins, 0, minutes)?;
        within("auth.restart_cooldown_secs", config.auth.restart_cooldown_secs, 0, seconds)?;
        Ok(())
    }

    /// Returns the user config path: `~/.capsule/config.toml`.
    fn user_config_path() -> Option<PathBuf> {
        home_dir().map(|h| h.join(".capsule").join("config.toml"))
    }

    /// Merge a TOML file into the existing config.
    /// Unknown keys are silently ignored (forward-compatible).
    fn merge_toml_file(config: &mut CapsuleConfig, path: &Path) -> Result<(), ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;

        let file_config: CapsuleConfig =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        Self::merge(config, &file_config);
        Ok(())
    }

    /// Merge `other` into `base`; `other` wins wherever it has a value.
    fn merge(base: &mut CapsuleConfig, other: &CapsuleConfig) {
        macro_rules! take {
            ($($section:ident . $field:ident),* $(,)?) => {
                $(
                    if other.$section.$field.is_some() {
                        base.$section.$field = other.$section.$field.clone();
                    }
                )*
            };
        }

        take!(
            store.path,
            store.config_artifact_path,
            store.artifacts_dir,
            store.lock_timeout_ms,
            store.max_entries,
            batch.inactivity_days,
            batch.check_cooldown_hours,
            batch.health_check_cooldown_mins,
            batch.report_cooldown_mins,
            batch.delivery_spacing_ms,
            batch.error_list_cap,
            batch.silence_threshold,
            batch.auto_snooze_days,
            checks.status_stale_days,
            checks.cross_ref_tolerance,
            auth.restart_cooldown_secs,
        );

        if !other.auth.user_allow_list.is_empty() {
            base.auth.user_allow_list = other.auth.user_allow_list.clone();
        }
    }

    /// Apply environment variable overrides.
    /// Pattern: `CAPSULE_STORE_PATH`, `CAPSULE_BATCH_INACTIVITY_DAYS`, etc.
    fn apply_env_overrides(config: &mut CapsuleConfig) {
        fn parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
            std::env::var(key).ok().and_then(|v| v.parse().ok())
        }

        if let Ok(val) = std::env::var("CAPSULE_STORE_PATH") {
            config.store.path = Some(val);
        }
        if let Some(v) = parsed("CAPSULE_STORE_LOCK_TIMEOUT_MS") {
            config.store.lock_timeout_ms = Some(v);
        }
        if let Some(v) = parsed("CAPSULE_BATCH_INACTIVITY_DAYS") {
            config.batch.inactivity_days = Some(v);
        }
        if let Some(v) = parsed("CAPSULE_BATCH_DELIVERY_SPACING_MS") {
            config.batch.delivery_spacing_ms = Some(v);
        }
        if let Some(v) = parsed("CAPSULE_BATCH_SILENCE_THRESHOLD") {
            config.batch.silence_threshold = Some(v);
        }
        if let Some(v) = parsed("CAPSULE_CHECKS_STATUS_STALE_DAYS") {
            config.checks.status_stale_days = Some(v);
        }
    }

    /// Apply explicit overrides (highest priority).
    fn apply_overrides(config: &mut CapsuleConfig, o: &ConfigOverrides) {
        if let Some(ref v) = o.store_path {
            config.store.path = Some(v.clone());
        }
        if let Some(v) = o.lock_timeout_ms {
            config.store.lock_timeout_ms = Some(v);
        }
        if let Some(v) = o.delivery_spacing_ms {
            config.batch.delivery_spacing_ms = Some(v);
        }
    }

    /// Serialize the config back to TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError {
            path: "<serialization>".to_string(),
            message: e.to_string(),
        })
    }
}

/// Cross-platform home directory resolution.
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}
