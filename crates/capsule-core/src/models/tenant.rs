//! Tenant entries: one per forum topic.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::constants::{MAX_DELIVERY_ERROR_LEN, MAX_NAME_LEN};
use crate::errors::EntryError;

/// Registry key of a tenant: `(groupId, threadId)`, rendered as `group:thread`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TenantKey {
    pub group_id: String,
    pub thread_id: String,
}

impl TenantKey {
    pub fn new(group_id: impl Into<String>, thread_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            thread_id: thread_id.into(),
        }
    }
}

impl fmt::Display for TenantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group_id, self.thread_id)
    }
}

impl FromStr for TenantKey {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (group, thread) = value.split_once(':').ok_or(())?;
        if group.is_empty() || thread.is_empty() || thread.contains(':') {
            return Err(());
        }
        Ok(Self::new(group, thread))
    }
}

/// What kind of work a topic hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TenantType {
    Coding,
    Research,
    Marketing,
    General,
}

impl TenantType {
    pub const ALL: [TenantType; 4] = [
        TenantType::Coding,
        TenantType::Research,
        TenantType::Marketing,
        TenantType::General,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TenantType::Coding => "coding",
            TenantType::Research => "research",
            TenantType::Marketing => "marketing",
            TenantType::General => "general",
        }
    }
}

impl fmt::Display for TenantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TenantType {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "coding" => Ok(TenantType::Coding),
            "research" => Ok(TenantType::Research),
            "marketing" => Ok(TenantType::Marketing),
            "general" => Ok(TenantType::General),
            _ => Err(()),
        }
    }
}

/// Lifecycle status. Archival is a flag; entries are never deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TenantStatus {
    Active,
    Archived,
    Snoozed,
}

impl TenantStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TenantStatus::Active => "active",
            TenantStatus::Archived => "archived",
            TenantStatus::Snoozed => "snoozed",
        }
    }
}

impl fmt::Display for TenantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Durable per-topic state.
///
/// `extras` is an opaque bag: no key in it is guaranteed to be present and
/// nothing in Capsule validates its shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantEntry {
    pub group_id: String,
    pub thread_id: String,
    /// Stable identifier; never changes after initialization.
    pub slug: String,
    /// Display label; may be renamed.
    pub name: String,
    #[serde(rename = "type")]
    pub tenant_type: TenantType,
    pub status: TenantStatus,
    pub capsule_version: u32,
    #[serde(default)]
    pub last_message_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_check_run_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_check_report_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_daily_report_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub snooze_until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub consecutive_silent_checks: u32,
    #[serde(default)]
    pub last_delivery_error: Option<String>,
    #[serde(default)]
    pub cron_job_id: Option<String>,
    #[serde(default)]
    pub extras: BTreeMap<String, serde_json::Value>,
}

impl TenantEntry {
    /// A fresh active entry at the given capsule version.
    pub fn new(
        key: &TenantKey,
        slug: impl Into<String>,
        name: impl Into<String>,
        tenant_type: TenantType,
        capsule_version: u32,
    ) -> Self {
        Self {
            group_id: key.group_id.clone(),
            thread_id: key.thread_id.clone(),
            slug: slug.into(),
            name: name.into(),
            tenant_type,
            status: TenantStatus::Active,
            capsule_version,
            last_message_at: None,
            last_check_run_at: None,
            last_check_report_at: None,
            last_daily_report_at: None,
            snooze_until: None,
            consecutive_silent_checks: 0,
            last_delivery_error: None,
            cron_job_id: None,
            extras: BTreeMap::new(),
        }
    }

    pub fn key(&self) -> TenantKey {
        TenantKey::new(self.group_id.clone(), self.thread_id.clone())
    }

    pub fn is_archived(&self) -> bool {
        self.status == TenantStatus::Archived
    }

    /// Put the entry to sleep until `until`.
    pub fn snooze(&mut self, until: DateTime<Utc>) {
        self.status = TenantStatus::Snoozed;
        self.snooze_until = Some(until);
    }

    /// Return a snoozed entry to active and clear its silence counter.
    pub fn wake(&mut self) {
        self.status = TenantStatus::Active;
        self.snooze_until = None;
        self.consecutive_silent_checks = 0;
    }

    pub fn archive(&mut self) {
        self.status = TenantStatus::Archived;
        self.snooze_until = None;
    }

    /// Record a delivery failure, truncated to the persisted bound.
    pub fn record_delivery_error(&mut self, message: &str) {
        self.last_delivery_error = Some(truncate_chars(message, MAX_DELIVERY_ERROR_LEN));
    }

    /// Check the entry's own invariants. Cross-entry rules (slug uniqueness,
    /// key agreement) are checked by the registry.
    pub fn validate(&self) -> Result<(), EntryError> {
        let key = self.key().to_string();
        if !valid_id(&self.group_id) || !valid_id(&self.thread_id) {
            return Err(EntryError::InvalidIds { key });
        }
        if !is_valid_slug(&self.slug) {
            return Err(EntryError::InvalidSlug {
                key,
                slug: self.slug.clone(),
            });
        }
        let name_len = self.name.trim().chars().count();
        if name_len == 0 || self.name.chars().count() > MAX_NAME_LEN {
            return Err(EntryError::InvalidName { key });
        }
        if self.snooze_until.is_some() && self.status != TenantStatus::Snoozed {
            return Err(EntryError::SnoozeWithoutStatus { key });
        }
        if let Some(ref err) = self.last_delivery_error {
            if err.chars().count() > MAX_DELIVERY_ERROR_LEN {
                return Err(EntryError::DeliveryErrorTooLong {
                    key,
                    max: MAX_DELIVERY_ERROR_LEN,
                });
            }
        }
        Ok(())
    }
}

fn valid_id(id: &str) -> bool {
    !id.trim().is_empty() && !id.contains(':')
}

/// Lowercase alphanumerics and dashes, not starting with a dash, at most 48 chars.
static SLUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9][a-z0-9-]{0,47}$").unwrap());

/// Whether `slug` is a well-formed tenant slug.
pub fn is_valid_slug(slug: &str) -> bool {
    SLUG_RE.is_match(slug)
}

/// Derive a slug from a free-text name: lowercase, non-alphanumerics collapsed
/// to single dashes, trimmed to the slug length limit.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug.truncate(48);
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        slug.push_str("topic");
    }
    slug
}

/// Truncate to at most `max` characters without splitting a code point.
pub fn truncate_chars(value: &str, max: usize) -> String {
    match value.char_indices().nth(max) {
        Some((idx, _)) => value[..idx].to_string(),
        None => value.to_string(),
    }
}
