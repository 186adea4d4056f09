//! Snapshot of a tenant's external artifacts (status, backlog, job notes, ...).

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;

use crate::constants::STATUS_ARTIFACT;

/// `Last activity: <timestamp>` line, optionally bulleted or bolded.
static FRESHNESS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^\s*(?:[-*]\s+)?(?:\*\*)?last activity(?:\*\*)?\s*:\s*(?:\*\*)?\s*(\S+)")
        .unwrap()
});

/// One artifact file's content and, when known, its modification time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactFile {
    pub content: String,
    pub modified_at: Option<DateTime<Utc>>,
}

impl ArtifactFile {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            modified_at: None,
        }
    }

    pub fn modified(mut self, at: DateTime<Utc>) -> Self {
        self.modified_at = Some(at);
        self
    }
}

/// All artifacts found for one tenant, keyed by file name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TenantArtifacts {
    pub files: BTreeMap<String, ArtifactFile>,
}

impl TenantArtifacts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, file: ArtifactFile) -> Self {
        self.files.insert(name.to_string(), file);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ArtifactFile> {
        self.files.get(name)
    }

    pub fn content(&self, name: &str) -> Option<&str> {
        self.files.get(name).map(|f| f.content.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.files.contains_key(name)
    }

    /// Latest `Last activity:` marker embedded in the status artifact.
    pub fn freshness_marker(&self) -> Option<DateTime<Utc>> {
        self.content(STATUS_ARTIFACT).and_then(parse_freshness_marker)
    }

    /// How fresh the status artifact is: the embedded marker, or the file's
    /// modification time when no marker is present.
    pub fn status_freshness(&self) -> Option<DateTime<Utc>> {
        self.freshness_marker()
            .or_else(|| self.get(STATUS_ARTIFACT).and_then(|f| f.modified_at))
    }
}

/// Parse every `Last activity:` marker in `content` and return the latest.
pub fn parse_freshness_marker(content: &str) -> Option<DateTime<Utc>> {
    FRESHNESS_RE
        .captures_iter(content)
        .filter_map(|caps| caps.get(1).and_then(|m| parse_timestamp(m.as_str())))
        .max()
}

/// Accept RFC 3339 timestamps or bare `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim_end_matches(|c: char| c == '*' || c == '.' || c == ',');
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn marker_accepts_dates_and_timestamps() {
        let content = "# Status\n- **Last activity:** 2026-10-01\nLast activity: 2026-10-03T08:30:00Z\n";
        assert_eq!(
            parse_freshness_marker(content),
            Some(Utc.with_ymd_and_hms(2026, 10, 3, 8, 30, 0).unwrap())
        );
    }

    #[test]
    fn missing_marker_falls_back_to_mtime() {
        let mtime = Utc.with_ymd_and_hms(2026, 9, 1, 0, 0, 0).unwrap();
        let artifacts = TenantArtifacts::new()
            .with(STATUS_ARTIFACT, ArtifactFile::new("# Status\n").modified(mtime));
        assert_eq!(artifacts.freshness_marker(), None);
        assert_eq!(artifacts.status_freshness(), Some(mtime));
    }

    #[test]
    fn garbage_marker_is_ignored() {
        assert_eq!(parse_freshness_marker("Last activity: soon"), None);
    }
}
