//! Check findings: one validator result with a severity.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Finding severity. Ordered so that `Error` sorts highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Advisory only.
    Info,
    /// Degraded but functional.
    Warn,
    /// Blocks the healthy-snapshot side effect.
    Error,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
        }
    }

    /// Whether a finding of this severity makes a tenant unhealthy.
    pub fn is_problem(self) -> bool {
        self >= Severity::Warn
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One validator result. Ephemeral; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub severity: Severity,
    pub check_id: String,
    pub message: String,
    pub fixable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
}

impl Finding {
    pub fn new(severity: Severity, check_id: &str, message: impl Into<String>) -> Self {
        Self {
            severity,
            check_id: check_id.to_string(),
            message: message.into(),
            fixable: false,
            remediation: None,
        }
    }

    pub fn error(check_id: &str, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, check_id, message)
    }

    pub fn warn(check_id: &str, message: impl Into<String>) -> Self {
        Self::new(Severity::Warn, check_id, message)
    }

    pub fn info(check_id: &str, message: impl Into<String>) -> Self {
        Self::new(Severity::Info, check_id, message)
    }

    /// Mark the finding as automatically fixable with the given remediation.
    pub fn fixable(mut self, remediation: impl Into<String>) -> Self {
        self.fixable = true;
        self.remediation = Some(remediation.into());
        self
    }

    /// Attach a manual remediation hint without marking it fixable.
    pub fn with_hint(mut self, remediation: impl Into<String>) -> Self {
        self.remediation = Some(remediation.into());
        self
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.check_id, self.message)
    }
}
