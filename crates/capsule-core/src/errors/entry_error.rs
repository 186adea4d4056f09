//! Per-entry validation errors.

use super::error_code::{self, CapsuleErrorCode};

/// Why a single tenant entry failed validation.
///
/// On read these quarantine the entry; on write they reject the whole document.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EntryError {
    #[error("entry {key} is malformed: {message}")]
    Malformed { key: String, message: String },

    #[error("entry key {key} does not match its group/thread ids")]
    KeyMismatch { key: String },

    #[error("entry {key} has an invalid group or thread id")]
    InvalidIds { key: String },

    #[error("entry {key} has invalid slug {slug:?}")]
    InvalidSlug { key: String, slug: String },

    #[error("entry {key} duplicates slug {slug:?} already used by {other}")]
    DuplicateSlug { key: String, slug: String, other: String },

    #[error("entry {key} has an empty or over-long name")]
    InvalidName { key: String },

    #[error("entry {key} carries snoozeUntil without snoozed status")]
    SnoozeWithoutStatus { key: String },

    #[error("entry {key} delivery error exceeds {max} characters")]
    DeliveryErrorTooLong { key: String, max: usize },

    #[error("entry {key} capsule version went backwards ({previous} -> {next})")]
    CapsuleVersionRegressed { key: String, previous: u32, next: u32 },

    #[error("entry {key} was removed; archive it instead")]
    Removed { key: String },

    #[error("entry key {key} belongs to a quarantined record")]
    QuarantinedKey { key: String },
}

impl CapsuleErrorCode for EntryError {
    fn error_code(&self) -> &'static str {
        error_code::ENTRY_INVALID
    }
}
