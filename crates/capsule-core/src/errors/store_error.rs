//! Registry store errors.

use super::error_code::{self, CapsuleErrorCode};
use super::EntryError;

/// Errors raised by the two integrity-critical store operations, `read` and `mutate`.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("registry validation failed: {message}")]
    Validation { message: String },

    #[error("registry schema version {found} is newer than supported version {supported}")]
    SchemaTooNew { found: u32, supported: u32 },

    #[error("registry not found at {path}")]
    NotFound { path: String },

    #[error("timed out after {waited_ms}ms waiting for registry lock {path}")]
    LockTimeout { path: String, waited_ms: u64 },

    #[error("registry I/O error at {path}: {message}")]
    Io { path: String, message: String },

    #[error("registry serialization failed: {message}")]
    Serialization { message: String },

    #[error("migration v{from} -> v{to} failed: {message}")]
    Migration { from: u32, to: u32, message: String },
}

pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    pub fn io(path: &std::path::Path, err: impl std::fmt::Display) -> Self {
        Self::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }
}

impl From<EntryError> for StoreError {
    fn from(err: EntryError) -> Self {
        Self::Validation {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Validation {
            message: err.to_string(),
        }
    }
}

impl CapsuleErrorCode for StoreError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => error_code::VALIDATION_ERROR,
            Self::SchemaTooNew { .. } => error_code::SCHEMA_TOO_NEW,
            Self::NotFound { .. } => error_code::NOT_FOUND,
            Self::LockTimeout { .. } => error_code::LOCK_TIMEOUT,
            Self::Io { .. } => error_code::STORAGE_IO,
            Self::Serialization { .. } => error_code::SERIALIZATION_ERROR,
            Self::Migration { .. } => error_code::MIGRATION_FAILED,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::LockTimeout { .. })
    }
}
