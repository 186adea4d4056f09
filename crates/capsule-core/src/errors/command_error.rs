//! Command surface errors.

use super::error_code::{self, CapsuleErrorCode};
use super::{ArtifactError, StoreError};

/// Failures a command cannot turn into a user-facing message.
///
/// User-correctable problems (unknown tenant, bad arguments, denied access)
/// are answered with a message instead.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error("{message}")]
    Rejected { message: String },
}

impl CommandError {
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }
}

impl CapsuleErrorCode for CommandError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Store(e) => e.error_code(),
            Self::Artifact(e) => e.error_code(),
            Self::Rejected { .. } => error_code::COMMAND_ERROR,
        }
    }

    fn is_retryable(&self) -> bool {
        match self {
            Self::Store(e) => e.is_retryable(),
            _ => false,
        }
    }
}
