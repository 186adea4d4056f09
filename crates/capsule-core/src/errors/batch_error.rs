//! Batch pass errors.

use super::error_code::CapsuleErrorCode;
use super::StoreError;

/// The only failures a batch pass surfaces: the store read at pass start
/// and the single reconciling mutation at pass end.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("registry read failed: {0}")]
    Read(#[source] StoreError),

    #[error("end-of-pass reconciliation failed: {0}")]
    Reconcile(#[source] StoreError),
}

impl CapsuleErrorCode for BatchError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Read(e) | Self::Reconcile(e) => e.error_code(),
        }
    }

    fn is_retryable(&self) -> bool {
        match self {
            Self::Read(e) | Self::Reconcile(e) => e.is_retryable(),
        }
    }
}
