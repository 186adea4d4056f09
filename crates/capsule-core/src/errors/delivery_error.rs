//! Outbound delivery errors.

use super::error_code::{self, CapsuleErrorCode};

/// A delivery attempt that the channel did not complete.
///
/// Recorded on the tenant entry, never raised out of a batch pass.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DeliveryError {
    #[error("delivery rejected by platform: {message}")]
    Rejected { message: String },

    #[error("delivery transport failure: {message}")]
    Transport { message: String },

    #[error("delivery rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },
}

impl CapsuleErrorCode for DeliveryError {
    fn error_code(&self) -> &'static str {
        error_code::DELIVERY_FAILURE
    }

    fn is_retryable(&self) -> bool {
        !matches!(self, Self::Rejected { .. })
    }
}
