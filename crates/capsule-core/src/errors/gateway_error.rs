//! Gateway control errors.

use super::error_code::{self, CapsuleErrorCode};

/// A restart request the gateway did not accept.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GatewayError {
    #[error("gateway unavailable: {message}")]
    Unavailable { message: String },

    #[error("gateway refused restart: {message}")]
    Refused { message: String },
}

impl CapsuleErrorCode for GatewayError {
    fn error_code(&self) -> &'static str {
        error_code::GATEWAY_ERROR
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}
