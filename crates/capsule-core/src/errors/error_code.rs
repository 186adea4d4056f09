//! Stable error codes shared by every Capsule error enum.

/// Maps an error to a stable, machine-readable code.
pub trait CapsuleErrorCode {
    /// Returns the error code string (e.g., "LOCK_TIMEOUT").
    fn error_code(&self) -> &'static str;

    /// Whether retrying the same operation later may succeed.
    fn is_retryable(&self) -> bool {
        false
    }

    /// Returns the formatted error string: `[ERROR_CODE] message`.
    fn coded_string(&self) -> String
    where
        Self: std::fmt::Display,
    {
        format!("[{}] {}", self.error_code(), self)
    }
}

pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
pub const SCHEMA_TOO_NEW: &str = "SCHEMA_TOO_NEW";
pub const NOT_FOUND: &str = "NOT_FOUND";
pub const LOCK_TIMEOUT: &str = "LOCK_TIMEOUT";
pub const STORAGE_IO: &str = "STORAGE_IO";
pub const SERIALIZATION_ERROR: &str = "SERIALIZATION_ERROR";
pub const MIGRATION_FAILED: &str = "MIGRATION_FAILED";
pub const ENTRY_INVALID: &str = "ENTRY_INVALID";
pub const DELIVERY_FAILURE: &str = "DELIVERY_FAILURE";
pub const ARTIFACT_ERROR: &str = "ARTIFACT_ERROR";
pub const CONFIG_ERROR: &str = "CONFIG_ERROR";
pub const COMMAND_ERROR: &str = "COMMAND_ERROR";
pub const GATEWAY_ERROR: &str = "GATEWAY_ERROR";
