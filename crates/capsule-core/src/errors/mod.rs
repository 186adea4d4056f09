//! Error handling for Capsule.
//! One error enum per subsystem, `thiserror` only.

pub mod artifact_error;
pub mod batch_error;
pub mod command_error;
pub mod config_error;
pub mod delivery_error;
pub mod entry_error;
pub mod error_code;
pub mod gateway_error;
pub mod store_error;

pub use artifact_error::ArtifactError;
pub use batch_error::BatchError;
pub use command_error::CommandError;
pub use config_error::ConfigError;
pub use delivery_error::DeliveryError;
pub use entry_error::EntryError;
pub use error_code::CapsuleErrorCode;
pub use gateway_error::GatewayError;
pub use store_error::{StoreError, StoreResult};
