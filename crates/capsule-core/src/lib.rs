//! # capsule-core
//!
//! Foundation crate for the Capsule topic registry.
//! Defines the registry document model, findings, errors, config, constants,
//! collaborator traits, and tracing setup. Every other crate depends on this.

pub mod config;
pub mod constants;
pub mod errors;
pub mod models;
pub mod tracing;
pub mod traits;

// Re-export the most commonly used types at the crate root.
pub use config::CapsuleConfig;
pub use errors::{CapsuleErrorCode, StoreError};
pub use models::{
    Finding, OutboundMessage, Registry, Severity, TenantArtifacts, TenantEntry, TenantKey,
    TenantStatus, TenantType,
};
pub use traits::{
    ArtifactSource, Clock, DeliveryChannel, GatewayControl, ManualClock, SystemClock,
};
