//! Data model: registry document, tenant entries, findings, artifacts, messages.

pub mod artifacts;
pub mod finding;
pub mod message;
pub mod registry;
pub mod tenant;

pub use artifacts::{ArtifactFile, TenantArtifacts};
pub use finding::{Finding, Severity};
pub use message::{InteractiveControl, OutboundMessage};
pub use registry::Registry;
pub use tenant::{
    is_valid_slug, slugify, truncate_chars, TenantEntry, TenantKey, TenantStatus, TenantType,
};
