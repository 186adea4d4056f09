//! Access to a tenant's external artifacts.

use chrono::{DateTime, Utc};

use crate::errors::ArtifactError;
use crate::models::{TenantArtifacts, TenantEntry};

/// Reads and writes the documents a tenant owns outside the registry.
pub trait ArtifactSource: Send + Sync {
    /// Load every artifact currently present for the tenant.
    fn load(&self, entry: &TenantEntry) -> Result<TenantArtifacts, ArtifactError>;

    /// Content-derived activity timestamp used as an eligibility freshness
    /// override, taken from artifacts the caller already loaded.
    fn freshness(&self, _entry: &TenantEntry, loaded: &TenantArtifacts) -> Option<DateTime<Utc>> {
        loaded.freshness_marker()
    }

    /// Create the artifact scaffold for a newly initialized tenant.
    fn scaffold(&self, entry: &TenantEntry) -> Result<(), ArtifactError>;

    /// Side effect run after a health check finds the tenant healthy.
    fn snapshot_healthy(&self, _entry: &TenantEntry) -> Result<(), ArtifactError> {
        Ok(())
    }
}
