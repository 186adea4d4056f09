//! Tenant artifact errors.

use super::error_code::{self, CapsuleErrorCode};

/// Errors reading, scaffolding, or snapshotting a tenant's external artifacts.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("artifact directory for {slug} not found")]
    MissingTenant { slug: String },

    #[error("artifact I/O error at {path}: {message}")]
    Io { path: String, message: String },

    #[error("scaffold failed for {slug}: {message}")]
    Scaffold { slug: String, message: String },
}

impl ArtifactError {
    pub fn io(path: &std::path::Path, err: impl std::fmt::Display) -> Self {
        Self::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }
}

impl CapsuleErrorCode for ArtifactError {
    fn error_code(&self) -> &'static str {
        error_code::ARTIFACT_ERROR
    }
}
