//! Filesystem-backed tenant artifacts: `<root>/<slug>/*.md`.

use std::fs;
use std::path::{Path, PathBuf};

use capsule_core::constants::{
    BACKLOG_ARTIFACT, JOBS_ARTIFACT, LEARNINGS_ARTIFACT, STATUS_ARTIFACT,
};
use capsule_core::errors::ArtifactError;
use capsule_core::models::{ArtifactFile, TenantArtifacts, TenantEntry};
use capsule_core::traits::ArtifactSource;
use chrono::{DateTime, Utc};

/// Directory (inside a tenant folder) holding the last healthy snapshot.
pub const SNAPSHOT_DIR: &str = ".healthy";

/// Tenant artifacts stored as markdown files, one folder per slug.
#[derive(Debug, Clone)]
pub struct FsArtifactSource {
    root: PathBuf,
}

impl FsArtifactSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn tenant_dir(&self, entry: &TenantEntry) -> PathBuf {
        self.root.join(&entry.slug)
    }

    fn read_file(path: &Path) -> Result<ArtifactFile, ArtifactError> {
        let content = fs::read_to_string(path).map_err(|e| ArtifactError::io(path, e))?;
        let mut file = ArtifactFile::new(content);
        if let Ok(modified) = fs::metadata(path).and_then(|m| m.modified()) {
            file = file.modified(DateTime::<Utc>::from(modified));
        }
        Ok(file)
    }
}

impl ArtifactSource for FsArtifactSource {
    fn load(&self, entry: &TenantEntry) -> Result<TenantArtifacts, ArtifactError> {
        let dir = self.tenant_dir(entry);
        if !dir.is_dir() {
            return Err(ArtifactError::MissingTenant {
                slug: entry.slug.clone(),
            });
        }
        let mut artifacts = TenantArtifacts::new();
        let listing = fs::read_dir(&dir).map_err(|e| ArtifactError::io(&dir, e))?;
        for item in listing {
            let item = item.map_err(|e| ArtifactError::io(&dir, e))?;
            let path = item.path();
            let is_markdown = path.extension().is_some_and(|ext| ext == "md");
            if !is_markdown || !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            artifacts.files.insert(name.to_string(), Self::read_file(&path)?);
        }
        Ok(artifacts)
    }

    fn scaffold(&self, entry: &TenantEntry) -> Result<(), ArtifactError> {
        let dir = self.tenant_dir(entry);
        let scaffold_err = |e: std::io::Error| ArtifactError::Scaffold {
            slug: entry.slug.clone(),
            message: e.to_string(),
        };
        fs::create_dir_all(&dir).map_err(scaffold_err)?;
        let today = Utc::now().format("%Y-%m-%d");
        for (name, body) in [
            (
                STATUS_ARTIFACT,
                format!(
                    "# {}\n\nLast activity: {today}\n\n## Current state\n\nJust initialized.\n\n## Next actions\n\n- Describe the first task\n",
                    entry.name
                ),
            ),
            (BACKLOG_ARTIFACT, "# Backlog\n\n".to_string()),
            (LEARNINGS_ARTIFACT, "# Learnings\n\n".to_string()),
            (JOBS_ARTIFACT, "# Scheduled jobs\n\n".to_string()),
        ] {
            let path = dir.join(name);
            if path.exists() {
                continue;
            }
            fs::write(&path, body).map_err(scaffold_err)?;
        }
        tracing::debug!(slug = %entry.slug, dir = %dir.display(), "scaffolded tenant artifacts");
        Ok(())
    }

    fn snapshot_healthy(&self, entry: &TenantEntry) -> Result<(), ArtifactError> {
        let dir = self.tenant_dir(entry);
        let source = dir.join(STATUS_ARTIFACT);
        let target_dir = dir.join(SNAPSHOT_DIR);
        fs::create_dir_all(&target_dir).map_err(|e| ArtifactError::io(&target_dir, e))?;
        let target = target_dir.join(STATUS_ARTIFACT);
        fs::copy(&source, &target).map_err(|e| ArtifactError::io(&source, e))?;
        Ok(())
    }
}
