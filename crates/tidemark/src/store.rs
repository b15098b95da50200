//! On-disk migration artifacts.
//!
//! Each application owns a directory `{location}/{app}/` holding one JSON
//! artifact per version plus the model snapshot the next run diffs against:
//!
//! ```text
//! migrations/models/
//!     0_20240309100000_init.json
//!     1_20240310083012_add_email.json
//!     old_models.json
//! ```

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tidemark_core::descriptor::ModelSet;
use tidemark_core::planner::MigrationPlan;
use tracing::{debug, warn};

use crate::error::{MigrateError, Result};
use crate::version::{VersionId, VersionSource};

/// File name of the baseline snapshot.
pub const BASELINE_FILE: &str = "old_models.json";

/// The persisted form of one migration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationArtifact {
    /// Upgrade statements, in execution order.
    pub upgrade: Vec<String>,
    /// Downgrade statements, in execution order.
    pub downgrade: Vec<String>,
}

impl From<&MigrationPlan> for MigrationArtifact {
    fn from(plan: &MigrationPlan) -> Self {
        Self {
            upgrade: plan.upgrade_sql(),
            downgrade: plan.downgrade_sql(),
        }
    }
}

/// Reads and writes the artifacts of one application.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    app: String,
    root: PathBuf,
}

impl ArtifactStore {
    /// Creates a store for `app` under `location`.
    pub fn new(location: impl AsRef<Path>, app: impl Into<String>) -> Self {
        let app = app.into();
        let root = location.as_ref().join(&app);
        Self { app, root }
    }

    /// Returns the application name.
    #[must_use]
    pub fn app(&self) -> &str {
        &self.app
    }

    /// Returns the application directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether any artifact or baseline exists.
    pub fn is_initialized(&self) -> Result<bool> {
        Ok(self.root.join(BASELINE_FILE).exists() || !self.list_versions()?.is_empty())
    }

    /// Writes an artifact atomically.
    ///
    /// Fails with [`MigrateError::VersionExists`] if the version, or any
    /// version with the same sequence number, is already on disk.
    pub fn persist(&self, version: &VersionId, artifact: &MigrationArtifact) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.root)?;
        let path = self.root.join(version.file_name());

        if let Some(existing) = self
            .list_versions()?
            .into_iter()
            .find(|v| v.sequence == version.sequence)
        {
            return Err(MigrateError::VersionExists(
                self.root.join(existing.file_name()),
            ));
        }

        let mut file = NamedTempFile::new_in(&self.root)?;
        serde_json::to_writer_pretty(&mut file, artifact)?;
        file.write_all(b"\n")?;
        file.flush()?;
        file.persist_noclobber(&path).map_err(|e| {
            if e.error.kind() == std::io::ErrorKind::AlreadyExists {
                MigrateError::VersionExists(path.clone())
            } else {
                MigrateError::Io(e.error)
            }
        })?;

        debug!(path = %path.display(), "Artifact written");
        Ok(path)
    }

    /// Lists persisted versions, sorted by sequence number.
    pub fn list_versions(&self) -> Result<Vec<VersionId>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }

        let mut versions = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if path.file_name().and_then(|n| n.to_str()) == Some(BASELINE_FILE) {
                continue;
            }
            match stem.parse::<VersionId>() {
                Ok(version) => versions.push(version),
                Err(_) => warn!(path = %path.display(), "Ignoring file that is not a migration"),
            }
        }

        versions.sort();
        Ok(versions)
    }

    /// Returns the highest persisted version.
    pub fn latest(&self) -> Result<Option<VersionId>> {
        Ok(self.list_versions()?.pop())
    }

    /// Loads the artifact of a version.
    pub fn load(&self, version: &VersionId) -> Result<MigrationArtifact> {
        let content = std::fs::read_to_string(self.root.join(version.file_name()))?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Reads the baseline snapshot, if one was written.
    pub fn read_baseline(&self) -> Result<Option<ModelSet>> {
        let path = self.root.join(BASELINE_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Replaces the baseline snapshot atomically.
    pub fn write_baseline(&self, models: &ModelSet) -> Result<()> {
        std::fs::create_dir_all(&self.root)?;
        let mut file = NamedTempFile::new_in(&self.root)?;
        serde_json::to_writer_pretty(&mut file, models)?;
        file.write_all(b"\n")?;
        file.flush()?;
        file.persist(self.root.join(BASELINE_FILE))
            .map_err(|e| MigrateError::Io(e.error))?;
        Ok(())
    }
}

impl VersionSource for ArtifactStore {
    async fn last_version(&self, app: &str) -> Result<Option<VersionId>> {
        if app != self.app {
            return ArtifactStore::new(self.root.parent().unwrap_or(Path::new(".")), app).latest();
        }
        self.latest()
    }
}
