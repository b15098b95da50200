//! Tool configuration.
//!
//! Settings come from an optional JSON file; command-line flags and
//! environment variables are applied on top by the binary.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tidemark_core::descriptor::ModelSet;
use tidemark_core::dialect::DialectKind;
use tracing::debug;

use crate::error::{MigrateError, Result};
use crate::store::ArtifactStore;

/// Configuration file read when no path is given and it exists.
pub const DEFAULT_CONFIG_FILE: &str = "tidemark.json";

/// Settings for one application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Application name; artifacts live in `{location}/{app}`.
    pub app: String,
    /// Migrations directory.
    pub location: PathBuf,
    /// SQL dialect.
    pub dialect: DialectKind,
    /// SQLite URL of the history database, if any.
    pub database: Option<String>,
    /// JSON snapshot of the current models.
    pub models: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app: "models".to_string(),
            location: PathBuf::from("migrations"),
            dialect: DialectKind::Sqlite,
            database: None,
            models: None,
        }
    }
}

impl Settings {
    /// Loads settings from `path`, or from [`DEFAULT_CONFIG_FILE`] when it
    /// exists, or falls back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))
            }
            None => Ok(Self::default()),
        }
    }

    /// Reads settings from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| MigrateError::Config(format!("{}: {e}", path.display())))?;
        let settings: Self = serde_json::from_str(&content)
            .map_err(|e| MigrateError::Config(format!("{}: {e}", path.display())))?;
        debug!(path = %path.display(), "Configuration loaded");
        Ok(settings)
    }

    /// Checks values that would produce unusable paths.
    pub fn validate(&self) -> Result<()> {
        if self.app.is_empty() || self.app.contains(['/', '\\']) || self.app == ".." {
            return Err(MigrateError::Config(format!(
                "invalid app name '{}'",
                self.app
            )));
        }
        Ok(())
    }

    /// Returns the artifact store of the configured app.
    #[must_use]
    pub fn store(&self) -> ArtifactStore {
        ArtifactStore::new(&self.location, &self.app)
    }

    /// Reads the current model snapshot.
    pub fn load_models(&self) -> Result<ModelSet> {
        let path = self
            .models
            .as_deref()
            .ok_or_else(|| MigrateError::Config("no model snapshot configured (--models)".to_string()))?;
        let content = std::fs::read_to_string(path)
            .map_err(|e| MigrateError::Config(format!("{}: {e}", path.display())))?;
        Ok(serde_json::from_str(&content)?)
    }
}
