//! Migration generation workflow.
//!
//! Ties the planner to the artifact store: `init` writes the first version
//! from an empty baseline, `migrate` diffs the current models against the
//! stored baseline and writes the next version.

use std::path::PathBuf;

use tidemark_core::descriptor::ModelSet;
use tidemark_core::dialect::Dialect;
use tidemark_core::planner::{MigrationPlan, MigrationPlanner};
use tidemark_core::rename::{FixedAnswer, RenameOracle};
use tracing::{info, warn};

use crate::error::{MigrateError, Result};
use crate::store::{ArtifactStore, MigrationArtifact};
use crate::version::{next_version, VersionId, VersionSource, INIT_LABEL};

/// A migration that was written to disk.
#[derive(Debug, Clone)]
pub struct GeneratedMigration {
    /// Its version.
    pub version: VersionId,
    /// Path of the artifact file.
    pub path: PathBuf,
    /// The plan it was rendered from.
    pub plan: MigrationPlan,
}

/// Generates migrations for one application.
pub struct MigrationGenerator<'a> {
    dialect: &'a dyn Dialect,
    store: ArtifactStore,
}

impl<'a> MigrationGenerator<'a> {
    /// Creates a generator rendering with `dialect` into `store`.
    #[must_use]
    pub fn new(dialect: &'a dyn Dialect, store: ArtifactStore) -> Self {
        Self { dialect, store }
    }

    /// Returns the artifact store.
    #[must_use]
    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    fn planner(&self) -> MigrationPlanner<'a> {
        MigrationPlanner::new(self.dialect)
    }

    /// Writes the first migration, creating every current model.
    pub fn init(&self, current: &ModelSet) -> Result<GeneratedMigration> {
        if self.store.is_initialized()? {
            return Err(MigrateError::AlreadyInitialized(
                self.store.root().to_path_buf(),
            ));
        }

        let plan = self
            .planner()
            .plan(&ModelSet::new(), current, &mut FixedAnswer(false))?;
        let version = next_version(None, INIT_LABEL)?;
        let path = self.store.persist(&version, &MigrationArtifact::from(&plan))?;
        self.store.write_baseline(current)?;

        info!(app = self.store.app(), version = %version, "Migrations initialized");
        Ok(GeneratedMigration {
            version,
            path,
            plan,
        })
    }

    /// Writes the next migration, or returns `None` when the models did not
    /// change.
    ///
    /// The new version follows the later of the last version reported by
    /// `versions` and the last artifact on disk, so a history table that
    /// lags the artifacts never reuses a sequence number. The baseline is
    /// replaced only after the artifact was written.
    pub async fn migrate<S: VersionSource>(
        &self,
        versions: &S,
        current: &ModelSet,
        label: &str,
        oracle: &mut dyn RenameOracle,
    ) -> Result<Option<GeneratedMigration>> {
        let baseline = self
            .store
            .read_baseline()?
            .ok_or_else(|| MigrateError::NotInitialized(self.store.root().to_path_buf()))?;

        let recorded = versions.last_version(self.store.app()).await?;
        let last = recorded.max(self.store.latest()?);
        let version = next_version(last.as_ref(), label)?;

        let plan = self.planner().plan(&baseline, current, oracle)?;
        if plan.is_empty() {
            warn!(app = self.store.app(), "No changes detected");
            return Ok(None);
        }

        let path = self.store.persist(&version, &MigrationArtifact::from(&plan))?;
        self.store.write_baseline(current)?;

        info!(
            app = self.store.app(),
            version = %version,
            upgrade = plan.upgrade.len(),
            downgrade = plan.downgrade.len(),
            "Migration generated"
        );
        Ok(Some(GeneratedMigration {
            version,
            path,
            plan,
        }))
    }

    /// Plans against the stored baseline (empty if none) without writing.
    pub fn preview(
        &self,
        current: &ModelSet,
        oracle: &mut dyn RenameOracle,
    ) -> Result<MigrationPlan> {
        let baseline = self.store.read_baseline()?.unwrap_or_default();
        Ok(self.planner().plan(&baseline, current, oracle)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tidemark_core::descriptor::{FieldDescriptor, FieldType, ModelDescriptor};
    use tidemark_core::dialect::{PostgresDialect, SqliteDialect};
    use crate::history::MigrationHistory;
    use tidemark_core::error::GenerateError;

    fn users() -> ModelSet {
        ModelSet::new().model(
            ModelDescriptor::new("user")
                .field(FieldDescriptor::id("id"))
                .field(FieldDescriptor::new("name", FieldType::Char(50))),
        )
    }

    fn users_with(field: FieldDescriptor) -> ModelSet {
        ModelSet::new().model(
            ModelDescriptor::new("user")
                .field(FieldDescriptor::id("id"))
                .field(FieldDescriptor::new("name", FieldType::Char(50)))
                .field(field),
        )
    }

    #[test]
    fn test_init_writes_version_zero_and_baseline() {
        let dir = tempfile::tempdir().unwrap();
        let dialect = SqliteDialect::new();
        let generator = MigrationGenerator::new(&dialect, ArtifactStore::new(dir.path(), "models"));

        let generated = generator.init(&users()).unwrap();
        assert_eq!(generated.version.sequence, 0);
        assert_eq!(generated.version.label, "init");
        assert!(generated.path.exists());
        assert!(generated.plan.upgrade[0].sql.starts_with("CREATE TABLE"));
        assert_eq!(generator.store().read_baseline().unwrap(), Some(users()));

        assert!(matches!(
            generator.init(&users()),
            Err(MigrateError::AlreadyInitialized(_))
        ));
    }

    #[tokio::test]
    async fn test_migrate_requires_init() {
        let dir = tempfile::tempdir().unwrap();
        let dialect = SqliteDialect::new();
        let store = ArtifactStore::new(dir.path(), "models");
        let generator = MigrationGenerator::new(&dialect, store.clone());

        let err = generator
            .migrate(&store, &users(), "update", &mut FixedAnswer(false))
            .await
            .unwrap_err();
        assert!(matches!(err, MigrateError::NotInitialized(_)));
    }

    #[tokio::test]
    async fn test_migrate_without_changes_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let dialect = SqliteDialect::new();
        let store = ArtifactStore::new(dir.path(), "models");
        let generator = MigrationGenerator::new(&dialect, store.clone());
        generator.init(&users()).unwrap();

        let result = generator
            .migrate(&store, &users(), "update", &mut FixedAnswer(false))
            .await
            .unwrap();
        assert!(result.is_none());
        assert_eq!(store.list_versions().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_migrate_writes_next_version_and_baseline() {
        let dir = tempfile::tempdir().unwrap();
        let dialect = SqliteDialect::new();
        let store = ArtifactStore::new(dir.path(), "models");
        let generator = MigrationGenerator::new(&dialect, store.clone());
        generator.init(&users()).unwrap();

        let current = users_with(FieldDescriptor::new("email", FieldType::Char(200)).nullable());
        let generated = generator
            .migrate(&store, &current, "add_email", &mut FixedAnswer(false))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(generated.version.sequence, 1);
        assert_eq!(generated.version.label, "add_email");
        let artifact = store.load(&generated.version).unwrap();
        assert_eq!(artifact.upgrade.len(), 1);
        assert!(artifact.upgrade[0].contains("ADD COLUMN \"email\""));
        assert_eq!(store.read_baseline().unwrap(), Some(current));
    }

    #[tokio::test]
    async fn test_failed_render_keeps_baseline() {
        let dir = tempfile::tempdir().unwrap();
        let dialect = SqliteDialect::new();
        let store = ArtifactStore::new(dir.path(), "models");
        let generator = MigrationGenerator::new(&dialect, store.clone());
        let before = users_with(FieldDescriptor::new("email", FieldType::Char(200)).nullable());
        generator.init(&before).unwrap();

        // SQLite cannot drop a column.
        let err = generator
            .migrate(&store, &users(), "drop_email", &mut FixedAnswer(false))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            MigrateError::Generate(GenerateError::Unsupported { .. })
        ));
        assert_eq!(store.read_baseline().unwrap(), Some(before));
        assert_eq!(store.list_versions().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_label_fails_before_planning() {
        let dir = tempfile::tempdir().unwrap();
        let dialect = PostgresDialect::new();
        let store = ArtifactStore::new(dir.path(), "models");
        let generator = MigrationGenerator::new(&dialect, store.clone());
        generator.init(&users()).unwrap();

        let mut asked = false;
        let mut oracle = |_: &tidemark_core::rename::RenameCandidate| {
            asked = true;
            true
        };
        let current = ModelSet::new().model(
            ModelDescriptor::new("user")
                .field(FieldDescriptor::id("id"))
                .field(FieldDescriptor::new("full_name", FieldType::Char(50))),
        );
        let err = generator
            .migrate(&store, &current, "bad name", &mut oracle)
            .await
            .unwrap_err();
        assert!(matches!(err, MigrateError::InvalidLabel(_)));
        assert!(!asked);
    }

    #[tokio::test]
    async fn test_migrate_follows_disk_when_history_lags() {
        let dir = tempfile::tempdir().unwrap();
        let dialect = SqliteDialect::new();
        let store = ArtifactStore::new(dir.path(), "models");
        let generator = MigrationGenerator::new(&dialect, store.clone());
        let init = generator.init(&users()).unwrap();

        let history = MigrationHistory::connect("sqlite::memory:").await.unwrap();
        assert!(history.last_version("models").await.unwrap().is_none());

        let current = users_with(FieldDescriptor::new("email", FieldType::Char(200)).nullable());
        let generated = generator
            .migrate(&history, &current, "add_email", &mut FixedAnswer(false))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(generated.version.sequence, 1);
        assert_eq!(generated.version.label, "add_email");

        // A history ahead of the disk still wins.
        history.record("models", &init.version).await.unwrap();
        history.record("models", &generated.version).await.unwrap();
        let ahead = next_version(Some(&generated.version), "applied_elsewhere").unwrap();
        history.record("models", &ahead).await.unwrap();

        let later = ModelSet::new().model(
            ModelDescriptor::new("user")
                .field(FieldDescriptor::id("id"))
                .field(FieldDescriptor::new("name", FieldType::Char(50)))
                .field(FieldDescriptor::new("email", FieldType::Char(200)).nullable())
                .field(FieldDescriptor::new("phone", FieldType::Char(20)).nullable()),
        );
        let generated = generator
            .migrate(&history, &later, "add_phone", &mut FixedAnswer(false))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(generated.version.sequence, 3);
        assert_eq!(store.list_versions().unwrap().len(), 3);
    }

    #[test]
    fn test_preview_does_not_write() {
        let dir = tempfile::tempdir().unwrap();
        let dialect = SqliteDialect::new();
        let store = ArtifactStore::new(dir.path(), "models");
        let generator = MigrationGenerator::new(&dialect, store.clone());

        let plan = generator.preview(&users(), &mut FixedAnswer(false)).unwrap();
        assert!(!plan.is_empty());
        assert!(!store.is_initialized().unwrap());
    }
}
