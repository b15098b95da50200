//! Migration planning.
//!
//! Wires the pieces together: rename candidates are resolved first, then
//! the schema is diffed in both directions with one shared [`DiffContext`],
//! every change is rendered by the dialect, and each direction is
//! sequenced.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::change::{ChangeRequest, Direction};
use crate::descriptor::ModelSet;
use crate::dialect::Dialect;
use crate::differ::{DiffContext, DifferOptions, SchemaDiffer};
use crate::error::Result;
use crate::rename::{resolve_renames, RenameCandidate, RenameDecisions, RenameOracle};
use crate::sequencer::{Operator, Sequencer};

/// Ordered statements of both migration directions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationPlan {
    /// Statements taking the baseline to the current schema.
    pub upgrade: Vec<Operator>,
    /// Statements taking the current schema back to the baseline.
    pub downgrade: Vec<Operator>,
}

impl MigrationPlan {
    /// Whether neither direction has any statement.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.upgrade.is_empty() && self.downgrade.is_empty()
    }

    /// Returns the upgrade statements as SQL strings.
    #[must_use]
    pub fn upgrade_sql(&self) -> Vec<String> {
        self.upgrade.iter().map(|op| op.sql.clone()).collect()
    }

    /// Returns the downgrade statements as SQL strings.
    #[must_use]
    pub fn downgrade_sql(&self) -> Vec<String> {
        self.downgrade.iter().map(|op| op.sql.clone()).collect()
    }
}

/// Plans migrations for one dialect.
pub struct MigrationPlanner<'a> {
    dialect: &'a dyn Dialect,
    differ: SchemaDiffer,
}

impl<'a> MigrationPlanner<'a> {
    /// Creates a planner rendering with `dialect`.
    #[must_use]
    pub fn new(dialect: &'a dyn Dialect) -> Self {
        Self {
            dialect,
            differ: SchemaDiffer::new(DifferOptions {
                partial_alterations: dialect.supports_partial_alteration(),
            }),
        }
    }

    /// Excludes a table from planning.
    #[must_use]
    pub fn exclude(mut self, table: impl Into<String>) -> Self {
        self.differ = self.differ.exclude(table);
        self
    }

    /// Returns the rename candidates between two model sets.
    #[must_use]
    pub fn rename_candidates(&self, baseline: &ModelSet, current: &ModelSet) -> Vec<RenameCandidate> {
        self.differ.rename_candidates(baseline, current)
    }

    /// Plans a migration, asking `oracle` about each rename candidate.
    pub fn plan(
        &self,
        baseline: &ModelSet,
        current: &ModelSet,
        oracle: &mut dyn RenameOracle,
    ) -> Result<MigrationPlan> {
        let candidates = self.rename_candidates(baseline, current);
        let decisions = resolve_renames(&candidates, oracle)?;
        self.plan_resolved(baseline, current, decisions)
    }

    /// Plans a migration with renames already decided.
    ///
    /// Fails on the first change the dialect cannot render; no partial plan
    /// is returned.
    pub fn plan_resolved(
        &self,
        baseline: &ModelSet,
        current: &ModelSet,
        decisions: RenameDecisions,
    ) -> Result<MigrationPlan> {
        let mut ctx = DiffContext::new(decisions);

        let upgrade = self
            .differ
            .diff(baseline, current, Direction::Upgrade, &mut ctx);
        let downgrade = self
            .differ
            .diff(current, baseline, Direction::Downgrade, &mut ctx);

        let plan = MigrationPlan {
            upgrade: self.sequence(upgrade)?,
            downgrade: self.sequence(downgrade)?,
        };

        info!(
            dialect = self.dialect.name(),
            upgrade = plan.upgrade.len(),
            downgrade = plan.downgrade.len(),
            "Migration planned"
        );
        Ok(plan)
    }

    fn sequence(&self, requests: Vec<ChangeRequest>) -> Result<Vec<Operator>> {
        let mut sequencer = Sequencer::new();
        for request in requests {
            let sql = self.dialect.render(&request.change)?;
            debug!(direction = %request.direction, %sql, "Rendered");
            sequencer.push(Operator::new(sql, request.direction, request.ordering()));
        }
        Ok(sequencer.finish())
    }
}
