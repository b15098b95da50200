//! Schema diffing and DDL generation for declarative data models.
//!
//! `tidemark-core` compares two snapshots of an application's models and
//! produces the SQL that takes a database from one to the other, in both
//! directions:
//! - Renames are detected structurally and confirmed by the caller
//! - Foreign keys, join tables and indexes are ordered around plain column
//!   changes so referenced objects exist when needed
//! - SQL generation is dialect-aware (SQLite, PostgreSQL, MySQL)
//!
//! # Architecture
//!
//! - **Descriptors** - Comparable snapshots of models and fields
//! - **Differ** - Compares two model sets and yields change requests
//! - **Rename** - Candidate detection and oracle-driven resolution
//! - **Dialect** - Renders one change request into one SQL statement
//! - **Sequencer** - Orders rendered statements for referential integrity
//! - **Planner** - Runs all of the above for both directions
//!
//! # Example
//!
//! ```rust
//! use tidemark_core::prelude::*;
//!
//! let baseline = ModelSet::new().model(
//!     ModelDescriptor::new("user")
//!         .field(FieldDescriptor::id("id"))
//!         .field(FieldDescriptor::new("name", FieldType::Char(50))),
//! );
//! let current = ModelSet::new().model(
//!     ModelDescriptor::new("user")
//!         .field(FieldDescriptor::id("id"))
//!         .field(FieldDescriptor::new("name", FieldType::Char(50)).unique()),
//! );
//!
//! let dialect = PostgresDialect::new();
//! let plan = MigrationPlanner::new(&dialect)
//!     .plan(&baseline, &current, &mut FixedAnswer(false))
//!     .unwrap();
//!
//! assert_eq!(plan.upgrade.len(), 1);
//! assert!(plan.upgrade[0].sql.starts_with("CREATE UNIQUE INDEX"));
//! ```

pub mod change;
pub mod descriptor;
pub mod dialect;
pub mod differ;
pub mod error;
pub mod naming;
pub mod planner;
pub mod rename;
pub mod sequencer;

/// Name of the migration history table; never diffed.
pub const HISTORY_TABLE: &str = "tidemark";

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::change::{Change, ChangeRequest, Direction, OrderingClass};
    pub use crate::descriptor::{
        DefaultValue, FieldDescriptor, FieldRole, FieldType, ForeignKeyTarget, IndexDefinition,
        JoinTable, ModelDescriptor, ModelSet, OnDelete,
    };
    pub use crate::dialect::{
        Capability, Dialect, DialectKind, MysqlDialect, PostgresDialect, SqliteDialect,
    };
    pub use crate::differ::{DiffContext, DifferOptions, ModelDiffer, SchemaDiffer};
    pub use crate::error::{GenerateError, OracleError, Result};
    pub use crate::planner::{MigrationPlan, MigrationPlanner};
    pub use crate::rename::{
        resolve_renames, FixedAnswer, RenameCandidate, RenameCorrelationMap, RenameDecisions,
        RenameOracle,
    };
    pub use crate::sequencer::{Operator, Sequencer};
    pub use crate::HISTORY_TABLE;
}
