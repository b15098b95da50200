//! Semantic change requests.
//!
//! The differ describes what changed between two model sets as a list of
//! [`ChangeRequest`]s. They carry no SQL; a [`Dialect`](crate::dialect::Dialect)
//! renders each one into a single statement.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::descriptor::{FieldDescriptor, ModelDescriptor};

/// Which of the two migration scripts a change belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Baseline to current.
    Upgrade,
    /// Current back to baseline.
    Downgrade,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Upgrade => f.write_str("upgrade"),
            Self::Downgrade => f.write_str("downgrade"),
        }
    }
}

/// Ordering class of a rendered statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderingClass {
    /// Runs in discovery order.
    Ordinary,
    /// Foreign key, join table or index statement; reordered by the sequencer.
    Referential,
}

/// A single schema change.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// Create a table.
    AddTable {
        /// The model to create.
        model: ModelDescriptor,
    },
    /// Drop a table.
    DropTable {
        /// Table name.
        table: String,
    },
    /// Add a plain column.
    AddColumn {
        /// Table name.
        table: String,
        /// The new field.
        field: FieldDescriptor,
    },
    /// Drop a plain column.
    DropColumn {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },
    /// Rewrite a column definition.
    ModifyColumn {
        /// Table name.
        table: String,
        /// The field as it should be.
        field: FieldDescriptor,
    },
    /// Rename a column.
    RenameColumn {
        /// Table name.
        table: String,
        /// Column name before the rename.
        old_column: String,
        /// The field after the rename.
        field: FieldDescriptor,
    },
    /// Set or drop a column default.
    SetDefault {
        /// Table name.
        table: String,
        /// The field carrying the new default.
        field: FieldDescriptor,
    },
    /// Set or drop NOT NULL.
    SetNullable {
        /// Table name.
        table: String,
        /// The field carrying the new nullability.
        field: FieldDescriptor,
    },
    /// Set or clear a column comment.
    SetComment {
        /// Table name.
        table: String,
        /// The field carrying the new description.
        field: FieldDescriptor,
    },
    /// Create an index.
    AddIndex {
        /// Table name.
        table: String,
        /// Indexed columns.
        columns: Vec<String>,
        /// Whether the index is unique.
        unique: bool,
    },
    /// Drop an index.
    DropIndex {
        /// Table name.
        table: String,
        /// Indexed columns.
        columns: Vec<String>,
        /// Whether the index is unique.
        unique: bool,
    },
    /// Add a foreign key column and its constraint.
    AddForeignKey {
        /// Table name.
        table: String,
        /// The foreign key field.
        field: FieldDescriptor,
    },
    /// Drop a foreign key constraint and its column.
    DropForeignKey {
        /// Table name.
        table: String,
        /// The foreign key field.
        field: FieldDescriptor,
    },
    /// Rename the constraint of a foreign key whose column was renamed.
    RenameForeignKey {
        /// Table name.
        table: String,
        /// Column name before the rename.
        old_column: String,
        /// The foreign key field after the rename.
        field: FieldDescriptor,
    },
    /// Create the join table of a many-to-many field.
    CreateJoinTable {
        /// Owning table.
        table: String,
        /// Primary key of the owning table.
        owner_key: FieldDescriptor,
        /// The many-to-many field.
        field: FieldDescriptor,
    },
    /// Drop the join table of a many-to-many field.
    DropJoinTable {
        /// Join table name.
        through: String,
    },
}

impl Change {
    /// Returns the table the change applies to.
    #[must_use]
    pub fn table(&self) -> &str {
        match self {
            Self::AddTable { model } => &model.table,
            Self::DropJoinTable { through } => through,
            Self::DropTable { table }
            | Self::AddColumn { table, .. }
            | Self::DropColumn { table, .. }
            | Self::ModifyColumn { table, .. }
            | Self::RenameColumn { table, .. }
            | Self::SetDefault { table, .. }
            | Self::SetNullable { table, .. }
            | Self::SetComment { table, .. }
            | Self::AddIndex { table, .. }
            | Self::DropIndex { table, .. }
            | Self::AddForeignKey { table, .. }
            | Self::DropForeignKey { table, .. }
            | Self::RenameForeignKey { table, .. }
            | Self::CreateJoinTable { table, .. } => table,
        }
    }

    /// Returns the ordering class of the rendered statement.
    #[must_use]
    pub fn ordering(&self) -> OrderingClass {
        match self {
            Self::AddIndex { .. }
            | Self::DropIndex { .. }
            | Self::AddForeignKey { .. }
            | Self::DropForeignKey { .. }
            | Self::RenameForeignKey { .. }
            | Self::CreateJoinTable { .. }
            | Self::DropJoinTable { .. } => OrderingClass::Referential,
            Self::RenameColumn { field, .. } | Self::SetComment { field, .. }
                if field.is_relation() =>
            {
                OrderingClass::Referential
            }
            _ => OrderingClass::Ordinary,
        }
    }

    /// Short description for logs.
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::AddTable { model } => format!("Create table {}", model.table),
            Self::DropTable { table } => format!("Drop table {table}"),
            Self::AddColumn { table, field } => format!("Add column {table}.{}", field.column()),
            Self::DropColumn { table, column } => format!("Drop column {table}.{column}"),
            Self::ModifyColumn { table, field } => {
                format!("Modify column {table}.{}", field.column())
            }
            Self::RenameColumn {
                table,
                old_column,
                field,
            } => format!("Rename column {table}.{old_column} to {}", field.column()),
            Self::SetDefault { table, field } => {
                format!("Alter default of {table}.{}", field.column())
            }
            Self::SetNullable { table, field } => {
                format!("Alter nullability of {table}.{}", field.column())
            }
            Self::SetComment { table, field } => {
                format!("Alter comment of {table}.{}", field.column())
            }
            Self::AddIndex { table, columns, .. } => {
                format!("Add index on {table} ({})", columns.join(", "))
            }
            Self::DropIndex { table, columns, .. } => {
                format!("Drop index on {table} ({})", columns.join(", "))
            }
            Self::AddForeignKey { table, field } => {
                format!("Add foreign key {table}.{}", field.column())
            }
            Self::DropForeignKey { table, field } => {
                format!("Drop foreign key {table}.{}", field.column())
            }
            Self::RenameForeignKey {
                table,
                old_column,
                field,
            } => format!(
                "Rename foreign key {table}.{old_column} to {}",
                field.column()
            ),
            Self::CreateJoinTable { field, .. } => format!(
                "Create join table {}",
                field.join_table().map_or(field.name.as_str(), |j| j.through.as_str())
            ),
            Self::DropJoinTable { through } => format!("Drop join table {through}"),
        }
    }
}

/// A change tagged with the direction it was discovered in.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeRequest {
    /// Migration direction.
    pub direction: Direction,
    /// The change itself.
    pub change: Change,
}

impl ChangeRequest {
    /// Creates a change request.
    #[must_use]
    pub fn new(direction: Direction, change: Change) -> Self {
        Self { direction, change }
    }

    /// Returns the ordering class of the change.
    #[must_use]
    pub fn ordering(&self) -> OrderingClass {
        self.change.ordering()
    }
}
