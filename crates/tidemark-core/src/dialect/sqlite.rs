//! SQLite dialect.

use super::{foreign_key_target, Capability, Dialect};
use crate::descriptor::{FieldDescriptor, FieldType};
use crate::error::Result;

/// SQLite dialect.
///
/// SQLite cannot drop, rewrite or rename columns in place, nor drop a
/// foreign key; those changes are rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl SqliteDialect {
    /// Creates a new SQLite dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn type_name(&self, field_type: &FieldType) -> String {
        match field_type {
            FieldType::SmallInt => "SMALLINT".to_string(),
            FieldType::Int | FieldType::Boolean => "INT".to_string(),
            FieldType::BigInt => "BIGINT".to_string(),
            FieldType::Char(len) => format!("VARCHAR({len})"),
            FieldType::Text | FieldType::Time => "TEXT".to_string(),
            FieldType::Float => "REAL".to_string(),
            FieldType::Decimal { .. } => "VARCHAR(40)".to_string(),
            FieldType::Date => "DATE".to_string(),
            FieldType::Datetime => "TIMESTAMP".to_string(),
            FieldType::Json => "JSON".to_string(),
            FieldType::Uuid => "CHAR(36)".to_string(),
            FieldType::Binary => "BLOB".to_string(),
        }
    }

    fn primary_key_definition(&self, field: &FieldDescriptor) -> String {
        if field.generated {
            format!(
                "{} INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL",
                self.quote(field.column())
            )
        } else {
            format!(
                "{} {} NOT NULL PRIMARY KEY",
                self.quote(field.column()),
                self.type_name(&field.field_type)
            )
        }
    }

    fn inline_comment(&self, text: &str) -> Option<String> {
        Some(format!("/* {} */", text.replace("*/", "* /")))
    }

    fn drop_column(&self, _table: &str, _column: &str) -> Result<String> {
        Err(self.unsupported(Capability::DropColumn))
    }

    fn modify_column(&self, _table: &str, _field: &FieldDescriptor) -> Result<String> {
        Err(self.unsupported(Capability::ModifyColumn))
    }

    fn rename_column(
        &self,
        _table: &str,
        _old_column: &str,
        _field: &FieldDescriptor,
    ) -> Result<String> {
        Err(self.unsupported(Capability::RenameColumn))
    }

    // ALTER TABLE cannot add a table constraint, only an inline reference.
    fn add_foreign_key(&self, table: &str, field: &FieldDescriptor) -> Result<String> {
        let target = foreign_key_target(self, field, Capability::AddForeignKey)?;
        Ok(format!(
            "ALTER TABLE {} ADD COLUMN {} REFERENCES {} ({}) ON DELETE {}",
            self.quote(table),
            self.column_definition(field),
            self.quote(&target.table),
            self.quote(&target.column),
            target.on_delete.as_sql()
        ))
    }

    fn drop_foreign_key(&self, _table: &str, _field: &FieldDescriptor) -> Result<String> {
        Err(self.unsupported(Capability::DropForeignKey))
    }
}
