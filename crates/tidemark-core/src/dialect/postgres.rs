//! PostgreSQL dialect.

use super::{default_clause, Dialect};
use crate::descriptor::{FieldDescriptor, FieldType};
use crate::error::Result;

/// PostgreSQL dialect.
///
/// The only backend that alters defaults, nullability and comments in
/// place. Comments are never inline; they are separate `COMMENT ON`
/// statements.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    /// Creates a new PostgreSQL dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn supports_partial_alteration(&self) -> bool {
        true
    }

    fn type_name(&self, field_type: &FieldType) -> String {
        match field_type {
            FieldType::SmallInt => "SMALLINT".to_string(),
            FieldType::Int => "INT".to_string(),
            FieldType::BigInt => "BIGINT".to_string(),
            FieldType::Boolean => "BOOL".to_string(),
            FieldType::Char(len) => format!("VARCHAR({len})"),
            FieldType::Text => "TEXT".to_string(),
            FieldType::Float => "DOUBLE PRECISION".to_string(),
            FieldType::Decimal { digits, places } => format!("DECIMAL({digits},{places})"),
            FieldType::Date => "DATE".to_string(),
            FieldType::Time => "TIME".to_string(),
            FieldType::Datetime => "TIMESTAMPTZ".to_string(),
            FieldType::Json => "JSONB".to_string(),
            FieldType::Uuid => "UUID".to_string(),
            FieldType::Binary => "BYTEA".to_string(),
        }
    }

    fn primary_key_definition(&self, field: &FieldDescriptor) -> String {
        let type_name = match (&field.field_type, field.generated) {
            (FieldType::SmallInt, true) => "SMALLSERIAL".to_string(),
            (FieldType::Int, true) => "SERIAL".to_string(),
            (FieldType::BigInt, true) => "BIGSERIAL".to_string(),
            (other, _) => self.type_name(other),
        };
        format!(
            "{} {type_name} NOT NULL PRIMARY KEY",
            self.quote(field.column())
        )
    }

    fn render_bool(&self, value: bool) -> &'static str {
        if value {
            "TRUE"
        } else {
            "FALSE"
        }
    }

    fn modify_column(&self, table: &str, field: &FieldDescriptor) -> Result<String> {
        let column = self.quote(field.column());
        let type_name = self.type_name(&field.field_type);
        Ok(format!(
            "ALTER TABLE {} ALTER COLUMN {column} TYPE {type_name} USING {column}::{type_name}",
            self.quote(table)
        ))
    }

    fn drop_foreign_key(&self, table: &str, field: &FieldDescriptor) -> Result<String> {
        let target = super::foreign_key_target(self, field, super::Capability::DropForeignKey)?;
        Ok(format!(
            "ALTER TABLE {} DROP CONSTRAINT {}, DROP COLUMN {}",
            self.quote(table),
            self.quote(&crate::naming::foreign_key_name(
                table,
                field.column(),
                &target.table,
                &target.column
            )),
            self.quote(field.column())
        ))
    }

    fn rename_foreign_key(
        &self,
        table: &str,
        old_column: &str,
        field: &FieldDescriptor,
    ) -> Result<String> {
        let target = super::foreign_key_target(self, field, super::Capability::RenameForeignKey)?;
        let name = |column: &str| {
            self.quote(&crate::naming::foreign_key_name(
                table,
                column,
                &target.table,
                &target.column,
            ))
        };
        Ok(format!(
            "ALTER TABLE {} RENAME CONSTRAINT {} TO {}",
            self.quote(table),
            name(old_column),
            name(field.column())
        ))
    }

    fn set_default(&self, table: &str, field: &FieldDescriptor) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} ALTER COLUMN {} {}",
            self.quote(table),
            self.quote(field.column()),
            default_clause(self, field)
        ))
    }

    fn set_nullable(&self, table: &str, field: &FieldDescriptor) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} ALTER COLUMN {} {}",
            self.quote(table),
            self.quote(field.column()),
            if field.nullable {
                "DROP NOT NULL"
            } else {
                "SET NOT NULL"
            }
        ))
    }

    fn set_comment(&self, table: &str, field: &FieldDescriptor) -> Result<String> {
        Ok(format!(
            "COMMENT ON COLUMN {}.{} IS {}",
            self.quote(table),
            self.quote(field.column()),
            field
                .description
                .as_deref()
                .map_or_else(|| "NULL".to_string(), |text| self.quote_literal(text))
        ))
    }
}
