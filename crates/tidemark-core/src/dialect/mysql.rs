//! MySQL dialect.

use super::{foreign_key_target, Capability, Dialect};
use crate::descriptor::{FieldDescriptor, FieldType};
use crate::error::Result;
use crate::naming;

/// MySQL dialect.
///
/// Comments are inline `COMMENT` clauses, so a description change is a full
/// column rewrite rather than a partial alteration.
#[derive(Debug, Clone, Copy, Default)]
pub struct MysqlDialect;

impl MysqlDialect {
    /// Creates a new MySQL dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for MysqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote_char(&self) -> char {
        '`'
    }

    fn type_name(&self, field_type: &FieldType) -> String {
        match field_type {
            FieldType::SmallInt => "SMALLINT".to_string(),
            FieldType::Int => "INT".to_string(),
            FieldType::BigInt => "BIGINT".to_string(),
            FieldType::Boolean => "BOOL".to_string(),
            FieldType::Char(len) => format!("VARCHAR({len})"),
            FieldType::Text => "LONGTEXT".to_string(),
            FieldType::Float => "DOUBLE".to_string(),
            FieldType::Decimal { digits, places } => format!("DECIMAL({digits},{places})"),
            FieldType::Date => "DATE".to_string(),
            FieldType::Time => "TIME(6)".to_string(),
            FieldType::Datetime => "DATETIME(6)".to_string(),
            FieldType::Json => "JSON".to_string(),
            FieldType::Uuid => "CHAR(36)".to_string(),
            FieldType::Binary => "LONGBLOB".to_string(),
        }
    }

    fn primary_key_definition(&self, field: &FieldDescriptor) -> String {
        let mut sql = format!(
            "{} {} NOT NULL PRIMARY KEY",
            self.quote(field.column()),
            self.type_name(&field.field_type)
        );
        if field.generated {
            sql.push_str(" AUTO_INCREMENT");
        }
        sql
    }

    // BLOB, TEXT and JSON columns cannot carry a literal default.
    fn accepts_default(&self, field_type: &FieldType) -> bool {
        !matches!(
            field_type,
            FieldType::Text | FieldType::Binary | FieldType::Json
        )
    }

    fn inline_comment(&self, text: &str) -> Option<String> {
        Some(format!("COMMENT {}", self.quote_literal(text)))
    }

    fn table_suffix(&self) -> &'static str {
        " CHARACTER SET utf8mb4"
    }

    fn modify_column(&self, table: &str, field: &FieldDescriptor) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} MODIFY COLUMN {}",
            self.quote(table),
            self.column_definition(field)
        ))
    }

    fn add_index(&self, table: &str, columns: &[String], unique: bool) -> Result<String> {
        let cols: Vec<String> = columns.iter().map(|c| self.quote(c)).collect();
        Ok(format!(
            "ALTER TABLE {} ADD {}INDEX {} ({})",
            self.quote(table),
            if unique { "UNIQUE " } else { "" },
            self.quote(&naming::index_name(table, columns, unique)),
            cols.join(", ")
        ))
    }

    fn drop_index(&self, table: &str, columns: &[String], unique: bool) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} DROP INDEX {}",
            self.quote(table),
            self.quote(&naming::index_name(table, columns, unique))
        ))
    }

    fn drop_foreign_key(&self, table: &str, field: &FieldDescriptor) -> Result<String> {
        let target = foreign_key_target(self, field, Capability::DropForeignKey)?;
        Ok(format!(
            "ALTER TABLE {} DROP FOREIGN KEY {}, DROP COLUMN {}",
            self.quote(table),
            self.quote(&naming::foreign_key_name(
                table,
                field.column(),
                &target.table,
                &target.column
            )),
            self.quote(field.column())
        ))
    }

    // MySQL cannot rename a foreign key constraint in place.
    fn rename_foreign_key(
        &self,
        table: &str,
        old_column: &str,
        field: &FieldDescriptor,
    ) -> Result<String> {
        let target = foreign_key_target(self, field, Capability::RenameForeignKey)?;
        Ok(format!(
            "ALTER TABLE {} DROP FOREIGN KEY {}, ADD {}",
            self.quote(table),
            self.quote(&naming::foreign_key_name(
                table,
                old_column,
                &target.table,
                &target.column
            )),
            self.foreign_key_clause(
                table,
                field.column(),
                &target.table,
                &target.column,
                target.on_delete.as_sql()
            )
        ))
    }
}
