//! Dialect-specific DDL generation.
//!
//! A [`Dialect`] turns one [`Change`] into exactly one SQL statement, or
//! refuses with [`GenerateError::Unsupported`]. Statements shared by most
//! databases live in the trait's default methods; each backend overrides
//! what differs and rejects what it structurally cannot do.

mod mysql;
mod postgres;
mod sqlite;

pub use mysql::MysqlDialect;
pub use postgres::PostgresDialect;
pub use sqlite::SqliteDialect;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::change::Change;
use crate::descriptor::{DefaultValue, FieldDescriptor, FieldType, ForeignKeyTarget, ModelDescriptor};
use crate::error::{GenerateError, Result};
use crate::naming;

/// A DDL action a dialect may or may not be able to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// `CREATE TABLE`.
    CreateTable,
    /// `DROP TABLE`.
    DropTable,
    /// Add a column.
    AddColumn,
    /// Drop a column.
    DropColumn,
    /// Rewrite a column definition.
    ModifyColumn,
    /// Rename a column.
    RenameColumn,
    /// Create an index.
    AddIndex,
    /// Drop an index.
    DropIndex,
    /// Add a foreign key.
    AddForeignKey,
    /// Drop a foreign key.
    DropForeignKey,
    /// Rename a foreign key constraint after its column was renamed.
    RenameForeignKey,
    /// Create a many-to-many join table.
    CreateJoinTable,
    /// Drop a many-to-many join table.
    DropJoinTable,
    /// Alter a column default in place.
    SetDefault,
    /// Alter column nullability in place.
    SetNullable,
    /// Alter a column comment in place.
    SetComment,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::CreateTable => "create table",
            Self::DropTable => "drop table",
            Self::AddColumn => "add column",
            Self::DropColumn => "drop column",
            Self::ModifyColumn => "modify column",
            Self::RenameColumn => "rename column",
            Self::AddIndex => "add index",
            Self::DropIndex => "drop index",
            Self::AddForeignKey => "add foreign key",
            Self::DropForeignKey => "drop foreign key",
            Self::RenameForeignKey => "rename foreign key",
            Self::CreateJoinTable => "create join table",
            Self::DropJoinTable => "drop join table",
            Self::SetDefault => "set default",
            Self::SetNullable => "set nullable",
            Self::SetComment => "set comment",
        };
        f.write_str(text)
    }
}

/// Trait for database-specific DDL rendering.
pub trait Dialect: Send + Sync {
    /// Returns the dialect name.
    fn name(&self) -> &'static str;

    /// Whether default, nullability and comment changes are emitted as
    /// separate statements instead of being folded into one column rewrite.
    fn supports_partial_alteration(&self) -> bool {
        false
    }

    /// Returns the SQL type for a declared field type.
    fn type_name(&self, field_type: &FieldType) -> String;

    /// Returns the full definition of a primary key column.
    fn primary_key_definition(&self, field: &FieldDescriptor) -> String {
        format!(
            "{} {} NOT NULL PRIMARY KEY",
            self.quote(field.column()),
            self.type_name(&field.field_type)
        )
    }

    /// Returns the identifier quote character.
    fn quote_char(&self) -> char {
        '"'
    }

    /// Quotes an identifier.
    fn quote(&self, name: &str) -> String {
        let q = self.quote_char();
        format!("{q}{name}{q}")
    }

    /// Quotes a string literal.
    fn quote_literal(&self, value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }

    /// Renders a boolean literal.
    fn render_bool(&self, value: bool) -> &'static str {
        if value {
            "1"
        } else {
            "0"
        }
    }

    /// Renders a default value.
    fn render_default(&self, default: &DefaultValue) -> String {
        match default {
            DefaultValue::Bool(b) => self.render_bool(*b).to_string(),
            DefaultValue::Integer(i) => i.to_string(),
            DefaultValue::Float(f) => f.to_string(),
            DefaultValue::Text(s) => self.quote_literal(s),
            DefaultValue::Expression(expr) => expr.clone(),
        }
    }

    /// Whether a column of this type may carry a default.
    fn accepts_default(&self, _field_type: &FieldType) -> bool {
        true
    }

    /// Renders a description inside a column definition, if the dialect can.
    fn inline_comment(&self, _text: &str) -> Option<String> {
        None
    }

    /// Text appended after the closing parenthesis of `CREATE TABLE`.
    fn table_suffix(&self) -> &'static str {
        ""
    }

    /// Generates a column definition.
    fn column_definition(&self, field: &FieldDescriptor) -> String {
        let mut sql = if field.primary_key {
            self.primary_key_definition(field)
        } else {
            let mut def = format!(
                "{} {}",
                self.quote(field.column()),
                self.type_name(&field.field_type)
            );
            if !field.nullable {
                def.push_str(" NOT NULL");
            }
            if let Some(ref default) = field.default {
                if self.accepts_default(&field.field_type) {
                    def.push_str(" DEFAULT ");
                    def.push_str(&self.render_default(default));
                }
            }
            def
        };

        if let Some(comment) = field
            .description
            .as_deref()
            .and_then(|text| self.inline_comment(text))
        {
            sql.push(' ');
            sql.push_str(&comment);
        }

        sql
    }

    /// Generates a named `FOREIGN KEY` table constraint.
    fn foreign_key_clause(
        &self,
        table: &str,
        column: &str,
        target_table: &str,
        target_column: &str,
        on_delete: &str,
    ) -> String {
        format!(
            "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({}) ON DELETE {}",
            self.quote(&naming::foreign_key_name(
                table,
                column,
                target_table,
                target_column
            )),
            self.quote(column),
            self.quote(target_table),
            self.quote(target_column),
            on_delete
        )
    }

    /// Builds the error for a capability this dialect rejects.
    fn unsupported(&self, capability: Capability) -> GenerateError {
        GenerateError::Unsupported {
            dialect: self.name(),
            capability,
        }
    }

    /// Renders a change into a single statement.
    fn render(&self, change: &Change) -> Result<String> {
        match change {
            Change::AddTable { model } => self.create_table(model),
            Change::DropTable { table } => self.drop_table(table),
            Change::AddColumn { table, field } => self.add_column(table, field),
            Change::DropColumn { table, column } => self.drop_column(table, column),
            Change::ModifyColumn { table, field } => self.modify_column(table, field),
            Change::RenameColumn {
                table,
                old_column,
                field,
            } => self.rename_column(table, old_column, field),
            Change::SetDefault { table, field } => self.set_default(table, field),
            Change::SetNullable { table, field } => self.set_nullable(table, field),
            Change::SetComment { table, field } => self.set_comment(table, field),
            Change::AddIndex {
                table,
                columns,
                unique,
            } => self.add_index(table, columns, *unique),
            Change::DropIndex {
                table,
                columns,
                unique,
            } => self.drop_index(table, columns, *unique),
            Change::AddForeignKey { table, field } => self.add_foreign_key(table, field),
            Change::DropForeignKey { table, field } => self.drop_foreign_key(table, field),
            Change::RenameForeignKey {
                table,
                old_column,
                field,
            } => self.rename_foreign_key(table, old_column, field),
            Change::CreateJoinTable {
                table,
                owner_key,
                field,
            } => self.create_join_table(table, owner_key, field),
            Change::DropJoinTable { through } => self.drop_join_table(through),
        }
    }

    /// Generates SQL for `CREATE TABLE`.
    ///
    /// Indexes and join tables are separate changes; foreign keys are named
    /// table constraints so they can be dropped later.
    fn create_table(&self, model: &ModelDescriptor) -> Result<String> {
        let mut lines = Vec::new();
        let mut constraints = Vec::new();

        for field in &model.fields {
            match field.foreign_key_target() {
                _ if field.join_table().is_some() || field.is_backward_relation() => {}
                Some(target) => {
                    lines.push(self.column_definition(field));
                    constraints.push(self.foreign_key_clause(
                        &model.table,
                        field.column(),
                        &target.table,
                        &target.column,
                        target.on_delete.as_sql(),
                    ));
                }
                None => lines.push(self.column_definition(field)),
            }
        }
        lines.extend(constraints);

        Ok(format!(
            "CREATE TABLE {} (\n    {}\n){}",
            self.quote(&model.table),
            lines.join(",\n    "),
            self.table_suffix()
        ))
    }

    /// Generates SQL for `DROP TABLE`.
    fn drop_table(&self, table: &str) -> Result<String> {
        Ok(format!("DROP TABLE IF EXISTS {}", self.quote(table)))
    }

    /// Generates SQL for adding a plain column.
    fn add_column(&self, table: &str, field: &FieldDescriptor) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} ADD COLUMN {}",
            self.quote(table),
            self.column_definition(field)
        ))
    }

    /// Generates SQL for dropping a column.
    fn drop_column(&self, table: &str, column: &str) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} DROP COLUMN {}",
            self.quote(table),
            self.quote(column)
        ))
    }

    /// Generates SQL for rewriting a column definition.
    fn modify_column(&self, table: &str, field: &FieldDescriptor) -> Result<String>;

    /// Generates SQL for renaming a column.
    fn rename_column(&self, table: &str, old_column: &str, field: &FieldDescriptor) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} RENAME COLUMN {} TO {}",
            self.quote(table),
            self.quote(old_column),
            self.quote(field.column())
        ))
    }

    /// Generates SQL for creating an index.
    fn add_index(&self, table: &str, columns: &[String], unique: bool) -> Result<String> {
        let cols: Vec<String> = columns.iter().map(|c| self.quote(c)).collect();
        Ok(format!(
            "CREATE {}INDEX {} ON {} ({})",
            if unique { "UNIQUE " } else { "" },
            self.quote(&naming::index_name(table, columns, unique)),
            self.quote(table),
            cols.join(", ")
        ))
    }

    /// Generates SQL for dropping an index.
    fn drop_index(&self, table: &str, columns: &[String], unique: bool) -> Result<String> {
        Ok(format!(
            "DROP INDEX {}",
            self.quote(&naming::index_name(table, columns, unique))
        ))
    }

    /// Generates SQL for adding a foreign key column with its constraint.
    fn add_foreign_key(&self, table: &str, field: &FieldDescriptor) -> Result<String> {
        let target = foreign_key_target(self, field, Capability::AddForeignKey)?;
        Ok(format!(
            "ALTER TABLE {} ADD COLUMN {}, ADD {}",
            self.quote(table),
            self.column_definition(field),
            self.foreign_key_clause(
                table,
                field.column(),
                &target.table,
                &target.column,
                target.on_delete.as_sql()
            )
        ))
    }

    /// Generates SQL for dropping a foreign key constraint and its column.
    fn drop_foreign_key(&self, table: &str, field: &FieldDescriptor) -> Result<String>;

    /// Generates SQL giving the constraint of a renamed foreign key column
    /// the name derived from its new column.
    fn rename_foreign_key(
        &self,
        _table: &str,
        _old_column: &str,
        _field: &FieldDescriptor,
    ) -> Result<String> {
        Err(self.unsupported(Capability::RenameForeignKey))
    }

    /// Generates SQL for creating a many-to-many join table.
    fn create_join_table(
        &self,
        table: &str,
        owner_key: &FieldDescriptor,
        field: &FieldDescriptor,
    ) -> Result<String> {
        let join = field
            .join_table()
            .ok_or_else(|| self.unsupported(Capability::CreateJoinTable))?;
        let on_delete = join.on_delete.as_sql();

        let lines = [
            format!(
                "{} {} NOT NULL",
                self.quote(&join.backward_key),
                self.type_name(&owner_key.field_type)
            ),
            format!(
                "{} {} NOT NULL",
                self.quote(&join.forward_key),
                self.type_name(&join.related_type)
            ),
            self.foreign_key_clause(
                &join.through,
                &join.backward_key,
                table,
                owner_key.column(),
                on_delete,
            ),
            self.foreign_key_clause(
                &join.through,
                &join.forward_key,
                &join.related_table,
                &join.related_column,
                on_delete,
            ),
        ];

        Ok(format!(
            "CREATE TABLE {} (\n    {}\n){}",
            self.quote(&join.through),
            lines.join(",\n    "),
            self.table_suffix()
        ))
    }

    /// Generates SQL for dropping a many-to-many join table.
    fn drop_join_table(&self, through: &str) -> Result<String> {
        Ok(format!("DROP TABLE IF EXISTS {}", self.quote(through)))
    }

    /// Generates SQL for setting or dropping a column default.
    fn set_default(&self, _table: &str, _field: &FieldDescriptor) -> Result<String> {
        Err(self.unsupported(Capability::SetDefault))
    }

    /// Generates SQL for setting or dropping NOT NULL.
    fn set_nullable(&self, _table: &str, _field: &FieldDescriptor) -> Result<String> {
        Err(self.unsupported(Capability::SetNullable))
    }

    /// Generates SQL for setting a column comment.
    fn set_comment(&self, _table: &str, _field: &FieldDescriptor) -> Result<String> {
        Err(self.unsupported(Capability::SetComment))
    }
}

/// Returns the target of a foreign key field, or rejects a field without one.
fn foreign_key_target<'a, D: Dialect + ?Sized>(
    dialect: &D,
    field: &'a FieldDescriptor,
    capability: Capability,
) -> Result<&'a ForeignKeyTarget> {
    field
        .foreign_key_target()
        .ok_or_else(|| dialect.unsupported(capability))
}

/// Renders `SET DEFAULT x` or `DROP DEFAULT` for an `ALTER COLUMN` clause.
fn default_clause<D: Dialect + ?Sized>(dialect: &D, field: &FieldDescriptor) -> String {
    match field.default {
        Some(ref default) if dialect.accepts_default(&field.field_type) => {
            format!("SET DEFAULT {}", dialect.render_default(default))
        }
        _ => "DROP DEFAULT".to_string(),
    }
}

/// The supported database backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DialectKind {
    /// SQLite.
    #[default]
    Sqlite,
    /// PostgreSQL.
    Postgres,
    /// MySQL.
    Mysql,
}

impl DialectKind {
    /// Builds the dialect implementation.
    #[must_use]
    pub fn build(self) -> Box<dyn Dialect> {
        match self {
            Self::Sqlite => Box::new(SqliteDialect::new()),
            Self::Postgres => Box::new(PostgresDialect::new()),
            Self::Mysql => Box::new(MysqlDialect::new()),
        }
    }
}

impl fmt::Display for DialectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sqlite => f.write_str("sqlite"),
            Self::Postgres => f.write_str("postgres"),
            Self::Mysql => f.write_str("mysql"),
        }
    }
}

impl FromStr for DialectKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sqlite" | "sqlite3" => Ok(Self::Sqlite),
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            "mysql" | "mariadb" => Ok(Self::Mysql),
            other => Err(format!("unknown dialect '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_kind_parse() {
        assert_eq!("sqlite".parse::<DialectKind>(), Ok(DialectKind::Sqlite));
        assert_eq!("PostgreSQL".parse::<DialectKind>(), Ok(DialectKind::Postgres));
        assert_eq!("mysql".parse::<DialectKind>(), Ok(DialectKind::Mysql));
        assert!("oracle".parse::<DialectKind>().is_err());
    }

    #[test]
    fn test_dialect_kind_builds_matching_dialect() {
        assert_eq!(DialectKind::Sqlite.build().name(), "sqlite");
        assert_eq!(DialectKind::Postgres.build().name(), "postgres");
        assert_eq!(DialectKind::Mysql.build().name(), "mysql");
    }

    #[test]
    fn test_partial_alteration_flags() {
        assert!(!DialectKind::Sqlite.build().supports_partial_alteration());
        assert!(DialectKind::Postgres.build().supports_partial_alteration());
        assert!(!DialectKind::Mysql.build().supports_partial_alteration());
    }

    #[test]
    fn test_capability_display() {
        assert_eq!(Capability::RenameColumn.to_string(), "rename column");
        assert_eq!(Capability::CreateJoinTable.to_string(), "create join table");
    }
}
