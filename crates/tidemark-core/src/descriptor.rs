//! Model and field descriptors.
//!
//! These types are the normalized, comparable snapshot of a data model that
//! the differ works on. They are produced by an external model loader (or
//! deserialized from a JSON snapshot) and never touch a live database.

use serde::{Deserialize, Serialize};

/// Declared type of a field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// 16-bit integer.
    SmallInt,
    /// 32-bit integer.
    Int,
    /// 64-bit integer.
    BigInt,
    /// Boolean.
    Boolean,
    /// Variable-length string with a maximum length.
    Char(usize),
    /// Unbounded text.
    Text,
    /// Double precision floating point.
    Float,
    /// Fixed-point decimal.
    Decimal {
        /// Total number of digits.
        digits: u8,
        /// Digits after the decimal point.
        places: u8,
    },
    /// Date only.
    Date,
    /// Time only.
    Time,
    /// Date and time.
    Datetime,
    /// JSON document.
    Json,
    /// UUID.
    Uuid,
    /// Binary data.
    Binary,
}

/// Default value of a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultValue {
    /// Boolean literal.
    Bool(bool),
    /// Integer literal.
    Integer(i64),
    /// Float literal.
    Float(f64),
    /// String literal.
    Text(String),
    /// Raw SQL expression (e.g. `CURRENT_TIMESTAMP`).
    Expression(String),
}

/// Referential action applied when the referenced row is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OnDelete {
    /// Delete referencing rows.
    #[default]
    Cascade,
    /// Refuse the delete.
    Restrict,
    /// Null out the reference.
    SetNull,
    /// Reset the reference to its default.
    SetDefault,
    /// Deferred check, no action.
    NoAction,
}

impl OnDelete {
    /// Returns the SQL keyword(s) for this action.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Cascade => "CASCADE",
            Self::Restrict => "RESTRICT",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
            Self::NoAction => "NO ACTION",
        }
    }
}

/// Target of a foreign key field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForeignKeyTarget {
    /// Referenced table.
    pub table: String,
    /// Referenced column (usually the primary key).
    pub column: String,
    /// Action on delete.
    #[serde(default)]
    pub on_delete: OnDelete,
}

/// The auxiliary table backing a many-to-many field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JoinTable {
    /// Join table name.
    pub through: String,
    /// Table on the other side of the relation.
    pub related_table: String,
    /// Primary key column of the related table.
    pub related_column: String,
    /// Type of the related primary key.
    pub related_type: FieldType,
    /// Join column referencing the related table.
    pub forward_key: String,
    /// Join column referencing the owning table.
    pub backward_key: String,
    /// Action on delete for both join columns.
    #[serde(default)]
    pub on_delete: OnDelete,
}

/// Role a field plays in its model.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldRole {
    /// An ordinary column.
    #[default]
    Plain,
    /// A column referencing another table.
    ForeignKey(ForeignKeyTarget),
    /// A relation stored in a join table; no column on the model itself.
    ManyToMany(JoinTable),
    /// The synthetic reverse side of a relation; never diffed.
    BackwardRelation,
}

/// Comparable description of a single field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Field name in the model.
    pub name: String,
    /// Database column name, when it differs from `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_column: Option<String>,
    /// Declared type.
    pub field_type: FieldType,
    /// Whether the column accepts NULL.
    #[serde(default)]
    pub nullable: bool,
    /// Whether the column carries a unique index.
    #[serde(default)]
    pub unique: bool,
    /// Whether the column carries a plain index.
    #[serde(default)]
    pub indexed: bool,
    /// Whether this is the primary key.
    #[serde(default)]
    pub primary_key: bool,
    /// Whether the database generates the value (auto-increment).
    #[serde(default)]
    pub generated: bool,
    /// Default value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<DefaultValue>,
    /// Free-text description, rendered as a column comment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Relational role.
    #[serde(default)]
    pub role: FieldRole,
}

impl FieldDescriptor {
    /// Creates a plain, NOT NULL field.
    #[must_use]
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            db_column: None,
            field_type,
            nullable: false,
            unique: false,
            indexed: false,
            primary_key: false,
            generated: false,
            default: None,
            description: None,
            role: FieldRole::Plain,
        }
    }

    /// Creates an auto-incrementing integer primary key.
    #[must_use]
    pub fn id(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Int).primary_key().generated()
    }

    /// Creates a foreign key field; the column is `{name}_id`.
    #[must_use]
    pub fn foreign_key(name: impl Into<String>, target: ForeignKeyTarget) -> Self {
        let name = name.into();
        let column = format!("{name}_id");
        Self::new(name, FieldType::Int)
            .db_column(column)
            .role(FieldRole::ForeignKey(target))
    }

    /// Creates a many-to-many field backed by `join`.
    #[must_use]
    pub fn many_to_many(name: impl Into<String>, join: JoinTable) -> Self {
        Self::new(name, FieldType::Int).role(FieldRole::ManyToMany(join))
    }

    /// Creates the synthetic reverse side of a relation.
    #[must_use]
    pub fn backward_relation(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Int).role(FieldRole::BackwardRelation)
    }

    /// Sets an explicit column name.
    #[must_use]
    pub fn db_column(mut self, column: impl Into<String>) -> Self {
        self.db_column = Some(column.into());
        self
    }

    /// Marks the field nullable.
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Marks the field unique.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Marks the field indexed.
    #[must_use]
    pub fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }

    /// Marks the field as the primary key.
    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    /// Marks the field as database-generated.
    #[must_use]
    pub fn generated(mut self) -> Self {
        self.generated = true;
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn default(mut self, value: DefaultValue) -> Self {
        self.default = Some(value);
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    /// Sets the relational role.
    #[must_use]
    pub fn role(mut self, role: FieldRole) -> Self {
        self.role = role;
        self
    }

    /// Returns the database column name.
    #[must_use]
    pub fn column(&self) -> &str {
        self.db_column.as_deref().unwrap_or(&self.name)
    }

    /// Returns the foreign key target, if any.
    #[must_use]
    pub fn foreign_key_target(&self) -> Option<&ForeignKeyTarget> {
        match &self.role {
            FieldRole::ForeignKey(target) => Some(target),
            _ => None,
        }
    }

    /// Returns the join table, if any.
    #[must_use]
    pub fn join_table(&self) -> Option<&JoinTable> {
        match &self.role {
            FieldRole::ManyToMany(join) => Some(join),
            _ => None,
        }
    }

    /// Whether the field is a foreign key or a many-to-many relation.
    #[must_use]
    pub fn is_relation(&self) -> bool {
        matches!(
            self.role,
            FieldRole::ForeignKey(_) | FieldRole::ManyToMany(_)
        )
    }

    /// Whether the field is the synthetic side of a relation.
    #[must_use]
    pub fn is_backward_relation(&self) -> bool {
        matches!(self.role, FieldRole::BackwardRelation)
    }

    /// Compares everything except the `unique` and `indexed` flags.
    ///
    /// Index changes are expressed as index operators, never as a column
    /// modification.
    #[must_use]
    pub fn same_shape(&self, other: &Self) -> bool {
        self.without_indexes() == other.without_indexes()
    }

    /// Compares everything except the field name and column name.
    #[must_use]
    pub fn is_rename_of(&self, other: &Self) -> bool {
        let mut this = self.clone();
        let mut that = other.clone();
        this.name.clear();
        this.db_column = None;
        that.name.clear();
        that.db_column = None;
        this == that
    }

    fn without_indexes(&self) -> Self {
        Self {
            unique: false,
            indexed: false,
            ..self.clone()
        }
    }
}

/// A composite index over several fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexDefinition {
    /// Field names, in index order.
    pub fields: Vec<String>,
    /// Whether the index is unique.
    #[serde(default)]
    pub unique: bool,
}

impl IndexDefinition {
    /// Creates a non-unique index.
    #[must_use]
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            unique: false,
        }
    }

    /// Makes the index unique.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

/// Comparable description of a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Table name.
    pub table: String,
    /// Fields, in declaration order.
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
    /// Composite indexes.
    #[serde(default)]
    pub indexes: Vec<IndexDefinition>,
    /// Composite unique-together sets.
    #[serde(default)]
    pub unique_together: Vec<Vec<String>>,
}

impl ModelDescriptor {
    /// Creates an empty model.
    #[must_use]
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            fields: Vec::new(),
            indexes: Vec::new(),
            unique_together: Vec::new(),
        }
    }

    /// Adds a field.
    #[must_use]
    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Adds a composite index.
    #[must_use]
    pub fn index(mut self, index: IndexDefinition) -> Self {
        self.indexes.push(index);
        self
    }

    /// Adds a unique-together set.
    #[must_use]
    pub fn unique_together<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unique_together
            .push(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Gets a field by name.
    #[must_use]
    pub fn get_field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Returns the primary key field.
    #[must_use]
    pub fn primary_key(&self) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.primary_key)
    }

    /// Maps field names to column names. Unknown names pass through.
    #[must_use]
    pub fn resolve_columns(&self, fields: &[String]) -> Vec<String> {
        fields
            .iter()
            .map(|name| {
                self.get_field(name)
                    .map_or_else(|| name.clone(), |f| f.column().to_string())
            })
            .collect()
    }

    /// Returns the tables this model references through foreign keys.
    pub fn referenced_tables(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter_map(|f| f.foreign_key_target().map(|t| t.table.as_str()))
    }
}

/// All models of one application, keyed by table name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelSet {
    /// Models, in declaration order.
    pub models: Vec<ModelDescriptor>,
}

impl ModelSet {
    /// Creates an empty model set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a model.
    #[must_use]
    pub fn model(mut self, model: ModelDescriptor) -> Self {
        self.models.push(model);
        self
    }

    /// Gets a model by table name.
    #[must_use]
    pub fn get(&self, table: &str) -> Option<&ModelDescriptor> {
        self.models.iter().find(|m| m.table == table)
    }

    /// Whether a table with this name exists.
    #[must_use]
    pub fn contains(&self, table: &str) -> bool {
        self.get(table).is_some()
    }

    /// Returns table names.
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.models.iter().map(|m| m.table.as_str())
    }

    /// Number of models.
    #[must_use]
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Whether the set holds no models.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_target() -> ForeignKeyTarget {
        ForeignKeyTarget {
            table: "user".to_string(),
            column: "id".to_string(),
            on_delete: OnDelete::Cascade,
        }
    }

    #[test]
    fn test_field_builder() {
        let field = FieldDescriptor::new("email", FieldType::Char(255))
            .nullable()
            .unique()
            .description("Contact address");

        assert_eq!(field.column(), "email");
        assert!(field.nullable);
        assert!(field.unique);
        assert!(!field.indexed);
        assert_eq!(field.description.as_deref(), Some("Contact address"));
    }

    #[test]
    fn test_primary_key_is_not_null() {
        let field = FieldDescriptor::new("id", FieldType::Int)
            .nullable()
            .primary_key();
        assert!(!field.nullable);
    }

    #[test]
    fn test_foreign_key_column() {
        let field = FieldDescriptor::foreign_key("user", user_target());
        assert_eq!(field.column(), "user_id");
        assert!(field.is_relation());
        assert_eq!(field.foreign_key_target().unwrap().table, "user");
    }

    #[test]
    fn test_same_shape_ignores_index_flags() {
        let a = FieldDescriptor::new("name", FieldType::Char(50));
        let b = a.clone().unique().indexed();
        assert!(a.same_shape(&b));
        assert_ne!(a, b);

        let c = a.clone().nullable();
        assert!(!a.same_shape(&c));
    }

    #[test]
    fn test_is_rename_of() {
        let nick = FieldDescriptor::new("nick", FieldType::Char(20)).nullable();
        let nickname = FieldDescriptor::new("nickname", FieldType::Char(20)).nullable();
        assert!(nickname.is_rename_of(&nick));

        let longer = FieldDescriptor::new("nickname", FieldType::Char(40)).nullable();
        assert!(!longer.is_rename_of(&nick));
    }

    #[test]
    fn test_resolve_columns() {
        let model = ModelDescriptor::new("category")
            .field(FieldDescriptor::id("id"))
            .field(FieldDescriptor::new("slug", FieldType::Char(200)))
            .field(FieldDescriptor::foreign_key("user", user_target()));

        let columns =
            model.resolve_columns(&["slug".to_string(), "user".to_string(), "gone".to_string()]);
        assert_eq!(columns, vec!["slug", "user_id", "gone"]);
        assert_eq!(model.referenced_tables().collect::<Vec<_>>(), vec!["user"]);
    }

    #[test]
    fn test_model_set_lookup() {
        let set = ModelSet::new()
            .model(ModelDescriptor::new("user"))
            .model(ModelDescriptor::new("category"));

        assert_eq!(set.len(), 2);
        assert!(set.contains("category"));
        assert!(set.get("product").is_none());
        assert_eq!(set.table_names().collect::<Vec<_>>(), vec!["user", "category"]);
    }

    #[test]
    fn test_snapshot_deserializes() {
        let json = r#"{
            "models": [{
                "table": "category",
                "fields": [
                    {"name": "id", "field_type": "int", "primary_key": true, "generated": true},
                    {"name": "slug", "field_type": {"char": 200}, "indexed": true},
                    {"name": "user", "db_column": "user_id", "field_type": "int",
                     "role": {"kind": "foreign_key", "table": "user", "column": "id"}},
                    {"name": "products", "field_type": "int", "role": {"kind": "backward_relation"}}
                ],
                "unique_together": [["slug", "user"]]
            }]
        }"#;

        let set: ModelSet = serde_json::from_str(json).unwrap();
        let category = set.get("category").unwrap();
        assert_eq!(category.fields.len(), 4);
        assert_eq!(category.get_field("slug").unwrap().field_type, FieldType::Char(200));
        assert_eq!(
            category.get_field("user").unwrap().foreign_key_target(),
            Some(&user_target())
        );
        assert!(category.get_field("products").unwrap().is_backward_relation());
    }
}
