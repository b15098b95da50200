//! Field-by-field comparison of one table.

use tracing::debug;

use super::DiffContext;
use crate::change::{Change, ChangeRequest, Direction};
use crate::descriptor::{FieldDescriptor, ModelDescriptor};

/// Index carried by a single column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnIndex {
    None,
    Plain,
    Unique,
}

impl ColumnIndex {
    fn of(field: &FieldDescriptor) -> Self {
        if field.unique {
            Self::Unique
        } else if field.indexed {
            Self::Plain
        } else {
            Self::None
        }
    }
}

/// Compares an old and a new version of the same table.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelDiffer {
    partial_alterations: bool,
}

impl ModelDiffer {
    /// Creates a model differ.
    ///
    /// With `partial_alterations`, default, nullability and comment changes
    /// also produce their own change requests ahead of the column rewrite.
    #[must_use]
    pub const fn new(partial_alterations: bool) -> Self {
        Self {
            partial_alterations,
        }
    }

    /// Diffs two versions of one table.
    pub fn diff(
        &self,
        old: &ModelDescriptor,
        new: &ModelDescriptor,
        direction: Direction,
        ctx: &mut DiffContext,
    ) -> Vec<ChangeRequest> {
        let table = new.table.as_str();
        let mut changes = Vec::new();
        let mut push = |change: Change| {
            debug!(%direction, change = %change.description(), "Change detected");
            changes.push(ChangeRequest::new(direction, change));
        };

        let mut added: Vec<&FieldDescriptor> = Vec::new();
        for new_field in new.fields.iter().filter(|f| !f.is_backward_relation()) {
            if let Some(join) = new_field.join_table() {
                if !ctx.claim_join_table(direction, &join.through) {
                    continue;
                }
            }
            match find_field(old, &new_field.name) {
                Some(old_field) => diff_field(
                    self.partial_alterations,
                    table,
                    old_field,
                    new_field,
                    &mut push,
                ),
                None => added.push(new_field),
            }
        }

        for old_field in old.fields.iter().filter(|f| !f.is_backward_relation()) {
            if find_field(new, &old_field.name).is_some() {
                continue;
            }

            if let Some(join) = old_field.join_table() {
                if ctx.claim_join_table(direction, &join.through) {
                    push(Change::DropJoinTable {
                        through: join.through.clone(),
                    });
                }
                continue;
            }

            if let Some(new_field) = take_rename(table, old_field, &mut added, direction, ctx) {
                renamed_field_changes(table, old_field, new_field, &mut push);
                continue;
            }

            if old_field.foreign_key_target().is_some() {
                push(Change::DropForeignKey {
                    table: table.to_string(),
                    field: old_field.clone(),
                });
            } else {
                push(Change::DropColumn {
                    table: table.to_string(),
                    column: old_field.column().to_string(),
                });
            }
        }

        for field in added {
            added_field_changes(new, field, self.partial_alterations, &mut push);
        }

        let old_indexes = composite_indexes(old);
        let new_indexes = composite_indexes(new);
        for (fields, unique) in &new_indexes {
            if !old_indexes.contains(&(fields.clone(), *unique)) {
                push(Change::AddIndex {
                    table: table.to_string(),
                    columns: new.resolve_columns(fields),
                    unique: *unique,
                });
            }
        }
        for (fields, unique) in &old_indexes {
            if !new_indexes.contains(&(fields.clone(), *unique)) {
                push(Change::DropIndex {
                    table: table.to_string(),
                    columns: old.resolve_columns(fields),
                    unique: *unique,
                });
            }
        }

        changes
    }
}

fn find_field<'a>(model: &'a ModelDescriptor, name: &str) -> Option<&'a FieldDescriptor> {
    model
        .get_field(name)
        .filter(|f| !f.is_backward_relation())
}

fn diff_field(
    partial_alterations: bool,
    table: &str,
    old: &FieldDescriptor,
    new: &FieldDescriptor,
    push: &mut impl FnMut(Change),
) {
    if new.join_table().is_some() {
        return;
    }

    if new.is_relation() {
        if partial_alterations && old.description != new.description {
            push(Change::SetComment {
                table: table.to_string(),
                field: new.clone(),
            });
        }
    } else if !old.same_shape(new) {
        if partial_alterations {
            if old.default != new.default {
                push(Change::SetDefault {
                    table: table.to_string(),
                    field: new.clone(),
                });
            }
            if old.nullable != new.nullable {
                push(Change::SetNullable {
                    table: table.to_string(),
                    field: new.clone(),
                });
            }
            if old.description != new.description {
                push(Change::SetComment {
                    table: table.to_string(),
                    field: new.clone(),
                });
            }
        }
        push(Change::ModifyColumn {
            table: table.to_string(),
            field: new.clone(),
        });
    }

    let before = ColumnIndex::of(old);
    let after = ColumnIndex::of(new);
    if before == after {
        return;
    }
    if before != ColumnIndex::None {
        push(Change::DropIndex {
            table: table.to_string(),
            columns: vec![old.column().to_string()],
            unique: before == ColumnIndex::Unique,
        });
    }
    if after != ColumnIndex::None {
        push(Change::AddIndex {
            table: table.to_string(),
            columns: vec![new.column().to_string()],
            unique: after == ColumnIndex::Unique,
        });
    }
}

/// Pairs a removed field with an added one when a rename applies.
///
/// The upgrade pass follows the caller's decisions and records what it did;
/// the downgrade pass only replays those records.
fn take_rename<'a>(
    table: &str,
    old_field: &FieldDescriptor,
    added: &mut Vec<&'a FieldDescriptor>,
    direction: Direction,
    ctx: &mut DiffContext,
) -> Option<&'a FieldDescriptor> {
    let position = match direction {
        Direction::Upgrade => {
            let new_name = ctx.decisions().renamed_to(table, &old_field.name)?;
            added.iter().position(|f| f.name == new_name)?
        }
        Direction::Downgrade => {
            let old_column = ctx.correlations.take(table, old_field.column())?;
            added
                .iter()
                .position(|f| f.join_table().is_none() && f.column() == old_column)?
        }
    };

    let new_field = added.remove(position);
    if direction == Direction::Upgrade {
        ctx.correlations
            .record(table, new_field.column(), old_field.column());
    }
    Some(new_field)
}

/// Renames a column together with the objects whose names derive from it.
///
/// Index and constraint names hash the column name, so the old index is
/// dropped before the rename and recreated under the new name after it.
fn renamed_field_changes(
    table: &str,
    old: &FieldDescriptor,
    new: &FieldDescriptor,
    push: &mut impl FnMut(Change),
) {
    let before = ColumnIndex::of(old);
    if before != ColumnIndex::None {
        push(Change::DropIndex {
            table: table.to_string(),
            columns: vec![old.column().to_string()],
            unique: before == ColumnIndex::Unique,
        });
    }

    push(Change::RenameColumn {
        table: table.to_string(),
        old_column: old.column().to_string(),
        field: new.clone(),
    });
    if new.foreign_key_target().is_some() {
        push(Change::RenameForeignKey {
            table: table.to_string(),
            old_column: old.column().to_string(),
            field: new.clone(),
        });
    }

    column_index(table, new, push);
}

fn added_field_changes(
    model: &ModelDescriptor,
    field: &FieldDescriptor,
    partial_alterations: bool,
    push: &mut impl FnMut(Change),
) {
    let table = model.table.as_str();

    if field.join_table().is_some() {
        push(Change::CreateJoinTable {
            table: table.to_string(),
            owner_key: owner_key(model),
            field: field.clone(),
        });
        return;
    }

    if field.foreign_key_target().is_some() {
        push(Change::AddForeignKey {
            table: table.to_string(),
            field: field.clone(),
        });
    } else {
        push(Change::AddColumn {
            table: table.to_string(),
            field: field.clone(),
        });
    }
    if partial_alterations && field.description.is_some() {
        push(Change::SetComment {
            table: table.to_string(),
            field: field.clone(),
        });
    }
    column_index(table, field, push);
}

/// Emits the single-column index of a freshly created column, if any.
pub(super) fn column_index(table: &str, field: &FieldDescriptor, push: &mut impl FnMut(Change)) {
    let unique = match ColumnIndex::of(field) {
        ColumnIndex::None => return,
        ColumnIndex::Plain => false,
        ColumnIndex::Unique => true,
    };
    push(Change::AddIndex {
        table: table.to_string(),
        columns: vec![field.column().to_string()],
        unique,
    });
}

/// The primary key referenced by join tables; models without one get `id`.
pub(super) fn owner_key(model: &ModelDescriptor) -> FieldDescriptor {
    model
        .primary_key()
        .cloned()
        .unwrap_or_else(|| FieldDescriptor::id("id"))
}

/// Composite indexes and unique-together sets as `(fields, unique)` pairs.
pub(super) fn composite_indexes(model: &ModelDescriptor) -> Vec<(Vec<String>, bool)> {
    let mut indexes: Vec<(Vec<String>, bool)> = Vec::new();
    let all = model
        .indexes
        .iter()
        .map(|index| (index.fields.clone(), index.unique))
        .chain(model.unique_together.iter().map(|fields| (fields.clone(), true)));
    for entry in all {
        if !indexes.contains(&entry) {
            indexes.push(entry);
        }
    }
    indexes
}
