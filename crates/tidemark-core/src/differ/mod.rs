//! Schema comparison.
//!
//! [`SchemaDiffer`] compares two [`ModelSet`]s table by table and hands
//! tables present on both sides to a [`ModelDiffer`]. It runs once per
//! direction; everything the two runs share lives in a [`DiffContext`].

mod model;

pub use model::ModelDiffer;

use model::{column_index, composite_indexes, owner_key};

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::change::{Change, ChangeRequest, Direction};
use crate::descriptor::{FieldDescriptor, ModelDescriptor, ModelSet};
use crate::rename::{RenameCandidate, RenameCorrelationMap, RenameDecisions};
use crate::HISTORY_TABLE;

/// Per-invocation diff state.
///
/// Holds the rename decisions for this run, the renames the upgrade pass
/// performed, and the join tables already handled in each direction.
/// Create a new context for every pair of upgrade/downgrade passes.
#[derive(Debug, Default)]
pub struct DiffContext {
    decisions: RenameDecisions,
    correlations: RenameCorrelationMap,
    join_tables: HashMap<Direction, HashSet<String>>,
}

impl DiffContext {
    /// Creates a context applying the given rename decisions.
    #[must_use]
    pub fn new(decisions: RenameDecisions) -> Self {
        Self {
            decisions,
            ..Self::default()
        }
    }

    /// Returns the rename decisions of this run.
    #[must_use]
    pub fn decisions(&self) -> &RenameDecisions {
        &self.decisions
    }

    /// Returns the renames recorded by the upgrade pass and not yet replayed.
    #[must_use]
    pub fn correlations(&self) -> &RenameCorrelationMap {
        &self.correlations
    }

    /// Marks a join table as handled; returns `false` if it already was.
    fn claim_join_table(&mut self, direction: Direction, through: &str) -> bool {
        self.join_tables
            .entry(direction)
            .or_default()
            .insert(through.to_string())
    }
}

/// Options controlling which change requests the differ produces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DifferOptions {
    /// Emit separate default/nullability/comment changes.
    pub partial_alterations: bool,
}

/// Compares two complete model sets.
#[derive(Debug, Clone)]
pub struct SchemaDiffer {
    models: ModelDiffer,
    partial_alterations: bool,
    excluded: HashSet<String>,
}

impl Default for SchemaDiffer {
    fn default() -> Self {
        Self::new(DifferOptions::default())
    }
}

impl SchemaDiffer {
    /// Creates a schema differ. The migration history table is always excluded.
    #[must_use]
    pub fn new(options: DifferOptions) -> Self {
        Self {
            models: ModelDiffer::new(options.partial_alterations),
            partial_alterations: options.partial_alterations,
            excluded: HashSet::from([HISTORY_TABLE.to_string()]),
        }
    }

    /// Excludes another table from comparison.
    #[must_use]
    pub fn exclude(mut self, table: impl Into<String>) -> Self {
        self.excluded.insert(table.into());
        self
    }

    fn included<'a>(&'a self, set: &'a ModelSet) -> impl Iterator<Item = &'a ModelDescriptor> + 'a {
        set.models
            .iter()
            .filter(move |m| !self.excluded.contains(&m.table))
    }

    /// Lists removed/added field pairs that could be renames.
    ///
    /// A pair qualifies when both fields live in the same table on both
    /// sides and their descriptors match in everything but the name.
    /// Many-to-many and backward relations never qualify.
    #[must_use]
    pub fn rename_candidates(&self, old: &ModelSet, new: &ModelSet) -> Vec<RenameCandidate> {
        let mut candidates = Vec::new();

        for new_model in self.included(new) {
            let Some(old_model) = old.get(&new_model.table) else {
                continue;
            };
            let removed: Vec<_> = old_model
                .fields
                .iter()
                .filter(has_column)
                .filter(|f| new_model.get_field(&f.name).is_none())
                .collect();
            let added: Vec<_> = new_model
                .fields
                .iter()
                .filter(has_column)
                .filter(|f| old_model.get_field(&f.name).is_none())
                .collect();

            for old_field in &removed {
                for new_field in &added {
                    if new_field.is_rename_of(old_field) {
                        candidates.push(RenameCandidate::new(
                            &new_model.table,
                            &old_field.name,
                            &new_field.name,
                        ));
                    }
                }
            }
        }

        candidates
    }

    /// Diffs `old` against `new`, labelling every change with `direction`.
    ///
    /// New tables come first in dependency order, then changes to common
    /// tables in declaration order, then dropped tables in reverse
    /// dependency order.
    pub fn diff(
        &self,
        old: &ModelSet,
        new: &ModelSet,
        direction: Direction,
        ctx: &mut DiffContext,
    ) -> Vec<ChangeRequest> {
        let mut changes = Vec::new();

        let created: Vec<&ModelDescriptor> = self
            .included(new)
            .filter(|m| !old.contains(&m.table))
            .collect();
        for model in dependency_order(created) {
            self.table_created(model, direction, ctx, &mut changes);
        }

        for new_model in self.included(new) {
            if let Some(old_model) = old.get(&new_model.table) {
                changes.extend(self.models.diff(old_model, new_model, direction, ctx));
            }
        }

        let dropped: Vec<&ModelDescriptor> = self
            .included(old)
            .filter(|m| !new.contains(&m.table))
            .collect();
        for model in dependency_order(dropped).into_iter().rev() {
            self.table_dropped(model, direction, ctx, &mut changes);
        }

        debug!(%direction, count = changes.len(), "Schema diff complete");
        changes
    }

    fn table_created(
        &self,
        model: &ModelDescriptor,
        direction: Direction,
        ctx: &mut DiffContext,
        changes: &mut Vec<ChangeRequest>,
    ) {
        let table = model.table.as_str();
        let mut push = |change: Change| {
            debug!(%direction, change = %change.description(), "Change detected");
            changes.push(ChangeRequest::new(direction, change));
        };

        push(Change::AddTable {
            model: model.clone(),
        });

        for field in &model.fields {
            if field.is_backward_relation() {
                continue;
            }
            if let Some(join) = field.join_table() {
                if ctx.claim_join_table(direction, &join.through) {
                    push(Change::CreateJoinTable {
                        table: table.to_string(),
                        owner_key: owner_key(model),
                        field: field.clone(),
                    });
                }
                continue;
            }
            if !field.primary_key {
                column_index(table, field, &mut push);
            }
            if self.partial_alterations && field.description.is_some() {
                push(Change::SetComment {
                    table: table.to_string(),
                    field: field.clone(),
                });
            }
        }

        for (fields, unique) in composite_indexes(model) {
            push(Change::AddIndex {
                table: table.to_string(),
                columns: model.resolve_columns(&fields),
                unique,
            });
        }
    }

    fn table_dropped(
        &self,
        model: &ModelDescriptor,
        direction: Direction,
        ctx: &mut DiffContext,
        changes: &mut Vec<ChangeRequest>,
    ) {
        for field in &model.fields {
            if let Some(join) = field.join_table() {
                if ctx.claim_join_table(direction, &join.through) {
                    changes.push(ChangeRequest::new(
                        direction,
                        Change::DropJoinTable {
                            through: join.through.clone(),
                        },
                    ));
                }
            }
        }
        debug!(%direction, table = %model.table, "Table dropped");
        changes.push(ChangeRequest::new(
            direction,
            Change::DropTable {
                table: model.table.clone(),
            },
        ));
    }
}

fn has_column(field: &&FieldDescriptor) -> bool {
    !field.is_backward_relation() && field.join_table().is_none()
}

/// Orders models so that a referenced model precedes the models
/// referencing it. Only references within `models` count; on a cycle the
/// remaining models keep their declaration order.
fn dependency_order(models: Vec<&ModelDescriptor>) -> Vec<&ModelDescriptor> {
    let mut remaining = models;
    let mut ordered: Vec<&ModelDescriptor> = Vec::with_capacity(remaining.len());

    while !remaining.is_empty() {
        let ready = remaining.iter().position(|model| {
            model.referenced_tables().all(|target| {
                target == model.table || !remaining.iter().any(|m| m.table == target)
            })
        });
        match ready {
            Some(idx) => ordered.push(remaining.remove(idx)),
            None => {
                ordered.append(&mut remaining);
            }
        }
    }

    ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{FieldType, ForeignKeyTarget, JoinTable, OnDelete};

    fn fk(name: &str, table: &str) -> FieldDescriptor {
        FieldDescriptor::foreign_key(
            name,
            ForeignKeyTarget {
                table: table.to_string(),
                column: "id".to_string(),
                on_delete: OnDelete::Cascade,
            },
        )
    }

    fn tags() -> FieldDescriptor {
        FieldDescriptor::many_to_many(
            "tags",
            JoinTable {
                through: "post_tag".to_string(),
                related_table: "tag".to_string(),
                related_column: "id".to_string(),
                related_type: FieldType::Int,
                forward_key: "tag_id".to_string(),
                backward_key: "post_id".to_string(),
                on_delete: OnDelete::Cascade,
            },
        )
    }

    fn tables(changes: &[ChangeRequest]) -> Vec<(&'static str, String)> {
        changes
            .iter()
            .map(|r| {
                let kind = match r.change {
                    Change::AddTable { .. } => "add",
                    Change::DropTable { .. } => "drop",
                    _ => "other",
                };
                (kind, r.change.table().to_string())
            })
            .collect()
    }

    #[test]
    fn test_created_tables_follow_dependencies() {
        let new = ModelSet::new()
            .model(
                ModelDescriptor::new("comment")
                    .field(FieldDescriptor::id("id"))
                    .field(fk("post", "post")),
            )
            .model(
                ModelDescriptor::new("post")
                    .field(FieldDescriptor::id("id"))
                    .field(fk("author", "user")),
            )
            .model(ModelDescriptor::new("user").field(FieldDescriptor::id("id")));

        let mut ctx = DiffContext::default();
        let differ = SchemaDiffer::default();
        let up = differ.diff(&ModelSet::new(), &new, Direction::Upgrade, &mut ctx);
        assert_eq!(
            tables(&up),
            vec![
                ("add", "user".to_string()),
                ("add", "post".to_string()),
                ("add", "comment".to_string()),
            ]
        );

        let down = differ.diff(&new, &ModelSet::new(), Direction::Downgrade, &mut ctx);
        assert_eq!(
            tables(&down),
            vec![
                ("drop", "comment".to_string()),
                ("drop", "post".to_string()),
                ("drop", "user".to_string()),
            ]
        );
    }

    #[test]
    fn test_cycle_keeps_declaration_order() {
        let a = ModelDescriptor::new("a").field(fk("b", "b"));
        let b = ModelDescriptor::new("b").field(fk("a", "a"));
        let ordered = dependency_order(vec![&a, &b]);
        assert_eq!(ordered[0].table, "a");
        assert_eq!(ordered[1].table, "b");
    }

    #[test]
    fn test_history_table_is_excluded() {
        let old = ModelSet::new();
        let new = ModelSet::new().model(
            ModelDescriptor::new(HISTORY_TABLE).field(FieldDescriptor::id("id")),
        );
        let mut ctx = DiffContext::default();
        assert!(SchemaDiffer::default()
            .diff(&old, &new, Direction::Upgrade, &mut ctx)
            .is_empty());
    }

    #[test]
    fn test_created_table_extras() {
        let new = ModelSet::new().model(
            ModelDescriptor::new("post")
                .field(FieldDescriptor::id("id"))
                .field(
                    FieldDescriptor::new("slug", FieldType::Char(80))
                        .unique()
                        .description("URL key"),
                )
                .field(tags())
                .field(FieldDescriptor::backward_relation("comments"))
                .unique_together(["slug", "id"]),
        );
        let mut ctx = DiffContext::default();
        let up = SchemaDiffer::new(DifferOptions {
            partial_alterations: true,
        })
        .diff(&ModelSet::new(), &new, Direction::Upgrade, &mut ctx);

        let changes: Vec<&Change> = up.iter().map(|r| &r.change).collect();
        assert_eq!(changes.len(), 5);
        assert!(matches!(changes[0], Change::AddTable { .. }));
        assert!(matches!(changes[1], Change::AddIndex { unique: true, columns, .. } if columns == &vec!["slug".to_string()]));
        assert!(matches!(changes[2], Change::SetComment { .. }));
        assert!(matches!(changes[3], Change::CreateJoinTable { .. }));
        assert!(matches!(changes[4], Change::AddIndex { unique: true, columns, .. } if columns.len() == 2));
    }

    #[test]
    fn test_join_table_deduplicated_per_direction() {
        let old = ModelSet::new()
            .model(ModelDescriptor::new("post").field(FieldDescriptor::id("id")))
            .model(ModelDescriptor::new("tag").field(FieldDescriptor::id("id")));
        let new = ModelSet::new()
            .model(
                ModelDescriptor::new("post")
                    .field(FieldDescriptor::id("id"))
                    .field(tags()),
            )
            .model(
                ModelDescriptor::new("tag")
                    .field(FieldDescriptor::id("id"))
                    .field(tags()),
            );

        let mut ctx = DiffContext::default();
        let differ = SchemaDiffer::default();
        let up = differ.diff(&old, &new, Direction::Upgrade, &mut ctx);
        let down = differ.diff(&new, &old, Direction::Downgrade, &mut ctx);

        assert_eq!(
            up.iter()
                .filter(|r| matches!(r.change, Change::CreateJoinTable { .. }))
                .count(),
            1
        );
        assert_eq!(
            down.iter()
                .filter(|r| matches!(r.change, Change::DropJoinTable { .. }))
                .count(),
            1
        );
    }

    #[test]
    fn test_rename_candidates() {
        let old = ModelSet::new().model(
            ModelDescriptor::new("user")
                .field(FieldDescriptor::id("id"))
                .field(FieldDescriptor::new("nick", FieldType::Char(20)))
                .field(FieldDescriptor::new("age", FieldType::Int)),
        );
        let new = ModelSet::new().model(
            ModelDescriptor::new("user")
                .field(FieldDescriptor::id("id"))
                .field(FieldDescriptor::new("nickname", FieldType::Char(20)))
                .field(FieldDescriptor::new("handle", FieldType::Char(20)))
                .field(FieldDescriptor::new("years", FieldType::BigInt))
                .field(tags()),
        );

        let candidates = SchemaDiffer::default().rename_candidates(&old, &new);
        assert_eq!(
            candidates,
            vec![
                RenameCandidate::new("user", "nick", "nickname"),
                RenameCandidate::new("user", "nick", "handle"),
            ]
        );
    }
}
