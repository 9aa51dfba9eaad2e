//! Snapshot comparison
//!
//! Entities are matched by name within their parent. An entity found only
//! in `before` is dropped, only in `after` created, and in both compared
//! field by field. Indexes, foreign keys, checks, triggers and sequences
//! cannot be altered in place, so a change to one of them is reported as a
//! Drop followed by a Create.

pub mod report;
mod types;

pub use types::{Action, EntityDiff, MetadataDiff, SchemaDiff, TableDiff};

use std::collections::HashMap;

use tracing::info;

use crate::error::SchemaDiffError;
use crate::model::{DatabaseSnapshot, Named, NamedCollection, SchemaSnapshot, TableState};

/// Diff configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct DiffOptions {
    /// Match names case-sensitively
    pub case_sensitive: bool,
}

/// Compare two snapshots. Neither input is modified.
pub fn diff(
    before: &DatabaseSnapshot,
    after: &DatabaseSnapshot,
    options: &DiffOptions,
) -> Result<MetadataDiff, SchemaDiffError> {
    check_shape(before)?;
    check_shape(after)?;

    let mut result = MetadataDiff::default();
    let empty = SchemaSnapshot::default();
    let before_schemas = by_name(&before.schemas, |s| s.name.as_str(), options.case_sensitive);
    let after_schemas = by_name(&after.schemas, |s| s.name.as_str(), options.case_sensitive);

    for schema in &before.schemas {
        if !after_schemas.contains_key(&key(&schema.name, options.case_sensitive)) {
            result.schemas.push(SchemaDiff {
                action: Action::Drop,
                name: schema.name.clone(),
            });
            diff_schema(schema, &empty, options, &mut result);
        }
    }
    for schema in &after.schemas {
        match before_schemas.get(&key(&schema.name, options.case_sensitive)) {
            Some(old) => diff_schema(old, schema, options, &mut result),
            None => {
                result.schemas.push(SchemaDiff {
                    action: Action::Create,
                    name: schema.name.clone(),
                });
                diff_schema(&empty, schema, options, &mut result);
            }
        }
    }

    info!(
        tables = result.tables.len(),
        views = result.views.len(),
        changes = result.change_count(),
        "computed metadata diff"
    );
    Ok(result)
}

/// The inputs are assumed valid; only structural breakage is reported.
fn check_shape(snapshot: &DatabaseSnapshot) -> Result<(), SchemaDiffError> {
    for schema in &snapshot.schemas {
        for table in schema.tables.iter() {
            let primaries = table.indexes.iter().filter(|i| i.primary).count();
            if primaries > 1 {
                return Err(SchemaDiffError::MalformedDiff {
                    kind: "table".to_string(),
                    message: format!("table `{}` has {} primary keys", table.name, primaries),
                });
            }
            if let Some(index) = table.indexes.iter().find(|i| i.keys.is_empty()) {
                return Err(SchemaDiffError::MalformedDiff {
                    kind: "index".to_string(),
                    message: format!("index `{}` of table `{}` has no keys", index.name, table.name),
                });
            }
        }
    }
    Ok(())
}

fn key(name: &str, case_sensitive: bool) -> String {
    if case_sensitive {
        name.to_string()
    } else {
        name.to_lowercase()
    }
}

fn by_name<'a, T>(
    items: &'a [T],
    name: impl Fn(&T) -> &str,
    case_sensitive: bool,
) -> HashMap<String, &'a T> {
    items.iter().map(|i| (key(name(i), case_sensitive), i)).collect()
}

fn diff_schema(before: &SchemaSnapshot, after: &SchemaSnapshot, options: &DiffOptions, out: &mut MetadataDiff) {
    let cs = options.case_sensitive;

    let old_tables = collection_by_name(&before.tables, cs);
    let new_tables = collection_by_name(&after.tables, cs);
    for table in before.tables.iter() {
        if !new_tables.contains_key(&key(&table.name, cs)) {
            out.tables.push(TableDiff::drop(table.clone()));
        }
    }
    for table in after.tables.iter() {
        match old_tables.get(&key(&table.name, cs)) {
            Some(old) => {
                if let Some(altered) = diff_table(old, table, cs) {
                    out.tables.push(altered);
                }
            }
            None => out.tables.push(TableDiff::create(table.clone())),
        }
    }

    out.views
        .extend(diff_collection(&before.views, &after.views, cs, |a, b| a.definition == b.definition, true));
    out.functions.extend(diff_collection(
        &before.functions,
        &after.functions,
        cs,
        |a, b| a.definition == b.definition,
        true,
    ));
    out.procedures.extend(diff_collection(
        &before.procedures,
        &after.procedures,
        cs,
        |a, b| a.definition == b.definition,
        true,
    ));
    out.events.extend(diff_collection(
        &before.events,
        &after.events,
        cs,
        |a, b| a.definition == b.definition,
        true,
    ));
    out.sequences.extend(diff_collection(
        &before.sequences,
        &after.sequences,
        cs,
        |a, b| a.definition == b.definition,
        false,
    ));
}

/// Compare two versions of a table; `None` when nothing changed.
pub fn diff_table(old: &TableState, new: &TableState, case_sensitive: bool) -> Option<TableDiff> {
    let mut table = TableDiff::alter(old.clone(), new.clone());
    table.columns = diff_collection(&old.columns, &new.columns, case_sensitive, |a, b| a.same_definition(b), true);
    table.indexes = diff_collection(&old.indexes, &new.indexes, case_sensitive, |a, b| a.same_definition(b), false);
    table.foreign_keys = diff_collection(
        &old.foreign_keys,
        &new.foreign_keys,
        case_sensitive,
        |a, b| a.same_definition(b),
        false,
    );
    table.checks = diff_collection(&old.checks, &new.checks, case_sensitive, |a, b| a.same_definition(b), false);
    table.triggers = diff_collection(&old.triggers, &new.triggers, case_sensitive, |a, b| a.same_definition(b), false);

    if old.partition != new.partition {
        if let Some(partition) = &old.partition {
            table.partition.push(EntityDiff::drop(partition.clone()));
        }
        if let Some(partition) = &new.partition {
            table.partition.push(EntityDiff::create(partition.clone()));
        }
    }

    if table.has_nested_changes() || !old.same_options(new) {
        Some(table)
    } else {
        None
    }
}

fn collection_by_name<T: Named>(items: &NamedCollection<T>, case_sensitive: bool) -> HashMap<String, &T> {
    items.iter().map(|i| (key(i.name(), case_sensitive), i)).collect()
}

/// Match two collections by name.
///
/// Drops come first in `before` order, then Creates and Alters in `after`
/// order. With `alterable == false` a changed entity becomes Drop + Create.
fn diff_collection<T: Named + Clone>(
    before: &NamedCollection<T>,
    after: &NamedCollection<T>,
    case_sensitive: bool,
    same: impl Fn(&T, &T) -> bool,
    alterable: bool,
) -> Vec<EntityDiff<T>> {
    let old_items = collection_by_name(before, case_sensitive);
    let new_items = collection_by_name(after, case_sensitive);
    let mut diffs = Vec::new();

    for item in before.iter() {
        let k = key(item.name(), case_sensitive);
        match new_items.get(&k) {
            None => diffs.push(EntityDiff::drop(item.clone())),
            Some(new) if !alterable && !same(item, new) => diffs.push(EntityDiff::drop(item.clone())),
            Some(_) => {}
        }
    }
    for item in after.iter() {
        match old_items.get(&key(item.name(), case_sensitive)) {
            None => diffs.push(EntityDiff::create(item.clone())),
            Some(old) if !same(old, item) => {
                if alterable {
                    diffs.push(EntityDiff::alter((*old).clone(), item.clone()));
                } else {
                    diffs.push(EntityDiff::create(item.clone()));
                }
            }
            Some(_) => {}
        }
    }
    diffs
}
