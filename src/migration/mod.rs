//! Migration script generation
//!
//! A migration runs in two phases. The drop phase removes dependents before
//! the objects they depend on: triggers, foreign keys, placeholder views,
//! then events, views, procedures, functions, sequences and tables, and
//! finally the checks, indexes and columns of altered tables. The create
//! phase builds tables before the foreign keys that reference them and
//! views after the tables they select from.

mod writers;

use tracing::debug;

use crate::diff::{Action, EntityDiff, MetadataDiff, TableDiff};
use crate::error::SchemaDiffError;
use crate::model::{Named, RoutineState, TableState};
use crate::serializer::{PartitionRenderer, ShowCreatePartitionRenderer};

use writers::*;

/// Generate the DDL that turns the diff's `before` side into its `after` side.
pub fn generate_migration(diff: &MetadataDiff) -> Result<String, SchemaDiffError> {
    generate_migration_with(diff, &ShowCreatePartitionRenderer)
}

/// [`generate_migration`] with a caller-supplied partition renderer.
pub fn generate_migration_with(
    diff: &MetadataDiff,
    renderer: &dyn PartitionRenderer,
) -> Result<String, SchemaDiffError> {
    let mut drops = String::new();
    write_drop_phase(diff, &mut drops)?;

    let mut creates = String::new();
    write_create_phase(diff, renderer, &mut creates)?;

    let mut out = drops;
    if !out.is_empty() && !creates.is_empty() {
        out.push('\n');
    }
    out.push_str(&creates);

    debug!(bytes = out.len(), changes = diff.change_count(), "generated migration");
    Ok(out)
}

fn malformed(kind: &str, message: impl Into<String>) -> SchemaDiffError {
    SchemaDiffError::MalformedDiff {
        kind: kind.to_string(),
        message: message.into(),
    }
}

fn old_table(table: &TableDiff) -> Result<&TableState, SchemaDiffError> {
    table
        .old
        .as_ref()
        .ok_or_else(|| malformed("table", format!("{:?} of `{}` has no old state", table.action, table.name())))
}

fn new_table(table: &TableDiff) -> Result<&TableState, SchemaDiffError> {
    table
        .new
        .as_ref()
        .ok_or_else(|| malformed("table", format!("{:?} of `{}` has no new state", table.action, table.name())))
}

fn old_of<'a, T: Named>(kind: &str, entity: &'a EntityDiff<T>) -> Result<&'a T, SchemaDiffError> {
    entity
        .old
        .as_ref()
        .ok_or_else(|| malformed(kind, format!("{:?} without an old state", entity.action)))
}

fn new_of<'a, T: Named>(kind: &str, entity: &'a EntityDiff<T>) -> Result<&'a T, SchemaDiffError> {
    entity
        .new
        .as_ref()
        .ok_or_else(|| malformed(kind, format!("{:?} of `{}` without a new state", entity.action, entity.name())))
}

fn dropped<T>(diffs: &[EntityDiff<T>]) -> impl Iterator<Item = &EntityDiff<T>> {
    diffs.iter().filter(|d| d.action == Action::Drop)
}

fn created<T>(diffs: &[EntityDiff<T>]) -> impl Iterator<Item = &EntityDiff<T>> {
    diffs.iter().filter(|d| d.action == Action::Create)
}

fn altered_tables(diff: &MetadataDiff) -> impl Iterator<Item = &TableDiff> {
    diff.tables.iter().filter(|t| t.action == Action::Alter)
}

// ============================================================================
// Drop phase
// ============================================================================

fn write_drop_phase(diff: &MetadataDiff, out: &mut String) -> Result<(), SchemaDiffError> {
    for table in &diff.tables {
        match table.action {
            Action::Drop => {
                for trigger in old_table(table)?.triggers.iter() {
                    write_drop_object(out, "TRIGGER", &trigger.name);
                }
            }
            Action::Alter => {
                for trigger in dropped(&table.triggers) {
                    write_drop_object(out, "TRIGGER", &old_of("trigger", trigger)?.name);
                }
            }
            Action::Create => {}
        }
    }

    for table in altered_tables(diff) {
        for fk in dropped(&table.foreign_keys) {
            write_drop_foreign_key(out, table.name(), &old_of("foreign key", fk)?.name);
        }
    }

    for view in dropped(&diff.views) {
        write_placeholder_view(out, old_of("view", view)?);
    }

    drop_routines(out, "EVENT", &diff.events)?;
    drop_routines(out, "VIEW", &diff.views)?;
    drop_routines(out, "PROCEDURE", &diff.procedures)?;
    drop_routines(out, "FUNCTION", &diff.functions)?;
    drop_routines(out, "SEQUENCE", &diff.sequences)?;

    for table in diff.tables.iter().filter(|t| t.action == Action::Drop) {
        write_drop_object(out, "TABLE", &old_table(table)?.name);
    }

    for table in altered_tables(diff) {
        if table.partition.iter().any(|p| p.action == Action::Drop) {
            write_remove_partitioning(out, table.name());
        }
        for check in dropped(&table.checks) {
            write_drop_check(out, table.name(), &old_of("check", check)?.name);
        }
        for index in dropped(&table.indexes) {
            write_drop_index(out, table.name(), &old_of("index", index)?.name);
        }
        for column in dropped(&table.columns) {
            write_drop_column(out, table.name(), &old_of("column", column)?.name);
        }
    }
    Ok(())
}

fn drop_routines<T: Named>(out: &mut String, kind: &str, diffs: &[EntityDiff<T>]) -> Result<(), SchemaDiffError> {
    for entity in dropped(diffs) {
        write_drop_object(out, kind, old_of(kind, entity)?.name());
    }
    Ok(())
}

// ============================================================================
// Create phase
// ============================================================================

fn write_create_phase(
    diff: &MetadataDiff,
    renderer: &dyn PartitionRenderer,
    out: &mut String,
) -> Result<(), SchemaDiffError> {
    let created_tables: Vec<&TableState> = diff
        .tables
        .iter()
        .filter(|t| t.action == Action::Create)
        .map(new_table)
        .collect::<Result<_, _>>()?;

    for table in &created_tables {
        write_create_table(out, table, renderer);
    }
    for table in &created_tables {
        for fk in table.foreign_keys.sorted_by_name() {
            write_add_foreign_key(out, &table.name, fk);
        }
    }
    for table in &created_tables {
        for trigger in table.triggers.iter() {
            write_create_trigger(out, &table.name, trigger);
        }
    }

    for table in altered_tables(diff) {
        write_alter_table(out, table, renderer)?;
    }

    for view in &diff.views {
        match view.action {
            Action::Create => write_view(out, new_of("view", view)?, false),
            Action::Alter => write_view(out, new_of("view", view)?, true),
            Action::Drop => {}
        }
    }

    create_routines(out, "sequence", &diff.sequences)?;
    create_routines(out, "function", &diff.functions)?;
    create_routines(out, "procedure", &diff.procedures)?;
    create_routines(out, "event", &diff.events)?;
    Ok(())
}

fn write_alter_table(
    out: &mut String,
    table: &TableDiff,
    renderer: &dyn PartitionRenderer,
) -> Result<(), SchemaDiffError> {
    let old = old_table(table)?;
    let new = new_table(table)?;
    let name = new.name.as_str();

    if old.comment != new.comment {
        write_table_comment(out, name, new.comment.as_deref());
    }
    write_table_options(out, old, new);

    for column in created(&table.columns) {
        write_add_column(out, new, new_of("column", column)?);
    }
    for column in table.columns.iter().filter(|c| c.action == Action::Alter) {
        write_modify_column(out, name, new_of("column", column)?);
    }

    let mut indexes = created(&table.indexes)
        .map(|i| new_of("index", i))
        .collect::<Result<Vec<_>, _>>()?;
    indexes.sort_by_key(|i| (!i.primary, !i.unique));
    for index in indexes {
        write_add_index(out, name, index);
    }

    for check in created(&table.checks) {
        write_add_check(out, name, new_of("check", check)?);
    }
    for fk in created(&table.foreign_keys) {
        write_add_foreign_key(out, name, new_of("foreign key", fk)?);
    }
    for trigger in created(&table.triggers) {
        write_create_trigger(out, name, new_of("trigger", trigger)?);
    }
    for partition in table.partition.iter().filter(|p| p.action == Action::Create) {
        if let Some(state) = &partition.new {
            write_add_partitioning(out, name, state, renderer);
        }
    }
    Ok(())
}

fn create_routines(out: &mut String, kind: &str, diffs: &[EntityDiff<RoutineState>]) -> Result<(), SchemaDiffError> {
    for routine in diffs.iter().filter(|d| d.action != Action::Drop) {
        write_definition(out, &new_of(kind, routine)?.definition);
    }
    Ok(())
}
