//! Table-level edits: column, index and constraint changes
//!
//! Every function works on a table the caller owns, usually a clone that
//! only replaces the live table once the whole statement succeeded.

use tracing::debug;

use super::diagnostic::{DiagnosticCode, Rejection};
use crate::error::SchemaDiffError;
use crate::model::{
    apply_primary_key_nullability, apply_table_options, check_state, column_state,
    default_from_clause, foreign_key_state, index_name, index_state, table_from_create,
    ColumnDefault, IndexKey, IndexState, IndexType, TableState, PRIMARY_KEY_NAME,
};
use crate::parser::{
    is_expression_default_only_type, is_time_type, AlterItem, CheckDefinition, ColumnDefinition,
    ColumnPosition, CreateTable, DefaultClause, ForeignKeyDefinition, IndexDefinition, IndexKind,
    TableConstraint,
};

/// Engine-specific column rules
#[derive(Debug, Clone, Copy, Default)]
pub struct ColumnRules {
    pub allow_auto_random: bool,
}

type EditResult<T = ()> = Result<T, Rejection>;

// ============================================================================
// CREATE TABLE
// ============================================================================

/// Build and validate a table from a CREATE TABLE definition.
pub fn create_table(create: &CreateTable, rules: ColumnRules) -> EditResult<TableState> {
    let table_name = &create.name.name;
    let mut auto_columns = 0;
    for column in create.columns() {
        validate_column(table_name, column, rules)?;
        if column.auto_increment || column.auto_random.is_some() {
            auto_columns += 1;
        }
        if auto_columns > 1 {
            return Err(auto_increment_exists(table_name));
        }
    }

    let table = table_from_create(create).map_err(|e| match e {
        SchemaDiffError::DuplicateObject { kind, name, scope } => duplicate_rejection(kind, &name, &scope),
        SchemaDiffError::InvalidPartition { table, message } => Rejection::new(
            DiagnosticCode::Internal,
            format!("Invalid partition layout for table `{}`: {}", table, message),
        ),
        other => Rejection::new(DiagnosticCode::Internal, other.to_string()),
    })?;

    for constraint in create.constraints() {
        match constraint {
            TableConstraint::Index(def) => check_index_keys(&table, def)?,
            TableConstraint::ForeignKey(fk) => check_columns_exist(&table, &fk.columns)?,
            TableConstraint::Check(_) => {}
        }
    }
    for index in table.indexes.iter() {
        check_spatial_keys(&table, index)?;
    }
    // PRIMARY KEY (a) with `a ... DEFAULT NULL`
    if let Some(pk) = table.primary_key() {
        for column in create.columns() {
            let in_key = pk.key_columns().any(|k| k.eq_ignore_ascii_case(&column.name));
            if in_key && column.default == Some(DefaultClause::Null) {
                return Err(invalid_default(&column.name));
            }
        }
    }
    Ok(table)
}

fn duplicate_rejection(kind: &str, name: &str, scope: &str) -> Rejection {
    match kind {
        "column" => column_exists(name, scope),
        "index" if name == PRIMARY_KEY_NAME => {
            Rejection::new(DiagnosticCode::PrimaryKeyExists, format!("Primary key exists in table `{}`", scope))
        }
        "index" => index_exists(name, scope),
        "foreign key" => Rejection::new(
            DiagnosticCode::ForeignKeyExists,
            format!("Foreign key `{}` already exists in table `{}`", name, scope),
        ),
        "check constraint" => Rejection::new(
            DiagnosticCode::CheckConstraintExists,
            format!("Check constraint `{}` already exists in table `{}`", name, scope),
        ),
        _ => Rejection::new(
            DiagnosticCode::Internal,
            format!("Duplicate {} `{}` in `{}`", kind, name, scope),
        ),
    }
}

// ============================================================================
// ALTER TABLE
// ============================================================================

/// Apply one ALTER TABLE item. RENAME TO is handled by the caller.
pub fn apply_alter_item(table: &mut TableState, item: &AlterItem, rules: ColumnRules) -> EditResult {
    match item {
        AlterItem::AddColumns { columns, position } => {
            let mut position = position.clone();
            for column in columns {
                add_column(table, column, &position, rules)?;
                if let ColumnPosition::After(_) | ColumnPosition::First = position {
                    position = ColumnPosition::After(column.name.clone());
                }
            }
            Ok(())
        }
        AlterItem::AddConstraint(constraint) => add_constraint(table, constraint),
        AlterItem::DropColumn { name } => drop_column(table, name),
        AlterItem::DropPrimaryKey => drop_primary_key(table),
        AlterItem::DropIndex { name } => drop_index(table, name),
        AlterItem::DropForeignKey { name } => drop_foreign_key(table, name),
        AlterItem::DropCheck { name } => drop_check(table, name),
        AlterItem::DropConstraint { name } => drop_constraint(table, name),
        AlterItem::ModifyColumn { column, position } => {
            change_column(table, &column.name, column, position, rules)
        }
        AlterItem::ChangeColumn {
            old_name,
            column,
            position,
        } => change_column(table, old_name, column, position, rules),
        AlterItem::RenameColumn { old_name, new_name } => rename_column(table, old_name, new_name),
        AlterItem::AlterColumnDefault { column, default } => {
            alter_column_default(table, column, default.as_ref())
        }
        AlterItem::AlterIndexVisibility { name, visible } => {
            let table_name = table.name.clone();
            let index = table
                .indexes
                .get_mut(name)
                .ok_or_else(|| index_not_exists(name, &table_name))?;
            index.visible = *visible;
            Ok(())
        }
        AlterItem::RenameIndex { old_name, new_name } => rename_index(table, old_name, new_name),
        AlterItem::SetOptions(options) => {
            apply_table_options(table, options);
            Ok(())
        }
        AlterItem::Partition(partition) => {
            partition.validate().map_err(|message| {
                Rejection::new(
                    DiagnosticCode::Internal,
                    format!("Invalid partition layout for table `{}`: {}", table.name, message),
                )
            })?;
            table.partition = Some(partition.clone());
            Ok(())
        }
        AlterItem::RemovePartitioning => {
            table.partition = None;
            Ok(())
        }
        AlterItem::RenameTable { .. } => Ok(()),
        AlterItem::Unsupported(text) => {
            debug!(table = %table.name, item = %text, "ignoring unsupported ALTER TABLE item");
            Ok(())
        }
    }
}

// ============================================================================
// Columns
// ============================================================================

fn validate_column(table_name: &str, column: &ColumnDefinition, rules: ColumnRules) -> EditResult {
    if column.auto_random.is_some() && !rules.allow_auto_random {
        return Err(Rejection::new(
            DiagnosticCode::InvalidColumnDefault,
            format!("AUTO_RANDOM is not supported for column `{}`", column.name),
        ));
    }
    match &column.default {
        Some(DefaultClause::Null) if column.nullable == Some(false) || column.primary_key => {
            return Err(invalid_default(&column.name));
        }
        Some(DefaultClause::Literal(_)) if is_expression_default_only_type(&column.data_type) => {
            return Err(literal_on_blob(&column.name));
        }
        Some(DefaultClause::Expression(expr))
            if is_expression_default_only_type(&column.data_type) && !expr.trim_start().starts_with('(') =>
        {
            return Err(literal_on_blob(&column.name));
        }
        _ => {}
    }
    if column.on_update.is_some() && !is_time_type(&column.data_type) {
        return Err(Rejection::new(
            DiagnosticCode::OnUpdateColumnNotDatetimeOrTimestamp,
            format!(
                "Column `{}` use ON UPDATE but is not DATETIME or TIMESTAMP in table `{}`",
                column.name, table_name
            ),
        ));
    }
    Ok(())
}

/// Reject a second auto column; `except` is the column being replaced.
fn check_single_auto_column(table: &TableState, column: &ColumnDefinition, except: Option<&str>) -> EditResult {
    if !column.auto_increment && column.auto_random.is_none() {
        return Ok(());
    }
    let other = table.columns.iter().any(|c| {
        matches!(c.default, ColumnDefault::AutoIncrement | ColumnDefault::AutoRandom(_))
            && except.map_or(true, |name| !c.name.eq_ignore_ascii_case(name))
    });
    if other {
        return Err(auto_increment_exists(&table.name));
    }
    Ok(())
}

fn add_column(
    table: &mut TableState,
    column: &ColumnDefinition,
    position: &ColumnPosition,
    rules: ColumnRules,
) -> EditResult {
    if table.columns.contains(&column.name) {
        return Err(column_exists(&column.name, &table.name));
    }
    validate_column(&table.name, column, rules)?;
    check_single_auto_column(table, column, None)?;

    let index = match position {
        ColumnPosition::Default => table.columns.len(),
        ColumnPosition::First => 0,
        ColumnPosition::After(after) => {
            table
                .columns
                .position(after)
                .ok_or_else(|| column_not_exists(after, &table.name))?
                + 1
        }
    };
    let state = column_state(column);
    let name = state.name.clone();
    table
        .columns
        .insert_at(index, state)
        .map_err(|c| column_exists(&c.name, &table.name))?;
    add_inline_constraints(table, column)?;
    debug!(table = %table.name, column = %name, position = index + 1, "added column");
    Ok(())
}

/// PRIMARY KEY, UNIQUE, REFERENCES and CHECK written on a column.
fn add_inline_constraints(table: &mut TableState, column: &ColumnDefinition) -> EditResult {
    let keys = vec![IndexKey::column(column.name.clone())];
    if column.primary_key {
        add_index_state(
            table,
            IndexState {
                name: PRIMARY_KEY_NAME.to_string(),
                keys: keys.clone(),
                primary: true,
                unique: true,
                ..Default::default()
            },
        )?;
    }
    if column.unique {
        let name = table.unique_index_name(&column.name);
        add_index_state(
            table,
            IndexState {
                name,
                keys,
                unique: true,
                ..Default::default()
            },
        )?;
    }
    if let Some(reference) = &column.references {
        add_foreign_key(
            table,
            &ForeignKeyDefinition {
                name: None,
                index_name: None,
                columns: vec![column.name.clone()],
                reference: reference.clone(),
            },
        )?;
    }
    if let Some(check) = &column.check {
        add_check(table, check)?;
    }
    Ok(())
}

fn drop_column(table: &mut TableState, name: &str) -> EditResult {
    if !table.columns.contains(name) {
        return Err(column_not_exists(name, &table.name));
    }
    if table.columns.len() == 1 {
        return Err(Rejection::new(
            DiagnosticCode::DropAllColumns,
            format!("Can't delete all columns with ALTER TABLE; use DROP TABLE `{}` instead", table.name),
        ));
    }
    table.columns.remove(name);

    // Key parts on the column go away; indexes left without keys are dropped.
    let mut emptied = Vec::new();
    for index in table.indexes.iter_mut() {
        index.keys.retain(|k| !k.column.eq_ignore_ascii_case(name));
        if index.keys.is_empty() {
            emptied.push(index.name.clone());
        }
    }
    for index in emptied {
        table.indexes.remove(&index);
    }
    Ok(())
}

/// MODIFY (old name == new name) and CHANGE COLUMN.
fn change_column(
    table: &mut TableState,
    old_name: &str,
    column: &ColumnDefinition,
    position: &ColumnPosition,
    rules: ColumnRules,
) -> EditResult {
    if !table.columns.contains(old_name) {
        return Err(column_not_exists(old_name, &table.name));
    }
    let renamed = !old_name.eq_ignore_ascii_case(&column.name);
    if renamed && table.columns.contains(&column.name) {
        return Err(column_exists(&column.name, &table.name));
    }
    validate_column(&table.name, column, rules)?;
    check_single_auto_column(table, column, Some(old_name))?;

    let mut state = column_state(column);
    if table.primary_key().is_some_and(|pk| pk.key_columns().any(|k| k.eq_ignore_ascii_case(old_name))) {
        state.nullable = false;
        if state.default == ColumnDefault::Null {
            state.default = ColumnDefault::None;
        }
    }
    table
        .columns
        .replace(old_name, state)
        .map_err(|c| column_exists(&c.name, &table.name))?;
    if renamed {
        rename_column_references(table, old_name, &column.name);
    }
    move_column(table, &column.name, position)?;
    add_inline_constraints(table, column)
}

fn move_column(table: &mut TableState, name: &str, position: &ColumnPosition) -> EditResult {
    match position {
        ColumnPosition::Default => {}
        ColumnPosition::First => {
            table.columns.move_to(name, 0);
        }
        ColumnPosition::After(after) => {
            let target = table
                .columns
                .position(after)
                .filter(|_| !after.eq_ignore_ascii_case(name))
                .ok_or_else(|| column_not_exists(after, &table.name))?;
            let from = table.columns.position(name).unwrap_or(target);
            let to = if from < target { target } else { target + 1 };
            table.columns.move_to(name, to);
        }
    }
    Ok(())
}

fn rename_column(table: &mut TableState, old_name: &str, new_name: &str) -> EditResult {
    if !table.columns.contains(old_name) {
        return Err(column_not_exists(old_name, &table.name));
    }
    if !old_name.eq_ignore_ascii_case(new_name) && table.columns.contains(new_name) {
        return Err(column_exists(new_name, &table.name));
    }
    if !table.columns.rename(old_name, new_name) {
        return Err(Rejection::new(
            DiagnosticCode::Internal,
            format!("failed to rename column `{}` to `{}`", old_name, new_name),
        ));
    }
    rename_column_references(table, old_name, new_name);
    Ok(())
}

fn rename_column_references(table: &mut TableState, old_name: &str, new_name: &str) {
    for index in table.indexes.iter_mut() {
        for key in index.keys.iter_mut() {
            if !key.is_expression() && key.column.eq_ignore_ascii_case(old_name) {
                key.column = new_name.to_string();
            }
        }
    }
    for fk in table.foreign_keys.iter_mut() {
        for column in fk.columns.iter_mut() {
            if column.eq_ignore_ascii_case(old_name) {
                *column = new_name.to_string();
            }
        }
    }
}

fn alter_column_default(table: &mut TableState, name: &str, default: Option<&DefaultClause>) -> EditResult {
    let table_name = table.name.clone();
    let column = table
        .columns
        .get_mut(name)
        .ok_or_else(|| column_not_exists(name, &table_name))?;
    match default {
        None if column.nullable => column.default = ColumnDefault::Null,
        None => column.default = ColumnDefault::None,
        Some(DefaultClause::Null) if !column.nullable => return Err(invalid_default(name)),
        Some(DefaultClause::Literal(_)) if is_expression_default_only_type(&column.data_type) => {
            return Err(literal_on_blob(name));
        }
        Some(clause) => column.default = default_from_clause(clause),
    }
    Ok(())
}

// ============================================================================
// Indexes and constraints
// ============================================================================

fn add_constraint(table: &mut TableState, constraint: &TableConstraint) -> EditResult {
    match constraint {
        TableConstraint::Index(def) => add_index(table, def),
        TableConstraint::ForeignKey(fk) => add_foreign_key(table, fk),
        TableConstraint::Check(check) => add_check(table, check),
    }
}

/// Add an index from its definition (ALTER TABLE ADD or CREATE INDEX).
pub fn add_index(table: &mut TableState, def: &IndexDefinition) -> EditResult {
    check_index_keys(table, def)?;
    let name = index_name(table, def);
    let state = index_state(def, name);
    check_spatial_keys(table, &state)?;
    let primary = state.primary;
    add_index_state(table, state)?;
    if primary {
        apply_primary_key_nullability(table);
    }
    Ok(())
}

fn add_index_state(table: &mut TableState, index: IndexState) -> EditResult {
    if index.primary && table.primary_key().is_some() {
        return Err(Rejection::new(
            DiagnosticCode::PrimaryKeyExists,
            format!("Primary key exists in table `{}`", table.name),
        ));
    }
    if table.indexes.contains(&index.name) {
        return Err(index_exists(&index.name, &table.name));
    }
    let table_name = table.name.clone();
    table
        .indexes
        .push(index)
        .map_err(|i| index_exists(&i.name, &table_name))
}

fn check_index_keys(table: &TableState, def: &IndexDefinition) -> EditResult {
    if def.keys.is_empty() {
        return Err(Rejection::new(
            DiagnosticCode::IndexEmptyKeys,
            format!("Index `{}` in table `{}` has empty key", def.name.as_deref().unwrap_or(""), table.name),
        ));
    }
    let columns: Vec<String> = def
        .keys
        .iter()
        .filter(|k| !k.is_expression())
        .map(|k| k.column.clone())
        .collect();
    check_columns_exist(table, &columns)?;
    if def.kind == IndexKind::Spatial {
        for column in &columns {
            if table.columns.get(column).is_some_and(|c| c.nullable) {
                return Err(spatial_nullable(column));
            }
        }
    }
    Ok(())
}

fn check_spatial_keys(table: &TableState, index: &IndexState) -> EditResult {
    if index.index_type != IndexType::Spatial {
        return Ok(());
    }
    for key in &index.keys {
        if table.columns.get(&key.column).is_some_and(|c| c.nullable) {
            return Err(spatial_nullable(&key.column));
        }
    }
    Ok(())
}

fn check_columns_exist(table: &TableState, columns: &[String]) -> EditResult {
    for column in columns {
        if !table.columns.contains(column) {
            return Err(column_not_exists(column, &table.name));
        }
    }
    Ok(())
}

fn add_foreign_key(table: &mut TableState, def: &ForeignKeyDefinition) -> EditResult {
    check_columns_exist(table, &def.columns)?;
    let name = def.name.clone().unwrap_or_else(|| table.next_foreign_key_name());
    if table.foreign_keys.contains(&name) {
        return Err(duplicate_rejection("foreign key", &name, &table.name));
    }
    let state = foreign_key_state(name.clone(), def.columns.clone(), &def.reference);
    let table_name = table.name.clone();
    table
        .foreign_keys
        .push(state)
        .map_err(|fk| duplicate_rejection("foreign key", &fk.name, &table_name))?;
    let index_base = def.index_name.as_deref().unwrap_or(&name);
    if let Some(index) = table.ensure_foreign_key_index(index_base, &def.columns) {
        debug!(table = %table.name, foreign_key = %name, index = %index, "synthesized foreign key index");
    }
    Ok(())
}

fn add_check(table: &mut TableState, def: &CheckDefinition) -> EditResult {
    let name = def.name.clone().unwrap_or_else(|| table.next_check_name());
    let table_name = table.name.clone();
    table
        .checks
        .push(check_state(name, def))
        .map_err(|c| duplicate_rejection("check constraint", &c.name, &table_name))
}

fn drop_primary_key(table: &mut TableState) -> EditResult {
    let Some(name) = table.primary_key().map(|pk| pk.name.clone()) else {
        return Err(Rejection::new(
            DiagnosticCode::PrimaryKeyNotExists,
            format!("Primary key does not exist in table `{}`", table.name),
        ));
    };
    table.indexes.remove(&name);
    Ok(())
}

/// Drop an index by name; `PRIMARY` drops the primary key.
pub fn drop_index(table: &mut TableState, name: &str) -> EditResult {
    if name.eq_ignore_ascii_case(PRIMARY_KEY_NAME) {
        return drop_primary_key(table);
    }
    if table.indexes.remove(name).is_none() {
        return Err(index_not_exists(name, &table.name));
    }
    Ok(())
}

/// Foreign keys on the table that some index currently covers.
pub fn covered_foreign_keys(table: &TableState) -> Vec<String> {
    table
        .foreign_keys
        .iter()
        .filter(|fk| table.has_covering_index(&fk.columns))
        .map(|fk| fk.name.clone())
        .collect()
}

/// Reject an edit that left a foreign key from `covered` without an index.
pub fn check_foreign_key_indexes(table: &TableState, covered: &[String]) -> EditResult {
    for name in covered {
        let Some(fk) = table.foreign_keys.get(name) else {
            continue;
        };
        if !table.has_covering_index(&fk.columns) {
            return Err(Rejection::new(
                DiagnosticCode::Internal,
                format!(
                    "Cannot drop index needed in foreign key constraint `{}` of table `{}`",
                    fk.name, table.name
                ),
            ));
        }
    }
    Ok(())
}

fn drop_foreign_key(table: &mut TableState, name: &str) -> EditResult {
    if table.foreign_keys.remove(name).is_none() {
        return Err(Rejection::new(
            DiagnosticCode::ForeignKeyNotExists,
            format!("Foreign key `{}` does not exist in table `{}`", name, table.name),
        ));
    }
    Ok(())
}

fn drop_check(table: &mut TableState, name: &str) -> EditResult {
    if table.checks.remove(name).is_none() {
        return Err(Rejection::new(
            DiagnosticCode::CheckConstraintNotExists,
            format!("Check constraint `{}` does not exist in table `{}`", name, table.name),
        ));
    }
    Ok(())
}

/// `DROP CONSTRAINT` looks at foreign keys, then checks, then unique indexes.
fn drop_constraint(table: &mut TableState, name: &str) -> EditResult {
    if table.foreign_keys.contains(name) {
        return drop_foreign_key(table, name);
    }
    if table.checks.contains(name) {
        return drop_check(table, name);
    }
    if table.indexes.get(name).is_some_and(|i| i.unique) {
        return drop_index(table, name);
    }
    Err(Rejection::new(
        DiagnosticCode::CheckConstraintNotExists,
        format!("Constraint `{}` does not exist in table `{}`", name, table.name),
    ))
}

fn rename_index(table: &mut TableState, old_name: &str, new_name: &str) -> EditResult {
    if !table.indexes.contains(old_name) {
        return Err(index_not_exists(old_name, &table.name));
    }
    if !old_name.eq_ignore_ascii_case(new_name) && table.indexes.contains(new_name) {
        return Err(index_exists(new_name, &table.name));
    }
    if !table.indexes.rename(old_name, new_name) {
        return Err(index_exists(new_name, &table.name));
    }
    Ok(())
}

// ============================================================================
// Rejections
// ============================================================================

fn column_exists(column: &str, table: &str) -> Rejection {
    Rejection::new(
        DiagnosticCode::ColumnExists,
        format!("Column `{}` already exists in table `{}`", column, table),
    )
}

fn column_not_exists(column: &str, table: &str) -> Rejection {
    Rejection::new(
        DiagnosticCode::ColumnNotExists,
        format!("Column `{}` does not exist in table `{}`", column, table),
    )
}

fn index_exists(index: &str, table: &str) -> Rejection {
    Rejection::new(
        DiagnosticCode::IndexExists,
        format!("Index `{}` already exists in table `{}`", index, table),
    )
}

fn index_not_exists(index: &str, table: &str) -> Rejection {
    Rejection::new(
        DiagnosticCode::IndexNotExists,
        format!("Index `{}` does not exist in table `{}`", index, table),
    )
}

fn invalid_default(column: &str) -> Rejection {
    Rejection::new(
        DiagnosticCode::SetNullDefaultForNotNullColumn,
        format!("Invalid default value for column `{}`", column),
    )
}

fn literal_on_blob(column: &str) -> Rejection {
    Rejection::new(
        DiagnosticCode::InvalidColumnDefault,
        format!("BLOB, TEXT, GEOMETRY or JSON column `{}` can't have a default value", column),
    )
}

fn auto_increment_exists(table: &str) -> Rejection {
    Rejection::new(
        DiagnosticCode::AutoIncrementExists,
        format!("There can be only one auto column for table `{}`", table),
    )
}

fn spatial_nullable(column: &str) -> Rejection {
    Rejection::new(
        DiagnosticCode::SpatialIndexKeyNullable,
        format!("All parts of a SPATIAL index must be NOT NULL, but `{}` is nullable", column),
    )
}
