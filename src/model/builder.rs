//! Build a catalog snapshot from parsed DDL statements
//!
//! This is the extractor: it reads CREATE statements only and is best-effort.
//! ALTER, DROP and anything unrecognized is skipped; applying those is the
//! walk-through's job.

use tracing::{debug, info, warn};

use crate::error::SchemaDiffError;
use crate::parser::{
    split_top_level, CheckDefinition, ColumnDefinition, CreateTable, CreateTrigger, CreateView,
    DdlStatement, DefaultClause, IndexDefinition, IndexKind, ParsedStatement,
    ReferenceDefinition, RoutineKind, TableConstraint, TableOption,
};
use crate::parser::identifier_utils::normalize_identifier;
use crate::parser::normalize_on_update;

use super::{
    CheckConstraintState, ColumnDefault, ColumnState, DatabaseSnapshot, ForeignKeyState,
    IndexState, RoutineState, SchemaSnapshot, TableState, TriggerState, ViewState,
    DEFAULT_REFERENCE_ACTION, PRIMARY_KEY_NAME,
};

/// Extractor configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractOptions {
    /// Compare table and view names case-sensitively
    pub case_sensitive_tables: bool,
}

/// Build a snapshot from parsed statements.
pub fn build_snapshot(
    statements: &[ParsedStatement],
    options: &ExtractOptions,
) -> Result<DatabaseSnapshot, SchemaDiffError> {
    let mut snapshot = DatabaseSnapshot::new("", options.case_sensitive_tables);
    let mut database: Option<String> = None;

    for parsed in statements {
        match &parsed.statement {
            DdlStatement::CreateTable(create) => {
                note_database(&mut database, create.name.database.as_deref())?;
                let table = table_from_create(create)?;
                let schema = snapshot.default_schema_mut();
                if schema.has_relation(&table.name) {
                    return Err(duplicate("table", &table.name, "database"));
                }
                let name = table.name.clone();
                schema.tables.push(table).map_err(|_| duplicate("table", &name, "database"))?;
            }
            DdlStatement::CreateTableLike { name, like, .. } => {
                note_database(&mut database, name.database.as_deref())?;
                let schema = snapshot.default_schema_mut();
                if schema.has_relation(&name.name) {
                    return Err(duplicate("table", &name.name, "database"));
                }
                match schema.tables.get(&like.name).map(|source| copy_table_like(source, &name.name)) {
                    Some(table) => {
                        let _ = schema.tables.push(table);
                    }
                    None => warn!(table = %name, like = %like, "skipping CREATE TABLE LIKE of unknown table"),
                }
            }
            DdlStatement::CreateDatabase {
                name,
                charset,
                collation,
                ..
            } => {
                note_database(&mut database, Some(name.as_str()))?;
                snapshot.charset = charset.clone();
                snapshot.collation = collation.clone();
            }
            DdlStatement::Use { database: name } => {
                note_database(&mut database, Some(name.as_str()))?;
            }
            DdlStatement::CreateView(view) => {
                note_database(&mut database, view.name.database.as_deref())?;
                let schema = snapshot.default_schema_mut();
                if schema.has_relation(&view.name.name) {
                    return Err(duplicate("view", &view.name.name, "database"));
                }
                let state = view_from_create(view, schema);
                let _ = schema.views.push(state);
            }
            DdlStatement::CreateTrigger(trigger) => {
                note_database(&mut database, trigger.name.database.as_deref())?;
                let schema = snapshot.default_schema_mut();
                match schema.tables.get_mut(&trigger.table.name) {
                    Some(table) => {
                        let state = trigger_from_create(trigger);
                        table
                            .triggers
                            .push(state)
                            .map_err(|t| duplicate("trigger", &t.name, &trigger.table.name))?;
                    }
                    None => {
                        warn!(trigger = %trigger.name, table = %trigger.table, "skipping trigger on unknown table")
                    }
                }
            }
            DdlStatement::CreateRoutine(routine) => {
                note_database(&mut database, routine.name.database.as_deref())?;
                let schema = snapshot.default_schema_mut();
                let (collection, kind) = match routine.kind {
                    RoutineKind::Function => (&mut schema.functions, "function"),
                    RoutineKind::Procedure => (&mut schema.procedures, "procedure"),
                    RoutineKind::Event => (&mut schema.events, "event"),
                    RoutineKind::Sequence => (&mut schema.sequences, "sequence"),
                    RoutineKind::Trigger => continue,
                };
                let state = RoutineState {
                    id: 0,
                    name: routine.name.name.clone(),
                    definition: routine.definition.clone(),
                };
                collection
                    .push(state)
                    .map_err(|r| duplicate(kind, &r.name, "database"))?;
            }
            other => debug!(kind = other.kind_name(), line = parsed.line, "extractor skips statement"),
        }
    }

    snapshot.name = database.unwrap_or_default();
    info!(
        database = %snapshot.name,
        tables = snapshot.table_count(),
        "extracted metadata"
    );
    Ok(snapshot)
}

/// Record a database name; two different names are an error.
fn note_database(current: &mut Option<String>, name: Option<&str>) -> Result<(), SchemaDiffError> {
    let Some(db) = name else {
        return Ok(());
    };
    match current {
        Some(first) if !first.eq_ignore_ascii_case(db) => Err(SchemaDiffError::ConflictingDatabaseNames {
            first: first.clone(),
            second: db.to_string(),
        }),
        Some(_) => Ok(()),
        None => {
            *current = Some(db.to_string());
            Ok(())
        }
    }
}

fn duplicate(kind: &'static str, name: &str, scope: &str) -> SchemaDiffError {
    SchemaDiffError::DuplicateObject {
        kind,
        name: name.to_string(),
        scope: scope.to_string(),
    }
}

// ============================================================================
// Tables
// ============================================================================

/// Build a table from a CREATE TABLE definition.
pub fn table_from_create(create: &CreateTable) -> Result<TableState, SchemaDiffError> {
    let table_name = create.name.name.clone();
    let mut table = TableState::new(table_name.clone());
    let mut inline_primary = Vec::new();
    let mut inline_unique = Vec::new();
    let mut pending_fks = Vec::new();
    let mut pending_checks = Vec::new();

    for column in create.columns() {
        let state = column_state(column);
        table
            .columns
            .push(state)
            .map_err(|c| duplicate("column", &c.name, &table_name))?;
        if column.primary_key {
            inline_primary.push(column.name.clone());
        }
        if column.unique {
            inline_unique.push(column.name.clone());
        }
        if let Some(reference) = &column.references {
            pending_fks.push((None, None, vec![column.name.clone()], reference.clone()));
        }
        if let Some(check) = &column.check {
            pending_checks.push(check.clone());
        }
    }

    if !inline_primary.is_empty() {
        let index = IndexState {
            name: PRIMARY_KEY_NAME.to_string(),
            keys: inline_primary.iter().map(super::IndexKey::column).collect(),
            primary: true,
            unique: true,
            ..Default::default()
        };
        add_index(&mut table, index)?;
    }
    for column in inline_unique {
        let index = IndexState {
            name: table.unique_index_name(&column),
            keys: vec![super::IndexKey::column(column)],
            unique: true,
            ..Default::default()
        };
        add_index(&mut table, index)?;
    }

    for constraint in create.constraints() {
        match constraint {
            TableConstraint::Index(def) => {
                let name = index_name(&table, def);
                add_index(&mut table, index_state(def, name))?;
            }
            TableConstraint::ForeignKey(fk) => {
                pending_fks.push((
                    fk.name.clone(),
                    fk.index_name.clone(),
                    fk.columns.clone(),
                    fk.reference.clone(),
                ));
            }
            TableConstraint::Check(check) => pending_checks.push(check.clone()),
        }
    }

    for (name, index_name, columns, reference) in pending_fks {
        let name = name.unwrap_or_else(|| table.next_foreign_key_name());
        let fk = foreign_key_state(name.clone(), columns.clone(), &reference);
        table
            .foreign_keys
            .push(fk)
            .map_err(|f| duplicate("foreign key", &f.name, &table_name))?;
        table.ensure_foreign_key_index(index_name.as_deref().unwrap_or(&name), &columns);
    }

    for check in pending_checks {
        let name = check.name.clone().unwrap_or_else(|| table.next_check_name());
        table
            .checks
            .push(check_state(name, &check))
            .map_err(|c| duplicate("check constraint", &c.name, &table_name))?;
    }

    apply_primary_key_nullability(&mut table);
    apply_table_options(&mut table, &create.options);

    if let Some(partition) = &create.partition {
        partition
            .validate()
            .map_err(|message| SchemaDiffError::InvalidPartition {
                table: table_name.clone(),
                message,
            })?;
        table.partition = Some(partition.clone());
    }

    Ok(table)
}

fn add_index(table: &mut TableState, index: IndexState) -> Result<(), SchemaDiffError> {
    let table_name = table.name.clone();
    if index.primary && table.primary_key().is_some() {
        return Err(duplicate("index", PRIMARY_KEY_NAME, &table_name));
    }
    table
        .indexes
        .push(index)
        .map_err(|i| duplicate("index", &i.name, &table_name))
}

/// Name for an index definition: explicit, `PRIMARY`, or derived from the
/// first key part.
pub fn index_name(table: &TableState, def: &IndexDefinition) -> String {
    if def.kind == IndexKind::Primary {
        return PRIMARY_KEY_NAME.to_string();
    }
    if let Some(name) = &def.name {
        return name.clone();
    }
    let base = match def.keys.first() {
        Some(key) if !key.is_expression() => key.column.clone(),
        _ => "functional_index".to_string(),
    };
    table.unique_index_name(&base)
}

/// Columns of a primary key are implicitly NOT NULL.
pub fn apply_primary_key_nullability(table: &mut TableState) {
    let Some(primary) = table.primary_key() else {
        return;
    };
    let keys: Vec<String> = primary.key_columns().map(str::to_string).collect();
    for key in keys {
        if let Some(column) = table.columns.get_mut(&key) {
            column.nullable = false;
            if column.default == ColumnDefault::Null {
                column.default = ColumnDefault::None;
            }
        }
    }
}

/// Apply ENGINE, CHARSET, COLLATE and COMMENT; other options are ignored.
pub fn apply_table_options(table: &mut TableState, options: &[TableOption]) {
    for option in options {
        match option.name.as_str() {
            "ENGINE" => table.engine = Some(option.value.clone()),
            "CHARSET" => table.charset = Some(option.value.clone()),
            "COLLATE" => table.collation = Some(option.value.clone()),
            "COMMENT" => {
                table.comment = if option.value.is_empty() {
                    None
                } else {
                    Some(option.value.clone())
                }
            }
            _ => {}
        }
    }
}

fn copy_table_like(source: &TableState, name: &str) -> TableState {
    let mut table = source.clone();
    table.name = name.to_string();
    table.foreign_keys = Default::default();
    table.triggers = Default::default();
    table
}

// ============================================================================
// Element conversion
// ============================================================================

/// Convert a parsed column definition into column state.
pub fn column_state(def: &ColumnDefinition) -> ColumnState {
    let nullable = def.nullable.unwrap_or(true) && !def.primary_key;
    let default = if def.auto_increment {
        ColumnDefault::AutoIncrement
    } else if let Some(params) = &def.auto_random {
        ColumnDefault::AutoRandom(params.clone())
    } else {
        match &def.default {
            Some(clause) => default_from_clause(clause),
            None if nullable => ColumnDefault::Null,
            None => ColumnDefault::None,
        }
    };

    ColumnState {
        id: 0,
        name: def.name.clone(),
        data_type: def.data_type.clone(),
        nullable,
        default,
        on_update: def.on_update.as_deref().map(normalize_on_update),
        comment: def.comment.clone().filter(|c| !c.is_empty()),
        charset: def.charset.clone(),
        collation: def.collation.clone(),
    }
}

pub fn default_from_clause(clause: &DefaultClause) -> ColumnDefault {
    match clause {
        DefaultClause::Null => ColumnDefault::Null,
        DefaultClause::Literal(value) => ColumnDefault::Literal(value.clone()),
        DefaultClause::Expression(expr) => ColumnDefault::Expression(normalize_on_update(expr)),
    }
}

pub fn index_state(def: &IndexDefinition, name: String) -> IndexState {
    let primary = def.kind == IndexKind::Primary;
    IndexState {
        id: 0,
        name,
        keys: def.keys.clone(),
        primary,
        unique: primary || def.kind == IndexKind::Unique,
        visible: def.visible,
        index_type: def.index_type(),
        comment: def.comment.clone().filter(|c| !c.is_empty()),
    }
}

pub fn foreign_key_state(name: String, columns: Vec<String>, reference: &ReferenceDefinition) -> ForeignKeyState {
    ForeignKeyState {
        id: 0,
        name,
        columns,
        referenced_database: reference.table.database.clone(),
        referenced_table: reference.table.name.clone(),
        referenced_columns: reference.columns.clone(),
        on_delete: reference_action(reference.on_delete.as_deref()),
        on_update: reference_action(reference.on_update.as_deref()),
    }
}

fn reference_action(action: Option<&str>) -> String {
    action
        .map(str::to_uppercase)
        .unwrap_or_else(|| DEFAULT_REFERENCE_ACTION.to_string())
}

pub fn check_state(name: String, def: &CheckDefinition) -> CheckConstraintState {
    CheckConstraintState {
        id: 0,
        name,
        expression: def.expression.clone(),
        enforced: def.enforced,
    }
}

pub fn trigger_from_create(trigger: &CreateTrigger) -> TriggerState {
    TriggerState {
        id: 0,
        name: trigger.name.name.clone(),
        timing: trigger.timing.clone(),
        event: trigger.event.clone(),
        body: trigger.body.clone(),
        definition: trigger.definition.clone(),
    }
}

// ============================================================================
// Views
// ============================================================================

pub fn view_from_create(view: &CreateView, schema: &SchemaSnapshot) -> ViewState {
    ViewState {
        id: 0,
        name: view.name.name.clone(),
        definition: view.definition.clone(),
        columns: resolve_view_columns(view, schema),
    }
}

/// Output columns of a view: the explicit column list, or the select list
/// when every item names a column (`*` expands over a known base table).
pub fn resolve_view_columns(view: &CreateView, schema: &SchemaSnapshot) -> Vec<String> {
    if !view.columns.is_empty() {
        return view.columns.clone();
    }
    let Some((select_list, from)) = split_select(&view.definition) else {
        return Vec::new();
    };

    let mut columns = Vec::new();
    for item in split_top_level(select_list) {
        let item = item.trim();
        if item == "*" || item.ends_with(".*") {
            let Some(table) = from.as_deref().and_then(|f| schema.tables.get(f)) else {
                return Vec::new();
            };
            columns.extend(table.columns.names().map(str::to_string));
            continue;
        }
        match output_name(item) {
            Some(name) => columns.push(name),
            None => return Vec::new(),
        }
    }
    columns
}

/// Split `SELECT list FROM tbl ...` into the list text and the first table.
fn split_select(definition: &str) -> Option<(&str, Option<String>)> {
    let trimmed = definition.trim_start();
    let lower = trimmed.to_ascii_lowercase();
    if !lower.starts_with("select") {
        return None;
    }
    let body = &trimmed[6..];
    let lower_body = &lower[6..];

    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    for (i, c) in lower_body.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"' | '`') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth -= 1,
            (None, 'f') if depth == 0 && is_keyword_at(lower_body, i, "from") => {
                let rest = body[i + 4..].trim_start();
                let table = rest
                    .split(|c: char| c.is_whitespace() || c == ',' || c == ';')
                    .next()
                    .filter(|t| !t.is_empty() && !t.starts_with('('))
                    .map(|t| normalize_identifier(t.rsplit('.').next().unwrap_or(t)));
                return Some((&body[..i], table));
            }
            _ => {}
        }
    }
    Some((body, None))
}

fn is_keyword_at(text: &str, i: usize, keyword: &str) -> bool {
    let before_ok = text[..i]
        .chars()
        .last()
        .map_or(true, |c| !c.is_alphanumeric() && c != '_');
    let after = &text[i..];
    after.starts_with(keyword)
        && after[keyword.len()..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_alphanumeric() && c != '_')
        && before_ok
}

/// Name of one select item: the alias, or the (last part of the) column.
fn output_name(item: &str) -> Option<String> {
    let parts = split_top_level(item);
    if parts.len() != 1 {
        return None;
    }
    let words: Vec<&str> = item.split_whitespace().collect();
    let candidate = match words.as_slice() {
        [single] => single.rsplit('.').next().unwrap_or(*single),
        [.., as_kw, alias] if as_kw.eq_ignore_ascii_case("as") => *alias,
        [expr, alias] if !expr.ends_with('(') => *alias,
        _ => return None,
    };
    if candidate.contains('(') || candidate.contains(')') {
        return None;
    }
    Some(normalize_identifier(candidate))
}
