//! Catalog walk-through
//!
//! Applies a statement sequence to a snapshot the way the server would,
//! validating each statement against the current catalog. A statement that
//! fails leaves the snapshot untouched.

mod diagnostic;
mod table_ops;

pub use diagnostic::{Diagnostic, DiagnosticCode, Rejection, Severity};
pub use table_ops::ColumnRules;

use tracing::{debug, info, warn};

use crate::model::{trigger_from_create, view_from_create, DatabaseSnapshot, RoutineState, SchemaSnapshot};
use crate::parser::{DdlStatement, ObjectName, ParsedStatement, RoutineKind};

/// What to do after a statement is rejected with an Error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Stop at the first Error
    #[default]
    Abort,
    /// Record the Error, skip the statement and continue
    SkipStatement,
}

/// Walk-through configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct WalkThroughOptions {
    pub error_policy: ErrorPolicy,
    /// Compare table and view names case-sensitively
    pub case_sensitive_tables: bool,
    /// Accept TiDB's AUTO_RANDOM column attribute
    pub allow_auto_random: bool,
}

/// Outcome of a walk-through
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkThroughReport {
    /// All diagnostics in statement order
    pub diagnostics: Vec<Diagnostic>,
    /// Statements applied without an Error
    pub applied: usize,
    /// Whether processing stopped early
    pub aborted: bool,
}

impl WalkThroughReport {
    /// The first Error, if any.
    pub fn error(&self) -> Option<&Diagnostic> {
        self.diagnostics.iter().find(|d| d.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| !d.is_error())
    }

    pub fn has_errors(&self) -> bool {
        self.error().is_some()
    }
}

/// Apply `statements` to `snapshot` in order.
pub fn walk_through(
    snapshot: &mut DatabaseSnapshot,
    statements: &[ParsedStatement],
    options: &WalkThroughOptions,
) -> WalkThroughReport {
    WalkThrough::new(snapshot, *options).run(statements)
}

/// Statement-by-statement catalog simulator
pub struct WalkThrough<'a> {
    snapshot: &'a mut DatabaseSnapshot,
    options: WalkThroughOptions,
    rules: ColumnRules,
    /// Set by DROP DATABASE of the current database
    deleted: bool,
}

/// Result of applying one statement: the warnings it raised, or the Error
/// that rejected it
type StepResult = Result<Vec<Rejection>, Rejection>;

impl<'a> WalkThrough<'a> {
    pub fn new(snapshot: &'a mut DatabaseSnapshot, options: WalkThroughOptions) -> Self {
        Self {
            snapshot,
            options,
            rules: ColumnRules {
                allow_auto_random: options.allow_auto_random,
            },
            deleted: false,
        }
    }

    pub fn run(&mut self, statements: &[ParsedStatement]) -> WalkThroughReport {
        let mut report = WalkThroughReport::default();

        if self.snapshot.case_sensitive_tables != self.options.case_sensitive_tables {
            self.snapshot.case_sensitive_tables = self.options.case_sensitive_tables;
            if let Err(name) = self.snapshot.apply_table_case() {
                report.diagnostics.push(
                    Rejection::new(
                        DiagnosticCode::Internal,
                        format!("Table or view `{}` collides under case-insensitive names", name),
                    )
                    .at(Severity::Error, 0),
                );
                report.aborted = true;
                return report;
            }
        }

        for parsed in statements {
            match self.apply(parsed) {
                Ok(warnings) => {
                    report.applied += 1;
                    for w in warnings {
                        report.diagnostics.push(w.at(Severity::Warning, parsed.line));
                    }
                }
                Err(rejection) => {
                    let diagnostic = rejection.at(Severity::Error, parsed.line);
                    debug!(line = parsed.line, code = diagnostic.code.code(), "statement rejected");
                    report.diagnostics.push(diagnostic);
                    if self.options.error_policy == ErrorPolicy::Abort {
                        report.aborted = true;
                        break;
                    }
                }
            }
        }

        let errors = report.diagnostics.iter().filter(|d| d.is_error()).count();
        if errors > 0 {
            warn!(errors, applied = report.applied, "walk-through raised errors");
        }
        info!(
            statements = statements.len(),
            applied = report.applied,
            diagnostics = report.diagnostics.len(),
            "walk-through finished"
        );
        report
    }

    /// Apply one statement atomically.
    fn apply(&mut self, parsed: &ParsedStatement) -> StepResult {
        if self.snapshot.schemas.is_empty() {
            return Err(Rejection::new(DiagnosticCode::SchemaNotExists, "Schema does not exist"));
        }
        if self.deleted && !self.revives_database(&parsed.statement) {
            return Err(Rejection::new(
                DiagnosticCode::DatabaseIsDeleted,
                format!("Database `{}` is deleted", self.snapshot.name),
            ));
        }

        let mut schema = self.snapshot.schemas[0].clone();
        let warnings = self.apply_to_schema(&mut schema, &parsed.statement)?;
        self.snapshot.schemas[0] = schema;
        Ok(warnings)
    }

    fn revives_database(&self, statement: &DdlStatement) -> bool {
        matches!(statement, DdlStatement::CreateDatabase { name, .. } if self.is_current(Some(name)))
    }

    /// Whether a qualifier names the simulated database.
    fn is_current(&self, database: Option<&String>) -> bool {
        match database {
            None => true,
            Some(db) => self.snapshot.name.is_empty() || self.snapshot.name.eq_ignore_ascii_case(db),
        }
    }

    fn not_current(&self, database: &str) -> Rejection {
        Rejection::new(
            DiagnosticCode::NotCurrentDatabase,
            format!(
                "Database `{}` is not the current database `{}`",
                database, self.snapshot.name
            ),
        )
    }

    /// A statement naming another database is skipped with a warning.
    fn foreign_name(&self, name: &ObjectName) -> Option<Rejection> {
        match &name.database {
            Some(db) if !self.is_current(Some(db)) => Some(self.not_current(db)),
            _ => None,
        }
    }

    fn apply_to_schema(&mut self, schema: &mut SchemaSnapshot, statement: &DdlStatement) -> StepResult {
        match statement {
            DdlStatement::CreateTable(create) => {
                if let Some(warning) = self.foreign_name(&create.name) {
                    return Ok(vec![warning]);
                }
                if schema.has_relation(&create.name.name) {
                    if create.if_not_exists {
                        return Ok(Vec::new());
                    }
                    return Err(table_exists(&create.name.name));
                }
                let table = table_ops::create_table(create, self.rules)?;
                push_table(schema, table)
            }
            DdlStatement::CreateTableLike {
                name,
                like,
                if_not_exists,
            } => {
                if let Some(warning) = self.foreign_name(name).or_else(|| self.foreign_name(like)) {
                    return Ok(vec![warning]);
                }
                if schema.has_relation(&name.name) {
                    if *if_not_exists {
                        return Ok(Vec::new());
                    }
                    return Err(table_exists(&name.name));
                }
                let source = schema
                    .tables
                    .get(&like.name)
                    .ok_or_else(|| table_not_exists(&like.name))?;
                let mut table = source.clone();
                table.name = name.name.clone();
                table.foreign_keys = Default::default();
                table.triggers = Default::default();
                push_table(schema, table)
            }
            DdlStatement::CreateTableAs { name } => Err(Rejection::new(
                DiagnosticCode::StatementCreateTableAs,
                format!("CREATE TABLE AS statement is used for table `{}`", name.name),
            )),
            DdlStatement::AlterTable { name, items } => {
                if let Some(warning) = self.foreign_name(name) {
                    return Ok(vec![warning]);
                }
                let mut table = schema
                    .tables
                    .get(&name.name)
                    .cloned()
                    .ok_or_else(|| table_not_exists(&name.name))?;
                let covered = table_ops::covered_foreign_keys(&table);
                let mut new_name = None;
                for item in items {
                    if let crate::parser::AlterItem::RenameTable { new_name: target } = item {
                        if let Some(warning) = self.foreign_name(target) {
                            return Ok(vec![warning]);
                        }
                        new_name = Some(target.name.clone());
                    }
                    table_ops::apply_alter_item(&mut table, item, self.rules)?;
                }
                table_ops::check_foreign_key_indexes(&table, &covered)?;
                schema
                    .tables
                    .replace(&name.name, table)
                    .map_err(|_| table_not_exists(&name.name))?;
                if let Some(target) = new_name {
                    rename_table(schema, &name.name, &target)?;
                }
                Ok(Vec::new())
            }
            DdlStatement::DropTable { names, if_exists } => {
                let mut warnings = Vec::new();
                for name in names {
                    if let Some(warning) = self.foreign_name(name) {
                        warnings.push(warning);
                        continue;
                    }
                    if schema.tables.remove(&name.name).is_none() && !if_exists {
                        return Err(table_not_exists(&name.name));
                    }
                }
                Ok(warnings)
            }
            DdlStatement::CreateIndex { table, index } => {
                if let Some(warning) = self.foreign_name(table) {
                    return Ok(vec![warning]);
                }
                let state = schema
                    .tables
                    .get_mut(&table.name)
                    .ok_or_else(|| table_not_exists(&table.name))?;
                table_ops::add_index(state, index)?;
                Ok(Vec::new())
            }
            DdlStatement::DropIndex { table, name } => {
                if let Some(warning) = self.foreign_name(table) {
                    return Ok(vec![warning]);
                }
                let state = schema
                    .tables
                    .get_mut(&table.name)
                    .ok_or_else(|| table_not_exists(&table.name))?;
                let covered = table_ops::covered_foreign_keys(state);
                table_ops::drop_index(state, name)?;
                table_ops::check_foreign_key_indexes(state, &covered)?;
                Ok(Vec::new())
            }
            DdlStatement::RenameTable { pairs } => {
                for (from, to) in pairs {
                    // Moving a table into or out of another database
                    if let Some(warning) = self.foreign_name(from).or_else(|| self.foreign_name(to)) {
                        return Ok(vec![warning]);
                    }
                    rename_table(schema, &from.name, &to.name)?;
                }
                Ok(Vec::new())
            }
            DdlStatement::CreateView(view) => {
                if let Some(warning) = self.foreign_name(&view.name) {
                    return Ok(vec![warning]);
                }
                if schema.tables.contains(&view.name.name) {
                    return Err(table_exists(&view.name.name));
                }
                let state = view_from_create(view, schema);
                if schema.views.contains(&view.name.name) {
                    if !view.or_replace {
                        return Err(Rejection::new(
                            DiagnosticCode::ViewExists,
                            format!("View `{}` already exists", view.name.name),
                        ));
                    }
                    let _ = schema.views.replace(&view.name.name, state);
                } else {
                    let _ = schema.views.push(state);
                }
                Ok(Vec::new())
            }
            DdlStatement::DropView { names, if_exists } => {
                let mut warnings = Vec::new();
                for name in names {
                    if let Some(warning) = self.foreign_name(name) {
                        warnings.push(warning);
                        continue;
                    }
                    if schema.views.remove(&name.name).is_none() && !if_exists {
                        return Err(Rejection::new(
                            DiagnosticCode::ViewNotExists,
                            format!("View `{}` does not exist", name.name),
                        ));
                    }
                }
                Ok(warnings)
            }
            DdlStatement::CreateDatabase {
                name,
                charset,
                collation,
                ..
            } => {
                if !self.is_current(Some(name)) {
                    return Ok(vec![self.not_current(name)]);
                }
                if self.snapshot.name.is_empty() {
                    self.snapshot.name = name.clone();
                }
                self.deleted = false;
                if charset.is_some() {
                    self.snapshot.charset = charset.clone();
                }
                if collation.is_some() {
                    self.snapshot.collation = collation.clone();
                }
                Ok(Vec::new())
            }
            DdlStatement::AlterDatabase {
                name,
                charset,
                collation,
            } => {
                if !self.is_current(name.as_ref()) {
                    return Ok(vec![self.not_current(name.as_deref().unwrap_or(""))]);
                }
                if charset.is_some() {
                    self.snapshot.charset = charset.clone();
                }
                if collation.is_some() {
                    self.snapshot.collation = collation.clone();
                }
                Ok(Vec::new())
            }
            DdlStatement::DropDatabase { name, .. } => {
                if !self.is_current(Some(name)) {
                    return Ok(vec![self.not_current(name)]);
                }
                self.deleted = true;
                Ok(Vec::new())
            }
            DdlStatement::Use { database } => {
                if !self.is_current(Some(database)) {
                    return Ok(vec![self.not_current(database)]);
                }
                Ok(Vec::new())
            }
            DdlStatement::CreateTrigger(trigger) => {
                if let Some(warning) = self.foreign_name(&trigger.table) {
                    return Ok(vec![warning]);
                }
                if schema.trigger_table(&trigger.name.name).is_some() {
                    return Err(Rejection::new(
                        DiagnosticCode::Internal,
                        format!("Trigger `{}` already exists", trigger.name.name),
                    ));
                }
                let table = schema
                    .tables
                    .get_mut(&trigger.table.name)
                    .ok_or_else(|| table_not_exists(&trigger.table.name))?;
                let _ = table.triggers.push(trigger_from_create(trigger));
                Ok(Vec::new())
            }
            DdlStatement::CreateRoutine(routine) => {
                if let Some(warning) = self.foreign_name(&routine.name) {
                    return Ok(vec![warning]);
                }
                let Some(collection) = routine_collection(schema, routine.kind) else {
                    return Ok(Vec::new());
                };
                let state = RoutineState {
                    id: 0,
                    name: routine.name.name.clone(),
                    definition: routine.definition.clone(),
                };
                if collection.contains(&state.name) {
                    if routine.if_not_exists {
                        return Ok(Vec::new());
                    }
                    return Err(Rejection::new(
                        DiagnosticCode::Internal,
                        format!("{} `{}` already exists", routine.kind.as_str(), state.name),
                    ));
                }
                let _ = collection.push(state);
                Ok(Vec::new())
            }
            DdlStatement::DropRoutine { kind, name, if_exists } => {
                if let Some(warning) = self.foreign_name(name) {
                    return Ok(vec![warning]);
                }
                let removed = if *kind == RoutineKind::Trigger {
                    match schema.trigger_table(&name.name).map(str::to_string) {
                        Some(table) => schema
                            .tables
                            .get_mut(&table)
                            .and_then(|t| t.triggers.remove(&name.name))
                            .is_some(),
                        None => false,
                    }
                } else {
                    routine_collection(schema, *kind)
                        .and_then(|collection| collection.remove(&name.name))
                        .is_some()
                };
                if !removed && !*if_exists {
                    return Err(Rejection::new(
                        DiagnosticCode::Internal,
                        format!("{} `{}` does not exist", kind.as_str(), name.name),
                    ));
                }
                Ok(Vec::new())
            }
            DdlStatement::Other => Ok(Vec::new()),
        }
    }
}

fn routine_collection(
    schema: &mut SchemaSnapshot,
    kind: RoutineKind,
) -> Option<&mut crate::model::NamedCollection<RoutineState>> {
    match kind {
        RoutineKind::Function => Some(&mut schema.functions),
        RoutineKind::Procedure => Some(&mut schema.procedures),
        RoutineKind::Event => Some(&mut schema.events),
        RoutineKind::Sequence => Some(&mut schema.sequences),
        RoutineKind::Trigger => None,
    }
}

fn push_table(schema: &mut SchemaSnapshot, table: crate::model::TableState) -> StepResult {
    schema
        .tables
        .push(table)
        .map_err(|t| table_exists(&t.name))?;
    Ok(Vec::new())
}

fn rename_table(schema: &mut SchemaSnapshot, from: &str, to: &str) -> Result<(), Rejection> {
    if !schema.tables.contains(from) {
        return Err(table_not_exists(from));
    }
    let same = if schema.tables.case_sensitive() {
        from == to
    } else {
        from.eq_ignore_ascii_case(to)
    };
    if !same && schema.has_relation(to) {
        return Err(table_exists(to));
    }
    if !schema.tables.rename(from, to) {
        return Err(table_exists(to));
    }
    Ok(())
}

fn table_exists(name: &str) -> Rejection {
    Rejection::new(DiagnosticCode::TableExists, format!("Table `{}` already exists", name))
}

fn table_not_exists(name: &str) -> Rejection {
    Rejection::new(DiagnosticCode::TableNotExists, format!("Table `{}` does not exist", name))
}
