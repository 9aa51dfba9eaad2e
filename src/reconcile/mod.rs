//! Design-schema reconciliation
//!
//! Rewrites a hand-maintained schema file so that it describes a target
//! snapshot while keeping the author's text wherever it is still accurate.
//! Unchanged table elements keep their exact bytes, changed ones are
//! replaced with canonical text, and objects the file never mentioned are
//! appended at the end.

mod edits;

pub use edits::{apply_edits, TextEdit};

use std::collections::HashSet;
use std::ops::Range;

use tracing::{debug, info};

use crate::error::SchemaDiffError;
use crate::model::{
    check_state, foreign_key_state, index_state, table_from_create, CheckConstraintState,
    DatabaseSnapshot, ForeignKeyState, IndexKey, IndexState, SchemaSnapshot, TableState,
    PRIMARY_KEY_NAME,
};
use crate::parser::identifier_utils::{quote_identifier, quote_literal};
use crate::parser::{
    parse_sql, ColumnDefinition, CreateTable, CreateView, DdlStatement, ParsedStatement,
    TableConstraint, TableElement,
};
use crate::serializer::{
    check_definition, column_definition, foreign_key_definition, index_definition,
    serialize_table, serialize_trigger, serialize_view, view_statement, LiteralStyle,
    PartitionRenderer, ShowCreatePartitionRenderer,
};

const STYLE: LiteralStyle = LiteralStyle::ShowCreate;

/// Rewrite `baseline` so that extracting it yields `target`.
pub fn reconcile(baseline: &str, target: &DatabaseSnapshot) -> Result<String, SchemaDiffError> {
    let statements = parse_sql(baseline)?;
    let empty = SchemaSnapshot::default();
    let schema = target.default_schema().unwrap_or(&empty);

    let mut reconciler = Reconciler::new(baseline, &target.name, schema);
    for parsed in &statements {
        match &parsed.statement {
            DdlStatement::CreateTable(create) => reconciler.table(parsed, create)?,
            DdlStatement::CreateView(view) => reconciler.view(parsed, view),
            _ => {}
        }
    }

    let tail = reconciler.remaining();
    debug!(edits = reconciler.edits.len(), appended = tail.len(), "reconciling design schema");
    let mut out = apply_edits(baseline, reconciler.edits)?;
    if !tail.is_empty() {
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(&tail);
    }
    info!(bytes = out.len(), "reconciled design schema");
    Ok(out)
}

fn key(name: &str, case_sensitive: bool) -> String {
    if case_sensitive {
        name.to_string()
    } else {
        name.to_lowercase()
    }
}

struct Reconciler<'a> {
    text: &'a str,
    database: &'a str,
    target: &'a SchemaSnapshot,
    edits: Vec<TextEdit>,
    seen_tables: HashSet<String>,
    seen_views: HashSet<String>,
}

/// What happens to one element of a table's element list
#[derive(Debug, Clone, PartialEq, Eq)]
enum Decision {
    Keep,
    Replace(String),
    Delete,
}

impl<'a> Reconciler<'a> {
    fn new(text: &'a str, database: &'a str, target: &'a SchemaSnapshot) -> Self {
        Self {
            text,
            database,
            target,
            edits: Vec::new(),
            seen_tables: HashSet::new(),
            seen_views: HashSet::new(),
        }
    }

    fn case_sensitive(&self) -> bool {
        self.target.tables.case_sensitive()
    }

    /// Remove a whole statement with its terminator and line break.
    fn remove_statement(&mut self, parsed: &ParsedStatement) {
        let rest = &self.text[parsed.end..];
        let end = if rest.starts_with("\r\n") {
            parsed.end + 2
        } else if rest.starts_with('\n') {
            parsed.end + 1
        } else {
            parsed.end
        };
        self.edits.push(TextEdit::delete(parsed.span.start..end));
    }

    // ========================================================================
    // Tables
    // ========================================================================

    fn table(&mut self, parsed: &ParsedStatement, create: &CreateTable) -> Result<(), SchemaDiffError> {
        if let Some(database) = &create.name.database {
            if !self.database.is_empty() && !database.eq_ignore_ascii_case(self.database) {
                return Err(SchemaDiffError::ConflictingDatabaseNames {
                    first: self.database.to_string(),
                    second: database.clone(),
                });
            }
        }

        let Some(target) = self.target.tables.get(&create.name.name) else {
            debug!(table = %create.name.name, "removing table absent from target");
            self.remove_statement(parsed);
            return Ok(());
        };
        self.seen_tables.insert(key(&target.name, self.case_sensitive()));

        let baseline = table_from_create(create)?;
        self.element_edits(parsed, create, &baseline, target);
        self.option_edits(parsed, create, &baseline, target);
        self.partition_edits(parsed, create, &baseline, target, &ShowCreatePartitionRenderer);
        Ok(())
    }

    fn element_edits(
        &mut self,
        parsed: &ParsedStatement,
        create: &CreateTable,
        baseline: &TableState,
        target: &TableState,
    ) {
        let mut matcher = ElementMatcher::new(baseline, target);
        let decisions: Vec<Decision> = create
            .elements
            .iter()
            .map(|e| match &e.element {
                TableElement::Column(def) => matcher.column(def),
                TableElement::Constraint(constraint) => matcher.constraint(constraint),
            })
            .collect();
        let spans: Vec<Range<usize>> = create.elements.iter().map(|e| parsed.absolute(&e.span)).collect();

        let first_kept = decisions.iter().position(|d| *d != Decision::Delete);
        for (i, decision) in decisions.iter().enumerate() {
            match decision {
                Decision::Keep => {}
                Decision::Replace(text) => self.edits.push(TextEdit::replace(spans[i].clone(), text.clone())),
                Decision::Delete => {
                    // Take the preceding separator when something survives before
                    // this element, the following one otherwise.
                    let span = match first_kept {
                        Some(first) if i > first => spans[i - 1].end..spans[i].end,
                        _ => spans[i].start..spans.get(i + 1).map_or(spans[i].end, |next| next.start),
                    };
                    self.edits.push(TextEdit::delete(span));
                }
            }
        }

        let new_columns: Vec<String> = target
            .columns
            .iter()
            .filter(|c| !matcher.columns.contains(&c.name.to_lowercase()))
            .map(|c| column_definition(c, STYLE))
            .collect();
        let new_constraints = matcher.new_constraints();

        let is_column = |i: usize| matches!(create.elements[i].element, TableElement::Column(_));
        let last_kept = (0..decisions.len()).rev().find(|&i| decisions[i] != Decision::Delete);
        let last_kept_column = (0..decisions.len())
            .rev()
            .find(|&i| decisions[i] != Decision::Delete && is_column(i));

        match (first_kept, last_kept) {
            (Some(first), Some(last)) => {
                if !new_columns.is_empty() {
                    match last_kept_column {
                        Some(column) => self
                            .edits
                            .push(TextEdit::insert(spans[column].end, format!(",\n  {}", new_columns.join(",\n  ")))),
                        None => self
                            .edits
                            .push(TextEdit::insert(spans[first].start, format!("{},\n  ", new_columns.join(",\n  ")))),
                    }
                }
                if !new_constraints.is_empty() {
                    self.edits.push(TextEdit::insert(
                        spans[last].end,
                        format!(",\n  {}", new_constraints.join(",\n  ")),
                    ));
                }
            }
            _ => {
                let all: Vec<String> = new_columns.into_iter().chain(new_constraints).collect();
                if !all.is_empty() {
                    let at = spans
                        .first()
                        .map_or_else(|| parsed.absolute(&create.body_span).start + 1, |s| s.start);
                    self.edits.push(TextEdit::insert(at, all.join(",\n  ")));
                }
            }
        }
    }

    fn option_edits(
        &mut self,
        parsed: &ParsedStatement,
        create: &CreateTable,
        baseline: &TableState,
        target: &TableState,
    ) {
        let anchor = create
            .options
            .last()
            .map_or_else(|| parsed.absolute(&create.body_span).end, |o| parsed.absolute(&o.span).end);

        let changes = [
            ("ENGINE", &baseline.engine, &target.engine),
            ("CHARSET", &baseline.charset, &target.charset),
            ("COLLATE", &baseline.collation, &target.collation),
            ("COMMENT", &baseline.comment, &target.comment),
        ];
        for (name, old, new) in changes {
            if old == new {
                continue;
            }
            let existing = create.options.iter().rev().find(|o| o.name == name);
            match (existing, new) {
                (Some(option), Some(value)) => self
                    .edits
                    .push(TextEdit::replace(parsed.absolute(&option.span), render_option(name, value))),
                (Some(option), None) => {
                    let span = parsed.absolute(&option.span);
                    let start = self.text[..span.start].trim_end().len();
                    self.edits.push(TextEdit::delete(start..span.end));
                }
                (None, Some(value)) => self
                    .edits
                    .push(TextEdit::insert(anchor, format!(" {}", render_option(name, value)))),
                (None, None) => {}
            }
        }
    }

    fn partition_edits(
        &mut self,
        parsed: &ParsedStatement,
        create: &CreateTable,
        baseline: &TableState,
        target: &TableState,
        renderer: &dyn PartitionRenderer,
    ) {
        if baseline.partition == target.partition {
            return;
        }
        let existing = create
            .partition_span
            .as_ref()
            .map(|span| widen_partition_span(self.text, parsed.absolute(span)));
        match (existing, &target.partition) {
            (Some(span), Some(partition)) => self.edits.push(TextEdit::replace(span, renderer.render(partition))),
            (Some(span), None) => self.edits.push(TextEdit::delete(span)),
            (None, Some(partition)) => self.edits.push(TextEdit::insert(parsed.span.end, renderer.render(partition))),
            (None, None) => {}
        }
    }

    // ========================================================================
    // Views
    // ========================================================================

    fn view(&mut self, parsed: &ParsedStatement, create: &CreateView) {
        let Some(target) = self.target.views.get(&create.name.name) else {
            debug!(view = %create.name.name, "removing view absent from target");
            self.remove_statement(parsed);
            return;
        };
        self.seen_views.insert(key(&target.name, self.case_sensitive()));
        if create.definition.trim() != target.definition.trim() {
            self.edits
                .push(TextEdit::replace(parsed.span.clone(), view_statement(target, create.or_replace)));
        }
    }

    /// Canonical text for target objects the baseline never defined.
    fn remaining(&self) -> String {
        let mut out = String::new();
        for table in self.target.tables.iter() {
            if self.seen_tables.contains(&key(&table.name, self.case_sensitive())) {
                continue;
            }
            out.push_str(&format!("\n--\n-- Table structure for {}\n--\n", quote_identifier(&table.name)));
            out.push_str(&serialize_table(table));
            for trigger in table.triggers.iter() {
                out.push_str(&serialize_trigger(trigger));
            }
        }
        for view in self.target.views.iter() {
            if self.seen_views.contains(&key(&view.name, self.case_sensitive())) {
                continue;
            }
            out.push_str(&format!("\n--\n-- View structure for {}\n--\n", quote_identifier(&view.name)));
            out.push_str(&serialize_view(view));
        }
        out
    }
}

fn render_option(name: &str, value: &str) -> String {
    match name {
        "CHARSET" => format!("DEFAULT CHARSET={}", value),
        "COMMENT" => format!("COMMENT {}", quote_literal(value)),
        _ => format!("{}={}", name, value),
    }
}

/// Extend a partition clause span over the surrounding whitespace and the
/// `/*!NNNNN ... */` wrapper a dump puts around it.
fn widen_partition_span(text: &str, span: Range<usize>) -> Range<usize> {
    let mut start = text[..span.start].trim_end().len();
    let mut end = span.end;

    let before = &text[..start];
    let marker = before.rfind("/*!").filter(|&at| {
        before[at + 3..].chars().all(|c| c.is_ascii_digit())
    });
    if let Some(at) = marker {
        let after = &text[end..];
        let trimmed = after.trim_start();
        if trimmed.starts_with("*/") {
            start = text[..at].trim_end().len();
            end += after.len() - trimmed.len() + 2;
        }
    }
    start..end
}

// ============================================================================
// Element matching
// ============================================================================

/// Resolves baseline elements to entity names and tracks which target
/// entities already appear in the rewritten text.
struct ElementMatcher<'a> {
    baseline: &'a TableState,
    target: &'a TableState,
    /// Baseline entities some element of the text defines
    claimed: HashSet<(Kind, String)>,
    /// Target entities present in the output
    present: HashSet<(Kind, String)>,
    /// Target columns present in the output, lower-cased
    columns: HashSet<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Kind {
    Index,
    ForeignKey,
    Check,
}

impl<'a> ElementMatcher<'a> {
    fn new(baseline: &'a TableState, target: &'a TableState) -> Self {
        Self {
            baseline,
            target,
            claimed: HashSet::new(),
            present: HashSet::new(),
            columns: HashSet::new(),
        }
    }

    fn column(&mut self, def: &ColumnDefinition) -> Decision {
        let mut inline = Vec::new();
        if def.primary_key {
            inline.push(self.claim_index(Some(PRIMARY_KEY_NAME), None));
        }
        if def.unique {
            let probe = IndexState {
                keys: vec![IndexKey::column(def.name.clone())],
                unique: true,
                ..Default::default()
            };
            inline.push(self.claim_index(None, Some(&probe)));
        }
        if let Some(reference) = &def.references {
            let probe = foreign_key_state(String::new(), vec![def.name.clone()], reference);
            inline.push(self.claim_foreign_key(None, &probe));
        }
        if let Some(check) = &def.check {
            let probe = check_state(String::new(), check);
            inline.push(self.claim_check(check.name.as_deref(), &probe));
        }

        let Some(new) = self.target.columns.get(&def.name) else {
            return Decision::Delete;
        };
        self.columns.insert(new.name.to_lowercase());

        let column_same = self.baseline.columns.get(&def.name).is_some_and(|old| old.same_definition(new));
        let inline_same = inline
            .iter()
            .all(|entity| entity.as_ref().is_some_and(|(kind, name)| self.unchanged(*kind, name)));
        if column_same && inline_same {
            for (kind, name) in inline.into_iter().flatten() {
                self.present.insert((kind, name.to_lowercase()));
            }
            Decision::Keep
        } else {
            Decision::Replace(column_definition(new, STYLE))
        }
    }

    fn constraint(&mut self, constraint: &TableConstraint) -> Decision {
        let entity = match constraint {
            TableConstraint::Index(def) => {
                let probe = index_state(def, String::new());
                let explicit = if probe.primary {
                    Some(PRIMARY_KEY_NAME)
                } else {
                    def.name.as_deref()
                };
                self.claim_index(explicit, Some(&probe))
            }
            TableConstraint::ForeignKey(def) => {
                let probe = foreign_key_state(String::new(), def.columns.clone(), &def.reference);
                self.claim_foreign_key(def.name.as_deref(), &probe)
            }
            TableConstraint::Check(def) => {
                let probe = check_state(String::new(), def);
                self.claim_check(def.name.as_deref(), &probe)
            }
        };
        let Some((kind, name)) = entity else {
            return Decision::Keep;
        };

        let rendered = match kind {
            Kind::Index => self.target.indexes.get(&name).map(|i| index_definition(i, STYLE)),
            Kind::ForeignKey => self.target.foreign_keys.get(&name).map(foreign_key_definition),
            Kind::Check => self.target.checks.get(&name).map(check_definition),
        };
        let Some(rendered) = rendered else {
            return Decision::Delete;
        };
        let unchanged = self.unchanged(kind, &name);
        self.present.insert((kind, name.to_lowercase()));
        if unchanged {
            Decision::Keep
        } else {
            Decision::Replace(rendered)
        }
    }

    fn unchanged(&self, kind: Kind, name: &str) -> bool {
        match kind {
            Kind::Index => matches!(
                (self.baseline.indexes.get(name), self.target.indexes.get(name)),
                (Some(a), Some(b)) if a.same_definition(b)
            ),
            Kind::ForeignKey => matches!(
                (self.baseline.foreign_keys.get(name), self.target.foreign_keys.get(name)),
                (Some(a), Some(b)) if a.same_definition(b)
            ),
            Kind::Check => matches!(
                (self.baseline.checks.get(name), self.target.checks.get(name)),
                (Some(a), Some(b)) if a.same_definition(b)
            ),
        }
    }

    fn claim(&mut self, kind: Kind, name: &str) -> Option<(Kind, String)> {
        self.claimed.insert((kind, name.to_lowercase()));
        Some((kind, name.to_string()))
    }

    fn is_claimed(&self, kind: Kind, name: &str) -> bool {
        self.claimed.contains(&(kind, name.to_lowercase()))
    }

    /// Unnamed elements resolve to the first unclaimed baseline entity with
    /// the same definition, in the order the extractor named them.
    fn claim_index(&mut self, explicit: Option<&str>, probe: Option<&IndexState>) -> Option<(Kind, String)> {
        if let Some(name) = explicit {
            return self.claim(Kind::Index, name);
        }
        let probe = probe?;
        let name = self
            .baseline
            .indexes
            .iter()
            .find(|i| {
                !self.is_claimed(Kind::Index, &i.name)
                    && i.primary == probe.primary
                    && i.unique == probe.unique
                    && i.keys == probe.keys
            })?
            .name
            .clone();
        self.claim(Kind::Index, &name)
    }

    fn claim_foreign_key(&mut self, explicit: Option<&str>, probe: &ForeignKeyState) -> Option<(Kind, String)> {
        if let Some(name) = explicit {
            return self.claim(Kind::ForeignKey, name);
        }
        let name = self
            .baseline
            .foreign_keys
            .iter()
            .find(|fk| {
                !self.is_claimed(Kind::ForeignKey, &fk.name)
                    && fk.columns == probe.columns
                    && fk.referenced_table.eq_ignore_ascii_case(&probe.referenced_table)
                    && fk.referenced_columns == probe.referenced_columns
            })?
            .name
            .clone();
        self.claim(Kind::ForeignKey, &name)
    }

    fn claim_check(&mut self, explicit: Option<&str>, probe: &CheckConstraintState) -> Option<(Kind, String)> {
        if let Some(name) = explicit {
            return self.claim(Kind::Check, name);
        }
        let name = self
            .baseline
            .checks
            .iter()
            .find(|c| !self.is_claimed(Kind::Check, &c.name) && c.expression == probe.expression)?
            .name
            .clone();
        self.claim(Kind::Check, &name)
    }

    /// Target indexes, foreign keys and checks missing from the output.
    ///
    /// An index the extractor synthesized for a foreign key in the baseline
    /// is synthesized again on the next extraction, so it is not written out.
    fn new_constraints(&self) -> Vec<String> {
        let mut out = Vec::new();
        for index in self.target.sorted_indexes() {
            if self.present.contains(&(Kind::Index, index.name.to_lowercase())) {
                continue;
            }
            let synthesized = !self.is_claimed(Kind::Index, &index.name)
                && self.baseline.indexes.get(&index.name).is_some_and(|old| old.same_definition(index));
            if !synthesized {
                out.push(index_definition(index, STYLE));
            }
        }
        for fk in self.target.foreign_keys.sorted_by_name() {
            if !self.present.contains(&(Kind::ForeignKey, fk.name.to_lowercase())) {
                out.push(foreign_key_definition(fk));
            }
        }
        for check in self.target.checks.iter() {
            if !self.present.contains(&(Kind::Check, check.name.to_lowercase())) {
                out.push(check_definition(check));
            }
        }
        out
    }
}
