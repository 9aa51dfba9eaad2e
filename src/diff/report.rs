//! Human-readable diff report

use std::fmt::Write;

use super::types::{Action, EntityDiff, MetadataDiff, TableDiff};
use crate::model::{Named, RoutineState};
use crate::parser::identifier_utils::quote_identifier;

/// Format a diff as an indented change list, one entity per line.
pub fn format_report(diff: &MetadataDiff) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Schema Diff Report ===");
    if diff.is_empty() {
        let _ = writeln!(out, "No changes.");
        return out;
    }
    let _ = writeln!(out, "Changes: {}", diff.change_count());
    let _ = writeln!(out);

    for schema in &diff.schemas {
        let _ = writeln!(out, "{} schema {}", schema.action.symbol(), quote_identifier(&schema.name));
    }
    for table in &diff.tables {
        write_table(&mut out, table);
    }
    for view in &diff.views {
        let _ = writeln!(out, "{} view {}", view.action.symbol(), quote_identifier(view.name()));
    }
    write_routines(&mut out, "function", &diff.functions);
    write_routines(&mut out, "procedure", &diff.procedures);
    write_routines(&mut out, "event", &diff.events);
    write_routines(&mut out, "sequence", &diff.sequences);
    out
}

fn write_table(out: &mut String, table: &TableDiff) {
    let _ = writeln!(out, "{} table {}", table.action.symbol(), quote_identifier(table.name()));
    if table.action != Action::Alter {
        return;
    }
    if let (Some(old), Some(new)) = (&table.old, &table.new) {
        if !old.same_options(new) {
            let _ = writeln!(out, "    ~ options");
        }
    }
    for column in &table.columns {
        let detail = column
            .current()
            .map(|c| format!(" {}", c.data_type))
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "    {} column {}{}",
            column.action.symbol(),
            quote_identifier(column.name()),
            detail
        );
    }
    write_nested(out, "index", &table.indexes);
    write_nested(out, "foreign key", &table.foreign_keys);
    write_nested(out, "check", &table.checks);
    write_nested(out, "trigger", &table.triggers);
    for partition in &table.partition {
        let _ = writeln!(out, "    {} partitioning", partition.action.symbol());
    }
}

fn write_nested<T: Named>(out: &mut String, kind: &str, diffs: &[EntityDiff<T>]) {
    for d in diffs {
        let _ = writeln!(out, "    {} {} {}", d.action.symbol(), kind, quote_identifier(d.name()));
    }
}

fn write_routines(out: &mut String, kind: &str, diffs: &[EntityDiff<RoutineState>]) {
    for d in diffs {
        let _ = writeln!(out, "{} {} {}", d.action.symbol(), kind, quote_identifier(d.name()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::{diff, DiffOptions};
    use crate::model::{build_snapshot, ExtractOptions};
    use crate::parser::parse_sql;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_format_report() {
        let a = build_snapshot(
            &parse_sql("CREATE TABLE t (id INT, KEY idx (id)); CREATE TABLE gone (a INT);").unwrap(),
            &ExtractOptions::default(),
        )
        .unwrap();
        let b = build_snapshot(
            &parse_sql("CREATE TABLE t (id INT, age INT);").unwrap(),
            &ExtractOptions::default(),
        )
        .unwrap();
        let result = diff(&a, &b, &DiffOptions::default()).unwrap();
        assert_eq!(
            format_report(&result),
            "=== Schema Diff Report ===\n\
             Changes: 3\n\
             \n\
             - table `gone`\n\
             ~ table `t`\n    \
             + column `age` int\n    \
             - index `idx`\n"
        );
    }

    #[test]
    fn test_empty_report() {
        assert_eq!(
            format_report(&MetadataDiff::default()),
            "=== Schema Diff Report ===\nNo changes.\n"
        );
    }
}
