//! Single-statement DDL writers for migration scripts.
//!
//! Drop statements are followed by a blank line; create statements end with
//! `;\n`. String literals use backslash escaping.

use crate::model::{
    CheckConstraintState, ColumnState, ForeignKeyState, IndexState, IndexType, PartitionState,
    TableState, TriggerState, ViewState,
};
use crate::parser::identifier_utils::{escape_string, quote_identifier};
use crate::serializer::{
    check_definition, column_definition, foreign_key_definition, index_key_list,
    serialize_statement, view_statement, LiteralStyle, PartitionRenderer,
};

const STYLE: LiteralStyle = LiteralStyle::Backslash;

// ============================================================================
// Drop phase
// ============================================================================

/// `DROP <KIND> IF EXISTS `name`;`
pub(crate) fn write_drop_object(out: &mut String, kind: &str, name: &str) {
    out.push_str(&format!("DROP {} IF EXISTS {};\n\n", kind, quote_identifier(name)));
}

pub(crate) fn write_drop_foreign_key(out: &mut String, table: &str, fk: &str) {
    out.push_str(&format!(
        "ALTER TABLE {} DROP FOREIGN KEY {};\n\n",
        quote_identifier(table),
        quote_identifier(fk)
    ));
}

pub(crate) fn write_drop_check(out: &mut String, table: &str, check: &str) {
    out.push_str(&format!(
        "ALTER TABLE {} DROP CHECK {};\n\n",
        quote_identifier(table),
        quote_identifier(check)
    ));
}

pub(crate) fn write_drop_index(out: &mut String, table: &str, index: &str) {
    out.push_str(&format!(
        "DROP INDEX {} ON {};\n\n",
        quote_identifier(index),
        quote_identifier(table)
    ));
}

pub(crate) fn write_drop_column(out: &mut String, table: &str, column: &str) {
    out.push_str(&format!(
        "ALTER TABLE {} DROP COLUMN {};\n\n",
        quote_identifier(table),
        quote_identifier(column)
    ));
}

pub(crate) fn write_remove_partitioning(out: &mut String, table: &str) {
    out.push_str(&format!("ALTER TABLE {} REMOVE PARTITIONING;\n\n", quote_identifier(table)));
}

/// Replace a view about to be dropped with a constant select of the same
/// shape, so views that still reference it keep compiling until they are
/// dropped themselves.
pub(crate) fn write_placeholder_view(out: &mut String, view: &ViewState) {
    let select = if view.columns.is_empty() {
        " 1".to_string()
    } else {
        let columns: Vec<String> = view
            .columns
            .iter()
            .map(|c| format!(" 1 AS {}", quote_identifier(c)))
            .collect();
        columns.join(",")
    };
    out.push_str(&format!(
        "CREATE OR REPLACE VIEW {} AS SELECT{};\n",
        quote_identifier(&view.name),
        select
    ));
}

// ============================================================================
// Create phase
// ============================================================================

/// `CREATE TABLE IF NOT EXISTS` with columns, primary key, unique keys and
/// checks inline. Foreign keys are left out; other indexes follow as
/// separate `CREATE INDEX` statements.
pub(crate) fn write_create_table(out: &mut String, table: &TableState, renderer: &dyn PartitionRenderer) {
    let mut elements: Vec<String> = table
        .columns
        .iter()
        .map(|c| column_definition(c, STYLE))
        .collect();
    let indexes = table.sorted_indexes();
    for index in &indexes {
        if index.primary {
            elements.push(format!("PRIMARY KEY ({})", index_key_list(index, ", ")));
        } else if index.unique {
            elements.push(format!(
                "UNIQUE KEY {} ({})",
                quote_identifier(&index.name),
                index_key_list(index, ", ")
            ));
        }
    }
    elements.extend(table.checks.iter().map(check_definition));

    out.push_str(&format!("CREATE TABLE IF NOT EXISTS {} (\n  ", quote_identifier(&table.name)));
    out.push_str(&elements.join(",\n  "));
    out.push_str("\n)");
    out.push_str(&table_options(table));
    if let Some(partition) = &table.partition {
        out.push_str(&renderer.render(partition));
    }
    out.push_str(";\n");

    for index in indexes.into_iter().filter(|i| !i.primary && !i.unique) {
        write_create_index(out, &table.name, index);
    }
}

/// ` ENGINE=.. DEFAULT CHARSET=.. COLLATE=.. COMMENT='..'`
fn table_options(table: &TableState) -> String {
    let mut out = String::new();
    if let Some(engine) = &table.engine {
        out.push_str(&format!(" ENGINE={}", engine));
    }
    if let Some(charset) = &table.charset {
        out.push_str(&format!(" DEFAULT CHARSET={}", charset));
    }
    if let Some(collation) = &table.collation {
        out.push_str(&format!(" COLLATE={}", collation));
    }
    if let Some(comment) = &table.comment {
        out.push_str(&format!(" COMMENT='{}'", escape_string(comment)));
    }
    out
}

/// `ALTER TABLE `t` ADD COLUMN ... [FIRST|AFTER `prev`];`
pub(crate) fn write_add_column(out: &mut String, table: &TableState, column: &ColumnState) {
    let position = match table.columns.position(&column.name) {
        Some(0) => " FIRST".to_string(),
        Some(at) => table
            .columns
            .get_index(at - 1)
            .map(|prev| format!(" AFTER {}", quote_identifier(&prev.name)))
            .unwrap_or_default(),
        None => String::new(),
    };
    out.push_str(&format!(
        "ALTER TABLE {} ADD COLUMN {}{};\n",
        quote_identifier(&table.name),
        column_definition(column, STYLE),
        position
    ));
}

pub(crate) fn write_modify_column(out: &mut String, table: &str, column: &ColumnState) {
    out.push_str(&format!(
        "ALTER TABLE {} MODIFY COLUMN {};\n",
        quote_identifier(table),
        column_definition(column, STYLE)
    ));
}

/// Primary and unique keys go through `ALTER TABLE`, everything else
/// through `CREATE INDEX`.
pub(crate) fn write_add_index(out: &mut String, table: &str, index: &IndexState) {
    if index.primary {
        out.push_str(&format!(
            "ALTER TABLE {} ADD PRIMARY KEY ({});\n",
            quote_identifier(table),
            index_key_list(index, ", ")
        ));
    } else if index.unique {
        out.push_str(&format!(
            "ALTER TABLE {} ADD UNIQUE KEY {} ({});\n",
            quote_identifier(table),
            quote_identifier(&index.name),
            index_key_list(index, ", ")
        ));
    } else {
        write_create_index(out, table, index);
    }
}

pub(crate) fn write_create_index(out: &mut String, table: &str, index: &IndexState) {
    let kind = match index.index_type {
        IndexType::Fulltext => "FULLTEXT ",
        IndexType::Spatial => "SPATIAL ",
        _ => "",
    };
    let mut statement = format!(
        "CREATE {}INDEX {} ON {} ({})",
        kind,
        quote_identifier(&index.name),
        quote_identifier(table),
        index_key_list(index, ", ")
    );
    if index.index_type == IndexType::Hash {
        statement.push_str(" USING HASH");
    }
    if let Some(comment) = &index.comment {
        statement.push_str(&format!(" COMMENT '{}'", escape_string(comment)));
    }
    if !index.visible {
        statement.push_str(" INVISIBLE");
    }
    out.push_str(&statement);
    out.push_str(";\n");
}

pub(crate) fn write_add_check(out: &mut String, table: &str, check: &CheckConstraintState) {
    out.push_str(&format!(
        "ALTER TABLE {} ADD {};\n",
        quote_identifier(table),
        check_definition(check)
    ));
}

pub(crate) fn write_add_foreign_key(out: &mut String, table: &str, fk: &ForeignKeyState) {
    out.push_str(&format!(
        "ALTER TABLE {} ADD {};\n",
        quote_identifier(table),
        foreign_key_definition(fk)
    ));
}

pub(crate) fn write_create_trigger(out: &mut String, table: &str, trigger: &TriggerState) {
    out.push_str(&serialize_statement(&format!(
        "CREATE TRIGGER {} {} {} ON {} FOR EACH ROW {}",
        quote_identifier(&trigger.name),
        trigger.timing,
        trigger.event,
        quote_identifier(table),
        trigger.body.trim()
    )));
}

pub(crate) fn write_table_comment(out: &mut String, table: &str, comment: Option<&str>) {
    out.push_str(&format!(
        "ALTER TABLE {} COMMENT = '{}';\n",
        quote_identifier(table),
        escape_string(comment.unwrap_or(""))
    ));
}

/// Engine, charset and collation changes in one statement.
pub(crate) fn write_table_options(out: &mut String, old: &TableState, new: &TableState) {
    let mut options = Vec::new();
    if old.engine != new.engine {
        if let Some(engine) = &new.engine {
            options.push(format!("ENGINE={}", engine));
        }
    }
    if old.charset != new.charset {
        if let Some(charset) = &new.charset {
            options.push(format!("DEFAULT CHARSET={}", charset));
        }
    }
    if old.collation != new.collation {
        if let Some(collation) = &new.collation {
            options.push(format!("COLLATE={}", collation));
        }
    }
    if !options.is_empty() {
        out.push_str(&format!("ALTER TABLE {} {};\n", quote_identifier(&new.name), options.join(" ")));
    }
}

pub(crate) fn write_add_partitioning(
    out: &mut String,
    table: &str,
    partition: &PartitionState,
    renderer: &dyn PartitionRenderer,
) {
    out.push_str(&format!("ALTER TABLE {}{};\n", quote_identifier(table), renderer.render(partition)));
}

pub(crate) fn write_view(out: &mut String, view: &ViewState, or_replace: bool) {
    out.push_str(&serialize_statement(&view_statement(view, or_replace)));
}

/// Stored programs and sequences are emitted from their definition text.
pub(crate) fn write_definition(out: &mut String, definition: &str) {
    out.push_str(&serialize_statement(definition.trim()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::IndexKey;

    #[test]
    fn test_drop_writers() {
        let mut out = String::new();
        write_drop_object(&mut out, "TRIGGER", "trg");
        write_drop_foreign_key(&mut out, "t", "fk");
        write_drop_index(&mut out, "t", "idx");
        assert_eq!(
            out,
            "DROP TRIGGER IF EXISTS `trg`;\n\n\
             ALTER TABLE `t` DROP FOREIGN KEY `fk`;\n\n\
             DROP INDEX `idx` ON `t`;\n\n"
        );
    }

    #[test]
    fn test_placeholder_view() {
        let mut out = String::new();
        let mut view = ViewState {
            name: "v".to_string(),
            columns: vec!["a".to_string(), "b".to_string()],
            ..Default::default()
        };
        write_placeholder_view(&mut out, &view);
        view.columns.clear();
        write_placeholder_view(&mut out, &view);
        assert_eq!(
            out,
            "CREATE OR REPLACE VIEW `v` AS SELECT 1 AS `a`, 1 AS `b`;\n\
             CREATE OR REPLACE VIEW `v` AS SELECT 1;\n"
        );
    }

    #[test]
    fn test_create_index_variants() {
        let mut out = String::new();
        let index = IndexState {
            name: "ft".to_string(),
            keys: vec![IndexKey::column("body")],
            index_type: IndexType::Fulltext,
            comment: Some("it's".to_string()),
            ..Default::default()
        };
        write_add_index(&mut out, "docs", &index);
        assert_eq!(out, "CREATE FULLTEXT INDEX `ft` ON `docs` (`body`) COMMENT 'it\\'s';\n");
    }

    #[test]
    fn test_table_comment() {
        let mut out = String::new();
        write_table_comment(&mut out, "t", Some("a'b"));
        assert_eq!(out, "ALTER TABLE `t` COMMENT = 'a\\'b';\n");
    }
}
