//! Canonical DDL rendering
//!
//! Produces `SHOW CREATE TABLE` style text from snapshot state. Output is a
//! pure function of the state: columns by id, the primary key first and then
//! other indexes by name, foreign keys by name. Rendering the same state twice
//! gives byte-identical text, and extracting the rendered text gives the
//! state back.

mod partition;

pub use partition::{PartitionRenderer, ShowCreatePartitionRenderer};

use crate::model::{
    CheckConstraintState, ColumnDefault, ColumnState, DatabaseSnapshot, ForeignKeyState, IndexKey,
    IndexState, IndexType, RoutineState, SchemaSnapshot, TableState, TriggerState, ViewState,
    DEFAULT_REFERENCE_ACTION,
};
use crate::parser::identifier_utils::{escape_string, quote_identifier, quote_identifier_list, quote_literal};
use crate::parser::is_expression_default_only_type;

/// How string literals are written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LiteralStyle {
    /// `'it''s'`, as SHOW CREATE prints
    #[default]
    ShowCreate,
    /// `'it\'s'`, as mysqldump prints
    Backslash,
}

impl LiteralStyle {
    pub fn quote(self, value: &str) -> String {
        match self {
            LiteralStyle::ShowCreate => quote_literal(value),
            LiteralStyle::Backslash => format!("'{}'", escape_string(value)),
        }
    }
}

// ============================================================================
// Database
// ============================================================================

/// Render every object of the default schema.
pub fn serialize_database(snapshot: &DatabaseSnapshot) -> String {
    match snapshot.default_schema() {
        Some(schema) => serialize_schema(schema, &ShowCreatePartitionRenderer),
        None => String::new(),
    }
}

/// Render a schema: tables with their triggers, then views, functions,
/// procedures, events and sequences. Objects are separated by a blank line.
pub fn serialize_schema(schema: &SchemaSnapshot, renderer: &dyn PartitionRenderer) -> String {
    let mut blocks = Vec::new();
    for table in schema.tables.iter() {
        blocks.push(serialize_table_with(table, renderer));
        for trigger in table.triggers.iter() {
            blocks.push(serialize_trigger(trigger));
        }
    }
    for view in schema.views.iter() {
        blocks.push(serialize_view(view));
    }
    for routine in schema
        .functions
        .iter()
        .chain(schema.procedures.iter())
        .chain(schema.events.iter())
    {
        blocks.push(serialize_routine(routine));
    }
    for sequence in schema.sequences.iter() {
        blocks.push(serialize_statement(&sequence.definition));
    }
    blocks.join("\n")
}

// ============================================================================
// Tables
// ============================================================================

pub fn serialize_table(table: &TableState) -> String {
    serialize_table_with(table, &ShowCreatePartitionRenderer)
}

/// Render `CREATE TABLE ...;\n` with a caller-supplied partition renderer.
pub fn serialize_table_with(table: &TableState, renderer: &dyn PartitionRenderer) -> String {
    let mut out = format!("CREATE TABLE {} (\n  ", quote_identifier(&table.name));
    out.push_str(&table_elements(table, LiteralStyle::ShowCreate).join(",\n  "));
    out.push_str("\n)");
    out.push_str(&table_options(table, LiteralStyle::ShowCreate));
    if let Some(partition) = &table.partition {
        out.push_str(&renderer.render(partition));
    }
    out.push_str(";\n");
    out
}

/// Column, index, foreign key and check definitions in render order.
pub fn table_elements(table: &TableState, style: LiteralStyle) -> Vec<String> {
    let mut elements: Vec<String> = table
        .columns
        .iter()
        .map(|c| column_definition(c, style))
        .collect();
    elements.extend(table.sorted_indexes().into_iter().map(|i| index_definition(i, style)));
    elements.extend(table.foreign_keys.sorted_by_name().into_iter().map(foreign_key_definition));
    elements.extend(table.checks.iter().map(check_definition));
    elements
}

/// ` ENGINE=.. DEFAULT CHARSET=.. COLLATE=.. COMMENT '..'`
pub fn table_options(table: &TableState, style: LiteralStyle) -> String {
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
        out.push_str(&format!(" COMMENT {}", style.quote(comment)));
    }
    out
}

// ============================================================================
// Elements
// ============================================================================

/// `` `name` type [CHARACTER SET ..] [COLLATE ..] [NOT NULL] [DEFAULT ..] ... ``
pub fn column_definition(column: &ColumnState, style: LiteralStyle) -> String {
    let mut out = format!("{} {}", quote_identifier(&column.name), column.data_type);
    if let Some(charset) = &column.charset {
        out.push_str(&format!(" CHARACTER SET {}", charset));
    }
    if let Some(collation) = &column.collation {
        out.push_str(&format!(" COLLATE {}", collation));
    }
    if !column.nullable {
        out.push_str(" NOT NULL");
    }
    match &column.default {
        ColumnDefault::None => {}
        // BLOB/TEXT/JSON/GEOMETRY cannot carry DEFAULT NULL in SHOW CREATE output
        ColumnDefault::Null if column.nullable && is_expression_default_only_type(&column.data_type) => {}
        ColumnDefault::Null => out.push_str(" DEFAULT NULL"),
        ColumnDefault::Literal(value) => out.push_str(&format!(" DEFAULT {}", style.quote(value))),
        ColumnDefault::Expression(expr) => out.push_str(&format!(" DEFAULT {}", expr)),
        ColumnDefault::AutoIncrement => out.push_str(" AUTO_INCREMENT"),
        ColumnDefault::AutoRandom(params) if params.is_empty() => {
            out.push_str(" /*T![auto_rand] AUTO_RANDOM */")
        }
        ColumnDefault::AutoRandom(params) => {
            out.push_str(&format!(" /*T![auto_rand] AUTO_RANDOM({}) */", params))
        }
    }
    if let Some(on_update) = &column.on_update {
        out.push_str(&format!(" ON UPDATE {}", on_update));
    }
    if let Some(comment) = &column.comment {
        out.push_str(&format!(" COMMENT {}", style.quote(comment)));
    }
    out
}

fn key_part(key: &IndexKey) -> String {
    if key.is_expression() {
        return if key.descending {
            format!("{} DESC", key.column)
        } else {
            key.column.clone()
        };
    }
    let mut out = quote_identifier(&key.column);
    if let Some(length) = key.length {
        out.push_str(&format!("({})", length));
    }
    if key.descending {
        out.push_str(" DESC");
    }
    out
}

/// The `(k1,k2)` key list of an index.
pub fn index_keys(index: &IndexState) -> String {
    format!("({})", index_key_list(index, ","))
}

/// Key parts joined with `separator`, without the parentheses.
pub fn index_key_list(index: &IndexState, separator: &str) -> String {
    let keys: Vec<String> = index.keys.iter().map(key_part).collect();
    keys.join(separator)
}

/// `PRIMARY KEY (..)`, `UNIQUE KEY `n` (..)`, ... with index options.
pub fn index_definition(index: &IndexState, style: LiteralStyle) -> String {
    let mut out = if index.primary {
        format!("PRIMARY KEY {}", index_keys(index))
    } else {
        let prefix = match index.index_type {
            IndexType::Fulltext => "FULLTEXT KEY",
            IndexType::Spatial => "SPATIAL KEY",
            _ if index.unique => "UNIQUE KEY",
            _ => "KEY",
        };
        format!("{} {} {}", prefix, quote_identifier(&index.name), index_keys(index))
    };
    out.push_str(&index_options(index, style));
    out
}

/// ` USING HASH`, ` COMMENT '..'` and the invisibility marker.
pub fn index_options(index: &IndexState, style: LiteralStyle) -> String {
    let mut out = String::new();
    if index.index_type == IndexType::Hash {
        out.push_str(" USING HASH");
    }
    if let Some(comment) = &index.comment {
        out.push_str(&format!(" COMMENT {}", style.quote(comment)));
    }
    if !index.visible {
        out.push_str(" /*!80000 INVISIBLE */");
    }
    out
}

pub fn foreign_key_definition(fk: &ForeignKeyState) -> String {
    let referenced = match &fk.referenced_database {
        Some(database) => format!("{}.{}", quote_identifier(database), quote_identifier(&fk.referenced_table)),
        None => quote_identifier(&fk.referenced_table),
    };
    let mut out = format!(
        "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
        quote_identifier(&fk.name),
        quote_identifier_list(&fk.columns, ", "),
        referenced,
        quote_identifier_list(&fk.referenced_columns, ", "),
    );
    if fk.on_delete != DEFAULT_REFERENCE_ACTION {
        out.push_str(&format!(" ON DELETE {}", fk.on_delete));
    }
    if fk.on_update != DEFAULT_REFERENCE_ACTION {
        out.push_str(&format!(" ON UPDATE {}", fk.on_update));
    }
    out
}

pub fn check_definition(check: &CheckConstraintState) -> String {
    let mut out = format!("CONSTRAINT {} CHECK ({})", quote_identifier(&check.name), check.expression);
    if !check.enforced {
        out.push_str(" /*!80016 NOT ENFORCED */");
    }
    out
}

// ============================================================================
// Views and stored programs
// ============================================================================

pub fn serialize_view(view: &ViewState) -> String {
    serialize_statement(&view_statement(view, false))
}

/// `CREATE [OR REPLACE] VIEW `v` AS ...` without a terminator.
pub fn view_statement(view: &ViewState, or_replace: bool) -> String {
    let verb = if or_replace { "CREATE OR REPLACE VIEW" } else { "CREATE VIEW" };
    format!("{} {} AS {}", verb, quote_identifier(&view.name), view.definition.trim())
}

/// Stored programs are wrapped in `DELIMITER ;;` so their bodies survive.
pub fn serialize_routine(routine: &RoutineState) -> String {
    delimited(&routine.definition)
}

pub fn serialize_trigger(trigger: &TriggerState) -> String {
    delimited(&trigger.definition)
}

fn delimited(definition: &str) -> String {
    let body = definition.trim_end();
    let mut out = String::from("DELIMITER ;;\n");
    out.push_str(body);
    if !body.ends_with(";;") {
        out.push_str(" ;;");
    }
    out.push_str("\nDELIMITER ;\n");
    out
}

/// Terminate a single statement with `;\n`.
pub fn serialize_statement(text: &str) -> String {
    let text = text.trim_end();
    if text.ends_with(';') {
        format!("{}\n", text)
    } else {
        format!("{};\n", text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{IndexKey, PRIMARY_KEY_NAME};
    use pretty_assertions::assert_eq;

    fn sample_table() -> TableState {
        let mut table = TableState::new("orders");
        let mut id = ColumnState::new("id", "int");
        id.nullable = false;
        id.default = ColumnDefault::AutoIncrement;
        let mut note = ColumnState::new("note", "varchar(20)");
        note.default = ColumnDefault::Literal("it's".to_string());
        note.comment = Some("free text".to_string());
        let mut body = ColumnState::new("body", "text");
        body.default = ColumnDefault::Null;
        table.columns.push(id).unwrap();
        table.columns.push(note).unwrap();
        table.columns.push(body).unwrap();
        table
            .indexes
            .push(IndexState {
                name: "note".to_string(),
                keys: vec![IndexKey {
                    column: "note".to_string(),
                    length: Some(10),
                    descending: true,
                }],
                unique: true,
                ..Default::default()
            })
            .unwrap();
        table
            .indexes
            .push(IndexState {
                name: PRIMARY_KEY_NAME.to_string(),
                keys: vec![IndexKey::column("id")],
                primary: true,
                unique: true,
                ..Default::default()
            })
            .unwrap();
        table.engine = Some("InnoDB".to_string());
        table.comment = Some("orders".to_string());
        table
    }

    #[test]
    fn test_serialize_table() {
        assert_eq!(
            serialize_table(&sample_table()),
            "CREATE TABLE `orders` (\n  \
             `id` int NOT NULL AUTO_INCREMENT,\n  \
             `note` varchar(20) DEFAULT 'it''s' COMMENT 'free text',\n  \
             `body` text,\n  \
             PRIMARY KEY (`id`),\n  \
             UNIQUE KEY `note` (`note`(10) DESC)\n\
             ) ENGINE=InnoDB COMMENT 'orders';\n"
        );
    }

    #[test]
    fn test_serialize_is_deterministic() {
        let table = sample_table();
        assert_eq!(serialize_table(&table), serialize_table(&table.clone()));
    }

    #[test]
    fn test_backslash_style() {
        let table = sample_table();
        let note = table.columns.get("note").unwrap();
        assert_eq!(
            column_definition(note, LiteralStyle::Backslash),
            "`note` varchar(20) DEFAULT 'it\\'s' COMMENT 'free text'"
        );
        let mut zero = ColumnState::new("n", "int");
        zero.default = ColumnDefault::Literal("0".to_string());
        assert_eq!(column_definition(&zero, LiteralStyle::Backslash), "`n` int DEFAULT '0'");
        assert_eq!(column_definition(&zero, LiteralStyle::ShowCreate), "`n` int DEFAULT '0'");
    }

    #[test]
    fn test_auto_random_and_on_update() {
        let mut id = ColumnState::new("id", "bigint");
        id.nullable = false;
        id.default = ColumnDefault::AutoRandom("5".to_string());
        assert_eq!(
            column_definition(&id, LiteralStyle::ShowCreate),
            "`id` bigint NOT NULL /*T![auto_rand] AUTO_RANDOM(5) */"
        );

        let mut ts = ColumnState::new("ts", "timestamp");
        ts.default = ColumnDefault::Expression("CURRENT_TIMESTAMP".to_string());
        ts.on_update = Some("CURRENT_TIMESTAMP".to_string());
        assert_eq!(
            column_definition(&ts, LiteralStyle::ShowCreate),
            "`ts` timestamp DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP"
        );
    }

    #[test]
    fn test_foreign_key_and_check() {
        let fk = ForeignKeyState {
            name: "fk_user".to_string(),
            columns: vec!["user_id".to_string()],
            referenced_table: "users".to_string(),
            referenced_columns: vec!["id".to_string()],
            on_delete: "CASCADE".to_string(),
            on_update: DEFAULT_REFERENCE_ACTION.to_string(),
            ..Default::default()
        };
        assert_eq!(
            foreign_key_definition(&fk),
            "CONSTRAINT `fk_user` FOREIGN KEY (`user_id`) REFERENCES `users` (`id`) ON DELETE CASCADE"
        );
        let check = CheckConstraintState {
            name: "c1".to_string(),
            expression: "qty > 0".to_string(),
            enforced: false,
            ..Default::default()
        };
        assert_eq!(
            check_definition(&check),
            "CONSTRAINT `c1` CHECK (qty > 0) /*!80016 NOT ENFORCED */"
        );
    }

    #[test]
    fn test_invisible_hash_index() {
        let index = IndexState {
            name: "idx".to_string(),
            keys: vec![IndexKey::column("a"), IndexKey::expression("(lower(b))".to_string())],
            visible: false,
            index_type: IndexType::Hash,
            ..Default::default()
        };
        assert_eq!(
            index_definition(&index, LiteralStyle::ShowCreate),
            "KEY `idx` (`a`,(lower(b))) USING HASH /*!80000 INVISIBLE */"
        );
    }

    #[test]
    fn test_routine_and_view() {
        let routine = RoutineState {
            id: 1,
            name: "p".to_string(),
            definition: "CREATE PROCEDURE p() BEGIN SELECT 1; END".to_string(),
        };
        assert_eq!(
            serialize_routine(&routine),
            "DELIMITER ;;\nCREATE PROCEDURE p() BEGIN SELECT 1; END ;;\nDELIMITER ;\n"
        );
        let view = ViewState {
            id: 1,
            name: "v".to_string(),
            definition: "SELECT 1".to_string(),
            columns: Vec::new(),
        };
        assert_eq!(serialize_view(&view), "CREATE VIEW `v` AS SELECT 1;\n");
    }
}
