//! Unit tests for the catalog walk-through

use pretty_assertions::assert_eq;
use rust_schemadiff::diff::Action;
use rust_schemadiff::migration::generate_migration;
use rust_schemadiff::model::ColumnDefault;
use rust_schemadiff::parser::parse_sql;
use rust_schemadiff::walk_through::{walk_through, DiagnosticCode, ErrorPolicy, Severity, WalkThroughOptions};
use rust_schemadiff::DatabaseSnapshot;

use crate::common::{diff_of, read_fixture, snapshot, walk};

#[test]
fn test_upgrade_script_stops_at_rename_conflict() {
    let mut db = snapshot(&read_fixture("shop", "v1.sql"));
    let report = walk(&mut db, &read_fixture("shop", "upgrade.sql"));

    let error = report.error().unwrap();
    assert_eq!(error.code, DiagnosticCode::IndexExists);
    assert_eq!(error.code.code(), 805);
    assert_eq!(error.severity, Severity::Error);
    assert_eq!(error.line, 4);
    assert!(report.aborted);
    assert_eq!(report.applied, 3);

    let users = db.table("users").unwrap();
    assert_eq!(users.columns.names().collect::<Vec<_>>(), vec!["id", "email", "age", "name"]);
    assert!(users.indexes.contains("idx_name"));
    assert!(db.table("audit_log").is_none());
}

#[test]
fn test_diagnostic_display() {
    let mut db = DatabaseSnapshot::new("", false);
    let report = walk(&mut db, "CREATE TABLE t (a INT);\n\nDROP TABLE missing;");
    let rendered = report.error().unwrap().to_string();
    assert!(rendered.starts_with("line 3: error [604]"), "{}", rendered);
}

#[test]
fn test_skip_statement_collects_every_error() {
    let mut db = DatabaseSnapshot::new("", false);
    let statements = parse_sql(
        "DROP TABLE a;\n\
         CREATE TABLE t (id INT);\n\
         ALTER TABLE t DROP COLUMN missing;\n\
         ALTER TABLE t ADD COLUMN name VARCHAR(20);",
    )
    .unwrap();
    let options = WalkThroughOptions {
        error_policy: ErrorPolicy::SkipStatement,
        ..Default::default()
    };
    let report = walk_through(&mut db, &statements, &options);

    let codes: Vec<DiagnosticCode> = report.diagnostics.iter().map(|d| d.code).collect();
    assert_eq!(codes, vec![DiagnosticCode::TableNotExists, DiagnosticCode::ColumnNotExists]);
    assert!(!report.aborted);
    assert_eq!(
        db.table("t").unwrap().columns.names().collect::<Vec<_>>(),
        vec!["id", "name"]
    );
}

#[test]
fn test_walk_through_matches_extraction() {
    let script = "CREATE TABLE p (id INT PRIMARY KEY);\n\
                  CREATE TABLE c (id INT PRIMARY KEY, pid INT, CONSTRAINT fk_p FOREIGN KEY (pid) REFERENCES p (id));\n\
                  CREATE VIEW v AS SELECT id FROM c;";
    let mut walked = DatabaseSnapshot::new("", false);
    let report = walk(&mut walked, script);
    assert!(report.diagnostics.is_empty(), "{:?}", report.diagnostics);

    let extracted = snapshot(script);
    assert!(diff_of(&walked, &extracted).is_empty());
    assert!(walked.table("c").unwrap().indexes.contains("fk_p"));
}

#[test]
fn test_empty_snapshot_rejects_table_statements() {
    let mut db = DatabaseSnapshot::new("", false);
    db.schemas.clear();
    let report = walk(&mut db, "CREATE TABLE t (id INT);");
    assert_eq!(report.error().unwrap().code, DiagnosticCode::SchemaNotExists);
}

#[test]
fn test_add_column_after_diff_and_reverse_migration() {
    let original = snapshot("CREATE TABLE t (id INT PRIMARY KEY, name VARCHAR(20));");
    let mut mutated = original.clone();
    let report = walk(&mut mutated, "ALTER TABLE t ADD COLUMN age INT AFTER id;");
    assert!(report.diagnostics.is_empty());

    let table = mutated.table("t").unwrap();
    let columns: Vec<(usize, &str)> = table.columns.iter().map(|c| (c.id, c.name.as_str())).collect();
    assert_eq!(columns, vec![(1, "id"), (2, "age"), (3, "name")]);

    let forward = diff_of(&original, &mutated);
    assert_eq!(forward.change_count(), 1);
    assert_eq!(forward.tables.len(), 1);
    assert_eq!(forward.tables[0].action, Action::Alter);
    assert_eq!(forward.tables[0].columns.len(), 1);
    let age = forward.tables[0].columns[0].new.as_ref().unwrap();
    assert_eq!(forward.tables[0].columns[0].action, Action::Create);
    assert_eq!((age.id, age.name.as_str()), (2, "age"));

    let reverse = generate_migration(&diff_of(&mutated, &original)).unwrap();
    assert_eq!(reverse.trim_end(), "ALTER TABLE `t` DROP COLUMN `age`;");
}

#[test]
fn test_drop_default_matches_extracted_column() {
    let mut walked = snapshot("CREATE TABLE t (id INT PRIMARY KEY, c INT DEFAULT 5, d INT NOT NULL DEFAULT 1);");
    let report = walk(
        &mut walked,
        "ALTER TABLE t ALTER COLUMN c DROP DEFAULT;\nALTER TABLE t ALTER COLUMN d DROP DEFAULT;",
    );
    assert!(report.diagnostics.is_empty(), "{:?}", report.diagnostics);

    let table = walked.table("t").unwrap();
    assert_eq!(table.columns.get("c").unwrap().default, ColumnDefault::Null);
    assert_eq!(table.columns.get("d").unwrap().default, ColumnDefault::None);

    let extracted = snapshot("CREATE TABLE t (id INT PRIMARY KEY, c INT, d INT NOT NULL);");
    assert!(diff_of(&walked, &extracted).is_empty());
}

#[test]
fn test_numeric_string_default_survives_migration() {
    let before = snapshot("CREATE TABLE t (id INT PRIMARY KEY, price DECIMAL(10,2) NOT NULL DEFAULT '0.00');");
    let after = snapshot("CREATE TABLE t (id INT PRIMARY KEY, price DECIMAL(10,2) NOT NULL DEFAULT '1.50');");

    let forward = generate_migration(&diff_of(&before, &after)).unwrap();
    assert!(forward.contains("DEFAULT '1.50'"), "{}", forward);
    let mut live = before.clone();
    let report = walk(&mut live, &forward);
    assert!(report.diagnostics.is_empty(), "{:?}", report.diagnostics);
    assert!(diff_of(&live, &after).is_empty(), "{}", forward);

    let reverse = generate_migration(&diff_of(&live, &before)).unwrap();
    let report = walk(&mut live, &reverse);
    assert!(report.diagnostics.is_empty(), "{:?}", report.diagnostics);
    assert!(diff_of(&live, &before).is_empty(), "{}", reverse);
}
