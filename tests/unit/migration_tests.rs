//! Unit tests for diffing and migration generation

use pretty_assertions::assert_eq;
use rust_schemadiff::diff::report::format_report;
use rust_schemadiff::diff::Action;
use rust_schemadiff::migration::generate_migration;

use crate::common::{diff_of, read_fixture, snapshot};

fn migrate(from: &str, to: &str) -> String {
    generate_migration(&diff_of(&snapshot(from), &snapshot(to))).unwrap()
}

fn position(script: &str, needle: &str) -> usize {
    script
        .find(needle)
        .unwrap_or_else(|| panic!("`{}` not found in:\n{}", needle, script))
}

// ============================================================================
// Diff
// ============================================================================

#[test]
fn test_diff_of_identical_fixture_is_empty() {
    let v1 = snapshot(&read_fixture("shop", "v1.sql"));
    let result = diff_of(&v1, &v1.clone());
    assert!(result.is_empty());
    assert_eq!(format_report(&result), "=== Schema Diff Report ===\nNo changes.\n");
}

#[test]
fn test_diff_between_fixture_versions() {
    let v1 = snapshot(&read_fixture("shop", "v1.sql"));
    let v2 = snapshot(&read_fixture("shop", "v2.sql"));
    let result = diff_of(&v1, &v2);

    let tables: Vec<(Action, &str)> = result.tables.iter().map(|t| (t.action, t.name())).collect();
    assert!(tables.contains(&(Action::Drop, "audit_log")));
    assert!(tables.contains(&(Action::Create, "orders")));
    assert!(tables.contains(&(Action::Alter, "users")));

    let users = result.tables.iter().find(|t| t.name() == "users").unwrap();
    assert_eq!(users.columns.len(), 1);
    assert_eq!(users.columns[0].action, Action::Create);
    assert_eq!(users.columns[0].name(), "age");
    assert_eq!(users.indexes.len(), 1);

    assert_eq!(result.views.len(), 1);
    assert_eq!(result.views[0].action, Action::Alter);

    let report = format_report(&result);
    assert!(report.contains("- table `audit_log`"), "{}", report);
    assert!(report.contains("+ table `orders`"), "{}", report);
    assert!(report.contains("    + column `age` int"), "{}", report);
}

#[test]
fn test_diff_is_deterministic() {
    let v1 = snapshot(&read_fixture("shop", "v1.sql"));
    let v2 = snapshot(&read_fixture("shop", "v2.sql"));
    assert_eq!(diff_of(&v1, &v2), diff_of(&v1, &v2));
}

// ============================================================================
// Migration
// ============================================================================

#[test]
fn test_add_column_after_and_reverse() {
    let before = "CREATE TABLE t (id INT, name VARCHAR(20));";
    let after = "CREATE TABLE t (id INT, age INT, name VARCHAR(20));";
    assert_eq!(
        migrate(before, after),
        "ALTER TABLE `t` ADD COLUMN `age` int DEFAULT NULL AFTER `id`;\n"
    );
    assert_eq!(migrate(after, before).trim_end(), "ALTER TABLE `t` DROP COLUMN `age`;");
}

#[test]
fn test_fixture_migration_order() {
    let script = migrate(&read_fixture("shop", "v1.sql"), &read_fixture("shop", "v2.sql"));

    let drop_table = position(&script, "DROP TABLE IF EXISTS `audit_log`;");
    let create_table = position(&script, "CREATE TABLE IF NOT EXISTS `orders`");
    let add_column = position(&script, "ALTER TABLE `users` ADD COLUMN `age` int DEFAULT NULL AFTER `email`;");
    let create_index = position(&script, "CREATE INDEX `idx_name` ON `users` (`name`);");
    let view = position(
        &script,
        "CREATE OR REPLACE VIEW `active_users` AS SELECT id, email, age FROM users;",
    );

    assert!(drop_table < create_table);
    assert!(drop_table < add_column);
    assert!(create_table < view && add_column < view && create_index < view);
}

#[test]
fn test_migration_is_deterministic() {
    let v1 = read_fixture("shop", "v1.sql");
    let v2 = read_fixture("shop", "v2.sql");
    assert_eq!(migrate(&v1, &v2), migrate(&v1, &v2));
}

#[test]
fn test_dropped_table_takes_its_triggers_first() {
    let script = migrate(
        "CREATE TABLE t (id INT, v INT); CREATE TRIGGER trg BEFORE INSERT ON t FOR EACH ROW SET NEW.v = 1;",
        "",
    );
    assert!(position(&script, "DROP TRIGGER IF EXISTS `trg`;") < position(&script, "DROP TABLE IF EXISTS `t`;"));
}
