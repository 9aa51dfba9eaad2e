//! End-to-end tests across extraction, walk-through, diff and migration

use pretty_assertions::assert_eq;
use rust_schemadiff::migration::generate_migration;
use rust_schemadiff::model::message;
use rust_schemadiff::serializer::serialize_database;
use rust_schemadiff::{load_snapshot, migrate, Engine, EngineRegistry, MigrateOptions};

use crate::common::{diff_of, read_fixture, snapshot, walk, TestContext};

#[test]
fn test_migration_applies_cleanly_and_rolls_back() {
    let v1 = snapshot(&read_fixture("shop", "v1.sql"));
    let v2 = snapshot(&read_fixture("shop", "v2.sql"));

    let upgrade = generate_migration(&diff_of(&v1, &v2)).unwrap();
    let mut live = v1.clone();
    let report = walk(&mut live, &upgrade);
    assert!(report.diagnostics.is_empty(), "{:?}\n{}", report.diagnostics, upgrade);
    assert!(diff_of(&live, &v2).is_empty(), "upgrade did not reach v2:\n{}", upgrade);

    let rollback = generate_migration(&diff_of(&live, &v1)).unwrap();
    let report = walk(&mut live, &rollback);
    assert!(report.diagnostics.is_empty(), "{:?}\n{}", report.diagnostics, rollback);
    assert!(diff_of(&live, &v1).is_empty(), "rollback did not reach v1:\n{}", rollback);
}

#[test]
fn test_canonical_text_round_trips() {
    let original = snapshot(&read_fixture("shop", "v2.sql"));
    let canonical = serialize_database(&original);
    let reparsed = snapshot(&canonical);
    assert!(diff_of(&original, &reparsed).is_empty());
    assert_eq!(serialize_database(&reparsed), canonical);
}

#[test]
fn test_load_snapshot_from_sql_and_json() {
    let ctx = TestContext::with_fixture("shop");
    let registry = EngineRegistry::with_defaults();
    let engine = registry.get(Engine::MySql).unwrap();

    let from_sql = load_snapshot(&ctx.path("v2.sql"), engine).unwrap();
    let json_path = ctx.write("v2.json", &message::to_json(&from_sql).unwrap());
    let from_json = load_snapshot(&json_path, engine).unwrap();
    assert_eq!(from_json, from_sql);
}

#[test]
fn test_load_snapshot_missing_file() {
    let ctx = TestContext::new();
    let registry = EngineRegistry::with_defaults();
    let engine = registry.get(Engine::MySql).unwrap();
    let err = load_snapshot(&ctx.path("absent.sql"), engine).unwrap_err();
    assert!(err.to_string().contains("absent.sql"), "{}", err);
}

#[test]
fn test_migrate_writes_output_file() {
    let ctx = TestContext::with_fixture("shop");
    let registry = EngineRegistry::with_defaults();
    let options = MigrateOptions {
        from_path: ctx.path("v1.sql"),
        to_path: ctx.path("v2.sql"),
        output_path: Some(ctx.path("upgrade_generated.sql")),
        engine: Engine::MySql,
    };

    let script = migrate(&options, &registry).unwrap();
    assert!(!script.is_empty());
    assert_eq!(ctx.read("upgrade_generated.sql"), script);
}

#[test]
fn test_migrate_between_identical_schemas_is_empty() {
    let ctx = TestContext::with_fixture("shop");
    let options = MigrateOptions {
        from_path: ctx.path("v1.sql"),
        to_path: ctx.path("v1.sql"),
        output_path: None,
        engine: Engine::TiDb,
    };
    assert_eq!(migrate(&options, &EngineRegistry::default()).unwrap(), "");
}

#[test]
fn test_load_snapshot_from_directory() {
    let ctx = TestContext::new();
    ctx.write("01_users.sql", "CREATE TABLE users (id INT PRIMARY KEY);");
    ctx.write("02_orders.sql", "CREATE TABLE orders (id INT PRIMARY KEY, user_id INT);");
    ctx.write("notes.txt", "not sql");

    let registry = EngineRegistry::with_defaults();
    let loaded = load_snapshot(&ctx.dir, registry.get(Engine::MySql).unwrap()).unwrap();
    assert_eq!(loaded.table_count(), 2);
    assert!(loaded.table("orders").is_some());
}
