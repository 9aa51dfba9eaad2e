//! Tests for the rust-schemadiff command line

use std::process::{Command, Output};

use crate::common::TestContext;

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_rust-schemadiff"))
        .args(args)
        .output()
        .expect("Failed to run rust-schemadiff")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn arg(path: &std::path::Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn test_check_reports_first_error() {
    let ctx = TestContext::with_fixture("shop");
    let output = run(&[
        "check",
        "--baseline",
        arg(&ctx.path("v1.sql")),
        "--migration",
        arg(&ctx.path("upgrade.sql")),
    ]);
    assert!(!output.status.success());
    assert!(stdout(&output).contains("line 4: error [805]"), "{}", stdout(&output));
}

#[test]
fn test_check_clean_script() {
    let ctx = TestContext::with_fixture("shop");
    let script = ctx.write("ok.sql", "ALTER TABLE users ADD COLUMN age INT AFTER email;\n");
    let output = run(&["check", "--baseline", arg(&ctx.path("v1.sql")), "--migration", arg(&script)]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout(&output).contains("OK: 1 statements applied"));
}

#[test]
fn test_migrate_command() {
    let ctx = TestContext::with_fixture("shop");
    let output = run(&["migrate", "--from", arg(&ctx.path("v1.sql")), "--to", arg(&ctx.path("v2.sql"))]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout(&output).contains("DROP TABLE IF EXISTS `audit_log`;"));
}

#[test]
fn test_metadata_then_serialize() {
    let ctx = TestContext::with_fixture("shop");
    let json = ctx.path("v1.json");
    let output = run(&["metadata", "--input", arg(&ctx.path("v1.sql")), "--output", arg(&json)]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let output = run(&["serialize", "--input", arg(&json)]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("CREATE TABLE `users` ("));
}

#[test]
fn test_diff_command_reports_no_changes() {
    let ctx = TestContext::with_fixture("shop");
    let v1 = ctx.path("v1.sql");
    let output = run(&["diff", "--from", arg(&v1), "--to", arg(&v1)]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("No changes."));
}

#[test]
fn test_unknown_engine_fails() {
    let ctx = TestContext::with_fixture("shop");
    let v1 = ctx.path("v1.sql");
    let output = run(&["--engine", "oracle", "diff", "--from", arg(&v1), "--to", arg(&v1)]);
    assert!(!output.status.success());
}
