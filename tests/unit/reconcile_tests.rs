//! Unit tests for design-schema reconciliation

use pretty_assertions::assert_eq;
use rust_schemadiff::reconcile::{apply_edits, reconcile, TextEdit};
use rust_schemadiff::serializer::serialize_database;

use crate::common::{diff_of, read_fixture, snapshot};

const DESIGN: &str = "-- Shop schema, maintained by hand\n\
\n\
-- Accounts\n\
CREATE TABLE `users` (\n  \
  `id` int NOT NULL AUTO_INCREMENT, -- surrogate\n  \
  `email` varchar(255) NOT NULL,\n  \
  PRIMARY KEY (`id`)\n\
) ENGINE=InnoDB;\n\
\n\
-- Scratch area\n\
CREATE TABLE `tmp` (\n  \
  `x` int DEFAULT NULL\n\
);\n";

#[test]
fn test_reconcile_to_itself_is_identity() {
    let target = snapshot(DESIGN);
    assert_eq!(reconcile(DESIGN, &target).unwrap(), DESIGN);
}

#[test]
fn test_reconcile_keeps_hand_comments() {
    let target = snapshot(
        "CREATE TABLE users (id INT NOT NULL AUTO_INCREMENT, email VARCHAR(255) NOT NULL, \
         nick VARCHAR(20), PRIMARY KEY (id)) ENGINE=InnoDB;",
    );
    let out = reconcile(DESIGN, &target).unwrap();

    assert!(out.starts_with("-- Shop schema, maintained by hand\n\n-- Accounts\n"));
    assert!(out.contains("`id` int NOT NULL AUTO_INCREMENT, -- surrogate\n"), "{}", out);
    assert!(out.contains("`email` varchar(255) NOT NULL,\n  `nick` varchar(20) DEFAULT NULL,\n"), "{}", out);
    assert!(!out.contains("CREATE TABLE `tmp`"), "{}", out);
    assert!(diff_of(&snapshot(&out), &target).is_empty());
}

#[test]
fn test_reconcile_fixture_to_next_version() {
    let baseline = read_fixture("shop", "v1.sql");
    let target = snapshot(&read_fixture("shop", "v2.sql"));

    let out = reconcile(&baseline, &target).unwrap();
    assert!(out.contains("-- Table structure for `orders`"), "{}", out);
    assert!(!out.contains("audit_log"), "{}", out);
    assert!(diff_of(&snapshot(&out), &target).is_empty(), "{}", out);
}

#[test]
fn test_canonical_text_is_stable() {
    let target = snapshot(&read_fixture("shop", "v2.sql"));
    let canonical = serialize_database(&target);
    assert_eq!(reconcile(&canonical, &target).unwrap(), canonical);
}

#[test]
fn test_apply_edits_rejects_out_of_range() {
    let result = apply_edits("abc", vec![TextEdit::replace(2..10, "x")]);
    assert!(result.is_err());
}
