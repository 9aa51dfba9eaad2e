//! Unit tests for metadata extraction and the metadata message

use std::io::Write;

use pretty_assertions::assert_eq;
use rust_schemadiff::model::{message, ColumnDefault};
use rust_schemadiff::{parse_to_metadata, SchemaDiffError};
use tempfile::NamedTempFile;

use crate::common::{read_fixture, snapshot};

/// Helper to create a temp SQL file with content
fn create_sql_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::with_suffix(".sql").unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

// ============================================================================
// Extraction
// ============================================================================

#[test]
fn test_extract_fixture() {
    let snapshot = snapshot(&read_fixture("shop", "v1.sql"));
    assert_eq!(snapshot.table_count(), 2);

    let users = snapshot.table("users").unwrap();
    assert_eq!(users.columns.names().collect::<Vec<_>>(), vec!["id", "email", "name"]);
    assert_eq!(users.columns.get("id").unwrap().default, ColumnDefault::AutoIncrement);
    assert_eq!(users.columns.get("name").unwrap().data_type, "varchar(100)");
    assert!(users.primary_key().is_some());
    assert!(users.indexes.get("uk_email").unwrap().unique);
    assert_eq!(users.engine.as_deref(), Some("InnoDB"));

    let schema = snapshot.default_schema().unwrap();
    assert_eq!(schema.views.get("active_users").unwrap().columns, vec!["id", "email"]);
}

#[test]
fn test_extract_from_file_strips_bom() {
    let file = create_sql_file("\u{FEFF}CREATE TABLE t (id INT);");
    let statements = rust_schemadiff::parser::parse_sql_file(file.path()).unwrap();
    assert_eq!(statements.len(), 1);
}

#[test]
fn test_missing_file_is_read_error() {
    let result = rust_schemadiff::parser::read_sql_file(std::path::Path::new("/nonexistent/schema.sql"));
    assert!(matches!(result, Err(SchemaDiffError::SqlFileReadError { .. })));
}

#[test]
fn test_unterminated_string_reports_position() {
    let err = parse_to_metadata("CREATE TABLE t (id INT);\nCREATE TABLE u (a VARCHAR(10) DEFAULT 'x);").unwrap_err();
    match err {
        SchemaDiffError::SqlParseError { line, .. } => assert_eq!(line, 2),
        other => panic!("Expected a parse error, got {:?}", other),
    }
}

#[test]
fn test_table_names_case_insensitive_by_default() {
    let snapshot = snapshot("CREATE TABLE Users (id INT);");
    assert!(snapshot.table("users").is_some());
    assert!(!snapshot.case_sensitive_tables);
}

// ============================================================================
// Metadata message
// ============================================================================

#[test]
fn test_message_preserves_snapshot() {
    let original = snapshot(&read_fixture("shop", "v2.sql"));
    let json = message::to_json(&original).unwrap();
    let decoded = message::from_json(&json).unwrap();
    assert_eq!(decoded, original);
}

#[test]
fn test_message_rejects_garbage() {
    assert!(matches!(
        message::from_json("{\"schemas\": 42}"),
        Err(SchemaDiffError::MetadataDecodeError { .. })
    ));
}
