//! Error types for rust-schemadiff

use std::path::PathBuf;
use thiserror::Error;

/// Hard failures: the schema cannot be processed.
///
/// Semantic problems found while simulating DDL are not errors of this kind;
/// they are reported as [`crate::walk_through::Diagnostic`] values instead.
#[derive(Error, Debug)]
pub enum SchemaDiffError {
    #[error("Failed to read SQL file: {path}")]
    SqlFileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("SQL parse error at line {line}, column {column}: {message}")]
    SqlParseError {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("Duplicate {kind} `{name}` in {scope}")]
    DuplicateObject {
        kind: &'static str,
        name: String,
        scope: String,
    },

    #[error("Multiple database names found: {first}, {second}")]
    ConflictingDatabaseNames { first: String, second: String },

    #[error("Invalid partition definition for table `{table}`: {message}")]
    InvalidPartition { table: String, message: String },

    #[error("Failed to decode metadata message: {message}")]
    MetadataDecodeError { message: String },

    #[error("Malformed {kind} diff: {message}")]
    MalformedDiff { kind: String, message: String },

    #[error("Overlapping text edits at byte offset {offset}")]
    OverlappingEdits { offset: usize },

    #[error("Unknown engine: {name}")]
    UnknownEngine { name: String },
}

impl From<serde_json::Error> for SchemaDiffError {
    fn from(err: serde_json::Error) -> Self {
        SchemaDiffError::MetadataDecodeError {
            message: err.to_string(),
        }
    }
}
