//! rust-schemadiff: schema tooling for MySQL-family databases
//!
//! This library extracts a catalog snapshot from DDL text, simulates DDL
//! against a snapshot with precise diagnostics, diffs two snapshots,
//! generates the migration between them, and reconciles a hand-maintained
//! schema file with a target snapshot.

pub mod diff;
pub mod engine;
pub mod error;
pub mod migration;
pub mod model;
pub mod parser;
pub mod reconcile;
pub mod serializer;
pub mod walk_through;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

pub use engine::{Engine, EngineRegistry, SchemaEngine};
pub use error::SchemaDiffError;
pub use model::DatabaseSnapshot;

/// Extract a snapshot from a MySQL DDL script.
pub fn parse_to_metadata(text: &str) -> Result<DatabaseSnapshot, SchemaDiffError> {
    let statements = parser::parse_sql(text)?;
    model::build_snapshot(&statements, &model::ExtractOptions::default())
}

/// Load a snapshot from a `.json` metadata message, a `.sql` script, or a
/// directory whose `.sql` files (in name order) together form one schema.
pub fn load_snapshot(path: &Path, engine: &dyn SchemaEngine) -> Result<DatabaseSnapshot> {
    if path.is_dir() {
        return load_directory(path);
    }

    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    if is_json {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read metadata file: {}", path.display()))?;
        let snapshot = model::message::from_json(&text)
            .with_context(|| format!("Failed to decode {}", path.display()))?;
        Ok(snapshot)
    } else {
        let text = parser::read_sql_file(path)?;
        let snapshot = engine
            .parse_to_metadata(&text)
            .with_context(|| format!("Failed to extract metadata from {}", path.display()))?;
        Ok(snapshot)
    }
}

fn load_directory(dir: &Path) -> Result<DatabaseSnapshot> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("Failed to read directory: {}", dir.display()))? {
        let path = entry?.path();
        let is_sql = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("sql"));
        if is_sql && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    info!(files = files.len(), dir = %dir.display(), "loading schema directory");

    let statements = parser::parse_sql_files(&files)?;
    let snapshot = model::build_snapshot(&statements, &model::ExtractOptions::default())
        .with_context(|| format!("Failed to extract metadata from {}", dir.display()))?;
    Ok(snapshot)
}

/// Options for generating a migration between two schema files
#[derive(Debug, Clone)]
pub struct MigrateOptions {
    /// Current schema (`.sql` or `.json`)
    pub from_path: PathBuf,
    /// Desired schema (`.sql` or `.json`)
    pub to_path: PathBuf,
    /// Where to write the script; returned only when `None`
    pub output_path: Option<PathBuf>,
    pub engine: Engine,
}

/// Generate the migration script from `from_path` to `to_path`.
pub fn migrate(options: &MigrateOptions, registry: &EngineRegistry) -> Result<String> {
    let engine = registry.get(options.engine)?;

    let before = load_snapshot(&options.from_path, engine)?;
    let after = load_snapshot(&options.to_path, engine)?;
    let diff = engine.diff(&before, &after)?;
    info!(changes = diff.change_count(), "diffed schemas");

    let script = engine.generate_migration(&diff)?;
    if let Some(output) = &options.output_path {
        std::fs::write(output, &script)
            .with_context(|| format!("Failed to write migration: {}", output.display()))?;
        info!(path = %output.display(), "wrote migration");
    }
    Ok(script)
}
