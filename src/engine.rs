//! Engine registry
//!
//! Every operation is reachable through a [`SchemaEngine`] looked up by
//! [`Engine`]. MySQL and TiDB share one implementation; TiDB additionally
//! accepts the AUTO_RANDOM column attribute.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::diff::{self, DiffOptions, MetadataDiff};
use crate::error::SchemaDiffError;
use crate::migration;
use crate::model::{build_snapshot, DatabaseSnapshot, ExtractOptions};
use crate::parser::parse_sql;
use crate::reconcile;
use crate::walk_through::{self, ErrorPolicy, WalkThroughOptions, WalkThroughReport};

/// Supported database engines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Engine {
    MySql,
    TiDb,
}

impl Engine {
    pub fn as_str(&self) -> &'static str {
        match self {
            Engine::MySql => "mysql",
            Engine::TiDb => "tidb",
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Engine {
    type Err = SchemaDiffError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mysql" => Ok(Engine::MySql),
            "tidb" => Ok(Engine::TiDb),
            _ => Err(SchemaDiffError::UnknownEngine { name: s.to_string() }),
        }
    }
}

/// The operations one engine provides
pub trait SchemaEngine: Send + Sync {
    fn engine(&self) -> Engine;

    /// Extract a snapshot from a DDL script.
    fn parse_to_metadata(&self, text: &str) -> Result<DatabaseSnapshot, SchemaDiffError>;

    /// Apply a DDL script to `snapshot`, collecting diagnostics.
    ///
    /// Only a script that cannot be parsed is a hard failure.
    fn walk_through(
        &self,
        snapshot: &mut DatabaseSnapshot,
        text: &str,
        policy: ErrorPolicy,
    ) -> Result<WalkThroughReport, SchemaDiffError>;

    fn diff(&self, before: &DatabaseSnapshot, after: &DatabaseSnapshot) -> Result<MetadataDiff, SchemaDiffError>;

    fn generate_migration(&self, diff: &MetadataDiff) -> Result<String, SchemaDiffError>;

    fn reconcile(&self, baseline: &str, target: &DatabaseSnapshot) -> Result<String, SchemaDiffError>;
}

/// MySQL-compatible engines
#[derive(Debug, Clone, Copy)]
pub struct MySqlFamilyEngine {
    engine: Engine,
    allow_auto_random: bool,
}

impl MySqlFamilyEngine {
    pub fn mysql() -> Self {
        Self {
            engine: Engine::MySql,
            allow_auto_random: false,
        }
    }

    pub fn tidb() -> Self {
        Self {
            engine: Engine::TiDb,
            allow_auto_random: true,
        }
    }
}

impl SchemaEngine for MySqlFamilyEngine {
    fn engine(&self) -> Engine {
        self.engine
    }

    fn parse_to_metadata(&self, text: &str) -> Result<DatabaseSnapshot, SchemaDiffError> {
        let statements = parse_sql(text)?;
        build_snapshot(&statements, &ExtractOptions::default())
    }

    fn walk_through(
        &self,
        snapshot: &mut DatabaseSnapshot,
        text: &str,
        policy: ErrorPolicy,
    ) -> Result<WalkThroughReport, SchemaDiffError> {
        let statements = parse_sql(text)?;
        let options = WalkThroughOptions {
            error_policy: policy,
            case_sensitive_tables: snapshot.case_sensitive_tables,
            allow_auto_random: self.allow_auto_random,
        };
        debug!(engine = %self.engine, statements = statements.len(), "walking through script");
        Ok(walk_through::walk_through(snapshot, &statements, &options))
    }

    fn diff(&self, before: &DatabaseSnapshot, after: &DatabaseSnapshot) -> Result<MetadataDiff, SchemaDiffError> {
        let options = DiffOptions {
            case_sensitive: before.case_sensitive_tables && after.case_sensitive_tables,
        };
        diff::diff(before, after, &options)
    }

    fn generate_migration(&self, diff: &MetadataDiff) -> Result<String, SchemaDiffError> {
        migration::generate_migration(diff)
    }

    fn reconcile(&self, baseline: &str, target: &DatabaseSnapshot) -> Result<String, SchemaDiffError> {
        reconcile::reconcile(baseline, target)
    }
}

/// Engines by identifier. Built once and passed by reference.
pub struct EngineRegistry {
    engines: HashMap<Engine, Box<dyn SchemaEngine>>,
}

impl EngineRegistry {
    pub fn new() -> Self {
        Self {
            engines: HashMap::new(),
        }
    }

    /// MySQL and TiDB.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(MySqlFamilyEngine::mysql()));
        registry.register(Box::new(MySqlFamilyEngine::tidb()));
        registry
    }

    pub fn register(&mut self, engine: Box<dyn SchemaEngine>) {
        self.engines.insert(engine.engine(), engine);
    }

    pub fn get(&self, engine: Engine) -> Result<&dyn SchemaEngine, SchemaDiffError> {
        self.engines
            .get(&engine)
            .map(|e| e.as_ref())
            .ok_or_else(|| SchemaDiffError::UnknownEngine {
                name: engine.to_string(),
            })
    }

    /// Look up an engine by its textual name (`mysql`, `tidb`).
    pub fn by_name(&self, name: &str) -> Result<&dyn SchemaEngine, SchemaDiffError> {
        self.get(name.parse()?)
    }
}

impl Default for EngineRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::walk_through::DiagnosticCode;

    #[test]
    fn test_lookup_by_name() {
        let registry = EngineRegistry::with_defaults();
        assert_eq!(registry.by_name("MySQL").unwrap().engine(), Engine::MySql);
        assert_eq!(registry.by_name("tidb").unwrap().engine(), Engine::TiDb);
        assert!(matches!(
            registry.by_name("oracle"),
            Err(SchemaDiffError::UnknownEngine { .. })
        ));
    }

    #[test]
    fn test_unregistered_engine() {
        let registry = EngineRegistry::new();
        assert!(registry.get(Engine::MySql).is_err());
    }

    #[test]
    fn test_auto_random_depends_on_engine() {
        let registry = EngineRegistry::with_defaults();
        let script = "CREATE TABLE t (id BIGINT AUTO_RANDOM PRIMARY KEY);";

        let mysql = registry.get(Engine::MySql).unwrap();
        let mut snapshot = DatabaseSnapshot::new("", false);
        let report = mysql.walk_through(&mut snapshot, script, ErrorPolicy::Abort).unwrap();
        assert_eq!(report.error().map(|d| d.code), Some(DiagnosticCode::InvalidColumnDefault));

        let tidb = registry.get(Engine::TiDb).unwrap();
        let mut snapshot = DatabaseSnapshot::new("", false);
        let report = tidb.walk_through(&mut snapshot, script, ErrorPolicy::Abort).unwrap();
        assert!(!report.has_errors());
        assert!(snapshot.table("t").is_some());
    }

    #[test]
    fn test_engine_pipeline() {
        let engine = MySqlFamilyEngine::mysql();
        let before = engine.parse_to_metadata("CREATE TABLE t (id INT);").unwrap();
        let after = engine.parse_to_metadata("CREATE TABLE t (id INT, age INT);").unwrap();
        let diff = engine.diff(&before, &after).unwrap();
        assert_eq!(
            engine.generate_migration(&diff).unwrap(),
            "ALTER TABLE `t` ADD COLUMN `age` int DEFAULT NULL AFTER `id`;\n"
        );
    }
}
