//! Database, schema and table snapshots

use serde::{Deserialize, Serialize};

use super::collection::{Named, NamedCollection};
use super::elements::*;
use super::partition::PartitionState;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableState {
    pub id: usize,
    pub name: String,
    #[serde(default)]
    pub columns: NamedCollection<ColumnState>,
    #[serde(default)]
    pub indexes: NamedCollection<IndexState>,
    #[serde(default)]
    pub foreign_keys: NamedCollection<ForeignKeyState>,
    #[serde(default)]
    pub checks: NamedCollection<CheckConstraintState>,
    #[serde(default)]
    pub triggers: NamedCollection<TriggerState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charset: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition: Option<PartitionState>,
}

impl Named for TableState {
    fn name(&self) -> &str {
        &self.name
    }
    fn set_name(&mut self, name: String) {
        self.name = name;
    }
    fn id(&self) -> usize {
        self.id
    }
    fn set_id(&mut self, id: usize) {
        self.id = id;
    }
}

impl TableState {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn primary_key(&self) -> Option<&IndexState> {
        self.indexes.iter().find(|i| i.primary)
    }

    /// The auto-increment column, if any.
    pub fn auto_increment_column(&self) -> Option<&ColumnState> {
        self.columns.iter().find(|c| c.default.is_auto_increment())
    }

    /// Whether some index's leading keys are exactly `columns`.
    pub fn has_covering_index(&self, columns: &[String]) -> bool {
        self.indexes.iter().any(|i| i.covers(columns))
    }

    /// A name derived from `base` that no index uses yet: `base`, `base_2`, ...
    pub fn unique_index_name(&self, base: &str) -> String {
        if !self.indexes.contains(base) {
            return base.to_string();
        }
        let mut n = 2;
        loop {
            let candidate = format!("{}_{}", base, n);
            if !self.indexes.contains(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    /// Next free `<table>_ibfk_<n>` name.
    pub fn next_foreign_key_name(&self) -> String {
        next_numbered_name(&self.name, "ibfk", |n| self.foreign_keys.contains(n))
    }

    /// Next free `<table>_chk_<n>` name.
    pub fn next_check_name(&self) -> String {
        next_numbered_name(&self.name, "chk", |n| self.checks.contains(n))
    }

    /// Synthesize an index for a foreign key whose columns no index covers.
    ///
    /// Returns the name of the created index.
    pub fn ensure_foreign_key_index(&mut self, fk_name: &str, columns: &[String]) -> Option<String> {
        if columns.is_empty() || self.has_covering_index(columns) {
            return None;
        }
        let base = if fk_name.is_empty() {
            columns.join("_")
        } else {
            fk_name.to_string()
        };
        let name = self.unique_index_name(&base);
        let index = IndexState {
            name: name.clone(),
            keys: columns.iter().map(IndexKey::column).collect(),
            ..Default::default()
        };
        self.indexes.push(index).ok()?;
        Some(name)
    }

    /// Sort indexes so the primary key comes first, others by name.
    pub fn sorted_indexes(&self) -> Vec<&IndexState> {
        let mut indexes: Vec<&IndexState> = self.indexes.iter().collect();
        indexes.sort_by(|a, b| b.primary.cmp(&a.primary).then_with(|| a.name.cmp(&b.name)));
        indexes
    }

    /// Whether any option besides the element lists differs.
    pub fn same_options(&self, other: &TableState) -> bool {
        self.comment == other.comment
            && self.engine == other.engine
            && self.charset == other.charset
            && self.collation == other.collation
    }
}

fn next_numbered_name(table: &str, tag: &str, taken: impl Fn(&str) -> bool) -> String {
    let mut n = 1;
    loop {
        let candidate = format!("{}_{}_{}", table, tag, n);
        if !taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// A schema; MySQL-family databases have a single unnamed one
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaSnapshot {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tables: NamedCollection<TableState>,
    #[serde(default)]
    pub views: NamedCollection<ViewState>,
    #[serde(default)]
    pub functions: NamedCollection<RoutineState>,
    #[serde(default)]
    pub procedures: NamedCollection<RoutineState>,
    #[serde(default)]
    pub events: NamedCollection<RoutineState>,
    #[serde(default)]
    pub sequences: NamedCollection<RoutineState>,
}

impl SchemaSnapshot {
    pub fn new(name: impl Into<String>, case_sensitive_tables: bool) -> Self {
        Self {
            name: name.into(),
            tables: NamedCollection::new(case_sensitive_tables),
            views: NamedCollection::new(case_sensitive_tables),
            ..Default::default()
        }
    }

    /// Name of the table a trigger belongs to.
    pub fn trigger_table(&self, trigger: &str) -> Option<&str> {
        self.tables
            .iter()
            .find(|t| t.triggers.contains(trigger))
            .map(|t| t.name.as_str())
    }

    /// Whether a table or view already uses this name.
    pub fn has_relation(&self, name: &str) -> bool {
        self.tables.contains(name) || self.views.contains(name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSnapshot {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charset: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collation: Option<String>,
    /// Table and view names compare case-sensitively
    #[serde(default)]
    pub case_sensitive_tables: bool,
    pub schemas: Vec<SchemaSnapshot>,
}

impl DatabaseSnapshot {
    /// An empty database with the single default schema.
    pub fn new(name: impl Into<String>, case_sensitive_tables: bool) -> Self {
        Self {
            name: name.into(),
            charset: None,
            collation: None,
            case_sensitive_tables,
            schemas: vec![SchemaSnapshot::new("", case_sensitive_tables)],
        }
    }

    pub fn schema(&self, name: &str) -> Option<&SchemaSnapshot> {
        self.schemas.iter().find(|s| s.name.eq_ignore_ascii_case(name))
    }

    pub fn default_schema(&self) -> Option<&SchemaSnapshot> {
        self.schemas.first()
    }

    /// The default schema, created when missing.
    pub fn default_schema_mut(&mut self) -> &mut SchemaSnapshot {
        if self.schemas.is_empty() {
            self.schemas.push(SchemaSnapshot::new("", self.case_sensitive_tables));
        }
        &mut self.schemas[0]
    }

    pub fn table(&self, name: &str) -> Option<&TableState> {
        self.default_schema().and_then(|s| s.tables.get(name))
    }

    /// Apply `case_sensitive_tables` to every table and view collection.
    pub fn apply_table_case(&mut self) -> Result<(), String> {
        let case_sensitive = self.case_sensitive_tables;
        for schema in &mut self.schemas {
            schema.tables.set_case_sensitive(case_sensitive)?;
            schema.views.set_case_sensitive(case_sensitive)?;
        }
        Ok(())
    }

    pub fn table_count(&self) -> usize {
        self.schemas.iter().map(|s| s.tables.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_with_index(columns: &[&str]) -> TableState {
        let mut table = TableState::new("orders");
        table
            .indexes
            .push(IndexState {
                name: "idx".to_string(),
                keys: columns.iter().map(|c| IndexKey::column(*c)).collect(),
                ..Default::default()
            })
            .unwrap();
        table
    }

    #[test]
    fn test_ensure_foreign_key_index() {
        let mut table = table_with_index(&["a", "b"]);
        assert_eq!(table.ensure_foreign_key_index("fk1", &["a".to_string()]), None);
        assert_eq!(
            table.ensure_foreign_key_index("fk2", &["b".to_string()]),
            Some("fk2".to_string())
        );
        assert_eq!(
            table.ensure_foreign_key_index("", &["c".to_string(), "d".to_string()]),
            Some("c_d".to_string())
        );
        assert_eq!(table.indexes.len(), 3);
    }

    #[test]
    fn test_generated_names() {
        let mut table = table_with_index(&["a"]);
        assert_eq!(table.unique_index_name("idx"), "idx_2");
        assert_eq!(table.next_foreign_key_name(), "orders_ibfk_1");
        table
            .checks
            .push(CheckConstraintState {
                name: "orders_chk_1".to_string(),
                expression: "a > 0".to_string(),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(table.next_check_name(), "orders_chk_2");
    }

    #[test]
    fn test_sorted_indexes_primary_first() {
        let mut table = table_with_index(&["a"]);
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
        let names: Vec<&str> = table.sorted_indexes().iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["PRIMARY", "idx"]);
    }
}
