//! Catalog entity types

use serde::{Deserialize, Serialize};

use super::collection::Named;

macro_rules! impl_named {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Named for $ty {
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
        )*
    };
}

impl_named!(
    ColumnState,
    IndexState,
    ForeignKeyState,
    CheckConstraintState,
    TriggerState,
    ViewState,
    RoutineState,
);

// ============================================================================
// Columns
// ============================================================================

/// A column's default. Exactly one variant applies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ColumnDefault {
    #[default]
    None,
    Null,
    /// A quoted string value, unescaped
    Literal(String),
    /// Expression text, e.g. `0`, `CURRENT_TIMESTAMP`, `(uuid())`
    Expression(String),
    AutoIncrement,
    /// AUTO_RANDOM parameters without parentheses (`5`, `5, 54`, or empty)
    AutoRandom(String),
}

impl ColumnDefault {
    pub fn is_auto_increment(&self) -> bool {
        matches!(self, ColumnDefault::AutoIncrement)
    }

    /// Whether the column has a value default (not None or an auto generator).
    pub fn has_value(&self) -> bool {
        matches!(
            self,
            ColumnDefault::Null | ColumnDefault::Literal(_) | ColumnDefault::Expression(_)
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnState {
    pub id: usize,
    pub name: String,
    /// Lower-case rendered type, e.g. `varchar(20)`, `int unsigned`
    pub data_type: String,
    pub nullable: bool,
    #[serde(default)]
    pub default: ColumnDefault,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_update: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charset: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collation: Option<String>,
}

impl ColumnState {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: true,
            ..Default::default()
        }
    }

    /// Equality of everything except position.
    pub fn same_definition(&self, other: &ColumnState) -> bool {
        self.name == other.name
            && self.data_type == other.data_type
            && self.nullable == other.nullable
            && self.default == other.default
            && self.on_update == other.on_update
            && self.comment == other.comment
            && self.charset == other.charset
            && self.collation == other.collation
    }
}

// ============================================================================
// Indexes
// ============================================================================

/// One key part: a column (with optional prefix length) or an expression
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexKey {
    /// Column name, or the parenthesized expression text
    pub column: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
    #[serde(default)]
    pub descending: bool,
}

impl IndexKey {
    pub fn column(name: impl Into<String>) -> Self {
        Self {
            column: name.into(),
            length: None,
            descending: false,
        }
    }

    pub fn expression(text: String) -> Self {
        Self {
            column: text,
            length: None,
            descending: false,
        }
    }

    pub fn is_expression(&self) -> bool {
        self.column.starts_with('(')
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IndexType {
    #[default]
    Btree,
    Hash,
    Fulltext,
    Spatial,
}

impl IndexType {
    pub fn from_keyword(word: &str) -> Option<IndexType> {
        match word.to_uppercase().as_str() {
            "BTREE" => Some(IndexType::Btree),
            "HASH" => Some(IndexType::Hash),
            "FULLTEXT" => Some(IndexType::Fulltext),
            "SPATIAL" | "RTREE" => Some(IndexType::Spatial),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IndexType::Btree => "BTREE",
            IndexType::Hash => "HASH",
            IndexType::Fulltext => "FULLTEXT",
            IndexType::Spatial => "SPATIAL",
        }
    }
}

pub const PRIMARY_KEY_NAME: &str = "PRIMARY";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexState {
    pub id: usize,
    pub name: String,
    pub keys: Vec<IndexKey>,
    #[serde(default)]
    pub primary: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default)]
    pub index_type: IndexType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Default for IndexState {
    fn default() -> Self {
        Self {
            id: 0,
            name: String::new(),
            keys: Vec::new(),
            primary: false,
            unique: false,
            visible: true,
            index_type: IndexType::Btree,
            comment: None,
        }
    }
}

impl IndexState {
    pub fn key_columns(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(|k| k.column.as_str())
    }

    /// Whether the first key parts are exactly `columns` (case-insensitive).
    pub fn covers(&self, columns: &[String]) -> bool {
        columns.len() <= self.keys.len()
            && self
                .keys
                .iter()
                .zip(columns)
                .all(|(k, c)| !k.is_expression() && k.column.eq_ignore_ascii_case(c))
    }

    pub fn same_definition(&self, other: &IndexState) -> bool {
        self.name == other.name
            && self.keys == other.keys
            && self.primary == other.primary
            && self.unique == other.unique
            && self.visible == other.visible
            && self.index_type == other.index_type
            && self.comment == other.comment
    }
}

// ============================================================================
// Constraints
// ============================================================================

pub const DEFAULT_REFERENCE_ACTION: &str = "NO ACTION";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyState {
    pub id: usize,
    pub name: String,
    pub columns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referenced_database: Option<String>,
    pub referenced_table: String,
    pub referenced_columns: Vec<String>,
    pub on_delete: String,
    pub on_update: String,
}

impl ForeignKeyState {
    pub fn same_definition(&self, other: &ForeignKeyState) -> bool {
        self.name == other.name
            && self.columns == other.columns
            && self.referenced_database == other.referenced_database
            && self.referenced_table == other.referenced_table
            && self.referenced_columns == other.referenced_columns
            && self.on_delete == other.on_delete
            && self.on_update == other.on_update
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckConstraintState {
    pub id: usize,
    pub name: String,
    pub expression: String,
    #[serde(default = "default_true")]
    pub enforced: bool,
}

impl Default for CheckConstraintState {
    fn default() -> Self {
        Self {
            id: 0,
            name: String::new(),
            expression: String::new(),
            enforced: true,
        }
    }
}

impl CheckConstraintState {
    pub fn same_definition(&self, other: &CheckConstraintState) -> bool {
        self.name == other.name && self.expression == other.expression && self.enforced == other.enforced
    }
}

// ============================================================================
// Triggers, views and stored programs
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerState {
    pub id: usize,
    pub name: String,
    /// `BEFORE` or `AFTER`
    pub timing: String,
    /// `INSERT`, `UPDATE` or `DELETE`
    pub event: String,
    pub body: String,
    /// Full CREATE TRIGGER text
    pub definition: String,
}

impl TriggerState {
    pub fn same_definition(&self, other: &TriggerState) -> bool {
        self.name == other.name
            && self.timing == other.timing
            && self.event == other.event
            && self.body == other.body
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewState {
    pub id: usize,
    pub name: String,
    /// The select text, verbatim
    pub definition: String,
    /// Resolved output columns; empty when unknown
    #[serde(default)]
    pub columns: Vec<String>,
}

/// A function, procedure, event or sequence kept as its definition text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutineState {
    pub id: usize,
    pub name: String,
    /// Full CREATE statement text
    pub definition: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_default_serde_tagging() {
        let json = serde_json::to_string(&ColumnDefault::Literal("x".to_string())).unwrap();
        assert_eq!(json, r#"{"kind":"literal","value":"x"}"#);
        let json = serde_json::to_string(&ColumnDefault::AutoIncrement).unwrap();
        assert_eq!(json, r#"{"kind":"auto_increment"}"#);
        let back: ColumnDefault = serde_json::from_str(r#"{"kind":"auto_random","value":"5"}"#).unwrap();
        assert_eq!(back, ColumnDefault::AutoRandom("5".to_string()));
    }

    #[test]
    fn test_index_covers_prefix() {
        let index = IndexState {
            name: "idx".to_string(),
            keys: vec![IndexKey::column("a"), IndexKey::column("b")],
            ..Default::default()
        };
        assert!(index.covers(&["A".to_string()]));
        assert!(index.covers(&["a".to_string(), "b".to_string()]));
        assert!(!index.covers(&["b".to_string()]));
        assert!(!index.covers(&["a".to_string(), "b".to_string(), "c".to_string()]));
    }

    #[test]
    fn test_index_type_keywords() {
        assert_eq!(IndexType::from_keyword("hash"), Some(IndexType::Hash));
        assert_eq!(IndexType::from_keyword("RTREE"), Some(IndexType::Spatial));
        assert_eq!(IndexType::from_keyword("other"), None);
        assert_eq!(IndexType::default(), IndexType::Btree);
    }
}
