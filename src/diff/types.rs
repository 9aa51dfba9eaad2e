//! Diff result types

use serde::Serialize;

use crate::model::{
    CheckConstraintState, ColumnState, ForeignKeyState, IndexState, Named, PartitionState,
    RoutineState, TableState, TriggerState, ViewState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Alter,
    Drop,
}

impl Action {
    /// `+`, `~` or `-`
    pub fn symbol(self) -> char {
        match self {
            Action::Create => '+',
            Action::Alter => '~',
            Action::Drop => '-',
        }
    }
}

/// One changed entity; `old` is set for Drop and Alter, `new` for Create
/// and Alter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityDiff<T> {
    pub action: Action,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new: Option<T>,
}

impl<T> EntityDiff<T> {
    pub fn create(new: T) -> Self {
        Self {
            action: Action::Create,
            old: None,
            new: Some(new),
        }
    }

    pub fn drop(old: T) -> Self {
        Self {
            action: Action::Drop,
            old: Some(old),
            new: None,
        }
    }

    pub fn alter(old: T, new: T) -> Self {
        Self {
            action: Action::Alter,
            old: Some(old),
            new: Some(new),
        }
    }

    /// The state after the change, or before it for a Drop.
    pub fn current(&self) -> Option<&T> {
        self.new.as_ref().or(self.old.as_ref())
    }
}

impl<T: Named> EntityDiff<T> {
    pub fn name(&self) -> &str {
        self.current().map(|e| e.name()).unwrap_or("")
    }
}

/// A schema present on one side only
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaDiff {
    pub action: Action,
    pub name: String,
}

/// A created, dropped or altered table. Only an Alter carries nested diffs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableDiff {
    pub action: Action,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old: Option<TableState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new: Option<TableState>,
    pub columns: Vec<EntityDiff<ColumnState>>,
    pub indexes: Vec<EntityDiff<IndexState>>,
    pub foreign_keys: Vec<EntityDiff<ForeignKeyState>>,
    pub checks: Vec<EntityDiff<CheckConstraintState>>,
    pub triggers: Vec<EntityDiff<TriggerState>>,
    /// Drop of the old layout and/or Create of the new one
    pub partition: Vec<EntityDiff<PartitionState>>,
}

impl TableDiff {
    pub fn create(table: TableState) -> Self {
        Self::with_states(Action::Create, None, Some(table))
    }

    pub fn drop(table: TableState) -> Self {
        Self::with_states(Action::Drop, Some(table), None)
    }

    pub fn alter(old: TableState, new: TableState) -> Self {
        Self::with_states(Action::Alter, Some(old), Some(new))
    }

    fn with_states(action: Action, old: Option<TableState>, new: Option<TableState>) -> Self {
        Self {
            action,
            old,
            new,
            columns: Vec::new(),
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
            checks: Vec::new(),
            triggers: Vec::new(),
            partition: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        self.new
            .as_ref()
            .or(self.old.as_ref())
            .map(|t| t.name.as_str())
            .unwrap_or("")
    }

    /// Whether an Alter has no nested change.
    pub fn has_nested_changes(&self) -> bool {
        !(self.columns.is_empty()
            && self.indexes.is_empty()
            && self.foreign_keys.is_empty()
            && self.checks.is_empty()
            && self.triggers.is_empty()
            && self.partition.is_empty())
    }

    fn nested_count(&self) -> usize {
        self.columns.len()
            + self.indexes.len()
            + self.foreign_keys.len()
            + self.checks.len()
            + self.triggers.len()
            + self.partition.len()
    }
}

/// Everything that changed between two snapshots
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetadataDiff {
    pub schemas: Vec<SchemaDiff>,
    pub tables: Vec<TableDiff>,
    pub views: Vec<EntityDiff<ViewState>>,
    pub functions: Vec<EntityDiff<RoutineState>>,
    pub procedures: Vec<EntityDiff<RoutineState>>,
    pub events: Vec<EntityDiff<RoutineState>>,
    pub sequences: Vec<EntityDiff<RoutineState>>,
}

impl MetadataDiff {
    pub fn is_empty(&self) -> bool {
        self.change_count() == 0
    }

    /// Number of entity changes, counting nested table changes individually.
    pub fn change_count(&self) -> usize {
        let tables: usize = self
            .tables
            .iter()
            .map(|t| if t.action == Action::Alter { t.nested_count().max(1) } else { 1 })
            .sum();
        self.schemas.len()
            + tables
            + self.views.len()
            + self.functions.len()
            + self.procedures.len()
            + self.events.len()
            + self.sequences.len()
    }

    pub fn table(&self, name: &str) -> Option<&TableDiff> {
        self.tables.iter().find(|t| t.name().eq_ignore_ascii_case(name))
    }
}
