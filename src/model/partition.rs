//! Partitioning metadata

use serde::{Deserialize, Serialize};

/// How rows are assigned to partitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PartitionKind {
    Range,
    RangeColumns,
    List,
    ListColumns,
    Hash,
    LinearHash,
    Key,
    LinearKey,
}

impl PartitionKind {
    pub fn is_columns(self) -> bool {
        matches!(self, PartitionKind::RangeColumns | PartitionKind::ListColumns)
    }

    pub fn is_key(self) -> bool {
        matches!(self, PartitionKind::Key | PartitionKind::LinearKey)
    }

    pub fn is_linear(self) -> bool {
        matches!(self, PartitionKind::LinearHash | PartitionKind::LinearKey)
    }

    /// Kinds allowed for SUBPARTITION BY
    pub fn is_hash_or_key(self) -> bool {
        matches!(
            self,
            PartitionKind::Hash | PartitionKind::LinearHash | PartitionKind::Key | PartitionKind::LinearKey
        )
    }

    /// `LESS THAN` for range kinds, `IN` for list kinds, nothing otherwise.
    pub fn preposition(self) -> Option<&'static str> {
        match self {
            PartitionKind::Range | PartitionKind::RangeColumns => Some("LESS THAN"),
            PartitionKind::List | PartitionKind::ListColumns => Some("IN"),
            _ => None,
        }
    }
}

/// `PARTITION BY ...` or `SUBPARTITION BY ...`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionSpec {
    pub kind: PartitionKind,
    /// Partitioning fields with surrounding backticks removed
    pub fields: Vec<String>,
    /// `PARTITIONS n` / `SUBPARTITIONS n`; zero when partitions are listed
    #[serde(default)]
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionDefinition {
    pub id: usize,
    pub name: String,
    /// Boundary value list joined by `,`, or `MAXVALUE`; empty for HASH/KEY
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub subpartitions: Vec<PartitionDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionState {
    pub spec: PartitionSpec,
    #[serde(default)]
    pub subpartition: Option<PartitionSpec>,
    #[serde(default)]
    pub partitions: Vec<PartitionDefinition>,
}

impl PartitionState {
    /// Check the layout rules MySQL enforces, returning a description of the
    /// first violation.
    pub fn validate(&self) -> Result<(), String> {
        if self.spec.count == 0 && self.partitions.is_empty() {
            return Err("no partitions listed and no PARTITIONS count given".to_string());
        }
        if self.spec.count != 0 && !self.partitions.is_empty() {
            return Err("PARTITIONS count and explicit partitions are mutually exclusive".to_string());
        }
        if self.spec.kind.preposition().is_some() && self.spec.count != 0 {
            return Err("RANGE and LIST partitioning require explicit partitions".to_string());
        }
        if let Some(sub) = &self.subpartition {
            if !sub.kind.is_hash_or_key() {
                return Err("subpartitions must use HASH or KEY".to_string());
            }
            let any_listed = self.partitions.iter().any(|p| !p.subpartitions.is_empty());
            if sub.count != 0 && any_listed {
                return Err(
                    "SUBPARTITIONS count and explicit subpartitions are mutually exclusive".to_string(),
                );
            }
        } else if self.partitions.iter().any(|p| !p.subpartitions.is_empty()) {
            return Err("subpartitions listed without SUBPARTITION BY".to_string());
        }
        Ok(())
    }
}
