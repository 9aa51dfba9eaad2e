//! Partition clause rendering
//!
//! Output follows what `SHOW CREATE TABLE` prints, including the
//! version-gated comment that wraps the clause.

use crate::model::{PartitionDefinition, PartitionKind, PartitionSpec, PartitionState};
use crate::parser::identifier_utils::quote_identifier;

/// Renders the `PARTITION BY` clause of a table.
///
/// The returned text is appended directly after the table options, so it
/// carries its own leading newline.
pub trait PartitionRenderer {
    fn render(&self, partition: &PartitionState) -> String;
}

/// The `SHOW CREATE TABLE` layout
#[derive(Debug, Clone, Copy, Default)]
pub struct ShowCreatePartitionRenderer;

impl PartitionRenderer for ShowCreatePartitionRenderer {
    fn render(&self, partition: &PartitionState) -> String {
        let mut out = String::new();
        out.push_str(version_comment(partition.spec.kind));
        out.push_str(" PARTITION BY ");
        out.push_str(&partition_type(&partition.spec));

        if partition.spec.count != 0 {
            out.push_str(&format!("\nPARTITIONS {}", partition.spec.count));
        }

        if let Some(sub) = &partition.subpartition {
            out.push_str("\nSUBPARTITION BY ");
            out.push_str(&partition_type(sub));
            if sub.count != 0 {
                out.push_str(&format!("\nSUBPARTITIONS {}", sub.count));
            }
        }

        if partition.spec.count == 0 && !partition.partitions.is_empty() {
            let listed_subpartitions = partition
                .subpartition
                .as_ref()
                .is_some_and(|sub| sub.count == 0);
            let entries: Vec<String> = sorted_by_id(&partition.partitions)
                .into_iter()
                .map(|p| partition_entry(p, partition.spec.kind, listed_subpartitions))
                .collect();
            out.push_str("\n(");
            out.push_str(&entries.join(",\n "));
            out.push(')');
        }

        out.push_str(" */");
        out
    }
}

/// COLUMNS partitioning appeared in 5.5, everything else in 5.1.
fn version_comment(kind: PartitionKind) -> &'static str {
    if kind.is_columns() {
        "\n/*!50500"
    } else {
        "\n/*!50100"
    }
}

fn partition_type(spec: &PartitionSpec) -> String {
    let quoted = || {
        spec.fields
            .iter()
            .map(|f| quote_identifier(f))
            .collect::<Vec<_>>()
            .join(",")
    };
    let bare = || spec.fields.join(",");

    match spec.kind {
        PartitionKind::Range => format!("RANGE ({})", quoted()),
        PartitionKind::RangeColumns => format!("RANGE  COLUMNS({})", bare()),
        PartitionKind::List => format!("LIST ({})", quoted()),
        PartitionKind::ListColumns => format!("LIST  COLUMNS({})", bare()),
        PartitionKind::Hash => format!("HASH ({})", quoted()),
        PartitionKind::LinearHash => format!("LINEAR HASH ({})", quoted()),
        PartitionKind::Key => format!("KEY ({})", bare()),
        PartitionKind::LinearKey => format!("LINEAR KEY ({})", bare()),
    }
}

fn partition_entry(partition: &PartitionDefinition, kind: PartitionKind, listed_subpartitions: bool) -> String {
    let mut out = format!("PARTITION {}", partition.name);
    if let Some(preposition) = kind.preposition() {
        if partition.value.eq_ignore_ascii_case("MAXVALUE") {
            out.push_str(&format!(" VALUES {} MAXVALUE", preposition));
        } else {
            out.push_str(&format!(" VALUES {} ({})", preposition, partition.value));
        }
    }

    if listed_subpartitions && !partition.subpartitions.is_empty() {
        let subpartitions: Vec<String> = sorted_by_id(&partition.subpartitions)
            .into_iter()
            .map(|s| format!("SUBPARTITION {} ENGINE = InnoDB", s.name))
            .collect();
        out.push_str("\n (");
        out.push_str(&subpartitions.join(",\n  "));
        out.push(')');
    } else {
        out.push_str(" ENGINE = InnoDB");
    }
    out
}

fn sorted_by_id(partitions: &[PartitionDefinition]) -> Vec<&PartitionDefinition> {
    let mut sorted: Vec<&PartitionDefinition> = partitions.iter().collect();
    sorted.sort_by_key(|p| p.id);
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn definition(id: usize, name: &str, value: &str) -> PartitionDefinition {
        PartitionDefinition {
            id,
            name: name.to_string(),
            value: value.to_string(),
            subpartitions: Vec::new(),
        }
    }

    #[test]
    fn test_render_range() {
        let state = PartitionState {
            spec: PartitionSpec {
                kind: PartitionKind::Range,
                fields: vec!["id".to_string()],
                count: 0,
            },
            subpartition: None,
            partitions: vec![definition(2, "p1", "MAXVALUE"), definition(1, "p0", "10")],
        };
        assert_eq!(
            ShowCreatePartitionRenderer.render(&state),
            "\n/*!50100 PARTITION BY RANGE (`id`)\n(PARTITION p0 VALUES LESS THAN (10) ENGINE = InnoDB,\n PARTITION p1 VALUES LESS THAN MAXVALUE ENGINE = InnoDB) */"
        );
    }

    #[test]
    fn test_render_hash_count() {
        let state = PartitionState {
            spec: PartitionSpec {
                kind: PartitionKind::LinearHash,
                fields: vec!["id".to_string()],
                count: 4,
            },
            subpartition: None,
            partitions: Vec::new(),
        };
        assert_eq!(
            ShowCreatePartitionRenderer.render(&state),
            "\n/*!50100 PARTITION BY LINEAR HASH (`id`)\nPARTITIONS 4 */"
        );
    }

    #[test]
    fn test_render_list_columns_with_subpartitions() {
        let mut p0 = definition(1, "p0", "'a','b'");
        p0.subpartitions = vec![definition(1, "s0", ""), definition(2, "s1", "")];
        let state = PartitionState {
            spec: PartitionSpec {
                kind: PartitionKind::ListColumns,
                fields: vec!["code".to_string()],
                count: 0,
            },
            subpartition: Some(PartitionSpec {
                kind: PartitionKind::Key,
                fields: vec!["id".to_string()],
                count: 0,
            }),
            partitions: vec![p0],
        };
        assert_eq!(
            ShowCreatePartitionRenderer.render(&state),
            "\n/*!50500 PARTITION BY LIST  COLUMNS(code)\nSUBPARTITION BY KEY (id)\n(PARTITION p0 VALUES IN ('a','b')\n (SUBPARTITION s0 ENGINE = InnoDB,\n  SUBPARTITION s1 ENGINE = InnoDB)) */"
        );
    }
}
