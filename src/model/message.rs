//! Canonical metadata message
//!
//! Snapshots travel as JSON. Every named collection is a list in id order,
//! so the message is stable across runs and independent of the dialect that
//! produced it.

use crate::error::SchemaDiffError;

use super::snapshot::DatabaseSnapshot;

/// Encode a snapshot as a pretty-printed metadata message.
pub fn to_json(snapshot: &DatabaseSnapshot) -> Result<String, SchemaDiffError> {
    Ok(serde_json::to_string_pretty(snapshot)?)
}

/// Decode a metadata message into an owned snapshot.
pub fn from_json(text: &str) -> Result<DatabaseSnapshot, SchemaDiffError> {
    let mut snapshot: DatabaseSnapshot = serde_json::from_str(text)?;
    if snapshot.schemas.is_empty() {
        snapshot.default_schema_mut();
    }
    snapshot
        .apply_table_case()
        .map_err(|name| SchemaDiffError::MetadataDecodeError {
            message: format!("duplicate table or view name `{}`", name),
        })?;
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ColumnDefault, ColumnState, TableState};

    #[test]
    fn test_message_round_trip() {
        let mut snapshot = DatabaseSnapshot::new("shop", false);
        let mut table = TableState::new("t");
        let mut column = ColumnState::new("id", "int");
        column.nullable = false;
        column.default = ColumnDefault::AutoIncrement;
        table.columns.push(column).unwrap();
        snapshot.default_schema_mut().tables.push(table).unwrap();

        let json = to_json(&snapshot).unwrap();
        assert!(json.contains("\"auto_increment\""));
        let back = from_json(&json).unwrap();
        assert_eq!(back, snapshot);
    }

    #[test]
    fn test_decode_rejects_duplicates() {
        let json = r#"{"name":"db","schemas":[{"tables":[{"id":1,"name":"t"},{"id":2,"name":"T"}]}]}"#;
        assert!(matches!(
            from_json(json),
            Err(SchemaDiffError::MetadataDecodeError { .. })
        ));
    }

    #[test]
    fn test_decode_case_sensitive_tables() {
        let json = r#"{"name":"db","case_sensitive_tables":true,"schemas":[{"tables":[{"id":1,"name":"t"}]}]}"#;
        let snapshot = from_json(json).unwrap();
        assert!(snapshot.table("t").is_some());
        assert!(snapshot.table("T").is_none());
    }

    #[test]
    fn test_decode_garbage() {
        assert!(from_json("not json").is_err());
    }
}
