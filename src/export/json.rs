//! JSON form of captured tables
//!
//! Tables are written as pretty-printed arrays of row objects; the combined
//! `complete_database.json` maps table name to its row array, in capture order.

use serde_json::{Map, Value};

use crate::error::{BackupError, BackupResult};
use crate::models::{Record, TableSnapshot};

/// Serialize one table's rows as a pretty-printed JSON array
pub fn table_json(rows: &[Record]) -> BackupResult<Vec<u8>> {
    serde_json::to_vec_pretty(rows)
        .map_err(|e| BackupError::Json(format!("Failed to serialize table rows: {}", e)))
}

/// Serialize every table as one object of name to row array
///
/// Empty tables are kept as empty arrays.
pub fn complete_database_json(tables: &[TableSnapshot]) -> BackupResult<Vec<u8>> {
    let mut combined = Map::new();
    for table in tables {
        let rows = table.rows.iter().cloned().map(Value::Object).collect();
        combined.insert(table.name.clone(), Value::Array(rows));
    }

    serde_json::to_vec_pretty(&Value::Object(combined))
        .map_err(|e| BackupError::Json(format!("Failed to serialize database: {}", e)))
}

/// Parse a `complete_database.json` payload, preserving table order
pub fn parse_complete_database(bytes: &[u8], entry: &str) -> BackupResult<Vec<TableSnapshot>> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| BackupError::ManifestInvalid(format!("{} is corrupted: {}", entry, e)))?;

    let Value::Object(tables) = value else {
        return Err(BackupError::ManifestInvalid(format!(
            "{} must map table names to row arrays",
            entry
        )));
    };

    tables
        .into_iter()
        .map(|(name, rows)| {
            let rows = rows_from_value(rows, &format!("{} table '{}'", entry, name))?;
            Ok(TableSnapshot::new(name, rows))
        })
        .collect()
}

/// Parse a single table payload (an array of row objects)
pub fn parse_table_rows(bytes: &[u8], entry: &str) -> BackupResult<Vec<Record>> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| BackupError::ManifestInvalid(format!("{} is corrupted: {}", entry, e)))?;
    rows_from_value(value, entry)
}

fn rows_from_value(value: Value, context: &str) -> BackupResult<Vec<Record>> {
    let Value::Array(items) = value else {
        return Err(BackupError::ManifestInvalid(format!(
            "{} is not an array of rows",
            context
        )));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(idx, item)| match item {
            Value::Object(record) => Ok(record),
            _ => Err(BackupError::ManifestInvalid(format!(
                "{} row {} is not an object",
                context,
                idx + 1
            ))),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_complete_database_keeps_order_and_empty_tables() {
        let tables = vec![
            TableSnapshot::new("residents", vec![record(json!({"id": 1, "name": "Ana"}))]),
            TableSnapshot::new("complainants", Vec::new()),
            TableSnapshot::new("events", vec![record(json!({"id": 4}))]),
        ];

        let bytes = complete_database_json(&tables).unwrap();
        let parsed = parse_complete_database(&bytes, "complete_database.json").unwrap();

        let names: Vec<_> = parsed.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["residents", "complainants", "events"]);
        assert!(parsed[1].rows.is_empty());
        assert_eq!(parsed, tables);
    }

    #[test]
    fn test_table_json_is_pretty_array() {
        let bytes = table_json(&[record(json!({"id": 1}))]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with('['));
        assert!(text.contains("\n"));
    }

    #[test]
    fn test_truncated_payload_is_manifest_invalid() {
        let bytes = br#"{"residents": [{"id": 1}, {"id""#;
        let err = parse_complete_database(bytes, "complete_database.json").unwrap_err();
        assert!(err.is_manifest_invalid());
    }

    #[test]
    fn test_wrong_shapes_are_rejected() {
        assert!(parse_complete_database(b"[1, 2]", "x").is_err());
        assert!(parse_complete_database(br#"{"t": {"id": 1}}"#, "x").is_err());
        assert!(parse_table_rows(br#"[{"id": 1}, 2]"#, "x").is_err());
        assert_eq!(parse_table_rows(b"[]", "x").unwrap().len(), 0);
    }
}
