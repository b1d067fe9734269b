//! Opaque row records
//!
//! Tables are enumerated at runtime, so rows are carried as ordered
//! column-to-scalar maps rather than per-table structs.

use serde_json::{Map, Value};

/// One row: column name to scalar value, in column order
pub type Record = Map<String, Value>;

/// Remove a column from a row, returning the row without it
pub fn without_column(mut record: Record, column: &str) -> Record {
    record.shift_remove(column);
    record
}

/// Render a value the way it appears in a flat text cell
///
/// Strings are unquoted, null is empty, and nested values (which the source
/// flattening should not produce) are JSON-encoded.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_without_column_keeps_order() {
        let row = record(json!({"id": 7, "folder_name": "Permits", "zip_name": "a.zip"}));
        let stripped = without_column(row, "id");

        let keys: Vec<_> = stripped.keys().cloned().collect();
        assert_eq!(keys, vec!["folder_name", "zip_name"]);
    }

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(&Value::Null), "");
        assert_eq!(cell_text(&json!("Juan \"JD\" Cruz")), "Juan \"JD\" Cruz");
        assert_eq!(cell_text(&json!(42)), "42");
        assert_eq!(cell_text(&json!(true)), "true");
        assert_eq!(cell_text(&json!(["a.pdf", "b.pdf"])), "[\"a.pdf\",\"b.pdf\"]");
    }
}
