//! SQLite-backed table store
//!
//! Exposes any SQLite database as an opaque set of tables. Catalog order is
//! `sqlite_master` rowid order, which is table creation order.

use std::collections::HashSet;
use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection};
use serde_json::{Number, Value};

use crate::error::{BackupError, BackupResult};
use crate::models::Record;

use super::TableStore;

/// A table store over a SQLite connection
pub struct SqliteStore {
    conn: Connection,
    name: String,
}

impl SqliteStore {
    /// Open (or create) a database file
    pub fn open(path: &Path) -> BackupResult<Self> {
        let conn = Connection::open(path).map_err(|e| {
            BackupError::StorageUnavailable(format!(
                "Failed to open database {}: {}",
                path.display(),
                e
            ))
        })?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "main".to_string());
        Ok(Self { conn, name })
    }

    /// Wrap an existing connection
    pub fn from_connection(conn: Connection, name: impl Into<String>) -> Self {
        Self {
            conn,
            name: name.into(),
        }
    }

    /// Count rows of a table
    pub fn count_rows(&self, table: &str) -> BackupResult<usize> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(table));
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count.max(0) as usize)
    }

    /// Columns declared with a BLOB type
    fn blob_columns(&self, table: &str) -> BackupResult<HashSet<String>> {
        let sql = format!("PRAGMA table_info({})", quote_ident(table));
        let mut stmt = self.conn.prepare(&sql)?;
        let columns = stmt
            .query_map([], |row| Ok((row.get::<_, String>(1)?, row.get::<_, String>(2)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(columns
            .into_iter()
            .filter(|(_, declared)| declared.to_ascii_uppercase().contains("BLOB"))
            .map(|(name, _)| name)
            .collect())
    }

    fn insert_one(
        &self,
        table: &str,
        record: &Record,
        blob_columns: &HashSet<String>,
    ) -> BackupResult<()> {
        if record.is_empty() {
            let sql = format!("INSERT INTO {} DEFAULT VALUES", quote_ident(table));
            self.conn.execute(&sql, [])?;
            return Ok(());
        }

        let columns: Vec<String> = record.keys().map(|k| quote_ident(k)).collect();
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_ident(table),
            columns.join(", "),
            placeholders.join(", ")
        );

        let mut stmt = self.conn.prepare_cached(&sql)?;
        let values = record.iter().map(|(column, value)| {
            if blob_columns.contains(column) {
                blob_to_sql(value)
            } else {
                json_to_sql(value)
            }
        });
        stmt.execute(params_from_iter(values))?;
        Ok(())
    }
}

impl TableStore for SqliteStore {
    fn database_name(&self) -> String {
        self.name.clone()
    }

    fn list_tables(&self) -> BackupResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT name FROM sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' \
             ORDER BY rowid",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    fn read_all_rows(&self, table: &str) -> BackupResult<Vec<Record>> {
        let sql = format!("SELECT * FROM {}", quote_ident(table));
        let mut stmt = self.conn.prepare(&sql)?;
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();

        let mut rows = stmt.query([])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            let mut record = Record::new();
            for (idx, column) in columns.iter().enumerate() {
                record.insert(column.clone(), sql_to_json(row.get_ref(idx)?));
            }
            records.push(record);
        }
        Ok(records)
    }

    fn begin_transaction(&mut self) -> BackupResult<()> {
        self.conn.execute_batch("BEGIN")?;
        Ok(())
    }

    fn truncate(&mut self, table: &str) -> BackupResult<()> {
        let sql = format!("DELETE FROM {}", quote_ident(table));
        self.conn.execute(&sql, [])?;
        Ok(())
    }

    fn bulk_insert(&mut self, table: &str, records: &[Record]) -> BackupResult<()> {
        let blob_columns = self.blob_columns(table)?;
        for record in records {
            self.insert_one(table, record, &blob_columns)?;
        }
        Ok(())
    }

    fn commit(&mut self) -> BackupResult<()> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback(&mut self) -> BackupResult<()> {
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }
}

/// Quote an identifier for use in SQL text
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn sql_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Number(i.into()),
        ValueRef::Real(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::String(BASE64.encode(bytes)),
    }
}

fn json_to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => n.as_f64().map_or(SqlValue::Null, SqlValue::Real),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        Value::Array(_) | Value::Object(_) => SqlValue::Text(value.to_string()),
    }
}

/// Bind a captured blob cell, undoing the base64 applied on read
fn blob_to_sql(value: &Value) -> SqlValue {
    match value {
        Value::String(s) => BASE64
            .decode(s)
            .map(SqlValue::Blob)
            .unwrap_or_else(|_| SqlValue::Text(s.clone())),
        other => json_to_sql(other),
    }
}
