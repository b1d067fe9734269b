//! In-memory table store
//!
//! Keeps tables in catalog order and implements transactions as a snapshot
//! that rollback restores. Used by tests and by embedders that want to drive
//! the engine without a database.

use crate::error::{BackupError, BackupResult};
use crate::models::Record;

use super::TableStore;

type Tables = Vec<(String, Vec<Record>)>;

/// A transactional, ordered, in-memory table store
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    name: String,
    tables: Tables,
    snapshot: Option<Tables>,
}

impl MemoryStore {
    /// Create an empty store with the given database name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tables: Vec::new(),
            snapshot: None,
        }
    }

    /// Builder-style helper adding a table with rows
    pub fn with_table(mut self, name: impl Into<String>, rows: Vec<Record>) -> Self {
        self.put_table(name, rows);
        self
    }

    /// Replace (or create) a table's rows outside any transaction
    pub fn put_table(&mut self, name: impl Into<String>, rows: Vec<Record>) {
        let name = name.into();
        match self.position(&name) {
            Some(idx) => self.tables[idx].1 = rows,
            None => self.tables.push((name, rows)),
        }
    }

    /// Rows of a table, if it exists
    pub fn rows(&self, table: &str) -> Option<&[Record]> {
        self.position(table).map(|idx| self.tables[idx].1.as_slice())
    }

    /// Row count of a table, if it exists
    pub fn row_count(&self, table: &str) -> Option<usize> {
        self.rows(table).map(<[Record]>::len)
    }

    /// Whether a transaction is currently open
    pub fn in_transaction(&self) -> bool {
        self.snapshot.is_some()
    }

    fn position(&self, table: &str) -> Option<usize> {
        self.tables.iter().position(|(name, _)| name == table)
    }

    fn table_mut(&mut self, table: &str) -> BackupResult<&mut Vec<Record>> {
        let idx = self
            .position(table)
            .ok_or_else(|| BackupError::table_not_found(table))?;
        Ok(&mut self.tables[idx].1)
    }
}

impl TableStore for MemoryStore {
    fn database_name(&self) -> String {
        self.name.clone()
    }

    fn list_tables(&self) -> BackupResult<Vec<String>> {
        Ok(self.tables.iter().map(|(name, _)| name.clone()).collect())
    }

    fn read_all_rows(&self, table: &str) -> BackupResult<Vec<Record>> {
        self.rows(table)
            .map(<[Record]>::to_vec)
            .ok_or_else(|| BackupError::table_not_found(table))
    }

    fn begin_transaction(&mut self) -> BackupResult<()> {
        if self.snapshot.is_some() {
            return Err(BackupError::StorageUnavailable(
                "A transaction is already open".into(),
            ));
        }
        self.snapshot = Some(self.tables.clone());
        Ok(())
    }

    fn truncate(&mut self, table: &str) -> BackupResult<()> {
        self.table_mut(table)?.clear();
        Ok(())
    }

    fn bulk_insert(&mut self, table: &str, records: &[Record]) -> BackupResult<()> {
        self.table_mut(table)?.extend_from_slice(records);
        Ok(())
    }

    fn commit(&mut self) -> BackupResult<()> {
        self.snapshot
            .take()
            .map(|_| ())
            .ok_or_else(|| BackupError::StorageUnavailable("No open transaction to commit".into()))
    }

    fn rollback(&mut self) -> BackupResult<()> {
        let snapshot = self.snapshot.take().ok_or_else(|| {
            BackupError::StorageUnavailable("No open transaction to roll back".into())
        })?;
        self.tables = snapshot;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(id: i64) -> Record {
        json!({"id": id, "name": format!("row {}", id)})
            .as_object()
            .cloned()
            .unwrap()
    }

    #[test]
    fn test_catalog_order() {
        let store = MemoryStore::new("civic")
            .with_table("residents", vec![row(1)])
            .with_table("events", Vec::new());

        assert_eq!(store.list_tables().unwrap(), vec!["residents", "events"]);
        assert_eq!(store.database_name(), "civic");
    }

    #[test]
    fn test_rollback_restores_snapshot() {
        let mut store = MemoryStore::new("civic").with_table("residents", vec![row(1), row(2)]);

        store.begin_transaction().unwrap();
        store.truncate("residents").unwrap();
        store.bulk_insert("residents", &[row(9)]).unwrap();
        assert_eq!(store.row_count("residents"), Some(1));

        store.rollback().unwrap();
        assert_eq!(store.row_count("residents"), Some(2));
        assert!(!store.in_transaction());
    }

    #[test]
    fn test_commit_keeps_changes() {
        let mut store = MemoryStore::new("civic").with_table("residents", vec![row(1)]);

        store.begin_transaction().unwrap();
        store.bulk_insert("residents", &[row(2)]).unwrap();
        store.commit().unwrap();

        assert_eq!(store.row_count("residents"), Some(2));
        assert!(store.commit().is_err());
    }

    #[test]
    fn test_unknown_table_fails() {
        let mut store = MemoryStore::new("civic");
        assert!(store.read_all_rows("ghosts").unwrap_err().is_not_found());
        assert!(store.truncate("ghosts").is_err());
        assert!(store.bulk_insert("ghosts", &[row(1)]).is_err());
    }
}
