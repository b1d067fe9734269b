//! Storage collaborators for civic-backup
//!
//! The backup engine never talks to a database or a directory directly. It
//! goes through three capabilities:
//!
//! - `TableStore`: table enumeration, bulk row reads, and transactional writes
//! - `FileTree`: per-group file listing, reading, and writing
//! - `SqlDumper`: an optional raw SQL dump
//!
//! `SqliteStore` and `DirFileTree` are the production implementations;
//! `MemoryStore` is an in-memory store for tests and embedding.

pub mod dump;
pub mod file_io;
pub mod file_tree;
pub mod memory;
pub mod sqlite;

pub use dump::{CommandDump, NoDump, SqlDumper};
pub use file_io::{read_json, write_bytes_atomic, write_json_atomic};
pub use file_tree::{is_safe_file_name, DirFileTree, FileTree};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::error::BackupResult;
use crate::models::Record;

/// Table-level access to the relational store
///
/// Reads are used by backups; the transactional methods by restores. A
/// restore calls `begin_transaction` once, then any number of `truncate` and
/// `bulk_insert` calls, then exactly one of `commit` or `rollback`.
pub trait TableStore {
    /// Informational database name
    fn database_name(&self) -> String;

    /// Table names in catalog order
    fn list_tables(&self) -> BackupResult<Vec<String>>;

    /// Every row of a table, in storage order
    fn read_all_rows(&self, table: &str) -> BackupResult<Vec<Record>>;

    fn begin_transaction(&mut self) -> BackupResult<()>;

    /// Remove every row of a table
    fn truncate(&mut self, table: &str) -> BackupResult<()>;

    /// Insert rows in the given order
    fn bulk_insert(&mut self, table: &str, records: &[Record]) -> BackupResult<()>;

    fn commit(&mut self) -> BackupResult<()>;

    fn rollback(&mut self) -> BackupResult<()>;
}
