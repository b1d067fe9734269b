//! Backup manifest models
//!
//! `TableSnapshot` carries one table's rows in memory. `ArchiveIndex` is the
//! compact form persisted as `manifest.json` inside each archive so an
//! archive can be described without loading its data.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::kind::{BackupKind, FileGroup};
use super::record::Record;

/// Schema version written into every archive index
pub const INDEX_SCHEMA_VERSION: u32 = 1;

/// One table's full row dump at capture time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSnapshot {
    /// Table name in the source schema
    pub name: String,
    /// Rows in capture order
    pub rows: Vec<Record>,
}

impl TableSnapshot {
    pub fn new(name: impl Into<String>, rows: Vec<Record>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }

    /// Number of captured rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Row count of one captured table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableCount {
    pub name: String,
    pub records: usize,
}

/// The archive index stored as `manifest.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveIndex {
    /// Schema version for migration support
    pub schema_version: u32,
    /// Scope of the backup
    pub kind: BackupKind,
    /// When the backup was captured
    pub created_at: DateTime<Utc>,
    /// Informational source database name
    #[serde(default)]
    pub source_database_name: String,
    /// Captured tables with their row counts, in capture order
    #[serde(default)]
    pub tables: Vec<TableCount>,
    /// Filenames captured per group
    #[serde(default)]
    pub file_groups: BTreeMap<FileGroup, Vec<String>>,
    /// Whether `database/database_dump.sql` is present
    #[serde(default)]
    pub sql_dump_included: bool,
}

impl ArchiveIndex {
    /// Total rows across all captured tables
    pub fn total_records(&self) -> usize {
        self.tables.iter().map(|t| t.records).sum()
    }

    /// Number of files captured for a group
    pub fn file_count(&self, group: FileGroup) -> usize {
        self.file_groups.get(&group).map_or(0, Vec::len)
    }

    /// Total files across all groups
    pub fn total_files(&self) -> usize {
        self.file_groups.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_index_keeps_empty_groups() {
        let mut file_groups = BTreeMap::new();
        file_groups.insert(FileGroup::Profiles, Vec::new());
        let index = ArchiveIndex {
            schema_version: INDEX_SCHEMA_VERSION,
            kind: BackupKind::Complete,
            created_at: Utc::now(),
            source_database_name: "civic".into(),
            tables: vec![TableCount {
                name: "events".into(),
                records: 0,
            }],
            file_groups,
            sql_dump_included: false,
        };

        let json = serde_json::to_value(&index).unwrap();
        assert_eq!(json["file_groups"]["profiles"], json!([]));
        assert_eq!(json["tables"][0]["records"], json!(0));

        let back: ArchiveIndex = serde_json::from_value(json).unwrap();
        assert_eq!(back, index);
    }
}
