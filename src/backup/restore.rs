//! Backup restoration for civic-backup
//!
//! Replays an archive into the live store and file tree. The database phase
//! runs inside one transaction and is all-or-nothing; the file phase is
//! best-effort per file. Archive entries are staged in a scratch directory
//! that is removed when the restore ends, however it ends.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tempfile::TempDir;
use tracing::{debug, info, warn};

use crate::archive::{layout, ArchiveReader};
use crate::config::settings::{AppendPolicy, RestoreSettings};
use crate::error::{BackupError, BackupResult};
use crate::models::record::{cell_text, without_column};
use crate::models::{BackupKind, FileGroup, Record, SkippedFile, TableCount, TableSnapshot};
use crate::storage::{is_safe_file_name, FileTree, TableStore};

/// Rows handed to the store per insert call
const INSERT_CHUNK: usize = 100;

/// Handles restoring from archives
pub struct RestoreManager {
    scratch_dir: PathBuf,
    settings: RestoreSettings,
    folders_table: String,
}

impl RestoreManager {
    /// Create a RestoreManager staging entries under `scratch_dir`
    pub fn new(scratch_dir: impl Into<PathBuf>, settings: RestoreSettings) -> Self {
        Self {
            scratch_dir: scratch_dir.into(),
            settings,
            folders_table: "folders".to_string(),
        }
    }

    /// Table that receives rows from folders archives
    pub fn with_folders_table(mut self, table: impl Into<String>) -> Self {
        self.folders_table = table.into();
        self
    }

    /// Check that an archive can be restored in a mode, without touching anything
    pub fn validate(&self, archive: &Path, mode: BackupKind) -> BackupResult<ValidationResult> {
        let mut reader = ArchiveReader::open(archive)?;
        let index = reader.index()?;
        let tables = reader.load_tables(mode, &self.folders_table)?;

        let files = mode
            .file_groups()
            .iter()
            .map(|&group| (group, reader.group_file_names(mode, group).len()))
            .collect();

        Ok(ValidationResult {
            mode,
            archive_kind: index.kind,
            backup_date: index.created_at,
            tables: tables
                .iter()
                .map(|t| TableCount {
                    name: t.name.clone(),
                    records: t.len(),
                })
                .collect(),
            files,
            sql_dump_included: index.sql_dump_included,
        })
    }

    /// Restore an archive into live storage
    ///
    /// `Database` and `Complete` replace every captured table inside one
    /// transaction; `Folders` appends the legacy folders table. File groups
    /// of the mode are then written over the live tree.
    pub fn restore(
        &self,
        archive: &Path,
        mode: BackupKind,
        store: &mut dyn TableStore,
        files: &dyn FileTree,
    ) -> BackupResult<RestoreReport> {
        info!(archive = %archive.display(), mode = %mode, "Restore started");

        let mut reader = ArchiveReader::open(archive)?;
        let index = reader.index()?;
        let staging = self.staging_dir()?;

        // Everything that can fail validation happens before the first write
        let tables = reader.load_tables(mode, &self.folders_table)?;
        let mut report = RestoreReport {
            mode,
            backup_date: index.created_at,
            ..Default::default()
        };
        let staged = self.stage_files(&mut reader, mode, staging.path(), &mut report.skipped);

        if mode.includes_database() {
            self.replace_tables(store, tables, &mut report)?;
        } else if let Some(table) = tables.into_iter().next() {
            self.append_table(store, table, &mut report)?;
        }

        for (group, names) in staged {
            let restored = self.replay_group(files, group, staging.path(), names, &mut report.skipped);
            report.files_restored.insert(group, restored);
        }

        info!(
            tables = report.tables_restored,
            records = report.records_restored,
            records_skipped = report.records_skipped,
            files = report.total_files_restored(),
            skipped = report.skipped.len(),
            "Restore completed"
        );

        Ok(report)
    }

    fn staging_dir(&self) -> BackupResult<TempDir> {
        fs::create_dir_all(&self.scratch_dir).map_err(|e| {
            BackupError::Io(format!(
                "Failed to create scratch directory {}: {}",
                self.scratch_dir.display(),
                e
            ))
        })?;

        tempfile::Builder::new()
            .prefix("restore_")
            .tempdir_in(&self.scratch_dir)
            .map_err(|e| BackupError::Io(format!("Failed to create staging directory: {}", e)))
    }

    /// Extract a mode's file groups into the staging directory
    fn stage_files(
        &self,
        reader: &mut ArchiveReader,
        mode: BackupKind,
        staging: &Path,
        skipped: &mut Vec<SkippedFile>,
    ) -> Vec<(FileGroup, Vec<String>)> {
        let mut staged = Vec::new();

        for &group in mode.file_groups() {
            let group_dir = staging.join(group.token());
            let mut names = Vec::new();

            for name in reader.group_file_names(mode, group) {
                if !is_safe_file_name(&name) {
                    warn!(group = %group.token(), file = %name, "Skipping entry with unsafe name");
                    skipped.push(SkippedFile::new(Some(group), name, "unsafe file name"));
                    continue;
                }

                let entry = layout::file_entry(mode, group, &name);
                let result = reader.read_entry(&entry).and_then(|bytes| {
                    let bytes = bytes.ok_or_else(|| {
                        BackupError::ArchiveIo(format!("Entry {} vanished", entry))
                    })?;
                    fs::create_dir_all(&group_dir)?;
                    fs::write(group_dir.join(&name), bytes)?;
                    Ok(())
                });

                match result {
                    Ok(()) => names.push(name),
                    Err(e) => {
                        warn!(group = %group.token(), file = %name, error = %e, "Skipping unreadable entry");
                        skipped.push(SkippedFile::new(Some(group), name, e.to_string()));
                    }
                }
            }

            staged.push((group, names));
        }

        staged
    }

    /// Move staged files into the live tree, returning how many were written
    fn replay_group(
        &self,
        files: &dyn FileTree,
        group: FileGroup,
        staging: &Path,
        names: Vec<String>,
        skipped: &mut Vec<SkippedFile>,
    ) -> usize {
        let group_dir = staging.join(group.token());
        let mut restored = 0;

        for name in names {
            let result = fs::read(group_dir.join(&name))
                .map_err(BackupError::from)
                .and_then(|bytes| files.write_file(group, &name, &bytes));

            match result {
                Ok(()) => {
                    debug!(group = %group.token(), file = %name, "File restored");
                    restored += 1;
                }
                Err(e) => {
                    warn!(group = %group.token(), file = %name, error = %e, "Failed to restore file");
                    skipped.push(SkippedFile::new(Some(group), name, e.to_string()));
                }
            }
        }

        restored
    }

    /// Restore order: configured priority tables first, then archive order
    fn order_tables(&self, tables: Vec<TableSnapshot>) -> Vec<TableSnapshot> {
        let mut remaining = tables;
        let mut ordered = Vec::with_capacity(remaining.len());

        for name in &self.settings.table_order {
            if let Some(pos) = remaining.iter().position(|t| &t.name == name) {
                ordered.push(remaining.remove(pos));
            }
        }
        ordered.extend(remaining);
        ordered
    }

    /// Truncate and reload every table inside one transaction
    fn replace_tables(
        &self,
        store: &mut dyn TableStore,
        tables: Vec<TableSnapshot>,
        report: &mut RestoreReport,
    ) -> BackupResult<()> {
        let tables = self.order_tables(tables);
        store.begin_transaction()?;

        for table in &tables {
            let result = store
                .truncate(&table.name)
                .and_then(|_| insert_chunked(store, &table.name, &table.rows));

            if let Err(e) = result {
                return Err(abort(store, &table.name, e));
            }
            debug!(table = %table.name, records = table.len(), "Table replaced");
        }

        if let Err(e) = store.commit() {
            return Err(abort(store, "commit", e));
        }

        report.tables_restored = tables.len();
        report.records_restored = tables.iter().map(TableSnapshot::len).sum();
        Ok(())
    }

    /// Insert captured rows as new rows, without touching existing ones
    fn append_table(
        &self,
        store: &mut dyn TableStore,
        table: TableSnapshot,
        report: &mut RestoreReport,
    ) -> BackupResult<()> {
        let identity = &self.settings.identity_column;
        let key_column = &self.settings.append_key_column;

        let mut existing: HashSet<String> = match self.settings.append_policy {
            AppendPolicy::SkipExisting => store
                .read_all_rows(&table.name)?
                .iter()
                .filter_map(|row| append_key(row, key_column))
                .collect(),
            AppendPolicy::Append => HashSet::new(),
        };

        let mut rows: Vec<Record> = Vec::with_capacity(table.len());
        let mut skipped = 0;
        for row in table.rows {
            if self.settings.append_policy == AppendPolicy::SkipExisting {
                if let Some(key) = append_key(&row, key_column) {
                    if !existing.insert(key) {
                        skipped += 1;
                        continue;
                    }
                }
            }
            rows.push(without_column(row, identity));
        }

        store.begin_transaction()?;
        if let Err(e) = insert_chunked(store, &table.name, &rows) {
            return Err(abort(store, &table.name, e));
        }
        if let Err(e) = store.commit() {
            return Err(abort(store, "commit", e));
        }

        if skipped > 0 {
            info!(table = %table.name, skipped, "Rows already present were not appended");
        }
        report.tables_restored = 1;
        report.records_restored = rows.len();
        report.records_skipped = skipped;
        Ok(())
    }
}

fn insert_chunked(store: &mut dyn TableStore, table: &str, rows: &[Record]) -> BackupResult<()> {
    for chunk in rows.chunks(INSERT_CHUNK) {
        store.bulk_insert(table, chunk)?;
    }
    Ok(())
}

/// Roll back and describe the failure
fn abort(store: &mut dyn TableStore, table: &str, err: BackupError) -> BackupError {
    warn!(table = %table, error = %err, "Restore failed, rolling back");
    if let Err(rollback_err) = store.rollback() {
        warn!(error = %rollback_err, "Rollback failed");
    }
    BackupError::TransactionFailure {
        table: table.to_string(),
        message: err.to_string(),
    }
}

fn append_key(row: &Record, column: &str) -> Option<String> {
    match row.get(column) {
        None | Some(serde_json::Value::Null) => None,
        Some(value) => Some(cell_text(value)),
    }
}

/// Result of a restore operation
#[derive(Debug, Clone, Default, Serialize)]
pub struct RestoreReport {
    /// Mode the archive was restored in
    pub mode: BackupKind,
    /// When the archive was captured
    pub backup_date: DateTime<Utc>,
    pub tables_restored: usize,
    pub records_restored: usize,
    /// Captured rows left out because they were already present
    pub records_skipped: usize,
    /// Files written per group
    pub files_restored: BTreeMap<FileGroup, usize>,
    /// Entries that could not be replayed
    pub skipped: Vec<SkippedFile>,
}

impl RestoreReport {
    /// Files written across all groups
    pub fn total_files_restored(&self) -> usize {
        self.files_restored.values().sum()
    }

    /// Files written for one group
    pub fn files_restored_for(&self, group: FileGroup) -> usize {
        self.files_restored.get(&group).copied().unwrap_or(0)
    }

    /// One-line summary of what was restored
    pub fn summary(&self) -> String {
        let mut parts = vec![
            format!("{} tables", self.tables_restored),
            format!("{} records", self.records_restored),
        ];
        for (group, count) in &self.files_restored {
            parts.push(format!("{} {}", count, group.to_string().to_lowercase()));
        }
        if self.records_skipped > 0 {
            parts.push(format!("{} existing records skipped", self.records_skipped));
        }
        if !self.skipped.is_empty() {
            parts.push(format!("{} files skipped", self.skipped.len()));
        }
        format!("Restored: {}", parts.join(", "))
    }
}

/// Result of validating an archive for restore
#[derive(Debug, Clone)]
pub struct ValidationResult {
    /// Mode that was validated
    pub mode: BackupKind,
    /// Kind recorded in (or inferred from) the archive
    pub archive_kind: BackupKind,
    /// When the archive was captured
    pub backup_date: DateTime<Utc>,
    /// Tables the restore would write, with their row counts
    pub tables: Vec<TableCount>,
    /// Files the restore would write per group
    pub files: BTreeMap<FileGroup, usize>,
    pub sql_dump_included: bool,
}

impl ValidationResult {
    pub fn total_records(&self) -> usize {
        self.tables.iter().map(|t| t.records).sum()
    }

    /// Get a summary of what the restore would write
    pub fn summary(&self) -> String {
        let files: usize = self.files.values().sum();
        format!(
            "{} backup from {}: {} tables, {} records, {} files",
            self.archive_kind.label(),
            self.backup_date.format("%Y-%m-%d %H:%M:%S"),
            self.tables.len(),
            self.total_records(),
            files
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ArchiveWriter;
    use crate::backup::builder::ArchiveBuilder;
    use crate::config::StorageLayout;
    use crate::models::Trigger;
    use crate::storage::{DirFileTree, MemoryStore};
    use chrono::TimeZone;
    use serde_json::json;

    fn row(value: serde_json::Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    fn source_store() -> MemoryStore {
        MemoryStore::new("civic")
            .with_table(
                "folders",
                vec![
                    row(json!({"id": 1, "folder_name": "Permits", "zip_name": "permits.zip"})),
                    row(json!({"id": 2, "folder_name": "Clearances", "zip_name": "clear.zip"})),
                ],
            )
            .with_table("users", vec![row(json!({"id": 1, "email": "clerk@example.org"}))])
            .with_table("events", Vec::new())
    }

    fn empty_store() -> MemoryStore {
        MemoryStore::new("civic")
            .with_table("folders", Vec::new())
            .with_table("users", Vec::new())
            .with_table("events", Vec::new())
    }

    struct Fixture {
        _temp: tempfile::TempDir,
        source: StorageLayout,
        target: StorageLayout,
    }

    impl Fixture {
        fn new() -> Self {
            let temp = tempfile::TempDir::new().unwrap();
            let source = StorageLayout::under(temp.path().join("source"));
            let target = StorageLayout::under(temp.path().join("target"));
            Self {
                _temp: temp,
                source,
                target,
            }
        }

        fn backup(&self, store: &MemoryStore, kind: BackupKind) -> PathBuf {
            let tree = DirFileTree::from_layout(&self.source);
            let at = Utc.with_ymd_and_hms(2025, 11, 18, 2, 0, 0).unwrap();
            ArchiveBuilder::new(&self.source.backup_dir, store, &tree)
                .build_at(kind, Trigger::Manual, at)
                .unwrap()
                .path
        }

        fn manager(&self) -> RestoreManager {
            RestoreManager::new(&self.target.scratch_dir, RestoreSettings::default())
        }

        fn seed_files(&self) {
            let tree = DirFileTree::from_layout(&self.source);
            tree.write_file(FileGroup::FolderZips, "permits.zip", b"zip-1").unwrap();
            tree.write_file(FileGroup::FolderZips, "clear.zip", b"zip-2").unwrap();
            tree.write_file(FileGroup::Profiles, "me.png", b"png").unwrap();
        }
    }

    fn write_archive(path: &Path, entries: &[(&str, &str)]) {
        let mut writer = ArchiveWriter::create_new(path).unwrap();
        for (name, text) in entries {
            writer.add_text(name, text).unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn test_database_round_trip() {
        let fixture = Fixture::new();
        let source = source_store();
        let archive = fixture.backup(&source, BackupKind::Database);

        let mut target = empty_store();
        let tree = DirFileTree::from_layout(&fixture.target);
        let report = fixture
            .manager()
            .restore(&archive, BackupKind::Database, &mut target, &tree)
            .unwrap();

        assert_eq!(report.tables_restored, 3);
        assert_eq!(report.records_restored, 3);
        for table in ["folders", "users", "events"] {
            assert_eq!(target.rows(table), source.rows(table));
        }
        assert!(!target.in_transaction());
    }

    #[test]
    fn test_complete_round_trip_replays_files() {
        let fixture = Fixture::new();
        fixture.seed_files();
        let source = source_store();
        let archive = fixture.backup(&source, BackupKind::Complete);

        let mut target = empty_store();
        let tree = DirFileTree::from_layout(&fixture.target);
        tree.write_file(FileGroup::Profiles, "me.png", b"stale").unwrap();

        let report = fixture
            .manager()
            .restore(&archive, BackupKind::Complete, &mut target, &tree)
            .unwrap();

        assert_eq!(target.rows("folders"), source.rows("folders"));
        assert_eq!(report.files_restored_for(FileGroup::FolderZips), 2);
        assert_eq!(report.files_restored_for(FileGroup::Profiles), 1);
        assert_eq!(tree.read_file(FileGroup::Profiles, "me.png").unwrap(), b"png");
        assert_eq!(tree.read_file(FileGroup::FolderZips, "clear.zip").unwrap(), b"zip-2");
    }

    #[test]
    fn test_folders_restore_appends_without_identity() {
        let fixture = Fixture::new();
        fixture.seed_files();
        let archive = fixture.backup(&source_store(), BackupKind::Folders);

        let mut target = MemoryStore::new("civic").with_table(
            "folders",
            vec![row(json!({"id": 7, "folder_name": "Permits", "zip_name": "permits.zip"}))],
        );
        let tree = DirFileTree::from_layout(&fixture.target);
        let report = fixture
            .manager()
            .restore(&archive, BackupKind::Folders, &mut target, &tree)
            .unwrap();

        assert_eq!(report.records_restored, 1);
        assert_eq!(report.records_skipped, 1);
        let rows = target.rows("folders").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["id"], json!(7));
        assert!(!rows[1].contains_key("id"));
        assert_eq!(rows[1]["zip_name"], json!("clear.zip"));
        assert_eq!(report.files_restored_for(FileGroup::FolderZips), 2);
    }

    #[test]
    fn test_pure_append_duplicates_rows() {
        let fixture = Fixture::new();
        let archive = fixture.backup(&source_store(), BackupKind::Folders);

        let mut settings = RestoreSettings::default();
        settings.append_policy = AppendPolicy::Append;
        let manager = RestoreManager::new(&fixture.target.scratch_dir, settings);

        let mut target = MemoryStore::new("civic").with_table("folders", Vec::new());
        let tree = DirFileTree::from_layout(&fixture.target);
        manager
            .restore(&archive, BackupKind::Folders, &mut target, &tree)
            .unwrap();
        let report = manager
            .restore(&archive, BackupKind::Folders, &mut target, &tree)
            .unwrap();

        assert_eq!(report.records_skipped, 0);
        assert_eq!(target.row_count("folders"), Some(4));
    }

    #[test]
    fn test_corrupted_database_leaves_store_untouched() {
        let fixture = Fixture::new();
        fs::create_dir_all(&fixture.source.backup_dir).unwrap();
        let archive = fixture.source.backup_dir.join("database_backup_2025-11-18_020000.zip");
        write_archive(
            &archive,
            &[("database/complete_database.json", r#"{"folders": [{"id": 1}, {"id""#)],
        );

        let mut target = source_store();
        let tree = DirFileTree::from_layout(&fixture.target);
        let err = fixture
            .manager()
            .restore(&archive, BackupKind::Database, &mut target, &tree)
            .unwrap_err();

        assert!(err.is_manifest_invalid());
        assert_eq!(target.row_count("folders"), Some(2));
        assert_eq!(target.row_count("users"), Some(1));
        assert!(!target.in_transaction());
    }

    #[test]
    fn test_missing_folders_entry_is_manifest_invalid() {
        let fixture = Fixture::new();
        let archive = fixture.backup(&source_store(), BackupKind::Database);

        let mut target = empty_store();
        let tree = DirFileTree::from_layout(&fixture.target);
        let err = fixture
            .manager()
            .restore(&archive, BackupKind::Folders, &mut target, &tree)
            .unwrap_err();
        assert!(err.is_manifest_invalid());
    }

    #[test]
    fn test_insert_failure_rolls_back_every_table() {
        let fixture = Fixture::new();
        let archive = fixture.backup(&source_store(), BackupKind::Database);

        // No "events" table: the last table of the archive fails to truncate
        let mut target = MemoryStore::new("civic")
            .with_table("folders", vec![row(json!({"id": 99}))])
            .with_table("users", Vec::new());
        let tree = DirFileTree::from_layout(&fixture.target);

        let err = fixture
            .manager()
            .restore(&archive, BackupKind::Database, &mut target, &tree)
            .unwrap_err();

        match err {
            BackupError::TransactionFailure { table, .. } => assert_eq!(table, "events"),
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(target.rows("folders").unwrap(), &[row(json!({"id": 99}))]);
        assert_eq!(target.row_count("users"), Some(0));
        assert!(!target.in_transaction());
    }

    #[test]
    fn test_configured_table_order() {
        let mut settings = RestoreSettings::default();
        settings.table_order = vec!["users".into(), "ghosts".into()];
        let manager = RestoreManager::new("unused", settings);

        let tables = vec![
            TableSnapshot::new("folders", Vec::new()),
            TableSnapshot::new("events", Vec::new()),
            TableSnapshot::new("users", Vec::new()),
        ];
        let names: Vec<_> = manager
            .order_tables(tables)
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["users", "folders", "events"]);
    }

    /// Refuses to write one file, delegating the rest
    struct FlakyTree {
        inner: DirFileTree,
        refuse: &'static str,
    }

    impl FileTree for FlakyTree {
        fn list_files(&self, group: FileGroup) -> BackupResult<Vec<String>> {
            self.inner.list_files(group)
        }

        fn read_file(&self, group: FileGroup, name: &str) -> BackupResult<Vec<u8>> {
            self.inner.read_file(group, name)
        }

        fn write_file(&self, group: FileGroup, name: &str, content: &[u8]) -> BackupResult<()> {
            if name == self.refuse {
                return Err(BackupError::Io("permission denied".into()));
            }
            self.inner.write_file(group, name, content)
        }
    }

    #[test]
    fn test_one_failed_file_does_not_stop_the_rest() {
        let fixture = Fixture::new();
        let source_tree = DirFileTree::from_layout(&fixture.source);
        for i in 0..10 {
            source_tree
                .write_file(FileGroup::FolderZips, &format!("folder_{}.zip", i), b"zip")
                .unwrap();
        }
        let archive = fixture.backup(&source_store(), BackupKind::Folders);

        let mut target = MemoryStore::new("civic").with_table("folders", Vec::new());
        let tree = FlakyTree {
            inner: DirFileTree::from_layout(&fixture.target),
            refuse: "folder_4.zip",
        };
        let report = fixture
            .manager()
            .restore(&archive, BackupKind::Folders, &mut target, &tree)
            .unwrap();

        assert_eq!(report.files_restored_for(FileGroup::FolderZips), 9);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].name, "folder_4.zip");
    }

    #[test]
    fn test_scratch_dir_is_cleaned_up() {
        let fixture = Fixture::new();
        fixture.seed_files();
        let archive = fixture.backup(&source_store(), BackupKind::Complete);
        let tree = DirFileTree::from_layout(&fixture.target);

        let mut target = empty_store();
        fixture
            .manager()
            .restore(&archive, BackupKind::Complete, &mut target, &tree)
            .unwrap();
        assert_eq!(fs::read_dir(&fixture.target.scratch_dir).unwrap().count(), 0);

        let mut broken = MemoryStore::new("civic");
        assert!(fixture
            .manager()
            .restore(&archive, BackupKind::Complete, &mut broken, &tree)
            .is_err());
        assert_eq!(fs::read_dir(&fixture.target.scratch_dir).unwrap().count(), 0);
    }

    #[test]
    fn test_validate_reports_without_writing() {
        let fixture = Fixture::new();
        fixture.seed_files();
        let archive = fixture.backup(&source_store(), BackupKind::Complete);

        let result = fixture
            .manager()
            .validate(&archive, BackupKind::Complete)
            .unwrap();
        assert_eq!(result.archive_kind, BackupKind::Complete);
        assert_eq!(result.tables.len(), 3);
        assert_eq!(result.total_records(), 3);
        assert_eq!(result.files[&FileGroup::FolderZips], 2);
        assert!(!fixture.target.scratch_dir.exists());
    }
}
