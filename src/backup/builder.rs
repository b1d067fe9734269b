//! Archive builder
//!
//! Captures tables and file groups from the live collaborators into a single
//! archive in the backup directory. A table read failure aborts the whole
//! backup; an unreadable file is skipped and reported.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::archive::{layout, ArchiveName, ArchiveWriter};
use crate::error::{BackupError, BackupResult};
use crate::export::{complete_database_json, rows_to_csv, table_json};
use crate::models::{
    ArchiveIndex, BackupKind, FileGroup, Record, SkippedFile, TableCount, TableSnapshot, Trigger,
    INDEX_SCHEMA_VERSION,
};
use crate::storage::{is_safe_file_name, FileTree, NoDump, SqlDumper, TableStore};

use super::catalog::size_mb;

/// Archives of one kind and trigger allowed within the same second
const MAX_NAME_SEQUENCE: u32 = 100;

/// Summary of one backup run
#[derive(Debug, Clone, Serialize)]
pub struct BackupStatistics {
    pub kind: BackupKind,
    pub trigger: Trigger,
    pub backup_date: DateTime<Utc>,
    pub database_name: String,
    /// Captured tables with their row counts, in capture order
    pub tables: Vec<TableCount>,
    pub total_tables: usize,
    pub total_records: usize,
    /// Rows in the folders table (folders kind only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_folders: Option<usize>,
    pub folder_zips: usize,
    pub profile_images: usize,
    pub total_files: usize,
    pub sql_dump_included: bool,
    pub size_bytes: u64,
    pub size_mb: f64,
    /// Files that could not be read
    pub skipped: Vec<SkippedFile>,
}

/// Result of a backup run
#[derive(Debug, Clone, Serialize)]
pub struct BackupReport {
    /// Archive filename
    pub filename: String,
    /// Full path to the archive
    pub path: PathBuf,
    pub statistics: BackupStatistics,
}

/// Builds archives from the live store and file tree
pub struct ArchiveBuilder<'a> {
    backup_dir: PathBuf,
    store: &'a dyn TableStore,
    files: &'a dyn FileTree,
    dumper: &'a dyn SqlDumper,
    folders_table: String,
}

impl<'a> ArchiveBuilder<'a> {
    /// Create a builder writing into `backup_dir`
    pub fn new(
        backup_dir: impl Into<PathBuf>,
        store: &'a dyn TableStore,
        files: &'a dyn FileTree,
    ) -> Self {
        Self {
            backup_dir: backup_dir.into(),
            store,
            files,
            dumper: &NoDump,
            folders_table: "folders".to_string(),
        }
    }

    /// Attach a raw SQL dump capability
    pub fn with_dumper(mut self, dumper: &'a dyn SqlDumper) -> Self {
        self.dumper = dumper;
        self
    }

    /// Table captured by the folders kind
    pub fn with_folders_table(mut self, table: impl Into<String>) -> Self {
        self.folders_table = table.into();
        self
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// Create a backup now
    pub fn build(&self, kind: BackupKind, trigger: Trigger) -> BackupResult<BackupReport> {
        self.build_at(kind, trigger, Utc::now())
    }

    /// Create a backup stamped with the given capture time
    pub fn build_at(
        &self,
        kind: BackupKind,
        trigger: Trigger,
        now: DateTime<Utc>,
    ) -> BackupResult<BackupReport> {
        fs::create_dir_all(&self.backup_dir).map_err(|e| {
            BackupError::ArchiveIo(format!(
                "Failed to create backup directory {}: {}",
                self.backup_dir.display(),
                e
            ))
        })?;

        let backup_dir = fs::canonicalize(&self.backup_dir).map_err(|e| {
            BackupError::ArchiveIo(format!(
                "Failed to resolve backup directory {}: {}",
                self.backup_dir.display(),
                e
            ))
        })?;

        let (name, mut writer) = self.claim_name(&backup_dir, kind, trigger, now)?;
        let filename = name.file_name();
        let path = writer.path().to_path_buf();
        info!(kind = %kind, trigger = ?trigger, file = %filename, "Backup started");

        let mut index = ArchiveIndex {
            schema_version: INDEX_SCHEMA_VERSION,
            kind,
            created_at: name.created_at(),
            source_database_name: self.store.database_name(),
            tables: Vec::new(),
            file_groups: Default::default(),
            sql_dump_included: false,
        };
        let mut total_folders = None;
        let mut skipped = Vec::new();

        if kind.includes_database() {
            self.write_database(&mut writer, &mut index)?;
        } else {
            let count = self.write_folders_table(&mut writer)?;
            index.tables.push(TableCount {
                name: self.folders_table.clone(),
                records: count,
            });
            total_folders = Some(count);
        }

        for &group in kind.file_groups() {
            let captured = self.write_group(&mut writer, kind, group, &mut skipped)?;
            index.file_groups.insert(group, captured);
        }

        let mut statistics = BackupStatistics {
            kind,
            trigger,
            backup_date: index.created_at,
            database_name: index.source_database_name.clone(),
            total_tables: index.tables.len(),
            total_records: index.total_records(),
            tables: index.tables.clone(),
            total_folders,
            folder_zips: index.file_count(FileGroup::FolderZips),
            profile_images: index.file_count(FileGroup::Profiles),
            total_files: index.total_files(),
            sql_dump_included: index.sql_dump_included,
            size_bytes: 0,
            size_mb: 0.0,
            skipped,
        };

        writer.add_text(layout::README, &readme(&statistics))?;
        let index_json = serde_json::to_vec_pretty(&index)
            .map_err(|e| BackupError::Json(format!("Failed to serialize archive index: {}", e)))?;
        writer.add_bytes(layout::INDEX, &index_json)?;

        let size = writer.finish()?;
        statistics.size_bytes = size;
        statistics.size_mb = size_mb(size);

        info!(
            file = %filename,
            tables = statistics.total_tables,
            records = statistics.total_records,
            files = statistics.total_files,
            skipped = statistics.skipped.len(),
            size_bytes = size,
            "Backup completed"
        );

        Ok(BackupReport {
            filename,
            path,
            statistics,
        })
    }

    /// Claim a fresh archive file, suffixing the name on same-second collisions
    fn claim_name(
        &self,
        backup_dir: &Path,
        kind: BackupKind,
        trigger: Trigger,
        now: DateTime<Utc>,
    ) -> BackupResult<(ArchiveName, ArchiveWriter)> {
        let base = ArchiveName::new(kind, trigger, now);
        let mut sequence = 1;
        loop {
            let name = base.with_sequence(sequence);
            match ArchiveWriter::create_new(&backup_dir.join(name.file_name())) {
                Ok(writer) => return Ok((name, writer)),
                Err(BackupError::Duplicate { .. }) if sequence < MAX_NAME_SEQUENCE => {
                    debug!(file = %name, "Archive name taken, trying the next one");
                    sequence += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Every table, per-table JSON and CSV, the combined JSON, and the dump
    fn write_database(
        &self,
        writer: &mut ArchiveWriter,
        index: &mut ArchiveIndex,
    ) -> BackupResult<()> {
        let names = self
            .store
            .list_tables()
            .map_err(|e| storage_failure("Failed to list tables", e))?;

        let mut snapshots = Vec::with_capacity(names.len());
        for name in names {
            let rows = self
                .store
                .read_all_rows(&name)
                .map_err(|e| storage_failure(&format!("Failed to read table '{}'", name), e))?;
            self.write_table(writer, &layout::table_json(&name), &layout::table_csv(&name), &rows)?;
            debug!(table = %name, records = rows.len(), "Table captured");

            index.tables.push(TableCount {
                name: name.clone(),
                records: rows.len(),
            });
            snapshots.push(TableSnapshot::new(name, rows));
        }

        writer.add_bytes(layout::COMPLETE_DATABASE, &complete_database_json(&snapshots)?)?;

        match self.dumper.dump() {
            Some(sql) => {
                writer.add_text(layout::SQL_DUMP, &sql)?;
                index.sql_dump_included = true;
            }
            None => warn!("SQL dump unavailable, continuing without it"),
        }

        Ok(())
    }

    /// The legacy single-table form used by the folders kind
    fn write_folders_table(&self, writer: &mut ArchiveWriter) -> BackupResult<usize> {
        let tables = self
            .store
            .list_tables()
            .map_err(|e| storage_failure("Failed to list tables", e))?;

        let rows = if tables.iter().any(|t| *t == self.folders_table) {
            self.store.read_all_rows(&self.folders_table).map_err(|e| {
                storage_failure(&format!("Failed to read table '{}'", self.folders_table), e)
            })?
        } else {
            warn!(table = %self.folders_table, "Folders table not found, capturing no rows");
            Vec::new()
        };

        self.write_table(
            writer,
            layout::FOLDERS_TABLE_JSON,
            layout::FOLDERS_TABLE_CSV,
            &rows,
        )?;
        Ok(rows.len())
    }

    fn write_table(
        &self,
        writer: &mut ArchiveWriter,
        json_entry: &str,
        csv_entry: &str,
        rows: &[Record],
    ) -> BackupResult<()> {
        writer.add_bytes(json_entry, &table_json(rows)?)?;
        if !rows.is_empty() {
            writer.add_bytes(csv_entry, &rows_to_csv(rows)?)?;
        }
        Ok(())
    }

    /// Copy one file group into the archive, returning the captured names
    fn write_group(
        &self,
        writer: &mut ArchiveWriter,
        kind: BackupKind,
        group: FileGroup,
        skipped: &mut Vec<SkippedFile>,
    ) -> BackupResult<Vec<String>> {
        let names = self.files.list_files(group)?;
        let mut captured = Vec::with_capacity(names.len());

        for name in names {
            if !is_safe_file_name(&name) {
                warn!(group = %group.token(), file = %name, "Skipping file with unsafe name");
                skipped.push(SkippedFile::new(Some(group), name, "unsafe file name"));
                continue;
            }

            match self.files.read_file(group, &name) {
                Ok(content) => {
                    writer.add_bytes(&layout::file_entry(kind, group, &name), &content)?;
                    debug!(group = %group.token(), file = %name, bytes = content.len(), "File captured");
                    captured.push(name);
                }
                Err(e) => {
                    warn!(group = %group.token(), file = %name, error = %e, "Skipping unreadable file");
                    skipped.push(SkippedFile::new(Some(group), name, e.to_string()));
                }
            }
        }

        Ok(captured)
    }
}

/// Normalize a collaborator read failure to `StorageUnavailable`
fn storage_failure(context: &str, err: BackupError) -> BackupError {
    match err {
        BackupError::StorageUnavailable(message) => {
            BackupError::StorageUnavailable(format!("{}: {}", context, message))
        }
        other => BackupError::StorageUnavailable(format!("{}: {}", context, other)),
    }
}

/// Human-readable summary written as `README.txt`
fn readme(stats: &BackupStatistics) -> String {
    let mut text = String::new();
    let automated = match stats.trigger {
        Trigger::Scheduled => "AUTOMATED ",
        Trigger::Manual => "",
    };
    let title = match stats.kind {
        BackupKind::Folders => "FOLDERS BACKUP",
        BackupKind::Database => "COMPLETE DATABASE BACKUP",
        BackupKind::Complete => "COMPLETE SYSTEM BACKUP",
    };

    let _ = writeln!(text, "=== {}{} ===", automated, title);
    let _ = writeln!(
        text,
        "Backup Date: {}",
        stats.backup_date.format("%Y-%m-%d %H:%M:%S UTC")
    );

    match stats.kind {
        BackupKind::Folders => {
            let _ = writeln!(
                text,
                "Total Folders in Database: {}",
                stats.total_folders.unwrap_or(0)
            );
            let _ = writeln!(text, "Total Zip Files Backed Up: {}", stats.folder_zips);
        }
        BackupKind::Database | BackupKind::Complete => {
            let _ = writeln!(text, "Database Name: {}", stats.database_name);
            let _ = writeln!(text, "Total Tables: {}", stats.total_tables);
            let _ = writeln!(text, "Total Records: {}", stats.total_records);
            let _ = writeln!(text, "\nTables:");
            for table in &stats.tables {
                let _ = writeln!(text, "  - {}: {} records", table.name, table.records);
            }
        }
    }

    if stats.kind == BackupKind::Complete {
        let _ = writeln!(text, "\nFiles:");
        let _ = writeln!(text, "  Folder Zips: {}", stats.folder_zips);
        let _ = writeln!(text, "  Profile Images: {}", stats.profile_images);
    }

    if !stats.skipped.is_empty() {
        let _ = writeln!(text, "\nSkipped Files: {}", stats.skipped.len());
        for skip in &stats.skipped {
            let _ = writeln!(text, "  - {}", skip);
        }
    }

    let _ = writeln!(text, "\nStructure:");
    match stats.kind {
        BackupKind::Folders => {
            let _ = writeln!(text, "- {} - Folder records in JSON format", layout::FOLDERS_TABLE_JSON);
            let _ = writeln!(text, "- {} - Folder records in CSV format", layout::FOLDERS_TABLE_CSV);
            let _ = writeln!(text, "- folder-zips/ - All folder zip files");
        }
        BackupKind::Database | BackupKind::Complete => {
            let _ = writeln!(text, "- {} - Complete database in JSON", layout::COMPLETE_DATABASE);
            let _ = writeln!(text, "- {} - Raw SQL dump (if available)", layout::SQL_DUMP);
            let _ = writeln!(text, "- database/tables/*.json - Individual tables in JSON");
            let _ = writeln!(text, "- database/tables/*.csv - Individual tables in CSV");
            if stats.kind == BackupKind::Complete {
                let _ = writeln!(text, "- files/folder-zips/ - All folder zip files");
                let _ = writeln!(text, "- files/profiles/ - Profile images");
            }
        }
    }
    let _ = writeln!(text, "- {} - Machine-readable archive index", layout::INDEX);

    text
}
