//! Archive reader
//!
//! Opens an existing archive, describes it (from `manifest.json` when present,
//! otherwise from its entry layout), and loads its tables and file entries.

use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use zip::result::ZipError;
use zip::ZipArchive;

use crate::error::{BackupError, BackupResult};
use crate::export::json::{parse_complete_database, parse_table_rows};
use crate::models::{
    ArchiveIndex, BackupKind, FileGroup, TableCount, TableSnapshot, INDEX_SCHEMA_VERSION,
};

use super::layout;
use super::naming::ArchiveName;
use super::writer::ArchiveWriter;

/// An open archive
pub struct ArchiveReader {
    path: PathBuf,
    zip: ZipArchive<File>,
}

impl ArchiveReader {
    /// Open an archive for reading
    pub fn open(path: &Path) -> BackupResult<Self> {
        let file = File::open(path).map_err(|e| {
            BackupError::ArchiveIo(format!("Could not open backup file {}: {}", path.display(), e))
        })?;
        let zip = ZipArchive::new(file).map_err(|e| {
            BackupError::ArchiveIo(format!("Could not open backup file {}: {}", path.display(), e))
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            zip,
        })
    }

    /// Every entry name, in archive order
    pub fn entry_names(&self) -> Vec<String> {
        self.zip.file_names().map(str::to_string).collect()
    }

    pub fn has_entry(&self, name: &str) -> bool {
        self.zip.index_for_name(name).is_some()
    }

    /// Read one entry, or `None` if the archive has no such entry
    pub fn read_entry(&mut self, name: &str) -> BackupResult<Option<Vec<u8>>> {
        let mut entry = match self.zip.by_name(name) {
            Ok(entry) => entry,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(e) => {
                return Err(BackupError::ArchiveIo(format!(
                    "Failed to read {}: {}",
                    name, e
                )))
            }
        };

        let mut bytes = Vec::with_capacity(entry.size() as usize);
        entry
            .read_to_end(&mut bytes)
            .map_err(|e| BackupError::ArchiveIo(format!("Failed to read {}: {}", name, e)))?;
        Ok(Some(bytes))
    }

    /// Copy one entry into `writer` without recompressing it
    ///
    /// Returns false if the archive has no such entry.
    pub fn copy_raw_entry(&mut self, name: &str, writer: &mut ArchiveWriter) -> BackupResult<bool> {
        let entry = match self.zip.by_name(name) {
            Ok(entry) => entry,
            Err(ZipError::FileNotFound) => return Ok(false),
            Err(e) => {
                return Err(BackupError::ArchiveIo(format!(
                    "Failed to read {}: {}",
                    name, e
                )))
            }
        };

        writer
            .zip_mut()?
            .raw_copy_file(entry)
            .map_err(|e| BackupError::ArchiveIo(format!("Failed to copy {}: {}", name, e)))?;
        writer.note_entry();
        Ok(true)
    }

    /// Read a text entry, lossily decoded
    pub fn read_text(&mut self, name: &str) -> BackupResult<Option<String>> {
        Ok(self
            .read_entry(name)?
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }

    /// Names of the files a group holds for a given kind, in archive order
    pub fn group_file_names(&self, kind: BackupKind, group: FileGroup) -> Vec<String> {
        let prefix = layout::group_prefix(kind, group);
        self.zip
            .file_names()
            .filter_map(|entry| layout::name_under(entry, &prefix))
            .map(str::to_string)
            .collect()
    }

    /// Describe the archive
    ///
    /// Archives written before `manifest.json` existed are described from
    /// their entry layout.
    pub fn index(&mut self) -> BackupResult<ArchiveIndex> {
        match self.read_entry(layout::INDEX)? {
            Some(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                BackupError::ManifestInvalid(format!("{} is corrupted: {}", layout::INDEX, e))
            }),
            None => self.infer_index(),
        }
    }

    /// Work out the backup kind from the entry layout alone
    pub fn infer_kind(&self) -> Option<BackupKind> {
        let has_files = self.zip.file_names().any(|n| n.starts_with("files/"));
        let folder_zips = layout::group_prefix(BackupKind::Folders, FileGroup::FolderZips);
        let has_folder_zips = self.zip.file_names().any(|n| n.starts_with(&folder_zips));

        if self.has_entry(layout::COMPLETE_DATABASE) {
            if has_files {
                Some(BackupKind::Complete)
            } else {
                Some(BackupKind::Database)
            }
        } else if self.has_entry(layout::FOLDERS_TABLE_JSON) || has_folder_zips {
            Some(BackupKind::Folders)
        } else {
            None
        }
    }

    fn infer_index(&mut self) -> BackupResult<ArchiveIndex> {
        let kind = self.infer_kind().ok_or_else(|| {
            BackupError::ManifestInvalid(format!(
                "{} is not a recognised backup archive",
                self.path.display()
            ))
        })?;

        // Folder zips alone mark a folders archive that never captured its table
        let tables = if kind == BackupKind::Folders && !self.has_entry(layout::FOLDERS_TABLE_JSON) {
            Vec::new()
        } else {
            self.load_tables(kind, "folders")?
        };
        let tables = tables
            .iter()
            .map(|t| TableCount {
                name: t.name.clone(),
                records: t.len(),
            })
            .collect();

        let file_groups = kind
            .file_groups()
            .iter()
            .map(|&group| (group, self.group_file_names(kind, group)))
            .collect();

        Ok(ArchiveIndex {
            schema_version: INDEX_SCHEMA_VERSION,
            kind,
            created_at: self.fallback_created_at(),
            source_database_name: String::new(),
            tables,
            file_groups,
            sql_dump_included: self.has_entry(layout::SQL_DUMP),
        })
    }

    fn fallback_created_at(&self) -> DateTime<Utc> {
        let from_name = self
            .path
            .file_name()
            .and_then(|n| ArchiveName::parse(&n.to_string_lossy()))
            .map(|name| name.created_at());

        from_name
            .or_else(|| {
                fs::metadata(&self.path)
                    .and_then(|m| m.modified())
                    .ok()
                    .map(DateTime::<Utc>::from)
            })
            .unwrap_or_else(Utc::now)
    }

    /// Parse the captured tables for a kind
    ///
    /// Database kinds read `complete_database.json`; the folders kind reads the
    /// legacy folders table entry under the given table name. A missing or
    /// malformed entry is `ManifestInvalid`. Nothing is written anywhere, so a
    /// failure leaves every store untouched.
    pub fn load_tables(
        &mut self,
        kind: BackupKind,
        folders_table: &str,
    ) -> BackupResult<Vec<TableSnapshot>> {
        let entry = if kind.includes_database() {
            layout::COMPLETE_DATABASE
        } else {
            layout::FOLDERS_TABLE_JSON
        };
        let bytes = self
            .read_entry(entry)?
            .ok_or_else(|| BackupError::ManifestInvalid(format!("Archive is missing {}", entry)))?;

        if kind.includes_database() {
            parse_complete_database(&bytes, entry)
        } else {
            let rows = parse_table_rows(&bytes, entry)?;
            Ok(vec![TableSnapshot::new(folders_table, rows)])
        }
    }
}
