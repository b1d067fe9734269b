//! Backup catalog
//!
//! Operator-facing enumeration of the backup directory. Everything shown here
//! is derived from the filename and filesystem metadata, so the catalog works
//! for archives of any age or origin.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::archive::{is_archive_file, is_automated, kind_label};
use crate::error::{BackupError, BackupResult};
use crate::storage::is_safe_file_name;

/// Automated archives shown in the scheduler overview
pub const RECENT_AUTOMATED_LIMIT: usize = 5;

/// Keyword resolving to the newest archive
pub const LATEST: &str = "latest";

/// Metadata about an archive in the backup directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupInfo {
    /// Archive filename
    pub filename: String,
    /// Full path to the archive
    pub path: PathBuf,
    /// Size in bytes
    pub size_bytes: u64,
    /// Size in megabytes, rounded to two decimals
    pub size_mb: f64,
    /// Filesystem modification time
    pub created_at: DateTime<Utc>,
    /// Kind label derived from the filename
    pub kind_label: String,
    /// Whether the scheduler created it
    pub is_automated: bool,
}

/// Megabytes rounded to two decimals
pub fn size_mb(bytes: u64) -> f64 {
    (bytes as f64 / 1024.0 / 1024.0 * 100.0).round() / 100.0
}

/// Lists and manages archives in one directory
pub struct BackupCatalog {
    backup_dir: PathBuf,
}

impl BackupCatalog {
    pub fn new(backup_dir: impl Into<PathBuf>) -> Self {
        Self {
            backup_dir: backup_dir.into(),
        }
    }

    /// Get backup directory path
    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// List all archives, newest first
    pub fn list(&self) -> BackupResult<Vec<BackupInfo>> {
        if !self.backup_dir.exists() {
            return Ok(Vec::new());
        }

        let mut backups = Vec::new();

        for entry in fs::read_dir(&self.backup_dir).map_err(|e| {
            BackupError::Io(format!("Failed to read backup directory: {}", e))
        })? {
            let entry = entry.map_err(|e| {
                BackupError::Io(format!("Failed to read directory entry: {}", e))
            })?;

            let path = entry.path();
            let is_archive = path
                .file_name()
                .map_or(false, |n| is_archive_file(&n.to_string_lossy()));
            if is_archive && path.is_file() {
                if let Some(info) = describe(&path) {
                    backups.push(info);
                }
            }
        }

        // Newest first; the filename breaks ties within one second
        backups.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.filename.cmp(&a.filename))
        });

        Ok(backups)
    }

    /// The most recent automated archives
    pub fn recent_automated(&self, limit: usize) -> BackupResult<Vec<BackupInfo>> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|b| b.is_automated)
            .take(limit)
            .collect())
    }

    /// Get the most recent archive
    pub fn latest(&self) -> BackupResult<Option<BackupInfo>> {
        Ok(self.list()?.into_iter().next())
    }

    /// Get a specific archive by filename
    pub fn get(&self, filename: &str) -> BackupResult<BackupInfo> {
        if !is_safe_file_name(filename) {
            return Err(BackupError::Validation(format!(
                "Backup name must not contain path components: {}",
                filename
            )));
        }

        let path = self.backup_dir.join(filename);
        if !path.is_file() {
            return Err(BackupError::backup_not_found(filename));
        }
        describe(&path).ok_or_else(|| BackupError::backup_not_found(filename))
    }

    /// Resolve `latest`, a filename in the backup directory, or a path
    pub fn resolve(&self, target: &str) -> BackupResult<PathBuf> {
        if target.eq_ignore_ascii_case(LATEST) {
            return self
                .latest()?
                .map(|b| b.path)
                .ok_or_else(|| BackupError::backup_not_found("no backups available"));
        }

        let in_dir = self.backup_dir.join(target);
        if is_safe_file_name(target) && in_dir.is_file() {
            return Ok(in_dir);
        }

        let as_path = PathBuf::from(target);
        if as_path.is_file() {
            return Ok(as_path);
        }

        Err(BackupError::backup_not_found(target))
    }

    /// Delete an archive by filename
    pub fn delete(&self, filename: &str) -> BackupResult<BackupInfo> {
        let info = self.get(filename)?;
        fs::remove_file(&info.path)
            .map_err(|e| BackupError::Io(format!("Failed to delete backup {}: {}", filename, e)))?;
        info!(file = %filename, "Backup deleted");
        Ok(info)
    }

    /// Copy an archive to `dest`
    ///
    /// `source` is anything `resolve` accepts. `dest` may be a directory, in
    /// which case the archive keeps its name. Returns the path written.
    pub fn download(&self, source: &str, dest: &Path) -> BackupResult<PathBuf> {
        let source_path = self.resolve(source)?;
        let filename = source_path
            .file_name()
            .map(|n| n.to_os_string())
            .ok_or_else(|| BackupError::backup_not_found(source))?;
        let target = if dest.is_dir() {
            dest.join(filename)
        } else {
            dest.to_path_buf()
        };

        if let Some(parent) = target.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    BackupError::Io(format!("Failed to create {}: {}", parent.display(), e))
                })?;
            }
        }

        fs::copy(&source_path, &target).map_err(|e| {
            BackupError::Io(format!("Failed to copy backup to {}: {}", target.display(), e))
        })?;
        Ok(target)
    }
}

/// Derive catalog metadata for one archive file
fn describe(path: &Path) -> Option<BackupInfo> {
    let filename = path.file_name()?.to_string_lossy().to_string();
    let metadata = fs::metadata(path).ok()?;
    let created_at = metadata
        .modified()
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now());

    Some(BackupInfo {
        size_bytes: metadata.len(),
        size_mb: size_mb(metadata.len()),
        created_at,
        kind_label: kind_label(&filename).to_string(),
        is_automated: is_automated(&filename),
        path: path.to_path_buf(),
        filename,
    })
}
