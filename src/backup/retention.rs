//! Retention sweep for automated archives
//!
//! Only archives carrying the `auto_` prefix are candidates; operator-created
//! archives are never deleted here, whatever their age.

use std::fs;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::archive::{is_archive_file, is_automated};
use crate::error::{BackupError, BackupResult};

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// An archive the sweep tried and failed to delete
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedDeletion {
    pub filename: String,
    pub reason: String,
}

/// Result of a retention sweep
#[derive(Debug, Clone, Default, Serialize)]
pub struct RetentionReport {
    /// Horizon the sweep ran with
    pub keep_days: u32,
    /// Deleted archive filenames
    pub deleted: Vec<String>,
    /// Archives that were due but could not be deleted
    pub failed: Vec<FailedDeletion>,
}

impl RetentionReport {
    pub fn deleted_count(&self) -> usize {
        self.deleted.len()
    }
}

/// Deletes expired automated archives
pub struct RetentionManager {
    backup_dir: PathBuf,
    keep_days: u32,
}

impl RetentionManager {
    pub fn new(backup_dir: impl Into<PathBuf>, keep_days: u32) -> Self {
        Self {
            backup_dir: backup_dir.into(),
            keep_days,
        }
    }

    /// Sweep relative to the current time
    pub fn sweep(&self) -> BackupResult<RetentionReport> {
        self.sweep_at(Utc::now())
    }

    /// Sweep relative to `now`
    ///
    /// An automated archive is deleted when its modification time is older
    /// than `now - keep_days`. A failed delete is recorded and the sweep
    /// continues.
    pub fn sweep_at(&self, now: DateTime<Utc>) -> BackupResult<RetentionReport> {
        let mut report = RetentionReport {
            keep_days: self.keep_days,
            ..Default::default()
        };

        if !self.backup_dir.exists() {
            return Ok(report);
        }

        let horizon = Duration::from_secs(u64::from(self.keep_days) * SECONDS_PER_DAY);
        let cutoff = SystemTime::from(now)
            .checked_sub(horizon)
            .unwrap_or(SystemTime::UNIX_EPOCH);

        for entry in fs::read_dir(&self.backup_dir).map_err(|e| {
            BackupError::Io(format!("Failed to read backup directory: {}", e))
        })? {
            let entry = entry.map_err(|e| {
                BackupError::Io(format!("Failed to read directory entry: {}", e))
            })?;

            let filename = entry.file_name().to_string_lossy().to_string();
            if !is_archive_file(&filename) || !is_automated(&filename) {
                continue;
            }

            let modified = match entry.metadata().and_then(|m| m.modified()) {
                Ok(modified) => modified,
                Err(e) => {
                    warn!(file = %filename, error = %e, "Cannot read archive modification time");
                    continue;
                }
            };
            if modified >= cutoff {
                debug!(file = %filename, "Archive within retention horizon");
                continue;
            }

            match fs::remove_file(entry.path()) {
                Ok(()) => {
                    debug!(file = %filename, "Expired archive deleted");
                    report.deleted.push(filename);
                }
                Err(e) => {
                    warn!(file = %filename, error = %e, "Failed to delete expired archive");
                    report.failed.push(FailedDeletion {
                        filename,
                        reason: e.to_string(),
                    });
                }
            }
        }

        report.deleted.sort();
        info!(
            keep_days = self.keep_days,
            deleted = report.deleted.len(),
            failed = report.failed.len(),
            "Retention sweep completed"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    fn archive_aged(dir: &std::path::Path, name: &str, now: DateTime<Utc>, days: i64) {
        let path = dir.join(name);
        let file = File::create(&path).unwrap();
        let mtime = now - chrono::Duration::days(days);
        file.set_modified(SystemTime::from(mtime)).unwrap();
    }

    #[test]
    fn test_sweep_respects_horizon_and_provenance() {
        let temp_dir = TempDir::new().unwrap();
        let now = Utc::now();
        archive_aged(temp_dir.path(), "auto_complete_backup_2025-01-01_020000.zip", now, 8);
        archive_aged(temp_dir.path(), "auto_complete_backup_2025-01-03_020000.zip", now, 6);
        archive_aged(temp_dir.path(), "complete_backup_2024-12-10_090000.zip", now, 30);
        archive_aged(temp_dir.path(), "auto_notes.txt", now, 30);

        let report = RetentionManager::new(temp_dir.path(), 7).sweep_at(now).unwrap();

        assert_eq!(report.deleted, vec!["auto_complete_backup_2025-01-01_020000.zip"]);
        assert!(report.failed.is_empty());
        assert!(temp_dir
            .path()
            .join("auto_complete_backup_2025-01-03_020000.zip")
            .exists());
        assert!(temp_dir
            .path()
            .join("complete_backup_2024-12-10_090000.zip")
            .exists());
        assert!(temp_dir.path().join("auto_notes.txt").exists());
    }

    #[test]
    fn test_zero_days_deletes_every_older_automated_archive() {
        let temp_dir = TempDir::new().unwrap();
        let now = Utc::now();
        archive_aged(temp_dir.path(), "auto_database_backup_a.zip", now, 1);
        archive_aged(temp_dir.path(), "auto_folders_backup_b.zip", now, 2);

        let report = RetentionManager::new(temp_dir.path(), 0).sweep_at(now).unwrap();
        assert_eq!(report.deleted_count(), 2);
    }

    #[test]
    fn test_missing_dir_is_empty_sweep() {
        let temp_dir = TempDir::new().unwrap();
        let report = RetentionManager::new(temp_dir.path().join("nope"), 7)
            .sweep()
            .unwrap();
        assert_eq!(report.deleted_count(), 0);
        assert_eq!(report.keep_days, 7);
    }
}
