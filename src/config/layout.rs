//! Resolved storage layout
//!
//! The concrete directories a backup, restore, or sweep operates on. Built
//! once from `Settings` and passed to each component explicitly.

use std::path::PathBuf;

/// Directories used by the backup engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    /// Where archives are written and catalogued
    pub backup_dir: PathBuf,
    /// Live directory for uploaded folder zips
    pub folder_zip_dir: PathBuf,
    /// Live directory for profile images
    pub profile_dir: PathBuf,
    /// Scratch space for restore staging and selective extraction output
    pub scratch_dir: PathBuf,
    /// SQLite database backing the table store
    pub database_file: PathBuf,
}

impl StorageLayout {
    /// Lay everything out under a single root (useful for testing)
    pub fn under(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            backup_dir: root.join("backups"),
            folder_zip_dir: root.join("storage").join("uploads").join("folder-zip"),
            profile_dir: root.join("storage").join("profiles"),
            scratch_dir: root.join("tmp"),
            database_file: root.join("civic.sqlite3"),
        }
    }
}
