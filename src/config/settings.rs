//! Operator settings for civic-backup
//!
//! Manages retention, restore policy, the optional SQL dump program, and
//! directory overrides. Settings are stored as pretty-printed JSON next to
//! the data directory.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::layout::StorageLayout;
use super::paths::CivicPaths;
use crate::error::BackupError;
use crate::storage::file_io::{read_json, write_json_atomic};

/// Retention settings for automated archives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionSettings {
    /// Automated archives older than this many days are deleted
    #[serde(default = "default_keep_days")]
    pub keep_days: u32,
}

impl Default for RetentionSettings {
    fn default() -> Self {
        Self {
            keep_days: default_keep_days(),
        }
    }
}

fn default_keep_days() -> u32 {
    7
}

/// How the legacy folders restore treats rows that already exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AppendPolicy {
    /// Insert every captured row, even if an equal key is already live
    Append,
    /// Skip captured rows whose key column value is already live
    #[default]
    SkipExisting,
}

/// Restore behaviour settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreSettings {
    /// Tables restored first, in this order; the rest follow archive order
    #[serde(default)]
    pub table_order: Vec<String>,

    /// Duplicate handling for the legacy folders restore
    #[serde(default)]
    pub append_policy: AppendPolicy,

    /// Column compared by `AppendPolicy::SkipExisting`
    #[serde(default = "default_append_key_column")]
    pub append_key_column: String,

    /// Identity column stripped from rows before an append restore
    #[serde(default = "default_identity_column")]
    pub identity_column: String,
}

impl Default for RestoreSettings {
    fn default() -> Self {
        Self {
            table_order: Vec::new(),
            append_policy: AppendPolicy::default(),
            append_key_column: default_append_key_column(),
            identity_column: default_identity_column(),
        }
    }
}

/// Optional directory overrides; unset entries use the `CivicPaths` defaults
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_zip_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scratch_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_file: Option<PathBuf>,
}

/// Settings for civic-backup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Retention policy for automated archives
    #[serde(default)]
    pub retention: RetentionSettings,

    /// Restore policy
    #[serde(default)]
    pub restore: RestoreSettings,

    /// Table captured by the folders-only backup kind
    #[serde(default = "default_folders_table")]
    pub folders_table: String,

    /// Program and arguments producing a raw SQL dump on stdout
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dump_command: Option<Vec<String>>,

    /// Directory overrides
    #[serde(default)]
    pub directories: DirectoryOverrides,
}

fn default_schema_version() -> u32 {
    1
}

fn default_folders_table() -> String {
    "folders".to_string()
}

fn default_append_key_column() -> String {
    "zip_name".to_string()
}

fn default_identity_column() -> String {
    "id".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            retention: RetentionSettings::default(),
            restore: RestoreSettings::default(),
            folders_table: default_folders_table(),
            dump_command: None,
            directories: DirectoryOverrides::default(),
        }
    }
}

impl Settings {
    /// Load settings from disk, or fall back to defaults if no file exists
    pub fn load_or_create(paths: &CivicPaths) -> Result<Self, BackupError> {
        let settings_path = paths.settings_file();

        if settings_path.exists() {
            let contents = std::fs::read_to_string(&settings_path)
                .map_err(|e| BackupError::Io(format!("Failed to read settings file: {}", e)))?;

            serde_json::from_str(&contents)
                .map_err(|e| BackupError::Config(format!("Failed to parse settings file: {}", e)))
        } else {
            // Don't save yet - let caller decide when to persist
            Ok(read_json(&settings_path)?)
        }
    }

    /// Save settings to disk
    pub fn save(&self, paths: &CivicPaths) -> Result<(), BackupError> {
        paths.ensure_base_dir()?;
        write_json_atomic(paths.settings_file(), self)
    }

    /// Resolve the concrete directories every component works against
    pub fn layout(&self, paths: &CivicPaths) -> StorageLayout {
        let dirs = &self.directories;
        StorageLayout {
            backup_dir: dirs.backup_dir.clone().unwrap_or_else(|| paths.backup_dir()),
            folder_zip_dir: dirs
                .folder_zip_dir
                .clone()
                .unwrap_or_else(|| paths.folder_zip_dir()),
            profile_dir: dirs.profile_dir.clone().unwrap_or_else(|| paths.profile_dir()),
            scratch_dir: dirs.scratch_dir.clone().unwrap_or_else(|| paths.scratch_dir()),
            database_file: dirs
                .database_file
                .clone()
                .unwrap_or_else(|| paths.database_file()),
        }
    }
}
