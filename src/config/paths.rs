//! Path management for civic-backup
//!
//! Provides platform-aware path resolution for configuration, live storage,
//! scratch space, and backups.
//!
//! ## Path Resolution Order
//!
//! 1. `CIVIC_BACKUP_DATA_DIR` environment variable (if set)
//! 2. The platform data directory for `civic-backup` (via `directories`)

use std::path::PathBuf;

use directories::ProjectDirs;

use crate::error::BackupError;

/// Environment variable that overrides the base directory
pub const DATA_DIR_ENV: &str = "CIVIC_BACKUP_DATA_DIR";

/// Manages all default paths used by civic-backup
#[derive(Debug, Clone)]
pub struct CivicPaths {
    /// Base directory for all civic-backup data
    base_dir: PathBuf,
}

impl CivicPaths {
    /// Create a new CivicPaths instance
    ///
    /// # Errors
    ///
    /// Returns an error if no platform data directory can be determined.
    pub fn new() -> Result<Self, BackupError> {
        let base_dir = if let Ok(custom) = std::env::var(DATA_DIR_ENV) {
            PathBuf::from(custom)
        } else {
            resolve_default_path()?
        };

        Ok(Self { base_dir })
    }

    /// Create CivicPaths with a custom base directory (useful for testing)
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the base directory
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the directory archives are written to
    pub fn backup_dir(&self) -> PathBuf {
        self.base_dir.join("backups")
    }

    /// Get the live storage root
    pub fn storage_dir(&self) -> PathBuf {
        self.base_dir.join("storage")
    }

    /// Get the live directory holding uploaded folder zips
    pub fn folder_zip_dir(&self) -> PathBuf {
        self.storage_dir().join("uploads").join("folder-zip")
    }

    /// Get the live directory holding profile images
    pub fn profile_dir(&self) -> PathBuf {
        self.storage_dir().join("profiles")
    }

    /// Get the scratch directory used for restore staging and extractions
    pub fn scratch_dir(&self) -> PathBuf {
        self.base_dir.join("tmp")
    }

    /// Get the default SQLite database path
    pub fn database_file(&self) -> PathBuf {
        self.base_dir.join("civic.sqlite3")
    }

    /// Get the path to the settings file
    pub fn settings_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Ensure the base directory exists
    pub fn ensure_base_dir(&self) -> Result<(), BackupError> {
        std::fs::create_dir_all(&self.base_dir)
            .map_err(|e| BackupError::Io(format!("Failed to create base directory: {}", e)))
    }

    /// Check if civic-backup has been initialized (config file exists)
    pub fn is_initialized(&self) -> bool {
        self.settings_file().exists()
    }
}

fn resolve_default_path() -> Result<PathBuf, BackupError> {
    ProjectDirs::from("", "", "civic-backup")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| BackupError::Config("Could not determine a data directory".into()))
}
