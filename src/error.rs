//! Custom error types for civic-backup
//!
//! This module defines the error hierarchy for the backup engine using thiserror
//! for ergonomic error definitions. Only fatal conditions live here; skipped
//! files and failed deletions are reported in the operation results instead.

use thiserror::Error;

/// The main error type for civic-backup operations
#[derive(Error, Debug)]
pub enum BackupError {
    /// The backing store could not be enumerated, read, or written
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// The archive file could not be created, opened, or finalized
    #[error("Archive I/O error: {0}")]
    ArchiveIo(String),

    /// An expected archive entry is missing or does not parse
    #[error("Invalid backup manifest: {0}")]
    ManifestInvalid(String),

    /// A table truncate/insert failed and the restore was rolled back
    #[error("Restore of table '{table}' failed, all changes rolled back: {message}")]
    TransactionFailure { table: String, message: String },

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// CSV serialization errors
    #[error("CSV error: {0}")]
    Csv(String),

    /// Invalid operator input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Entity not found errors
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: &'static str,
        identifier: String,
    },

    /// Duplicate entity errors
    #[error("{entity_type} already exists: {identifier}")]
    Duplicate {
        entity_type: &'static str,
        identifier: String,
    },
}

impl BackupError {
    /// Create a "not found" error for backup archives
    pub fn backup_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Backup",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for tables
    pub fn table_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Table",
            identifier: identifier.into(),
        }
    }

    /// Stable machine-readable label for this failure
    pub fn kind(&self) -> &'static str {
        match self {
            Self::StorageUnavailable(_) => "storage_unavailable",
            Self::ArchiveIo(_) => "archive_io",
            Self::ManifestInvalid(_) => "manifest_invalid",
            Self::TransactionFailure { .. } => "transaction_failure",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
            Self::Json(_) => "json",
            Self::Csv(_) => "csv",
            Self::Validation(_) => "validation",
            Self::NotFound { .. } => "not_found",
            Self::Duplicate { .. } => "duplicate",
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this error left the live store untouched
    pub fn is_manifest_invalid(&self) -> bool {
        matches!(self, Self::ManifestInvalid(_))
    }
}

// Implement From traits for common error types

impl From<std::io::Error> for BackupError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for BackupError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl From<zip::result::ZipError> for BackupError {
    fn from(err: zip::result::ZipError) -> Self {
        Self::ArchiveIo(err.to_string())
    }
}

impl From<rusqlite::Error> for BackupError {
    fn from(err: rusqlite::Error) -> Self {
        Self::StorageUnavailable(err.to_string())
    }
}

impl From<csv::Error> for BackupError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err.to_string())
    }
}

/// Result type alias for civic-backup operations
pub type BackupResult<T> = Result<T, BackupError>;
