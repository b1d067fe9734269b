//! Backup kind, trigger, and file group
//!
//! A backup's kind decides which scopes (database, files) end up in the
//! archive; the trigger decides whether the archive is subject to retention.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Scope of a backup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupKind {
    /// Folder zips plus the legacy folders table
    Folders,
    /// Every table, no files
    Database,
    /// Every table plus every file group
    Complete,
}

impl BackupKind {
    /// All kinds, in the order they are offered to operators
    pub const ALL: [BackupKind; 3] = [Self::Folders, Self::Database, Self::Complete];

    /// Token used in archive filenames
    pub fn token(&self) -> &'static str {
        match self {
            Self::Folders => "folders",
            Self::Database => "database",
            Self::Complete => "complete",
        }
    }

    /// Human-readable label used by the catalog
    pub fn label(&self) -> &'static str {
        match self {
            Self::Folders => "Folders Only",
            Self::Database => "Database Only",
            Self::Complete => "Complete System",
        }
    }

    /// Returns true if every table is captured
    pub fn includes_database(&self) -> bool {
        matches!(self, Self::Database | Self::Complete)
    }

    /// File groups captured by this kind
    pub fn file_groups(&self) -> &'static [FileGroup] {
        match self {
            Self::Folders => &[FileGroup::FolderZips],
            Self::Database => &[],
            Self::Complete => &[FileGroup::FolderZips, FileGroup::Profiles],
        }
    }

    /// Parse a kind from a string
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "folders" | "folder" | "folders-only" => Some(Self::Folders),
            "database" | "db" | "database-only" => Some(Self::Database),
            "complete" | "full" | "system" => Some(Self::Complete),
            _ => None,
        }
    }
}

impl Default for BackupKind {
    fn default() -> Self {
        Self::Complete
    }
}

impl fmt::Display for BackupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.token())
    }
}

impl FromStr for BackupKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| {
            format!(
                "unknown backup kind '{}' (expected folders, database, or complete)",
                s
            )
        })
    }
}

/// Who asked for a backup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Trigger {
    /// Operator-requested; never removed by retention
    #[default]
    Manual,
    /// Scheduler-requested; subject to retention
    Scheduled,
}

impl Trigger {
    /// Filename prefix marking provenance
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Manual => "",
            Self::Scheduled => "auto_",
        }
    }
}

/// A named file tree captured into archives
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileGroup {
    /// Zipped folders uploaded by staff
    FolderZips,
    /// Resident profile images
    Profiles,
}

impl FileGroup {
    /// Directory token used inside archives
    pub fn token(&self) -> &'static str {
        match self {
            Self::FolderZips => "folder-zips",
            Self::Profiles => "profiles",
        }
    }
}

impl fmt::Display for FileGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FolderZips => write!(f, "Folder Zips"),
            Self::Profiles => write!(f, "Profile Images"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parse() {
        assert_eq!(BackupKind::parse("Complete"), Some(BackupKind::Complete));
        assert_eq!(BackupKind::parse("db"), Some(BackupKind::Database));
        assert_eq!(BackupKind::parse("folders"), Some(BackupKind::Folders));
        assert_eq!(BackupKind::parse("nope"), None);
        assert!("weekly".parse::<BackupKind>().is_err());
    }

    #[test]
    fn test_kind_scopes() {
        assert!(!BackupKind::Folders.includes_database());
        assert!(BackupKind::Database.file_groups().is_empty());
        assert_eq!(
            BackupKind::Complete.file_groups(),
            &[FileGroup::FolderZips, FileGroup::Profiles]
        );
    }

    #[test]
    fn test_serde_tokens() {
        assert_eq!(
            serde_json::to_string(&BackupKind::Database).unwrap(),
            "\"database\""
        );
        assert_eq!(
            serde_json::to_string(&FileGroup::FolderZips).unwrap(),
            "\"folder-zips\""
        );
        assert_eq!(Trigger::Scheduled.prefix(), "auto_");
        assert_eq!(Trigger::Manual.prefix(), "");
    }
}
