//! Archive naming convention
//!
//! Names look like `{prefix}{kind}_backup_{YYYY-MM-DD_HHMMSS}.zip`, where the
//! prefix is `auto_` for scheduler-created archives and empty otherwise. The
//! timestamp (UTC) sorts lexically in creation order. A second archive of the
//! same kind and trigger within one second gets a `_2`, `_3`, ... suffix after
//! the timestamp. The `auto_` prefix is the only persisted record of
//! provenance.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Timelike, Utc};

use crate::models::{BackupKind, Trigger};

/// Extension shared by every archive
pub const ARCHIVE_EXTENSION: &str = "zip";

const AUTOMATED_PREFIX: &str = "auto_";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H%M%S";
const TIMESTAMP_LEN: usize = 17;

/// A parsed or generated archive filename
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveName {
    pub trigger: Trigger,
    pub kind: BackupKind,
    pub timestamp: NaiveDateTime,
    /// 1 for the first archive in a second; higher values are suffixed
    pub sequence: u32,
}

impl ArchiveName {
    /// Name an archive captured at `at`, truncated to whole seconds
    pub fn new(kind: BackupKind, trigger: Trigger, at: DateTime<Utc>) -> Self {
        let timestamp = at.naive_utc().with_nanosecond(0).unwrap_or(at.naive_utc());
        Self {
            trigger,
            kind,
            timestamp,
            sequence: 1,
        }
    }

    /// The same name with a collision sequence number
    pub fn with_sequence(mut self, sequence: u32) -> Self {
        self.sequence = sequence.max(1);
        self
    }

    /// The filename on disk
    pub fn file_name(&self) -> String {
        let suffix = if self.sequence > 1 {
            format!("_{}", self.sequence)
        } else {
            String::new()
        };
        format!(
            "{}{}_backup_{}{}.{}",
            self.trigger.prefix(),
            self.kind.token(),
            self.timestamp.format(TIMESTAMP_FORMAT),
            suffix,
            ARCHIVE_EXTENSION
        )
    }

    /// Parse a filename produced by `file_name`
    pub fn parse(file_name: &str) -> Option<Self> {
        let stem = file_name.strip_suffix(".zip")?;
        let (trigger, rest) = match stem.strip_prefix(AUTOMATED_PREFIX) {
            Some(rest) => (Trigger::Scheduled, rest),
            None => (Trigger::Manual, stem),
        };

        let (token, stamp) = rest.split_once("_backup_")?;
        let kind = match token {
            "folders" => BackupKind::Folders,
            "database" => BackupKind::Database,
            "complete" => BackupKind::Complete,
            _ => return None,
        };
        let (stamp, sequence) = match (stamp.get(..TIMESTAMP_LEN), stamp.get(TIMESTAMP_LEN..)) {
            (Some(stamp), Some("")) => (stamp, 1),
            (Some(stamp), Some(suffix)) => {
                let sequence: u32 = suffix.strip_prefix('_')?.parse().ok()?;
                if sequence < 2 {
                    return None;
                }
                (stamp, sequence)
            }
            _ => return None,
        };
        let timestamp = NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).ok()?;

        Some(Self {
            trigger,
            kind,
            timestamp,
            sequence,
        })
    }

    /// Capture time as UTC
    pub fn created_at(&self) -> DateTime<Utc> {
        DateTime::from_naive_utc_and_offset(self.timestamp, Utc)
    }
}

impl fmt::Display for ArchiveName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.file_name())
    }
}

/// Returns true if the filename carries the archive extension
pub fn is_archive_file(file_name: &str) -> bool {
    std::path::Path::new(file_name)
        .extension()
        .map_or(false, |ext| ext == ARCHIVE_EXTENSION)
}

/// Returns true if the filename marks a scheduler-created archive
pub fn is_automated(file_name: &str) -> bool {
    file_name.starts_with(AUTOMATED_PREFIX)
}

/// Kind label derived by substring match on the filename
///
/// Works for any historical naming, not just names `ArchiveName` produces.
pub fn kind_label(file_name: &str) -> &'static str {
    if file_name.contains("complete") {
        BackupKind::Complete.label()
    } else if file_name.contains("database") {
        BackupKind::Database.label()
    } else if file_name.contains("folders") {
        BackupKind::Folders.label()
    } else {
        "Unknown"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 11, 18, 2, 0, 5).unwrap()
    }

    #[test]
    fn test_file_name() {
        let name = ArchiveName::new(BackupKind::Complete, Trigger::Scheduled, at());
        assert_eq!(name.file_name(), "auto_complete_backup_2025-11-18_020005.zip");

        let name = ArchiveName::new(BackupKind::Database, Trigger::Manual, at());
        assert_eq!(name.file_name(), "database_backup_2025-11-18_020005.zip");
    }

    #[test]
    fn test_parse_round_trip() {
        let name = ArchiveName::new(BackupKind::Folders, Trigger::Scheduled, at());
        let parsed = ArchiveName::parse(&name.file_name()).unwrap();
        assert_eq!(parsed, name);
        assert_eq!(parsed.created_at(), at());
    }

    #[test]
    fn test_sequence_suffix() {
        let name = ArchiveName::new(BackupKind::Database, Trigger::Manual, at()).with_sequence(2);
        assert_eq!(name.file_name(), "database_backup_2025-11-18_020005_2.zip");

        let parsed = ArchiveName::parse("database_backup_2025-11-18_020005_2.zip").unwrap();
        assert_eq!(parsed, name);
        assert_eq!(parsed.created_at(), at());
        assert_eq!(kind_label(&name.file_name()), "Database Only");

        let first = ArchiveName::new(BackupKind::Database, Trigger::Manual, at());
        assert!(first.file_name() < name.file_name());
        assert!(ArchiveName::parse("database_backup_2025-11-18_020005_1.zip").is_none());
        assert!(ArchiveName::parse("database_backup_2025-11-18_020005_x.zip").is_none());
    }

    #[test]
    fn test_parse_rejects_foreign_names() {
        assert!(ArchiveName::parse("folders_complete_backup_2025-11-18_020005.zip").is_none());
        assert!(ArchiveName::parse("complete_backup_yesterday.zip").is_none());
        assert!(ArchiveName::parse("complete_backup_2025-11-18_020005.tar").is_none());
    }

    #[test]
    fn test_names_sort_by_creation() {
        let earlier = ArchiveName::new(BackupKind::Complete, Trigger::Manual, at());
        let later = ArchiveName::new(
            BackupKind::Complete,
            Trigger::Manual,
            at() + chrono::Duration::seconds(1),
        );
        assert!(earlier.file_name() < later.file_name());
    }

    #[test]
    fn test_classification() {
        assert!(is_archive_file("auto_database_backup_2025-11-18_020005.zip"));
        assert!(!is_archive_file("notes.txt"));
        assert!(is_automated("auto_folders_backup_2025-11-18_020005.zip"));
        assert!(!is_automated("folders_backup_2025-11-18_020005.zip"));

        assert_eq!(kind_label("auto_database_backup_x.zip"), "Database Only");
        assert_eq!(kind_label("folders_backup_x.zip"), "Folders Only");
        assert_eq!(kind_label("folders_complete_backup_x.zip"), "Complete System");
        assert_eq!(kind_label("misc.zip"), "Unknown");
    }
}
