//! Backup display formatting
//!
//! Formats catalog listings, backup statistics, and archive indexes for
//! terminal output.

use chrono::{DateTime, Utc};
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::backup::{BackupInfo, BackupStatistics, RestoreReport, RetentionReport};
use crate::models::{ArchiveIndex, FileGroup};

#[derive(Tabled)]
struct BackupRow {
    #[tabled(rename = "#")]
    position: usize,
    #[tabled(rename = "File")]
    filename: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Size")]
    size: String,
    #[tabled(rename = "Age")]
    age: String,
    #[tabled(rename = "Auto")]
    automated: &'static str,
}

/// Format catalog entries as a table, newest first
pub fn format_backup_list(backups: &[BackupInfo], now: DateTime<Utc>) -> String {
    if backups.is_empty() {
        return "No backups found.".to_string();
    }

    let rows = backups.iter().enumerate().map(|(i, backup)| BackupRow {
        position: i + 1,
        filename: backup.filename.clone(),
        kind: backup.kind_label.clone(),
        size: format_size(backup.size_bytes),
        age: format_duration(now.signed_duration_since(backup.created_at)),
        automated: if backup.is_automated { "yes" } else { "" },
    });

    Table::new(rows).with(Style::psql()).to_string()
}

/// Format the statistics of a finished backup
pub fn format_statistics(stats: &BackupStatistics) -> String {
    let mut lines = vec![
        format!("Type:          {}", stats.kind.label()),
        format!(
            "Date:          {}",
            stats.backup_date.format("%Y-%m-%d %H:%M:%S UTC")
        ),
    ];

    match stats.total_folders {
        Some(folders) => lines.push(format!("Folders:       {}", folders)),
        None => {
            lines.push(format!("Database:      {}", stats.database_name));
            lines.push(format!("Tables:        {}", stats.total_tables));
            lines.push(format!("Records:       {}", stats.total_records));
            lines.push(format!(
                "SQL dump:      {}",
                if stats.sql_dump_included { "included" } else { "not available" }
            ));
        }
    }

    lines.push(format!("Folder zips:   {}", stats.folder_zips));
    lines.push(format!("Profile images: {}", stats.profile_images));
    lines.push(format!(
        "Size:          {} ({} MB)",
        format_size(stats.size_bytes),
        stats.size_mb
    ));

    if !stats.skipped.is_empty() {
        lines.push(format!("Skipped files: {}", stats.skipped.len()));
        for skip in &stats.skipped {
            lines.push(format!("  - {}", skip));
        }
    }

    lines.join("\n")
}

/// Format an archive index, listing every table
pub fn format_index(index: &ArchiveIndex) -> String {
    let mut lines = vec![
        format!("Type:     {}", index.kind.label()),
        format!(
            "Created:  {}",
            index.created_at.format("%Y-%m-%d %H:%M:%S UTC")
        ),
    ];
    if !index.source_database_name.is_empty() {
        lines.push(format!("Database: {}", index.source_database_name));
    }
    lines.push(format!(
        "SQL dump: {}",
        if index.sql_dump_included { "Yes" } else { "No" }
    ));

    if !index.tables.is_empty() {
        lines.push(String::new());
        lines.push(format!(
            "Tables ({}, {} records):",
            index.tables.len(),
            index.total_records()
        ));
        for table in &index.tables {
            lines.push(format!("  - {}: {} records", table.name, table.records));
        }
    }

    if !index.file_groups.is_empty() {
        lines.push(String::new());
        lines.push("Files:".to_string());
        for group in index.file_groups.keys() {
            lines.push(format!("  {}: {}", group, index.file_count(*group)));
        }
    }

    lines.join("\n")
}

/// Format the outcome of a restore
pub fn format_restore_report(report: &RestoreReport) -> String {
    let mut lines = vec![
        format!("Tables restored:  {}", report.tables_restored),
        format!("Records restored: {}", report.records_restored),
    ];
    if report.records_skipped > 0 {
        lines.push(format!("Records skipped:  {} (already present)", report.records_skipped));
    }
    for group in [FileGroup::FolderZips, FileGroup::Profiles] {
        if let Some(count) = report.files_restored.get(&group) {
            lines.push(format!("{} restored: {}", group, count));
        }
    }
    for skip in &report.skipped {
        lines.push(format!("  skipped {}", skip));
    }
    lines.join("\n")
}

/// Format the outcome of a retention sweep
pub fn format_retention_report(report: &RetentionReport) -> String {
    let mut lines = vec![format!(
        "Deleted {} automated backup(s) older than {} days.",
        report.deleted_count(),
        report.keep_days
    )];
    for name in &report.deleted {
        lines.push(format!("  - {}", name));
    }
    for failure in &report.failed {
        lines.push(format!("  ! {}: {}", failure.filename, failure.reason));
    }
    lines.join("\n")
}

/// Format a duration in human-readable form
pub fn format_duration(duration: chrono::Duration) -> String {
    let total_seconds = duration.num_seconds().max(0);

    if total_seconds < 60 {
        return format!("{}s", total_seconds);
    }

    let minutes = total_seconds / 60;
    if minutes < 60 {
        return format!("{}m", minutes);
    }

    let hours = minutes / 60;
    if hours < 24 {
        return format!("{}h", hours);
    }

    let days = hours / 24;
    if days < 30 {
        return format!("{}d", days);
    }

    let months = days / 30;
    format!("{}mo", months)
}

/// Format a file size in human-readable form
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(chrono::Duration::seconds(42)), "42s");
        assert_eq!(format_duration(chrono::Duration::hours(5)), "5h");
        assert_eq!(format_duration(chrono::Duration::days(8)), "8d");
        assert_eq!(format_duration(chrono::Duration::seconds(-5)), "0s");
    }

    #[test]
    fn test_backup_list_table() {
        let now = Utc::now();
        let backups = vec![BackupInfo {
            filename: "auto_complete_backup_2025-11-18_020000.zip".into(),
            path: PathBuf::from("/tmp/auto_complete_backup_2025-11-18_020000.zip"),
            size_bytes: 2048,
            size_mb: 0.0,
            created_at: now - chrono::Duration::days(2),
            kind_label: "Complete System".into(),
            is_automated: true,
        }];

        let table = format_backup_list(&backups, now);
        assert!(table.contains("auto_complete_backup_2025-11-18_020000.zip"));
        assert!(table.contains("Complete System"));
        assert!(table.contains("2.0 KB"));
        assert!(table.contains("2d"));
        assert_eq!(format_backup_list(&[], now), "No backups found.");
    }
}
