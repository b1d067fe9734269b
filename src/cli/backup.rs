//! Backup CLI commands
//!
//! Implements the operator commands for creating, listing, restoring, and
//! pruning backups.

use clap::Subcommand;
use std::path::PathBuf;

use crate::archive::layout::README;
use crate::archive::ArchiveReader;
use crate::backup::{
    resolve_folder_zip, ArchiveBuilder, BackupCatalog, RestoreManager, RetentionManager,
    SelectiveExtractor, RECENT_AUTOMATED_LIMIT,
};
use crate::config::paths::CivicPaths;
use crate::config::settings::Settings;
use crate::config::StorageLayout;
use crate::display::{
    format_backup_list, format_index, format_restore_report, format_retention_report,
    format_size, format_statistics,
};
use crate::error::{BackupError, BackupResult};
use crate::models::{BackupKind, FileGroup, Trigger};
use crate::storage::dump;
use crate::storage::{DirFileTree, FileTree, SqliteStore, TableStore};

/// Backup subcommands
#[derive(Subcommand)]
pub enum BackupCommands {
    /// Create a new backup
    Create {
        /// Backup type: folders, database, or complete
        #[arg(short = 't', long = "type", default_value = "complete")]
        kind: BackupKind,
    },

    /// Create an automated backup, then delete expired automated backups
    Scheduled {
        /// Backup type: folders, database, or complete
        #[arg(short = 't', long = "type", default_value = "complete")]
        kind: BackupKind,

        /// Keep automated backups this many days (defaults to settings)
        #[arg(long)]
        keep_days: Option<u32>,
    },

    /// List all available backups
    List {
        /// Show detailed information
        #[arg(short, long)]
        verbose: bool,
    },

    /// Show information about a specific backup
    Info {
        /// Backup filename or path (use 'latest' for most recent)
        backup: String,
    },

    /// Copy a backup out of the backup directory
    Download {
        /// Backup filename or path (use 'latest' for most recent)
        backup: String,

        /// Destination file or directory
        dest: PathBuf,
    },

    /// Delete a backup
    Delete {
        /// Backup filename
        backup: String,
    },

    /// Restore from a backup
    Restore {
        /// Backup filename or path (use 'latest' for most recent)
        backup: String,

        /// What to restore: folders, database, or complete (defaults to the backup's type)
        #[arg(short, long)]
        mode: Option<BackupKind>,

        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Delete automated backups older than the retention horizon
    Cleanup {
        /// Keep automated backups this many days (defaults to settings)
        #[arg(long)]
        keep_days: Option<u32>,
    },

    /// Package selected files of a folder zip into a new archive
    Extract {
        /// Folder zip name in the upload directory, or a path to any zip
        folder: String,

        /// Entry names to include
        #[arg(required = true)]
        files: Vec<String>,

        /// Where to put the new archive (defaults to the scratch directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show live database and file statistics
    Status,
}

/// Handle a backup command
pub fn handle_backup_command(
    paths: &CivicPaths,
    settings: &Settings,
    cmd: BackupCommands,
) -> BackupResult<()> {
    let layout = settings.layout(paths);
    let catalog = BackupCatalog::new(&layout.backup_dir);

    match cmd {
        BackupCommands::Create { kind } => {
            println!("Creating {} backup...", kind.label().to_lowercase());
            let store = SqliteStore::open(&layout.database_file)?;
            let files = DirFileTree::from_layout(&layout);
            let report = create_backup(&layout, settings, &store, &files, kind, Trigger::Manual)?;

            println!("Backup created: {}", report.filename);
            println!("Location: {}", report.path.display());
            println!();
            println!("{}", format_statistics(&report.statistics));
        }

        BackupCommands::Scheduled { kind, keep_days } => {
            let keep_days = keep_days.unwrap_or(settings.retention.keep_days);
            println!("=== Automated Backup Started ===");

            let store = SqliteStore::open(&layout.database_file)?;
            let files = DirFileTree::from_layout(&layout);
            let report =
                create_backup(&layout, settings, &store, &files, kind, Trigger::Scheduled)?;
            println!("Backup created: {}", report.filename);
            println!("{}", format_statistics(&report.statistics));
            println!();

            let sweep = RetentionManager::new(&layout.backup_dir, keep_days).sweep()?;
            println!("{}", format_retention_report(&sweep));
            println!("=== Automated Backup Completed ===");
        }

        BackupCommands::List { verbose } => {
            let backups = catalog.list()?;

            if backups.is_empty() {
                println!("No backups found.");
                println!("Create one with: civic-backup create");
                return Ok(());
            }

            println!("Available Backups");
            println!("=================");
            println!();
            println!("{}", format_backup_list(&backups, chrono::Utc::now()));

            if verbose {
                println!();
                for backup in &backups {
                    println!(
                        "{}\n   Created: {}\n   Size: {} bytes ({} MB)\n   Path: {}\n",
                        backup.filename,
                        backup.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
                        backup.size_bytes,
                        backup.size_mb,
                        backup.path.display(),
                    );
                }
            }

            let total: u64 = backups.iter().map(|b| b.size_bytes).sum();
            println!();
            println!("Total: {} backup(s), {}", backups.len(), format_size(total));
        }

        BackupCommands::Info { backup } => {
            let backup_path = catalog.resolve(&backup)?;
            let mut reader = ArchiveReader::open(&backup_path)?;
            let index = reader.index()?;
            let metadata = std::fs::metadata(&backup_path)?;

            println!("Backup Details");
            println!("==============");
            println!("File: {}", backup_path.display());
            println!("Size: {}", format_size(metadata.len()));
            println!("Entries: {}", reader.entry_names().len());
            println!("{}", format_index(&index));

            if let Some(readme) = reader.read_text(README)? {
                println!();
                println!("README");
                println!("------");
                println!("{}", readme.trim_end());
            }
        }

        BackupCommands::Download { backup, dest } => {
            let written = catalog.download(&backup, &dest)?;
            println!("Backup copied to: {}", written.display());
        }

        BackupCommands::Delete { backup } => {
            let deleted = catalog.delete(&backup)?;
            println!(
                "Deleted backup: {} ({})",
                deleted.filename,
                format_size(deleted.size_bytes)
            );
        }

        BackupCommands::Restore {
            backup,
            mode,
            force,
        } => {
            let backup_path = catalog.resolve(&backup)?;
            let mode = match mode {
                Some(mode) => mode,
                None => ArchiveReader::open(&backup_path)?.index()?.kind,
            };

            // Validate the backup first
            let restore_manager = RestoreManager::new(&layout.scratch_dir, settings.restore.clone())
                .with_folders_table(settings.folders_table.clone());
            let validation = restore_manager.validate(&backup_path, mode)?;

            println!("Backup Information");
            println!("==================");
            println!("File: {}", backup_path.display());
            println!(
                "Created: {}",
                validation.backup_date.format("%Y-%m-%d %H:%M:%S UTC")
            );
            println!("Restore mode: {}", mode.label());
            println!("Status: {}", validation.summary());
            println!();

            if !force {
                match mode {
                    BackupKind::Folders => {
                        println!("This will append folder records and overwrite folder zips.")
                    }
                    _ => println!("WARNING: This will replace ALL data in the restored tables!"),
                }
                println!("To proceed, run again with --force flag:");
                println!(
                    "  civic-backup restore {} --mode {} --force",
                    backup, mode
                );
                return Ok(());
            }

            let mut store = SqliteStore::open(&layout.database_file)?;
            let files = DirFileTree::from_layout(&layout);

            // Create a backup of current data before restoring
            println!("Creating backup of current data before restore...");
            let safety = create_backup(&layout, settings, &store, &files, mode, Trigger::Manual)?;
            println!("Pre-restore backup saved: {}", safety.filename);
            println!();

            println!("Restoring from backup...");
            let report = restore_manager.restore(&backup_path, mode, &mut store, &files)?;

            println!("Restore complete!");
            println!("{}", format_restore_report(&report));
        }

        BackupCommands::Cleanup { keep_days } => {
            let keep_days = keep_days.unwrap_or(settings.retention.keep_days);
            let report = RetentionManager::new(&layout.backup_dir, keep_days).sweep()?;
            println!("{}", format_retention_report(&report));
        }

        BackupCommands::Extract {
            folder,
            files,
            output,
        } => {
            let as_path = PathBuf::from(&folder);
            let source = if as_path.is_file() {
                as_path
            } else {
                resolve_folder_zip(&layout.folder_zip_dir, &folder)?
            };

            let report = SelectiveExtractor::new(&layout.scratch_dir).extract(&source, &files)?;
            let delivered_to = match output {
                Some(dest) => {
                    let target = if dest.is_dir() {
                        dest.join(file_name_of(&report.path))
                    } else {
                        dest
                    };
                    std::fs::copy(&report.path, &target).map_err(|e| {
                        BackupError::Io(format!(
                            "Failed to copy archive to {}: {}",
                            target.display(),
                            e
                        ))
                    })?;
                    std::fs::remove_file(&report.path)?;
                    target
                }
                None => report.path.clone(),
            };

            println!(
                "Extracted {} of {} requested file(s) to {}",
                report.delivered.len(),
                report.requested,
                delivered_to.display()
            );
            for name in &report.missing {
                println!("  not found: {}", name);
            }
        }

        BackupCommands::Status => {
            let store = SqliteStore::open(&layout.database_file)?;
            let files = DirFileTree::from_layout(&layout);

            let tables = store.list_tables()?;
            let mut total_records = 0;
            for table in &tables {
                total_records += store.count_rows(table)?;
            }

            println!("System Status");
            println!("=============");
            println!("Database: {}", store.database_name());
            println!("Tables: {}", tables.len());
            println!("Records: {}", total_records);
            for group in [FileGroup::FolderZips, FileGroup::Profiles] {
                println!("{}: {}", group, files.list_files(group)?.len());
            }

            let backups = catalog.list()?;
            println!();
            println!("Backups: {}", backups.len());
            let recent = catalog.recent_automated(RECENT_AUTOMATED_LIMIT)?;
            if !recent.is_empty() {
                println!("Recent automated backups:");
                for backup in recent {
                    println!(
                        "  - {} ({}, {} MB)",
                        backup.filename, backup.kind_label, backup.size_mb
                    );
                }
            }
        }
    }

    Ok(())
}

/// Build an archive with the configured dump program and folders table
fn create_backup(
    layout: &StorageLayout,
    settings: &Settings,
    store: &dyn TableStore,
    files: &dyn FileTree,
    kind: BackupKind,
    trigger: Trigger,
) -> BackupResult<crate::backup::BackupReport> {
    let dumper = dump::from_settings(settings.dump_command.as_ref());
    ArchiveBuilder::new(&layout.backup_dir, store, files)
        .with_dumper(dumper.as_ref())
        .with_folders_table(settings.folders_table.clone())
        .build(kind, trigger)
}

fn file_name_of(path: &std::path::Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
