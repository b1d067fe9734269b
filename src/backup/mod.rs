//! Backup engine for civic-backup
//!
//! Creates archives of the live database and file trees, restores them, and
//! keeps the backup directory tidy.
//!
//! # Architecture
//!
//! - `ArchiveBuilder`: captures tables and file groups into a new archive
//! - `RestoreManager`: validates an archive and replays it into live storage
//! - `RetentionManager`: deletes expired automated archives
//! - `SelectiveExtractor`: re-packages part of a folder zip for delivery
//! - `BackupCatalog`: lists, resolves, copies, and deletes archives
//!
//! Every component receives its directories explicitly, usually from
//! `Settings::layout`.
//!
//! # Example
//!
//! ```rust,ignore
//! use civic_backup::backup::{ArchiveBuilder, RestoreManager, RetentionManager};
//! use civic_backup::config::{CivicPaths, Settings};
//! use civic_backup::models::{BackupKind, Trigger};
//! use civic_backup::storage::{DirFileTree, SqliteStore};
//!
//! let paths = CivicPaths::new()?;
//! let settings = Settings::load_or_create(&paths)?;
//! let layout = settings.layout(&paths);
//! let mut store = SqliteStore::open(&layout.database_file)?;
//! let files = DirFileTree::from_layout(&layout);
//!
//! // Create a backup
//! let report = ArchiveBuilder::new(&layout.backup_dir, &store, &files)
//!     .build(BackupKind::Complete, Trigger::Manual)?;
//!
//! // Later, restore from it
//! let restore = RestoreManager::new(&layout.scratch_dir, settings.restore.clone());
//! let result = restore.restore(&report.path, BackupKind::Complete, &mut store, &files)?;
//! println!("{}", result.summary());
//!
//! // Drop expired automated archives
//! RetentionManager::new(&layout.backup_dir, settings.retention.keep_days).sweep()?;
//! ```

mod builder;
mod catalog;
mod extract;
mod restore;
mod retention;

pub use builder::{ArchiveBuilder, BackupReport, BackupStatistics};
pub use catalog::{size_mb, BackupCatalog, BackupInfo, LATEST, RECENT_AUTOMATED_LIMIT};
pub use extract::{resolve_folder_zip, ExtractionReport, SelectiveExtractor};
pub use restore::{RestoreManager, RestoreReport, ValidationResult};
pub use retention::{FailedDeletion, RetentionManager, RetentionReport};
