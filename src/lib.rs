//! civic-backup - Backup and restore for municipal records
//!
//! This library snapshots a relational database and the uploaded file trees
//! of a municipal records system into single zip archives, restores them,
//! prunes expired automated archives, and re-packages parts of folder zips
//! for delivery.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Configuration, path management, and the resolved storage layout
//! - `error`: Custom error types
//! - `models`: Backup kinds, row records, manifests, and skip records
//! - `storage`: Table store, file tree, and SQL dump collaborators
//! - `export`: JSON and CSV forms of captured tables
//! - `archive`: Archive naming, entry layout, reader, and writer
//! - `backup`: Builder, restorer, retention, selective extraction, and catalog
//! - `cli`: Command handlers for the `civic-backup` binary
//! - `display`: Terminal formatting
//!
//! # Example
//!
//! ```rust,ignore
//! use civic_backup::config::{CivicPaths, Settings};
//!
//! let paths = CivicPaths::new()?;
//! let settings = Settings::load_or_create(&paths)?;
//! let layout = settings.layout(&paths);
//! ```

pub mod archive;
pub mod backup;
pub mod cli;
pub mod config;
pub mod display;
pub mod error;
pub mod export;
pub mod models;
pub mod storage;

pub use error::{BackupError, BackupResult};
