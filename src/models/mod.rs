//! Core data models for civic-backup
//!
//! This module contains the data structures describing what an archive holds:
//! backup kinds and file groups, opaque row records, the manifest types, and
//! the records of files skipped along the way.

pub mod kind;
pub mod manifest;
pub mod record;
pub mod skip;

pub use kind::{BackupKind, FileGroup, Trigger};
pub use manifest::{ArchiveIndex, TableCount, TableSnapshot, INDEX_SCHEMA_VERSION};
pub use record::Record;
pub use skip::SkippedFile;
