//! Archive format
//!
//! Naming, entry layout, and the zip reader/writer shared by every backup
//! operation.

pub mod layout;
pub mod naming;
pub mod reader;
pub mod writer;

pub use naming::{is_archive_file, is_automated, kind_label, ArchiveName, ARCHIVE_EXTENSION};
pub use reader::ArchiveReader;
pub use writer::ArchiveWriter;
