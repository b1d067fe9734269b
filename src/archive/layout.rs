//! Entry paths inside an archive
//!
//! The layout is fixed so that archives written by any version stay readable:
//!
//! ```text
//! README.txt
//! manifest.json
//! database/complete_database.json
//! database/database_dump.sql            (optional)
//! database/tables/<table>.json
//! database/tables/<table>.csv           (non-empty tables only)
//! database/folders_table.json           (folders kind)
//! database/folders_table.csv            (folders kind, non-empty only)
//! files/<group>/<name>                  (complete kind)
//! folder-zips/<name>                    (folders kind)
//! ```

use crate::models::{BackupKind, FileGroup};

pub const README: &str = "README.txt";
pub const INDEX: &str = "manifest.json";
pub const COMPLETE_DATABASE: &str = "database/complete_database.json";
pub const SQL_DUMP: &str = "database/database_dump.sql";
pub const FOLDERS_TABLE_JSON: &str = "database/folders_table.json";
pub const FOLDERS_TABLE_CSV: &str = "database/folders_table.csv";

/// Per-table JSON entry
pub fn table_json(table: &str) -> String {
    format!("database/tables/{}.json", table)
}

/// Per-table CSV entry
pub fn table_csv(table: &str) -> String {
    format!("database/tables/{}.csv", table)
}

/// Directory prefix (with trailing slash) holding a group's files for a kind
///
/// The folders kind keeps the legacy top-level `folder-zips/` directory;
/// complete archives nest every group under `files/`.
pub fn group_prefix(kind: BackupKind, group: FileGroup) -> String {
    match kind {
        BackupKind::Folders => format!("{}/", group.token()),
        BackupKind::Database | BackupKind::Complete => format!("files/{}/", group.token()),
    }
}

/// Entry path of one captured file
pub fn file_entry(kind: BackupKind, group: FileGroup, name: &str) -> String {
    format!("{}{}", group_prefix(kind, group), name)
}

/// Split an entry path into its file name if it sits directly under `prefix`
pub fn name_under<'a>(entry: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = entry.strip_prefix(prefix)?;
    if rest.is_empty() || rest.ends_with('/') {
        return None;
    }
    Some(rest)
}
