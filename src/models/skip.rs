//! Non-fatal per-file conditions
//!
//! A file that cannot be captured or replayed is recorded and skipped; it
//! never aborts the surrounding backup or restore.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::kind::FileGroup;

/// A file left out of a backup or a restore
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedFile {
    /// Group the file belongs to, when known
    pub group: Option<FileGroup>,
    /// File name or archive entry name
    pub name: String,
    /// Why it was skipped
    pub reason: String,
}

impl SkippedFile {
    pub fn new(group: Option<FileGroup>, name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            group,
            name: name.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for SkippedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.group {
            Some(group) => write!(f, "{}/{}: {}", group.token(), self.name, self.reason),
            None => write!(f, "{}: {}", self.name, self.reason),
        }
    }
}
