//! Live file trees
//!
//! Each file group is a flat directory of uploaded files. Names are plain
//! filenames; anything with a path component is rejected.

use std::fs;
use std::path::PathBuf;

use crate::config::StorageLayout;
use crate::error::{BackupError, BackupResult};
use crate::models::FileGroup;

use super::file_io::write_bytes_atomic;

/// Listing, reading, and writing files per group
pub trait FileTree {
    /// Names of the regular files in a group, sorted
    fn list_files(&self, group: FileGroup) -> BackupResult<Vec<String>>;

    /// Read one file's bytes
    fn read_file(&self, group: FileGroup, name: &str) -> BackupResult<Vec<u8>>;

    /// Write one file, replacing any file of the same name
    fn write_file(&self, group: FileGroup, name: &str, content: &[u8]) -> BackupResult<()>;
}

/// Returns true if `name` is a bare filename with no traversal segments
pub fn is_safe_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains('\0')
}

/// A file tree backed by one directory per group
#[derive(Debug, Clone)]
pub struct DirFileTree {
    folder_zip_dir: PathBuf,
    profile_dir: PathBuf,
}

impl DirFileTree {
    pub fn new(folder_zip_dir: PathBuf, profile_dir: PathBuf) -> Self {
        Self {
            folder_zip_dir,
            profile_dir,
        }
    }

    /// Use the live directories of a storage layout
    pub fn from_layout(layout: &StorageLayout) -> Self {
        Self::new(layout.folder_zip_dir.clone(), layout.profile_dir.clone())
    }

    /// Directory backing a group
    pub fn group_dir(&self, group: FileGroup) -> &PathBuf {
        match group {
            FileGroup::FolderZips => &self.folder_zip_dir,
            FileGroup::Profiles => &self.profile_dir,
        }
    }

    /// Full path of a file in a group, validating the name
    pub fn file_path(&self, group: FileGroup, name: &str) -> BackupResult<PathBuf> {
        if !is_safe_file_name(name) {
            return Err(BackupError::Validation(format!(
                "Unsafe file name: {:?}",
                name
            )));
        }
        Ok(self.group_dir(group).join(name))
    }
}

impl FileTree for DirFileTree {
    fn list_files(&self, group: FileGroup) -> BackupResult<Vec<String>> {
        let dir = self.group_dir(group);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(dir).map_err(|e| {
            BackupError::Io(format!("Failed to read {}: {}", dir.display(), e))
        })? {
            let entry = entry.map_err(|e| {
                BackupError::Io(format!("Failed to read directory entry: {}", e))
            })?;

            let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
            if is_file {
                names.push(entry.file_name().to_string_lossy().to_string());
            }
        }

        names.sort();
        Ok(names)
    }

    fn read_file(&self, group: FileGroup, name: &str) -> BackupResult<Vec<u8>> {
        let path = self.file_path(group, name)?;
        fs::read(&path)
            .map_err(|e| BackupError::Io(format!("Failed to read {}: {}", path.display(), e)))
    }

    fn write_file(&self, group: FileGroup, name: &str, content: &[u8]) -> BackupResult<()> {
        let path = self.file_path(group, name)?;
        write_bytes_atomic(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_tree() -> (DirFileTree, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let layout = StorageLayout::under(temp_dir.path());
        (DirFileTree::from_layout(&layout), temp_dir)
    }

    #[test]
    fn test_missing_dir_lists_nothing() {
        let (tree, _temp) = test_tree();
        assert!(tree.list_files(FileGroup::Profiles).unwrap().is_empty());
    }

    #[test]
    fn test_write_then_list_and_read() {
        let (tree, _temp) = test_tree();

        tree.write_file(FileGroup::FolderZips, "b.zip", b"bbb").unwrap();
        tree.write_file(FileGroup::FolderZips, "a.zip", b"aaa").unwrap();
        fs::create_dir_all(tree.group_dir(FileGroup::FolderZips).join("subdir")).unwrap();

        assert_eq!(
            tree.list_files(FileGroup::FolderZips).unwrap(),
            vec!["a.zip", "b.zip"]
        );
        assert_eq!(tree.read_file(FileGroup::FolderZips, "a.zip").unwrap(), b"aaa");
    }

    #[test]
    fn test_write_overwrites() {
        let (tree, _temp) = test_tree();

        tree.write_file(FileGroup::Profiles, "me.png", b"v1").unwrap();
        tree.write_file(FileGroup::Profiles, "me.png", b"v2").unwrap();
        assert_eq!(tree.read_file(FileGroup::Profiles, "me.png").unwrap(), b"v2");
    }

    #[test]
    fn test_rejects_traversal() {
        let (tree, _temp) = test_tree();

        assert!(tree
            .write_file(FileGroup::Profiles, "../escape.png", b"x")
            .is_err());
        assert!(!is_safe_file_name(".."));
        assert!(!is_safe_file_name("a\\b"));
        assert!(is_safe_file_name("folder_permits 2025.zip"));
    }
}
