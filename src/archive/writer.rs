//! Archive writer
//!
//! Wraps a `ZipWriter` over a file that is claimed exclusively at creation.
//! An archive that is dropped before `finish` is removed, so a failed build
//! never leaves a partial file in the backup directory.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{BackupError, BackupResult};

/// A zip archive being written
pub struct ArchiveWriter {
    path: PathBuf,
    zip: Option<ZipWriter<File>>,
    options: SimpleFileOptions,
    entries: usize,
    finished: bool,
}

impl ArchiveWriter {
    /// Create a new archive; fails if the path already exists
    pub fn create_new(path: &Path) -> BackupResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                BackupError::ArchiveIo(format!(
                    "Failed to create backup directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => BackupError::Duplicate {
                    entity_type: "Backup",
                    identifier: path.display().to_string(),
                },
                _ => BackupError::ArchiveIo(format!(
                    "Could not create backup file {}: {}",
                    path.display(),
                    e
                )),
            })?;

        Ok(Self {
            path: path.to_path_buf(),
            zip: Some(ZipWriter::new(file)),
            options: SimpleFileOptions::default().compression_method(CompressionMethod::Deflated),
            entries: 0,
            finished: false,
        })
    }

    /// Path of the archive on disk
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of entries written so far
    pub fn entry_count(&self) -> usize {
        self.entries
    }

    /// Add one entry
    pub fn add_bytes(&mut self, name: &str, bytes: &[u8]) -> BackupResult<()> {
        let options = self.options;
        let zip = self.zip_mut()?;
        zip.start_file(name, options)
            .map_err(|e| BackupError::ArchiveIo(format!("Failed to add {}: {}", name, e)))?;
        zip.write_all(bytes)
            .map_err(|e| BackupError::ArchiveIo(format!("Failed to write {}: {}", name, e)))?;
        self.entries += 1;
        Ok(())
    }

    /// Add one text entry
    pub fn add_text(&mut self, name: &str, text: &str) -> BackupResult<()> {
        self.add_bytes(name, text.as_bytes())
    }

    /// Borrow the underlying writer, for raw entry copies
    pub fn zip_mut(&mut self) -> BackupResult<&mut ZipWriter<File>> {
        self.zip
            .as_mut()
            .ok_or_else(|| BackupError::ArchiveIo("Archive already finalized".into()))
    }

    /// Record that an entry was added through `zip_mut`
    pub fn note_entry(&mut self) {
        self.entries += 1;
    }

    /// Finalize the central directory and flush to disk
    ///
    /// Returns the archive size in bytes.
    pub fn finish(mut self) -> BackupResult<u64> {
        let zip = self
            .zip
            .take()
            .ok_or_else(|| BackupError::ArchiveIo("Archive already finalized".into()))?;

        let file = zip.finish().map_err(|e| {
            BackupError::ArchiveIo(format!(
                "Could not finalize backup file {}: {}",
                self.path.display(),
                e
            ))
        })?;
        file.sync_all()
            .map_err(|e| BackupError::ArchiveIo(format!("Failed to sync archive: {}", e)))?;
        let size = file
            .metadata()
            .map(|m| m.len())
            .map_err(|e| BackupError::ArchiveIo(format!("Failed to stat archive: {}", e)))?;

        self.finished = true;
        debug!(path = %self.path.display(), entries = self.entries, size, "Archive finalized");
        Ok(size)
    }
}

impl Drop for ArchiveWriter {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        drop(self.zip.take());
        if let Err(e) = fs::remove_file(&self.path) {
            if e.kind() != ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %e, "Failed to remove partial archive");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;
    use zip::ZipArchive;

    #[test]
    fn test_write_and_finish() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("backups").join("a.zip");

        let mut writer = ArchiveWriter::create_new(&path).unwrap();
        writer.add_text("README.txt", "hello").unwrap();
        writer.add_bytes("files/profiles/me.png", &[1, 2, 3]).unwrap();
        assert_eq!(writer.entry_count(), 2);
        let size = writer.finish().unwrap();

        assert_eq!(size, fs::metadata(&path).unwrap().len());
        let mut archive = ZipArchive::new(File::open(&path).unwrap()).unwrap();
        let mut text = String::new();
        archive
            .by_name("README.txt")
            .unwrap()
            .read_to_string(&mut text)
            .unwrap();
        assert_eq!(text, "hello");
    }

    #[test]
    fn test_existing_path_is_duplicate() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a.zip");
        fs::write(&path, b"previous").unwrap();

        let err = ArchiveWriter::create_new(&path).err().unwrap();
        assert_eq!(err.kind(), "duplicate");
        assert_eq!(fs::read(&path).unwrap(), b"previous");
    }

    #[test]
    fn test_unfinished_archive_is_removed() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a.zip");

        {
            let mut writer = ArchiveWriter::create_new(&path).unwrap();
            writer.add_text("README.txt", "partial").unwrap();
        }

        assert!(!path.exists());
    }
}
