//! Selective extraction
//!
//! Re-packages a subset of a folder zip's entries into a new, smaller archive
//! for delivery. Requested names that are not present are left out of the
//! output rather than failing the extraction.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::archive::{ArchiveReader, ArchiveWriter};
use crate::error::{BackupError, BackupResult};
use crate::storage::is_safe_file_name;

/// Result of a selective extraction
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionReport {
    /// The new archive, owned by the caller from here on
    pub path: PathBuf,
    /// Distinct names that were asked for
    pub requested: usize,
    /// Names copied into the output, in request order
    pub delivered: Vec<String>,
    /// Names with no matching entry
    pub missing: Vec<String>,
}

impl ExtractionReport {
    /// Requested names that were not delivered
    pub fn omitted(&self) -> usize {
        self.requested - self.delivered.len()
    }
}

/// Writes partial archives into a staging directory
pub struct SelectiveExtractor {
    staging_dir: PathBuf,
}

impl SelectiveExtractor {
    pub fn new(staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            staging_dir: staging_dir.into(),
        }
    }

    /// Copy the requested entries of `source` into a new archive
    ///
    /// Names match entry names exactly. Duplicate requests are collapsed.
    pub fn extract(&self, source: &Path, requested: &[String]) -> BackupResult<ExtractionReport> {
        let mut reader = ArchiveReader::open(source)?;

        let mut wanted: Vec<&str> = Vec::with_capacity(requested.len());
        for name in requested {
            if !wanted.contains(&name.as_str()) {
                wanted.push(name);
            }
        }

        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "archive".to_string());
        let path = self
            .staging_dir
            .join(format!("{}_selected_{}.zip", stem, Uuid::new_v4().simple()));

        let mut writer = ArchiveWriter::create_new(&path)?;
        let mut delivered = Vec::new();
        let mut missing = Vec::new();

        for name in &wanted {
            if reader.copy_raw_entry(name, &mut writer)? {
                debug!(file = %name, "Entry extracted");
                delivered.push(name.to_string());
            } else {
                missing.push(name.to_string());
            }
        }
        writer.finish()?;

        info!(
            source = %source.display(),
            requested = wanted.len(),
            delivered = delivered.len(),
            output = %path.display(),
            "Selective extraction completed"
        );

        Ok(ExtractionReport {
            path,
            requested: wanted.len(),
            delivered,
            missing,
        })
    }
}

/// Locate a folder zip by name in the live folder-zip directory
pub fn resolve_folder_zip(folder_zip_dir: &Path, name: &str) -> BackupResult<PathBuf> {
    if !is_safe_file_name(name) {
        return Err(BackupError::Validation(format!(
            "Folder zip name must not contain path components: {}",
            name
        )));
    }

    let path = folder_zip_dir.join(name);
    if !path.is_file() {
        return Err(BackupError::NotFound {
            entity_type: "Folder zip",
            identifier: name.to_string(),
        });
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn folder_zip(dir: &Path, name: &str, entries: &[(&str, &[u8])]) -> PathBuf {
        let path = dir.join(name);
        let mut writer = ArchiveWriter::create_new(&path).unwrap();
        for (entry, bytes) in entries {
            writer.add_bytes(entry, bytes).unwrap();
        }
        writer.finish().unwrap();
        path
    }

    #[test]
    fn test_extract_reports_missing_names() {
        let temp_dir = TempDir::new().unwrap();
        let source = folder_zip(
            temp_dir.path(),
            "folder_permits.zip",
            &[("a.pdf", &b"%PDF-a"[..]), ("b.pdf", &b"%PDF-b"[..])],
        );
        let extractor = SelectiveExtractor::new(temp_dir.path().join("tmp"));

        let requested = vec!["a.pdf".to_string(), "missing.pdf".to_string()];
        let report = extractor.extract(&source, &requested).unwrap();

        assert_eq!(report.delivered, vec!["a.pdf"]);
        assert_eq!(report.missing, vec!["missing.pdf"]);
        assert_eq!(report.omitted(), 1);

        let mut output = ArchiveReader::open(&report.path).unwrap();
        assert_eq!(output.entry_names(), vec!["a.pdf"]);
        assert_eq!(output.read_entry("a.pdf").unwrap().unwrap(), b"%PDF-a");
        assert!(report
            .path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("folder_permits_selected_"));
    }

    #[test]
    fn test_no_matches_yields_empty_archive() {
        let temp_dir = TempDir::new().unwrap();
        let source = folder_zip(temp_dir.path(), "f.zip", &[("a.pdf", &b"a"[..])]);
        let extractor = SelectiveExtractor::new(temp_dir.path());

        let report = extractor.extract(&source, &["zzz.pdf".to_string()]).unwrap();

        assert!(report.delivered.is_empty());
        let output = ArchiveReader::open(&report.path).unwrap();
        assert!(output.entry_names().is_empty());
    }

    #[test]
    fn test_duplicate_requests_collapse() {
        let temp_dir = TempDir::new().unwrap();
        let source = folder_zip(temp_dir.path(), "f.zip", &[("a.pdf", &b"a"[..])]);
        let extractor = SelectiveExtractor::new(temp_dir.path());

        let requested = vec!["a.pdf".to_string(), "a.pdf".to_string()];
        let report = extractor.extract(&source, &requested).unwrap();
        assert_eq!(report.requested, 1);
        assert_eq!(report.delivered.len(), 1);
    }

    #[test]
    fn test_unreadable_source_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("broken.zip");
        fs::write(&source, b"garbage").unwrap();

        let extractor = SelectiveExtractor::new(temp_dir.path().join("tmp"));
        let err = extractor.extract(&source, &["a.pdf".to_string()]).unwrap_err();
        assert_eq!(err.kind(), "archive_io");
        assert!(!temp_dir.path().join("tmp").exists());
    }

    #[test]
    fn test_resolve_folder_zip() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("f.zip"), b"x").unwrap();

        assert!(resolve_folder_zip(temp_dir.path(), "f.zip").is_ok());
        assert!(resolve_folder_zip(temp_dir.path(), "g.zip").unwrap_err().is_not_found());
        assert_eq!(
            resolve_folder_zip(temp_dir.path(), "../f.zip").unwrap_err().kind(),
            "validation"
        );
    }
}
