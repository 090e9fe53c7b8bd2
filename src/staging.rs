//! Scoped temp files: stage an upload on disk for exactly one request.
//!
//! Converters want a filesystem path, and most of them pick their parser from
//! the file extension, so the upload is written to a uniquely named file that
//! keeps the client's extension. [`ScopedTempFile`] owns that file and unlinks
//! it on drop. Drop runs on every exit path: normal return, `?` early return,
//! panic unwinding, and cancellation of the request future. No call site ever
//! deletes a staged file by hand.

use crate::error::ProcessingError;
use bytes::Bytes;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tracing::{debug, warn};

/// Prefix for every staged file name.
pub const TEMP_PREFIX: &str = "doc2md-";

/// Longest extension carried over from the client's filename.
const MAX_SUFFIX_LEN: usize = 16;

/// A staged upload that is deleted when this value is dropped.
#[derive(Debug)]
pub struct ScopedTempFile {
    // `Option` so `Drop` can take it and call the fallible `close`.
    path: Option<TempPath>,
}

impl ScopedTempFile {
    /// Write `payload` to a new file named `doc2md-<random><suffix>`.
    ///
    /// Uses `dir` when given, otherwise the system temp directory. If writing
    /// fails the partial file is removed before the error is returned.
    pub fn create(payload: &[u8], suffix: &str, dir: Option<&Path>) -> io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(TEMP_PREFIX).suffix(suffix);

        let mut file = match dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        file.write_all(payload)?;
        file.flush()?;

        // Close our handle so the converter sees a fully written, unlocked file.
        Ok(Self {
            path: Some(file.into_temp_path()),
        })
    }

    /// Path of the staged file.
    pub fn path(&self) -> &Path {
        self.path.as_deref().unwrap_or(Path::new(""))
    }
}

impl Drop for ScopedTempFile {
    fn drop(&mut self) {
        let Some(temp_path) = self.path.take() else {
            return;
        };
        let path = temp_path.to_path_buf();
        match temp_path.close() {
            Ok(()) => debug!("Deleted temp file {}", path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("Temp file {} already gone", path.display())
            }
            Err(e) => warn!("Failed to delete temp file {}: {}", path.display(), e),
        }
    }
}

/// Stage `payload` on a blocking thread.
///
/// The write can take a while for uploads near the size limit, so it is kept
/// off the async executor. If the awaiting request is cancelled the finished
/// guard is dropped by the runtime, which still deletes the file.
pub async fn stage(
    payload: Bytes,
    suffix: String,
    dir: Option<PathBuf>,
) -> Result<ScopedTempFile, ProcessingError> {
    tokio::task::spawn_blocking(move || ScopedTempFile::create(&payload, &suffix, dir.as_deref()))
        .await
        .map_err(|e| ProcessingError::Internal(format!("staging task failed: {e}")))?
        .map_err(|source| ProcessingError::StagingFailed { source })
}

/// Derive the temp-file suffix from a client-supplied filename.
///
/// `report.pdf` → `.pdf`, `archive.tar.gz` → `.gz`, `README` → `""`,
/// `.bashrc` → `""`. Extensions that are not short ASCII alphanumerics are
/// dropped so the client cannot inject path characters into the temp name.
pub fn suffix_for(file_name: Option<&str>) -> String {
    file_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| {
            !ext.is_empty()
                && ext.len() <= MAX_SUFFIX_LEN
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_suffix_for() {
        assert_eq!(suffix_for(Some("report.pdf")), ".pdf");
        assert_eq!(suffix_for(Some("Budget 2024.XLSX")), ".XLSX");
        assert_eq!(suffix_for(Some("archive.tar.gz")), ".gz");
        assert_eq!(suffix_for(Some("README")), "");
        assert_eq!(suffix_for(Some(".bashrc")), "");
        assert_eq!(suffix_for(Some("trailing.")), "");
        assert_eq!(suffix_for(Some("evil.p$f")), "");
        assert_eq!(suffix_for(Some("")), "");
        assert_eq!(suffix_for(None), "");
    }

    #[test]
    fn create_writes_payload_with_suffix() {
        let dir = TempDir::new().unwrap();
        let staged = ScopedTempFile::create(b"%PDF-1.7 hello", ".pdf", Some(dir.path())).unwrap();

        let path = staged.path().to_path_buf();
        assert!(path.starts_with(dir.path()));
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with(TEMP_PREFIX), "got: {name}");
        assert!(name.ends_with(".pdf"), "got: {name}");
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.7 hello");
    }

    #[test]
    fn drop_deletes_file() {
        let dir = TempDir::new().unwrap();
        let staged = ScopedTempFile::create(b"data", "", Some(dir.path())).unwrap();
        let path = staged.path().to_path_buf();
        assert!(path.exists());

        drop(staged);
        assert!(!path.exists());
    }

    #[test]
    fn drop_tolerates_already_deleted_file() {
        let dir = TempDir::new().unwrap();
        let staged = ScopedTempFile::create(b"data", ".txt", Some(dir.path())).unwrap();
        std::fs::remove_file(staged.path()).unwrap();
        drop(staged); // must not panic
    }

    #[test]
    fn drop_runs_during_unwind() {
        let dir = TempDir::new().unwrap();
        let dir_path = dir.path().to_path_buf();

        let result = std::panic::catch_unwind(move || {
            let _staged = ScopedTempFile::create(b"data", ".docx", Some(&dir_path)).unwrap();
            panic!("converter blew up");
        });
        assert!(result.is_err());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn concurrent_files_get_distinct_paths() {
        let dir = TempDir::new().unwrap();
        let a = ScopedTempFile::create(b"a", ".pdf", Some(dir.path())).unwrap();
        let b = ScopedTempFile::create(b"b", ".pdf", Some(dir.path())).unwrap();
        assert_ne!(a.path(), b.path());
    }

    #[test]
    fn create_in_missing_dir_fails() {
        let err = ScopedTempFile::create(b"x", "", Some(Path::new("/definitely/not/here")));
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn stage_off_thread() {
        let dir = TempDir::new().unwrap();
        let staged = stage(
            Bytes::from_static(b"hello"),
            ".md".into(),
            Some(dir.path().to_path_buf()),
        )
        .await
        .unwrap();
        assert_eq!(std::fs::read_to_string(staged.path()).unwrap(), "hello");
    }

    #[tokio::test]
    async fn stage_maps_io_error() {
        let err = stage(
            Bytes::from_static(b"hello"),
            String::new(),
            Some(PathBuf::from("/definitely/not/here")),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ProcessingError::StagingFailed { .. }));
    }
}
