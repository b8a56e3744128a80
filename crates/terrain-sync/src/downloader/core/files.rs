//! File operation utilities
//!
//! Temp-file naming, atomic promotion and the "already on disk" check the
//! resume filter relies on.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::downloader::core::{DownloadError, FileOperation, Result};

const PARTIAL_SUFFIX: &str = ".part";

/// Temporary path for an in-progress download, next to the final file
///
/// The suffix is appended rather than replacing the extension so that
/// `a.webp` and `a.srtm` never share a temp file.
pub fn temp_path(dest_path: &Path) -> PathBuf {
    let mut name = dest_path.as_os_str().to_os_string();
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}

/// True when the file exists and is non-empty
///
/// No checksum is verified: a truncated but non-empty file counts as done.
pub async fn is_satisfied(path: &Path) -> Result<bool> {
    match fs::metadata(path).await {
        Ok(meta) => Ok(meta.is_file() && meta.len() > 0),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(DownloadError::file_system(path, FileOperation::Metadata, e)),
    }
}

/// Atomically rename a temporary file to its final destination
pub async fn atomic_rename(temp_path: &Path, dest_path: &Path) -> Result<()> {
    fs::rename(temp_path, dest_path)
        .await
        .map_err(|e| DownloadError::file_system(dest_path, FileOperation::Move, e))?;
    debug!("Atomically renamed {} to {}", temp_path.display(), dest_path.display());
    Ok(())
}

/// Remove a partial file, ignoring the case where it was never created
pub async fn remove_partial(temp_path: &Path) {
    match fs::remove_file(temp_path).await {
        Ok(()) => debug!("Removed partial file {}", temp_path.display()),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => debug!("Could not remove partial file {}: {}", temp_path.display(), e),
    }
}

pub async fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)
        .await
        .map_err(|e| DownloadError::file_system(dir, FileOperation::CreateDir, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn temp_path_appends_suffix() {
        let path = temp_path(Path::new("/data/textures/tile_01.webp"));
        assert_eq!(path, PathBuf::from("/data/textures/tile_01.webp.part"));
    }

    #[tokio::test]
    async fn missing_and_empty_files_are_not_satisfied() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing.srtm");
        assert!(!is_satisfied(&missing).await.unwrap());

        let empty = dir.path().join("empty.srtm");
        tokio::fs::write(&empty, b"").await.unwrap();
        assert!(!is_satisfied(&empty).await.unwrap());

        let full = dir.path().join("full.srtm");
        tokio::fs::write(&full, b"x").await.unwrap();
        assert!(is_satisfied(&full).await.unwrap());
    }

    #[tokio::test]
    async fn directories_are_not_satisfied_targets() {
        let dir = tempdir().unwrap();
        let sub = dir.path().join("looks_like_a_file.webp");
        tokio::fs::create_dir(&sub).await.unwrap();
        assert!(!is_satisfied(&sub).await.unwrap());
    }

    #[tokio::test]
    async fn remove_partial_tolerates_missing_file() {
        let dir = tempdir().unwrap();
        remove_partial(&dir.path().join("never_written.part")).await;
    }
}
