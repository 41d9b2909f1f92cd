//! Filesystem checks shared by the staging and encoding steps.

use std::path::Path;
use tokio::fs;

use crate::error::{MediaError, MediaResult};

/// Check that `path` is an existing, non-empty regular file.
///
/// Returns the file size in bytes.
pub async fn ensure_non_empty_file(path: impl AsRef<Path>) -> MediaResult<u64> {
    let path = path.as_ref();

    let metadata = match fs::metadata(path).await {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(MediaError::FileNotFound(path.to_path_buf()));
        }
        Err(e) => return Err(MediaError::from(e)),
    };

    if !metadata.is_file() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }
    if metadata.len() == 0 {
        return Err(MediaError::EmptyAsset(path.to_path_buf()));
    }

    Ok(metadata.len())
}

/// Remove a file if present.
///
/// Best effort: a failure is logged, never returned, because callers use this
/// while already propagating another error.
pub async fn remove_if_exists(path: impl AsRef<Path>) {
    let path = path.as_ref();
    match fs::remove_file(path).await {
        Ok(()) => tracing::debug!("Removed partial output {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Failed to remove {}: {}", path.display(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_non_empty_file_reports_size() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("clip.mp4");
        fs::write(&path, b"0123456789").await.unwrap();

        assert_eq!(ensure_non_empty_file(&path).await.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_empty_and_missing_files_rejected() {
        let dir = TempDir::new().unwrap();
        let empty = dir.path().join("empty.mp4");
        fs::write(&empty, b"").await.unwrap();

        assert!(matches!(
            ensure_non_empty_file(&empty).await,
            Err(MediaError::EmptyAsset(_))
        ));
        assert!(matches!(
            ensure_non_empty_file(dir.path().join("missing.mp4")).await,
            Err(MediaError::FileNotFound(_))
        ));
        assert!(matches!(
            ensure_non_empty_file(dir.path()).await,
            Err(MediaError::FileNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_remove_if_exists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("output.mp4");
        fs::write(&path, b"partial").await.unwrap();

        remove_if_exists(&path).await;
        assert!(!path.exists());

        // Second call is a no-op
        remove_if_exists(&path).await;
    }
}
