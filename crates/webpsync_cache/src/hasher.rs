//! Source and artifact file hashing.
//!
//! Files are streamed through SHA-256 in fixed-size chunks. The async entry
//! point runs the blocking read on tokio's blocking pool so that many
//! concurrent hashes never stall the scheduler.

use std::fs::File;
use std::path::Path;

use webpsync_common::ContentHash;

use crate::error::CacheError;

/// Utility for computing content hashes of files on disk.
pub struct ContentHasher;

impl ContentHasher {
    /// Computes the content hash of a single file, blocking the caller.
    pub fn hash_file(path: &Path) -> Result<ContentHash, CacheError> {
        let io_err = |e| CacheError::Io {
            path: path.to_path_buf(),
            source: e,
        };
        let file = File::open(path).map_err(io_err)?;
        ContentHash::from_reader(file).map_err(io_err)
    }

    /// Computes the content hash of a file on the blocking thread pool.
    pub async fn hash_file_async(path: &Path) -> Result<ContentHash, CacheError> {
        let owned = path.to_path_buf();
        tokio::task::spawn_blocking(move || Self::hash_file(&owned))
            .await
            .map_err(|e| CacheError::HashTask {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_file_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.png");
        std::fs::write(&path, b"\x89PNG fake pixels").unwrap();

        let h1 = ContentHasher::hash_file(&path).unwrap();
        let h2 = ContentHasher::hash_file(&path).unwrap();
        assert_eq!(h1, h2);
        assert_eq!(h1, ContentHash::from_bytes(b"\x89PNG fake pixels"));
    }

    #[test]
    fn hash_file_different_content() {
        let dir = tempfile::tempdir().unwrap();
        let path_a = dir.path().join("a.png");
        let path_b = dir.path().join("b.png");
        std::fs::write(&path_a, b"image a").unwrap();
        std::fs::write(&path_b, b"image b").unwrap();

        let h1 = ContentHasher::hash_file(&path_a).unwrap();
        let h2 = ContentHasher::hash_file(&path_b).unwrap();
        assert_ne!(h1, h2);
    }

    #[test]
    fn hash_file_nonexistent_errors() {
        let result = ContentHasher::hash_file(Path::new("/nonexistent/file.png"));
        assert!(matches!(result, Err(CacheError::Io { .. })));
    }

    #[test]
    fn hash_large_file_streams() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.png");
        let data = vec![0xabu8; 1024 * 1024 + 3];
        std::fs::write(&path, &data).unwrap();

        let h = ContentHasher::hash_file(&path).unwrap();
        assert_eq!(h, ContentHash::from_bytes(&data));
    }

    #[tokio::test]
    async fn async_matches_blocking() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.png");
        std::fs::write(&path, b"pixels").unwrap();

        let blocking = ContentHasher::hash_file(&path).unwrap();
        let offloaded = ContentHasher::hash_file_async(&path).await.unwrap();
        assert_eq!(blocking, offloaded);
    }

    #[tokio::test]
    async fn async_missing_file_errors() {
        let result = ContentHasher::hash_file_async(Path::new("/nonexistent/x.png")).await;
        assert!(matches!(result, Err(CacheError::Io { .. })));
    }
}
