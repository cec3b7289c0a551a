//! Persistent lock file access.
//!
//! A [`CacheStore`] owns reads and writes of one lock file. Every store opened
//! for the same path shares a single async mutex that lives for the rest of
//! the process, so loads and saves from any caller never interleave.

use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex, OnceLock};

use chrono::Utc;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::entry::CacheMap;
use crate::error::CacheError;
use crate::lockfile::{LockFile, LockMetadata};

/// Process-wide registry of per-path exclusion locks.
static PATH_LOCKS: OnceLock<StdMutex<HashMap<PathBuf, Arc<Mutex<()>>>>> = OnceLock::new();

/// Returns the shared lock for `path`, creating it on first use.
fn lock_for(path: &Path) -> Arc<Mutex<()>> {
    let registry = PATH_LOCKS.get_or_init(|| StdMutex::new(HashMap::new()));
    let mut locks = registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    locks
        .entry(path.to_path_buf())
        .or_insert_with(|| Arc::new(Mutex::new(())))
        .clone()
}

/// Loads and atomically persists the conversion cache at a fixed path.
#[derive(Debug, Clone)]
pub struct CacheStore {
    /// Absolute path of the lock file.
    path: PathBuf,

    /// Exclusion lock shared with every other store for the same path.
    lock: Arc<Mutex<()>>,
}

impl CacheStore {
    /// Opens a store for the lock file at `path`.
    ///
    /// The parent directory is canonicalized when it exists, so `..` segments
    /// and symlinked directories still map to the same shared lock. Nothing is
    /// read until [`load`](Self::load) is called.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = resolve_lock_path(path.as_ref());
        let lock = lock_for(&path);
        Self { path, lock }
    }

    /// The lock file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `true` if `other` guards the same lock file.
    pub fn shares_lock_with(&self, other: &CacheStore) -> bool {
        Arc::ptr_eq(&self.lock, &other.lock)
    }

    /// Loads the flat cache.
    ///
    /// An absent lock file yields an empty map. A present but malformed one is
    /// an error; it is never silently treated as empty.
    pub async fn load(&self) -> Result<CacheMap, CacheError> {
        let _guard = self.lock.lock().await;

        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no lock file, starting with empty cache");
                return Ok(CacheMap::new());
            }
            Err(e) => {
                return Err(CacheError::Io {
                    path: self.path.clone(),
                    source: e,
                })
            }
        };

        let entries = LockFile::parse(&bytes, &self.path)?.into_entries(&self.path)?;
        debug!(path = %self.path.display(), entries = entries.len(), "loaded lock file");
        Ok(entries)
    }

    /// Replaces the lock file with `entries`.
    ///
    /// The document is written to a sibling temp file, synced, then renamed
    /// over the lock file, so a crash leaves either the old or the new file
    /// and never a truncated one.
    pub async fn save(&self, entries: &CacheMap) -> Result<LockMetadata, CacheError> {
        let lock_file = LockFile::from_entries(entries, Utc::now());
        let bytes = lock_file.to_pretty_json()?;

        let _guard = self.lock.lock().await;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CacheError::Io {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }

        let tmp_path = self.temp_path();
        if let Err(e) = write_synced(&tmp_path, &bytes).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(CacheError::Io {
                path: tmp_path,
                source: e,
            });
        }
        if let Err(e) = tokio::fs::rename(&tmp_path, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(CacheError::Io {
                path: self.path.clone(),
                source: e,
            });
        }

        info!(
            path = %self.path.display(),
            total_files = lock_file.metadata.total_files,
            "saved lock file"
        );
        Ok(lock_file.metadata)
    }

    /// `<lock file name>.tmp` next to the lock file.
    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from("lock"));
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

/// Absolute lock file path with its parent directory canonicalized if possible.
fn resolve_lock_path(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let resolved = absolute
        .parent()
        .zip(absolute.file_name())
        .and_then(|(parent, name)| std::fs::canonicalize(parent).ok().map(|dir| dir.join(name)));
    resolved.unwrap_or(absolute)
}

async fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await
}
