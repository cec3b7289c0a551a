//! On-disk lock file schema.
//!
//! The lock file groups entries by folder:
//!
//! ```json
//! {
//!     "metadata": { "last_update": "...", "total_files": 2, "version": "1.0" },
//!     "files": {
//!         "root": { "a.png": { ... } },
//!         "icons": { "icons/b.png": { ... } }
//!     }
//! }
//! ```
//!
//! The grouping exists only here. [`LockFile::from_entries`] derives it from
//! each entry's `folder` field and [`LockFile::into_entries`] flattens it back
//! into a [`CacheMap`].

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entry::CacheMap;
use crate::error::CacheError;

/// Schema version written to and required from `metadata.version`.
pub const LOCK_VERSION: &str = "1.0";

/// Summary block at the top of the lock file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockMetadata {
    /// When the lock file was written.
    #[serde(deserialize_with = "crate::timestamp::deserialize")]
    pub last_update: DateTime<Utc>,
    /// Number of entries across all folders.
    pub total_files: usize,
    /// Schema version, see [`LOCK_VERSION`].
    pub version: String,
}

/// The serialized form of the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockFile {
    /// Summary block.
    pub metadata: LockMetadata,
    /// Folder label → (relative path key → entry).
    pub files: BTreeMap<String, CacheMap>,
}

/// Minimal view used to check the schema version before full parsing, so an
/// unknown version is reported as such rather than as a shape mismatch.
#[derive(Deserialize)]
struct VersionHeader {
    metadata: HeaderMetadata,
}

#[derive(Deserialize)]
struct HeaderMetadata {
    version: String,
}

impl LockFile {
    /// Groups a flat cache by each entry's `folder` field.
    pub fn from_entries(entries: &CacheMap, now: DateTime<Utc>) -> Self {
        let mut files: BTreeMap<String, CacheMap> = BTreeMap::new();
        for (key, entry) in entries {
            files
                .entry(entry.folder.clone())
                .or_default()
                .insert(key.clone(), entry.clone());
        }
        Self {
            metadata: LockMetadata {
                last_update: now,
                total_files: entries.len(),
                version: LOCK_VERSION.to_string(),
            },
            files,
        }
    }

    /// Parses lock file bytes, checking the schema version first.
    ///
    /// `path` is only used for error context.
    pub fn parse(bytes: &[u8], path: &Path) -> Result<Self, CacheError> {
        let parse_err = |e: serde_json::Error| CacheError::LockParse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        };
        let header: VersionHeader = serde_json::from_slice(bytes).map_err(parse_err)?;
        if header.metadata.version != LOCK_VERSION {
            return Err(CacheError::UnsupportedVersion {
                path: path.to_path_buf(),
                expected: LOCK_VERSION.to_string(),
                found: header.metadata.version,
            });
        }
        serde_json::from_slice(bytes).map_err(parse_err)
    }

    /// Serializes with four-space indentation and a trailing newline.
    pub fn to_pretty_json(&self) -> Result<Vec<u8>, CacheError> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)
            .map_err(|e| CacheError::Serialization {
                reason: e.to_string(),
            })?;
        buf.push(b'\n');
        Ok(buf)
    }

    /// Flattens the folder groups into a single map.
    ///
    /// Fails if an entry sits in a group that disagrees with its own
    /// `folder`, or if a key appears in more than one group.
    pub fn into_entries(self, path: &Path) -> Result<CacheMap, CacheError> {
        let mut flat = CacheMap::new();
        for (group, entries) in self.files {
            for (key, entry) in entries {
                if entry.folder != group {
                    return Err(CacheError::FolderMismatch {
                        path: path.to_path_buf(),
                        key,
                        group,
                        folder: entry.folder,
                    });
                }
                if flat.contains_key(&key) {
                    return Err(CacheError::DuplicateKey {
                        path: path.to_path_buf(),
                        key,
                    });
                }
                flat.insert(key, entry);
            }
        }
        Ok(flat)
    }
}
