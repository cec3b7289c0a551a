//! Cache entries and the relative-path keys that identify them.

use std::collections::BTreeMap;
use std::path::{Component, Path};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use webpsync_common::ContentHash;

/// Folder label used for files directly under the input root.
pub const ROOT_FOLDER: &str = "root";

/// The flat in-memory cache: relative path key → entry.
///
/// Ordered so that serialization is deterministic.
pub type CacheMap = BTreeMap<String, CacheEntry>;

/// Record of the last successful conversion of one source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Digest of the source file's bytes at conversion time.
    pub input_hash: ContentHash,
    /// Digest of the produced artifact.
    pub output_hash: ContentHash,
    /// Parent directory relative to the input root, or [`ROOT_FOLDER`].
    pub folder: String,
    /// Base name of the source file.
    pub original_name: String,
    /// Base name of the artifact.
    #[serde(rename = "webp_name")]
    pub converted_name: String,
    /// When the conversion finished.
    #[serde(deserialize_with = "crate::timestamp::deserialize")]
    pub last_conversion: DateTime<Utc>,
}

impl CacheEntry {
    /// Returns `true` if this entry can be reused without reconverting.
    ///
    /// Both the source hash must match and the artifact must still exist.
    pub fn is_valid(&self, current_input_hash: &ContentHash, artifact_exists: bool) -> bool {
        self.input_hash == *current_input_hash && artifact_exists
    }
}

/// Builds the cache key for a path relative to the input root.
///
/// Components are joined with `/` on every platform so lock files are
/// portable.
pub fn relative_key(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Returns the folder label for a cache key: everything before the last
/// `/`, or [`ROOT_FOLDER`] for top-level files.
pub fn folder_of(key: &str) -> &str {
    match key.rsplit_once('/') {
        Some((parent, _)) => parent,
        None => ROOT_FOLDER,
    }
}
