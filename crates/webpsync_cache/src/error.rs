//! Error types for cache operations.

use std::path::PathBuf;

/// Errors that can occur during cache operations.
///
/// An absent lock file is not an error (it loads as an empty cache). Every
/// variant here describes a lock file that exists but cannot be trusted, or
/// an I/O failure while hashing or persisting.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// An I/O error occurred while reading or writing a file.
    #[error("cache I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The lock file is not valid JSON or does not match the schema.
    #[error("failed to parse lock file {path}: {reason}")]
    LockParse {
        /// The lock file path.
        path: PathBuf,
        /// Description of the parse failure.
        reason: String,
    },

    /// The lock file declares a schema version this build does not read.
    #[error("unsupported lock file version in {path}: expected {expected}, got {found}")]
    UnsupportedVersion {
        /// The lock file path.
        path: PathBuf,
        /// The supported schema version.
        expected: String,
        /// The version found in the file.
        found: String,
    },

    /// An entry is filed under a folder group that disagrees with its `folder` field.
    #[error("entry '{key}' in {path} is grouped under '{group}' but records folder '{folder}'")]
    FolderMismatch {
        /// The lock file path.
        path: PathBuf,
        /// The entry key.
        key: String,
        /// The folder group the entry was found in.
        group: String,
        /// The folder recorded on the entry.
        folder: String,
    },

    /// The same relative path appears in more than one folder group.
    #[error("duplicate entry '{key}' in {path}")]
    DuplicateKey {
        /// The lock file path.
        path: PathBuf,
        /// The repeated key.
        key: String,
    },

    /// A serialization error occurred while writing the lock file.
    #[error("serialization error: {reason}")]
    Serialization {
        /// Description of the serialization failure.
        reason: String,
    },

    /// A background hashing task panicked or was cancelled.
    #[error("hashing task for {path} failed: {reason}")]
    HashTask {
        /// The file being hashed.
        path: PathBuf,
        /// Description of the task failure.
        reason: String,
    },
}
