//! Error types for encoding, per-file conversion and whole runs.

use std::path::PathBuf;

use webpsync_cache::CacheError;

/// Errors reported by an [`Encoder`](crate::Encoder).
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    /// Reading the source or writing the artifact failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// The file involved.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The image codec rejected the input or failed to encode it.
    #[error("codec error for {path}: {source}")]
    Codec {
        /// The source image.
        path: PathBuf,
        /// The underlying codec error.
        source: image::ImageError,
    },

    /// Any other encoder-specific failure.
    #[error("{0}")]
    Other(String),
}

/// Errors from converting a single file.
///
/// These never abort a run: the walker logs them and leaves the file out of
/// the new cache so it is retried next time.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    /// The encoder failed.
    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// The produced artifact could not be hashed.
    #[error(transparent)]
    Hash(#[from] CacheError),

    /// The blocking encode task panicked or was cancelled.
    #[error("encoder task for {path} failed: {reason}")]
    Task {
        /// The source image.
        path: PathBuf,
        /// Description of the task failure.
        reason: String,
    },

    /// The permit pool was closed.
    #[error("concurrency limiter closed")]
    LimiterClosed,
}

/// Fatal errors that stop a run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The input root is missing or not a directory.
    #[error("input directory {path} is not usable: {reason}")]
    InputRoot {
        /// The input root.
        path: PathBuf,
        /// Why it was rejected.
        reason: String,
    },

    /// The output root could not be created.
    #[error("failed to create output directory {path}: {source}")]
    OutputRoot {
        /// The output root.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Loading or saving the lock file failed.
    #[error(transparent)]
    Cache(#[from] CacheError),
}
