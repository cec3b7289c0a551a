//! Incremental conversion cache management.
//!
//! This crate provides content-hash-based change detection for source images
//! and the persisted lock file that records every successful conversion, so
//! unchanged files can be skipped on the next run.
//!
//! In memory the cache is one flat [`CacheMap`] keyed by the file's path
//! relative to the input root. The folder-nested layout of the lock file is a
//! serialization detail handled entirely by [`LockFile`].

#![warn(missing_docs)]

pub mod entry;
pub mod error;
pub mod hasher;
pub mod lockfile;
pub mod store;
pub mod timestamp;

pub use entry::{folder_of, relative_key, CacheEntry, CacheMap, ROOT_FOLDER};
pub use error::CacheError;
pub use hasher::ContentHasher;
pub use lockfile::{LockFile, LockMetadata, LOCK_VERSION};
pub use store::CacheStore;
