//! Recursive tree traversal with bottom-up cache merging.
//!
//! Each directory lists its entries, then drives one unit per matching file
//! and one recursive unit per subdirectory concurrently, and only returns once
//! all of them have finished. File units and directory listings hold a
//! traversal permit while they run, so the number of in-flight hashes and
//! listings is bounded no matter how wide the tree is. A directory never holds
//! a permit while it waits on its children, which keeps the cap deadlock-free.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use futures::future::{join_all, BoxFuture, FutureExt};
use tracing::{debug, error, info, warn};
use webpsync_cache::{folder_of, relative_key, CacheEntry, CacheMap, ContentHasher};

use crate::limiter::ConcurrencyLimiter;
use crate::worker::ConversionWorker;

/// Naming and limits for one walk.
#[derive(Debug, Clone)]
pub struct WalkerOptions {
    /// Root of the source tree; cache keys are relative to it.
    pub input_root: PathBuf,
    /// Root of the mirrored artifact tree.
    pub output_root: PathBuf,
    /// Extension of files to convert, without the dot.
    pub source_extension: String,
    /// Extension given to artifacts, without the dot.
    pub target_extension: String,
    /// Cap on file units and directory listings in flight.
    pub max_in_flight: usize,
}

/// Per-run counts of terminal file states.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Files whose cache entry was reused.
    pub skipped: usize,
    /// Files converted successfully.
    pub converted: usize,
    /// Files that could not be hashed or converted.
    pub failed: usize,
}

impl RunStats {
    /// Adds another subtree's counts to this one.
    pub fn merge(&mut self, other: RunStats) {
        self.skipped += other.skipped;
        self.converted += other.converted;
        self.failed += other.failed;
    }

    /// Total number of matching files seen.
    pub fn total(&self) -> usize {
        self.skipped + self.converted + self.failed
    }
}

/// The merged cache and counts for a subtree.
#[derive(Debug, Default)]
pub struct WalkResult {
    /// New cache entries for every skipped or converted file in the subtree.
    pub entries: CacheMap,
    /// Terminal state counts.
    pub stats: RunStats,
}

impl WalkResult {
    fn merge(&mut self, child: WalkResult) {
        self.entries.extend(child.entries);
        self.stats.merge(child.stats);
    }
}

/// Terminal state of one file.
enum FileOutcome {
    Skipped(String, CacheEntry),
    Converted(String, CacheEntry),
    Failed,
}

/// Immediate children of one directory.
#[derive(Default)]
struct Listing {
    files: Vec<PathBuf>,
    dirs: Vec<PathBuf>,
}

/// Walks an input tree against the previous run's cache.
pub struct TreeWalker {
    options: WalkerOptions,
    previous: Arc<CacheMap>,
    worker: ConversionWorker,
    traversal: ConcurrencyLimiter,
}

impl TreeWalker {
    /// Creates a walker. `previous` is only read, never modified.
    pub fn new(options: WalkerOptions, previous: CacheMap, worker: ConversionWorker) -> Self {
        let traversal = ConcurrencyLimiter::new(options.max_in_flight);
        Self {
            options,
            previous: Arc::new(previous),
            worker,
            traversal,
        }
    }

    /// Processes the whole tree and returns the new cache.
    ///
    /// If the output root lies inside the input root it is left out of the
    /// walk.
    pub async fn walk(&self) -> WalkResult {
        let skip_dir = nested_output_root(&self.options.input_root, &self.options.output_root).await;
        self.walk_dir(
            self.options.input_root.clone(),
            self.options.output_root.clone(),
            skip_dir.as_deref(),
        )
        .await
    }

    fn walk_dir<'a>(
        &'a self,
        input_dir: PathBuf,
        output_dir: PathBuf,
        skip_dir: Option<&'a Path>,
    ) -> BoxFuture<'a, WalkResult> {
        async move {
            if let Err(e) = tokio::fs::create_dir_all(&output_dir).await {
                error!(dir = %output_dir.display(), error = %e, "failed to create output directory");
            }

            let listing = match self.traversal.acquire().await {
                Ok(_permit) => self.list_dir(&input_dir, skip_dir).await,
                Err(_) => Listing::default(),
            };
            debug!(
                dir = %input_dir.display(),
                files = listing.files.len(),
                dirs = listing.dirs.len(),
                "listed directory"
            );

            let files = listing
                .files
                .into_iter()
                .map(|file| self.process_file(file, &output_dir));
            let subdirs = listing.dirs.into_iter().map(|dir| {
                let out = match dir.file_name() {
                    Some(name) => output_dir.join(name),
                    None => output_dir.clone(),
                };
                self.walk_dir(dir, out, skip_dir)
            });

            let (outcomes, children) = futures::join!(join_all(files), join_all(subdirs));

            let mut result = WalkResult::default();
            for outcome in outcomes {
                match outcome {
                    FileOutcome::Skipped(key, entry) => {
                        result.stats.skipped += 1;
                        result.entries.insert(key, entry);
                    }
                    FileOutcome::Converted(key, entry) => {
                        result.stats.converted += 1;
                        result.entries.insert(key, entry);
                    }
                    FileOutcome::Failed => result.stats.failed += 1,
                }
            }
            for child in children {
                result.merge(child);
            }
            result
        }
        .boxed()
    }

    /// Splits a directory into matching files and subdirectories.
    ///
    /// Symlinked files are followed; symlinked directories are not, so a link
    /// cycle cannot recurse forever.
    async fn list_dir(&self, dir: &Path, skip_dir: Option<&Path>) -> Listing {
        let mut listing = Listing::default();
        let mut read_dir = match tokio::fs::read_dir(dir).await {
            Ok(rd) => rd,
            Err(e) => {
                error!(dir = %dir.display(), error = %e, "failed to read directory");
                return listing;
            }
        };

        loop {
            let entry = match read_dir.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    error!(dir = %dir.display(), error = %e, "failed to read directory entry");
                    break;
                }
            };
            let path = entry.path();
            let file_type = match entry.file_type().await {
                Ok(ft) => ft,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "cannot stat entry, skipping");
                    continue;
                }
            };

            if file_type.is_dir() {
                if is_same_dir(&path, skip_dir).await {
                    debug!(dir = %path.display(), "skipping output directory");
                    continue;
                }
                listing.dirs.push(path);
            } else if self.is_source_file(&path) {
                let is_file = if file_type.is_symlink() {
                    tokio::fs::metadata(&path)
                        .await
                        .map(|m| m.is_file())
                        .unwrap_or(false)
                } else {
                    file_type.is_file()
                };
                if is_file {
                    listing.files.push(path);
                }
            }
        }

        listing.files.sort();
        listing.dirs.sort();
        listing
    }

    fn is_source_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext == self.options.source_extension)
    }

    /// Runs the per-file state machine:
    /// hash → reuse a valid entry, or convert → new entry / failure.
    async fn process_file(&self, input: PathBuf, output_dir: &Path) -> FileOutcome {
        let Ok(_permit) = self.traversal.acquire().await else {
            return FileOutcome::Failed;
        };

        let relative = input
            .strip_prefix(&self.options.input_root)
            .unwrap_or(&input);
        let key = relative_key(relative);
        let folder = folder_of(&key).to_string();
        let original_name = file_name_of(&input);
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let converted_name = format!("{stem}.{}", self.options.target_extension);
        let artifact = output_dir.join(&converted_name);

        let input_hash = match ContentHasher::hash_file_async(&input).await {
            Ok(hash) => hash,
            Err(e) => {
                error!(folder = %folder, file = %original_name, error = %e, "failed to hash source file");
                return FileOutcome::Failed;
            }
        };

        if let Some(cached) = self.previous.get(&key) {
            let artifact_exists = tokio::fs::try_exists(&artifact).await.unwrap_or(false);
            if cached.is_valid(&input_hash, artifact_exists) {
                info!(folder = %folder, file = %original_name, "skipping, already converted and unchanged");
                return FileOutcome::Skipped(key, cached.clone());
            }
        }

        info!(folder = %folder, file = %original_name, "converting");
        match self.worker.convert(&input, &artifact).await {
            Ok(output_hash) => {
                info!(folder = %folder, file = %original_name, "converted");
                let entry = CacheEntry {
                    input_hash,
                    output_hash,
                    folder,
                    original_name,
                    converted_name,
                    last_conversion: Utc::now(),
                };
                FileOutcome::Converted(key, entry)
            }
            Err(_) => {
                error!(folder = %folder, file = %original_name, "failed to convert");
                FileOutcome::Failed
            }
        }
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Returns the canonical output root if it sits inside the input root.
async fn nested_output_root(input_root: &Path, output_root: &Path) -> Option<PathBuf> {
    let input = tokio::fs::canonicalize(input_root).await.ok()?;
    let output = tokio::fs::canonicalize(output_root).await.ok()?;
    (output != input && output.starts_with(&input)).then_some(output)
}

async fn is_same_dir(dir: &Path, skip_dir: Option<&Path>) -> bool {
    match skip_dir {
        Some(skip) => tokio::fs::canonicalize(dir)
            .await
            .is_ok_and(|canonical| canonical == skip),
        None => false,
    }
}
