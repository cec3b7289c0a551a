//! Top-level load → walk → save orchestration.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;
use webpsync_cache::CacheStore;
use webpsync_config::ConvertConfig;

use crate::encoder::{Encoder, WebpEncoder};
use crate::error::PipelineError;
use crate::limiter::ConcurrencyLimiter;
use crate::walker::{RunStats, TreeWalker, WalkerOptions};
use crate::worker::ConversionWorker;

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Terminal state counts.
    pub stats: RunStats,
    /// Number of entries written to the lock file.
    pub total_entries: usize,
    /// Where the lock file was written.
    pub lock_path: PathBuf,
}

/// A configured conversion pipeline.
pub struct Pipeline {
    config: ConvertConfig,
    encoder: Arc<dyn Encoder>,
}

impl Pipeline {
    /// Creates a pipeline around a custom encoder.
    pub fn new(config: ConvertConfig, encoder: Arc<dyn Encoder>) -> Self {
        Self { config, encoder }
    }

    /// Creates a pipeline using the built-in [`WebpEncoder`].
    pub fn with_webp(config: ConvertConfig) -> Self {
        Self::new(config, Arc::new(WebpEncoder))
    }

    /// The active configuration.
    pub fn config(&self) -> &ConvertConfig {
        &self.config
    }

    /// Converts `input_root` into `output_root` and rewrites the lock file.
    ///
    /// Per-file failures are counted in the report, not returned as errors.
    /// Errors are reserved for an unusable input root, an output root that
    /// cannot be created, and lock file load/save failures. A malformed lock
    /// file stops the run before any conversion happens.
    pub async fn run(&self, input_root: &Path, output_root: &Path) -> Result<RunReport, PipelineError> {
        check_input_root(input_root).await?;
        tokio::fs::create_dir_all(output_root)
            .await
            .map_err(|source| PipelineError::OutputRoot {
                path: output_root.to_path_buf(),
                source,
            })?;

        let pipeline = &self.config.pipeline;
        let store = CacheStore::open(output_root.join(&pipeline.lock_file));
        let previous = store.load().await?;
        info!(
            input = %input_root.display(),
            output = %output_root.display(),
            cached = previous.len(),
            "starting conversion"
        );

        let worker = ConversionWorker::new(
            self.encoder.clone(),
            ConcurrencyLimiter::new(pipeline.max_concurrent_conversions),
            self.config.encoder.clone(),
        );
        let walker = TreeWalker::new(
            WalkerOptions {
                input_root: input_root.to_path_buf(),
                output_root: output_root.to_path_buf(),
                source_extension: pipeline.source_extension.clone(),
                target_extension: pipeline.target_extension.clone(),
                max_in_flight: pipeline.max_in_flight,
            },
            previous,
            worker,
        );
        let result = walker.walk().await;

        let metadata = store.save(&result.entries).await?;
        info!(
            converted = result.stats.converted,
            skipped = result.stats.skipped,
            failed = result.stats.failed,
            "conversion process completed"
        );

        Ok(RunReport {
            stats: result.stats,
            total_entries: metadata.total_files,
            lock_path: store.path().to_path_buf(),
        })
    }
}

async fn check_input_root(path: &Path) -> Result<(), PipelineError> {
    let reject = |reason: String| PipelineError::InputRoot {
        path: path.to_path_buf(),
        reason,
    };
    let meta = tokio::fs::metadata(path)
        .await
        .map_err(|e| reject(e.to_string()))?;
    if !meta.is_dir() {
        return Err(reject("not a directory".to_string()));
    }
    Ok(())
}
