//! Single-file conversion under the shared limiter.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};
use webpsync_cache::ContentHasher;
use webpsync_common::ContentHash;
use webpsync_config::EncoderOptions;

use crate::encoder::Encoder;
use crate::error::ConvertError;
use crate::limiter::ConcurrencyLimiter;

/// Runs the encoder for one file at a time per permit and hashes the result.
#[derive(Clone)]
pub struct ConversionWorker {
    encoder: Arc<dyn Encoder>,
    limiter: ConcurrencyLimiter,
    options: Arc<EncoderOptions>,
}

impl ConversionWorker {
    /// Creates a worker. Every clone shares `limiter`.
    pub fn new(
        encoder: Arc<dyn Encoder>,
        limiter: ConcurrencyLimiter,
        options: EncoderOptions,
    ) -> Self {
        Self {
            encoder,
            limiter,
            options: Arc::new(options),
        }
    }

    /// The limiter bounding this worker's conversions.
    pub fn limiter(&self) -> &ConcurrencyLimiter {
        &self.limiter
    }

    /// Converts `input` into `output` and returns the artifact's hash.
    ///
    /// Holds a limiter permit for the encode and the artifact hash; the permit
    /// is released on every path, including failures. Failures are logged
    /// here with their cause.
    pub async fn convert(&self, input: &Path, output: &Path) -> Result<ContentHash, ConvertError> {
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|_| ConvertError::LimiterClosed)?;

        let result = self.encode_and_hash(input, output).await;
        if let Err(e) = &result {
            warn!(input = %input.display(), error = %e, "conversion failed");
        }
        result
    }

    async fn encode_and_hash(
        &self,
        input: &Path,
        output: &Path,
    ) -> Result<ContentHash, ConvertError> {
        let encoder = self.encoder.clone();
        let options = self.options.clone();
        let (src, dst) = (input.to_path_buf(), output.to_path_buf());

        tokio::task::spawn_blocking(move || encoder.encode(&src, &dst, &options))
            .await
            .map_err(|e| ConvertError::Task {
                path: input.to_path_buf(),
                reason: e.to_string(),
            })??;

        let hash = ContentHasher::hash_file_async(output).await?;
        debug!(output = %output.display(), %hash, "artifact written");
        Ok(hash)
    }
}
