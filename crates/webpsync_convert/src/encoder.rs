//! The encoder seam and the shipped WebP implementation.

use std::path::Path;

use webp::WebPConfig;
use webpsync_config::EncoderOptions;

use crate::error::EncodeError;

/// Converts one source file into one artifact.
///
/// Implementations are synchronous and may be slow; the pipeline always calls
/// them from tokio's blocking pool. `options` is passed through exactly as
/// configured.
pub trait Encoder: Send + Sync + 'static {
    /// Reads `input` and writes the converted artifact to `output`.
    fn encode(
        &self,
        input: &Path,
        output: &Path,
        options: &EncoderOptions,
    ) -> Result<(), EncodeError>;
}

/// PNG → WebP encoder.
///
/// Decodes the source with `image` and encodes through libwebp, so every
/// [`EncoderOptions`] field reaches the codec.
#[derive(Debug, Default, Clone, Copy)]
pub struct WebpEncoder;

impl Encoder for WebpEncoder {
    fn encode(
        &self,
        input: &Path,
        output: &Path,
        options: &EncoderOptions,
    ) -> Result<(), EncodeError> {
        let img = image::open(input).map_err(|source| EncodeError::Codec {
            path: input.to_path_buf(),
            source,
        })?;
        let config = webp_config(options)?;

        let (width, height) = (img.width(), img.height());
        let encoded = if img.color().has_alpha() {
            let rgba = img.to_rgba8();
            webp::Encoder::from_rgba(rgba.as_raw(), width, height).encode_advanced(&config)
        } else {
            let rgb = img.to_rgb8();
            webp::Encoder::from_rgb(rgb.as_raw(), width, height).encode_advanced(&config)
        };
        let memory = encoded.map_err(|e| {
            EncodeError::Other(format!("libwebp failed to encode {}: {e:?}", input.display()))
        })?;

        // Only touch the artifact once encoding has fully succeeded.
        std::fs::write(output, &*memory).map_err(|source| EncodeError::Io {
            path: output.to_path_buf(),
            source,
        })
    }
}

/// Maps the configured options onto a libwebp configuration.
///
/// `minimize_size` raises the entropy-analysis passes to libwebp's maximum.
fn webp_config(options: &EncoderOptions) -> Result<WebPConfig, EncodeError> {
    let mut config = WebPConfig::new()
        .map_err(|_| EncodeError::Other("libwebp rejected its default configuration".to_string()))?;
    config.lossless = i32::from(options.lossless);
    config.quality = f32::from(options.quality);
    config.method = i32::from(options.method);
    config.exact = i32::from(options.exact);
    config.alpha_quality = i32::from(options.alpha_quality);
    if options.minimize_size {
        config.pass = 10;
    }
    Ok(config)
}
