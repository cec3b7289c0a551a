//! Configuration types deserialized from `webpsync.toml`.

use serde::{Deserialize, Serialize};

/// Default number of conversions allowed to run at the same time.
pub const DEFAULT_MAX_CONCURRENT_CONVERSIONS: usize = 5;

/// Default number of file units and directory listings in flight at once.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 32;

/// Default name of the lock file written at the output root.
pub const DEFAULT_LOCK_FILE: &str = "conversion.lock";

/// The top-level configuration parsed from `webpsync.toml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConvertConfig {
    /// Options handed unmodified to the encoder.
    #[serde(default)]
    pub encoder: EncoderOptions,
    /// Concurrency limits and file naming for the pipeline.
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// Format-specific knobs for the WebP encoder.
///
/// The pipeline treats this as an opaque bundle: it never inspects the
/// values, only passes them through to the encoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EncoderOptions {
    /// Lossy quality level, 0–100.
    pub quality: u8,
    /// Compression effort, 0 (fast) to 6 (slowest, smallest).
    pub method: u8,
    /// Encode losslessly.
    pub lossless: bool,
    /// Preserve RGB values under fully transparent pixels.
    pub exact: bool,
    /// Spend extra effort minimizing output size.
    pub minimize_size: bool,
    /// Quality of the alpha channel, 0–100.
    pub alpha_quality: u8,
}

impl Default for EncoderOptions {
    fn default() -> Self {
        Self {
            quality: 85,
            method: 6,
            lossless: false,
            exact: true,
            minimize_size: true,
            alpha_quality: 90,
        }
    }
}

/// Pipeline limits and the fixed source/target file naming.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Maximum number of encode operations running at once, tree-wide.
    pub max_concurrent_conversions: usize,
    /// Maximum number of file units and directory listings in flight at once.
    pub max_in_flight: usize,
    /// Extension (without the dot) of source files to convert.
    pub source_extension: String,
    /// Extension (without the dot) given to converted artifacts.
    pub target_extension: String,
    /// File name of the lock file at the output root.
    pub lock_file: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_conversions: DEFAULT_MAX_CONCURRENT_CONVERSIONS,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            source_extension: "png".to_string(),
            target_extension: "webp".to_string(),
            lock_file: DEFAULT_LOCK_FILE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoder_defaults() {
        let opts = EncoderOptions::default();
        assert_eq!(opts.quality, 85);
        assert_eq!(opts.method, 6);
        assert!(!opts.lossless);
        assert!(opts.exact);
        assert!(opts.minimize_size);
        assert_eq!(opts.alpha_quality, 90);
    }

    #[test]
    fn pipeline_defaults() {
        let p = PipelineConfig::default();
        assert_eq!(p.max_concurrent_conversions, 5);
        assert_eq!(p.max_in_flight, 32);
        assert_eq!(p.source_extension, "png");
        assert_eq!(p.target_extension, "webp");
        assert_eq!(p.lock_file, "conversion.lock");
    }

    #[test]
    fn partial_encoder_section_keeps_other_defaults() {
        let config: ConvertConfig = toml::from_str("[encoder]\nquality = 60\n").unwrap();
        assert_eq!(config.encoder.quality, 60);
        assert_eq!(config.encoder.method, 6);
        assert_eq!(config.pipeline, PipelineConfig::default());
    }
}
