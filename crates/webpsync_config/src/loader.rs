//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::{ConvertConfig, EncoderOptions, PipelineConfig};
use std::path::Path;

/// Name of the configuration file looked up in a directory.
pub const CONFIG_FILE: &str = "webpsync.toml";

/// Loads `<dir>/webpsync.toml` if it exists, otherwise returns the defaults.
pub fn load_config(dir: &Path) -> Result<ConvertConfig, ConfigError> {
    let config_path = dir.join(CONFIG_FILE);
    if !config_path.is_file() {
        return Ok(ConvertConfig::default());
    }
    load_config_file(&config_path)
}

/// Loads and validates a configuration from an explicit file path.
///
/// Unlike [`load_config`], a missing file is an error.
pub fn load_config_file(path: &Path) -> Result<ConvertConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Parses and validates a `webpsync.toml` configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<ConvertConfig, ConfigError> {
    let config: ConvertConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Checks value ranges and naming constraints.
pub fn validate_config(config: &ConvertConfig) -> Result<(), ConfigError> {
    validate_encoder(&config.encoder)?;
    validate_pipeline(&config.pipeline)
}

fn validate_encoder(opts: &EncoderOptions) -> Result<(), ConfigError> {
    if opts.quality > 100 {
        return Err(invalid(format!(
            "encoder.quality must be 0-100, got {}",
            opts.quality
        )));
    }
    if opts.method > 6 {
        return Err(invalid(format!(
            "encoder.method must be 0-6, got {}",
            opts.method
        )));
    }
    if opts.alpha_quality > 100 {
        return Err(invalid(format!(
            "encoder.alpha_quality must be 0-100, got {}",
            opts.alpha_quality
        )));
    }
    Ok(())
}

fn validate_pipeline(p: &PipelineConfig) -> Result<(), ConfigError> {
    if p.max_concurrent_conversions == 0 {
        return Err(invalid("pipeline.max_concurrent_conversions must be at least 1"));
    }
    if p.max_in_flight == 0 {
        return Err(invalid("pipeline.max_in_flight must be at least 1"));
    }
    for (field, ext) in [
        ("source_extension", &p.source_extension),
        ("target_extension", &p.target_extension),
    ] {
        if ext.is_empty() || ext.contains(['.', '/', '\\']) {
            return Err(invalid(format!(
                "pipeline.{field} must be a bare extension like \"png\", got {ext:?}"
            )));
        }
    }
    if p.source_extension == p.target_extension {
        return Err(invalid(
            "pipeline.source_extension and pipeline.target_extension must differ",
        ));
    }
    if p.lock_file.is_empty() || p.lock_file.contains(['/', '\\']) {
        return Err(invalid(format!(
            "pipeline.lock_file must be a plain file name, got {:?}",
            p.lock_file
        )));
    }
    Ok(())
}

fn invalid(msg: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError(msg.into())
}
