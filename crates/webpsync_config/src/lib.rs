//! Parsing and validation of `webpsync.toml` configuration files.
//!
//! This crate reads the optional configuration file and produces a
//! strongly-typed [`ConvertConfig`] holding the encoder options and the
//! pipeline limits. Every field has a default, so an empty file (or no file
//! at all) yields a usable configuration.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_file, load_config_from_str, validate_config, CONFIG_FILE};
pub use types::*;
