//! Shared foundational types used across the webpsync workspace.
//!
//! This crate provides the content digest used for change detection of source
//! images and converted artifacts.

#![warn(missing_docs)]

pub mod hash;

pub use hash::{ContentHash, ParseContentHashError, HASH_CHUNK_SIZE};
