//! Incremental PNG → WebP conversion pipeline.
//!
//! Walks an input tree, hashes every matching source file, reuses cache
//! entries whose source is unchanged and whose artifact still exists, and
//! converts the rest through an [`Encoder`] under a tree-wide
//! [`ConcurrencyLimiter`]. [`Pipeline::run`] drives the whole
//! load → walk → save sequence.

#![warn(missing_docs)]

pub mod encoder;
pub mod error;
pub mod limiter;
pub mod pipeline;
pub mod walker;
pub mod worker;

pub use encoder::{Encoder, WebpEncoder};
pub use error::{ConvertError, EncodeError, PipelineError};
pub use limiter::{ConcurrencyLimiter, Permit};
pub use pipeline::{Pipeline, RunReport};
pub use walker::{RunStats, TreeWalker, WalkResult, WalkerOptions};
pub use worker::ConversionWorker;
