//! Softgrep: ingestion front-end for local semantic code search.
//!
//! Walk roots (or piped stdin) → chunk each file (tree-sitter query matches, or overlapping byte
//! windows) → encode chunks into fixed-length `[CLS] … [SEP] [PAD]…` windows for an embedding model.

pub mod chunk;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod sink;
pub mod tokenize;
pub mod types;
pub mod utils;
pub mod walker;

/// Re-export types for API
pub use types::*;

use log::debug;
use std::sync::Arc;

use crate::pipeline::PipelineStats;
use crate::tokenize::Encoder;
use crate::utils::{CancelToken, Registry};
use crate::walker::Input;

/// Result alias used by public softgrep API
pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// Single entry point: run `inputs` through the whole pipeline with `opts` and return every
/// window together with the run report.
///
/// `encoder` is shared read-only by all window workers. Pass a [`CancelToken`] you keep a clone
/// of to be able to stop the run early; `None` runs to completion.
///
/// ```ignore
/// let encoder = Arc::new(softgrep::tokenize::HfEncoder::from_file(path)?);
/// let inputs = vec![softgrep::walker::Input::Root("src".into())];
/// let (windows, stats) = softgrep::ingest(inputs, &Opts::default(), encoder, None)?;
/// ```
pub fn ingest(
    inputs: Vec<Input>,
    opts: &Opts,
    encoder: Arc<dyn Encoder>,
    cancel: Option<CancelToken>,
) -> Result<(Vec<SourcedWindow>, PipelineStats)> {
    opts.validate()?;
    debug!(
        "{} CONFIG:{:#?}",
        env!("CARGO_PKG_NAME").to_uppercase(),
        opts
    );
    let registry = Arc::new(Registry::with_excludes(&opts.exclude)?);
    pipeline::collect_windows(
        inputs,
        opts,
        registry,
        encoder,
        cancel.unwrap_or_default(),
    )
}
