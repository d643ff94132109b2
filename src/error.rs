//! Typed errors. File-scoped kinds never leave the worker that hit them; root and usage kinds
//! end the run.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while building or driving a [`Chunker`](crate::chunk::Chunker). All file-scoped.
#[derive(Error, Debug)]
pub enum ChunkError {
    /// First bytes of the file contain a NUL byte.
    #[error("binary file")]
    Binary,

    /// Grammar, parser or query construction failed for a registered language.
    #[error("parse error: {0}")]
    Parse(String),

    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),
}

impl ChunkError {
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }
}

/// Fatal traversal failure: the root itself could not be opened or read.
#[derive(Error, Debug)]
pub enum WalkError {
    #[error("cannot read root {}: {source}", path.display())]
    Root {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Input argument misuse. Always fatal.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum UsageError {
    #[error("'-' (stdin) may only be given once")]
    StdinTwice,

    #[error("pipe not found: '-' given but stdin is a terminal")]
    StdinIsTerminal,

    #[error("no paths given and nothing piped on stdin")]
    NoInput,
}

/// Failure from the external subword encoder.
#[derive(Error, Debug)]
#[error("encoder: {0}")]
pub struct EncodeError(pub String);

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("stride must be greater than zero")]
    InvalidStride,

    #[error("overlap ({overlap}) must be smaller than stride ({stride})")]
    InvalidOverlap { stride: usize, overlap: usize },

    #[error("invalid exclude pattern {pattern:?}: {source}")]
    Exclude {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("cannot read {}: {source}", path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid {}: {source}", path.display())]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error(
        "no tokenizer configured (use --tokenizer, .softgrep.toml or SOFTGREP_TOKENIZER, or build with the embedded-vocab feature)"
    )]
    MissingTokenizer,
}
