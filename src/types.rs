//! Public and internal types for the softgrep API and pipeline.

use serde::Serialize;
use std::fmt;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::ConfigError;
use crate::utils::config::{ChunkConsts, default_workers};

/// Path shown for piped input.
pub const STDIN_PATH: &str = "-";

/// One discovered input. Owned by the walker until sent, then by exactly one chunk worker,
/// which drops (closes) `content` when done.
pub struct FileEntry {
    /// Filesystem path, or `-` for stdin.
    pub path: Arc<str>,
    pub content: Box<dyn Read + Send>,
    /// Registered language name, if the path matched one.
    pub language: Option<&'static str>,
}

impl FileEntry {
    pub fn new(path: impl Into<Arc<str>>, content: Box<dyn Read + Send>) -> Self {
        Self {
            path: path.into(),
            content,
            language: None,
        }
    }
}

impl fmt::Debug for FileEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileEntry")
            .field("path", &self.path)
            .field("language", &self.language)
            .finish_non_exhaustive()
    }
}

/// Text of one chunk, tagged with the file it came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chunk {
    pub source: Arc<str>,
    pub text: String,
}

/// Fixed-length model input. `tokens[0]` is CLS, the last unmasked slot is SEP, the rest is PAD.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TokenWindow {
    pub tokens: Vec<u32>,
    pub segment_ids: Vec<u32>,
    pub attention_mask: Vec<u32>,
    /// Decoded text of the real tokens (CLS/SEP/PAD stripped).
    pub decoded_text: String,
}

impl TokenWindow {
    /// Number of unmasked positions (real tokens + CLS + SEP).
    pub fn real_len(&self) -> usize {
        self.attention_mask.iter().filter(|&&m| m == 1).count()
    }
}

/// A window on the final queue, with the file it was derived from.
#[derive(Clone, Debug)]
pub struct SourcedWindow {
    pub source: Arc<str>,
    pub window: TokenWindow,
}

/// Strided chunking parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkOpts {
    /// Window size in bytes.
    pub stride: usize,
    /// Bytes shared with the previous window. Must be smaller than `stride`.
    pub overlap: usize,
}

impl Default for ChunkOpts {
    fn default() -> Self {
        Self {
            stride: ChunkConsts::DEFAULT_STRIDE,
            overlap: ChunkConsts::DEFAULT_OVERLAP,
        }
    }
}

impl ChunkOpts {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stride == 0 {
            return Err(ConfigError::InvalidStride);
        }
        if self.overlap >= self.stride {
            return Err(ConfigError::InvalidOverlap {
                stride: self.stride,
                overlap: self.overlap,
            });
        }
        Ok(())
    }
}

/// Full options (CLI, config file and lib callers).
#[derive(Clone, Debug)]
pub struct Opts {
    pub chunk: ChunkOpts,
    /// Workers per stage. When None, [`default_workers`].
    pub workers: Option<usize>,
    /// `tokenizer.json` for the subword encoder.
    pub tokenizer: Option<PathBuf>,
    /// Follow symbolic links while walking.
    pub follow_links: bool,
    /// Extra exclude regexes, matched against the full path.
    pub exclude: Vec<String>,
    pub verbose: bool,
    /// Write windows as JSON lines to stdout.
    pub json: bool,
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            chunk: ChunkOpts::default(),
            workers: None,
            tokenizer: None,
            follow_links: true,
            exclude: Vec::new(),
            verbose: false,
            json: false,
        }
    }
}

impl Opts {
    pub fn num_workers(&self) -> usize {
        self.workers.unwrap_or_else(default_workers).max(1)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.chunk.validate()
    }
}
