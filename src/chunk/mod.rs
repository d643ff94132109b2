//! Chunking: split one file's content into an ordered, finite sequence of chunk texts.
//!
//! Files whose name matches a registered grammar are chunked by tree-sitter query matches; all
//! others (and languages registered as strided) fall back to overlapping byte windows.

pub mod ast;
pub mod language;
pub mod strided;

use log::debug;
use std::io::Read;
use std::iter::FusedIterator;

use crate::engine::tools::is_binary;
use crate::error::ChunkError;
use crate::types::ChunkOpts;
use crate::utils::config::Registry;

pub use ast::AstChunker;
pub use language::{Grammar, LanguageSpec};
pub use strided::StridedChunker;

/// Chunk sequence for one file. Once exhausted, every further call returns `None`.
pub enum Chunker {
    Ast(AstChunker),
    Strided(StridedChunker),
}

impl Chunker {
    /// Read `reader` to the end and pick a strategy for `filename`.
    ///
    /// Re-checks for binary content so the chunker can be used without the walker.
    pub fn new<R: Read>(
        filename: &str,
        mut reader: R,
        opts: &ChunkOpts,
        registry: &Registry,
    ) -> Result<Self, ChunkError> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Self::from_bytes(filename, bytes, opts, registry)
    }

    /// Pick a strategy by looking `filename` up in `registry`.
    pub fn from_bytes(
        filename: &str,
        bytes: Vec<u8>,
        opts: &ChunkOpts,
        registry: &Registry,
    ) -> Result<Self, ChunkError> {
        Self::with_language(filename, bytes, registry.language_for(filename), opts)
    }

    /// Build for a language that was already detected (by the walker); `None` means strided.
    pub fn with_language(
        filename: &str,
        bytes: Vec<u8>,
        lang: Option<&LanguageSpec>,
        opts: &ChunkOpts,
    ) -> Result<Self, ChunkError> {
        if is_binary(&bytes) {
            return Err(ChunkError::Binary);
        }

        match lang.and_then(|l| l.ast_grammar().map(|g| (l, g))) {
            Some((lang, grammar)) => {
                let chunker = AstChunker::new(bytes, grammar, lang.query)?;
                if chunker.remaining() == 0 {
                    debug!("{}: no {} query matches, no chunks", filename, lang.name);
                }
                Ok(Chunker::Ast(chunker))
            }
            None => Ok(Chunker::Strided(StridedChunker::new(bytes, opts))),
        }
    }

    pub fn is_strided(&self) -> bool {
        matches!(self, Chunker::Strided(_))
    }
}

impl Iterator for Chunker {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        match self {
            Chunker::Ast(c) => c.next(),
            Chunker::Strided(c) => c.next(),
        }
    }
}

impl FusedIterator for Chunker {}
