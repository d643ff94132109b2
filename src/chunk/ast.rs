//! Syntax-aware chunking: one chunk per query match, in document order.

use std::collections::VecDeque;
use std::iter::FusedIterator;
use std::ops::Range;
use streaming_iterator::StreamingIterator;
use tree_sitter::{Parser, Query, QueryCursor};

use crate::chunk::language::Grammar;
use crate::error::ChunkError;

/// Chunks produced from tree-sitter query matches. Each chunk is the concatenated text of the
/// match's captures.
pub struct AstChunker {
    bytes: Vec<u8>,
    matches: VecDeque<Vec<Range<usize>>>,
}

impl AstChunker {
    /// Parse `bytes` with `grammar` and run `query` over the whole tree.
    pub fn new(bytes: Vec<u8>, grammar: Grammar, query: &str) -> Result<Self, ChunkError> {
        let language = grammar.tree_sitter_language();
        let mut parser = Parser::new();
        parser
            .set_language(&language)
            .map_err(|e| ChunkError::parse(format!("{} grammar: {e}", grammar.as_str())))?;
        let tree = parser
            .parse(&bytes, None)
            .ok_or_else(|| ChunkError::parse(format!("{} parser returned no tree", grammar.as_str())))?;
        let query = Query::new(&language, query)
            .map_err(|e| ChunkError::parse(format!("{} query: {e}", grammar.as_str())))?;

        let matches = {
            let mut cursor = QueryCursor::new();
            let mut found: VecDeque<Vec<Range<usize>>> = VecDeque::new();
            let mut iter = cursor.matches(&query, tree.root_node(), bytes.as_slice());
            while let Some(m) = iter.next() {
                found.push_back(m.captures.iter().map(|c| c.node.byte_range()).collect());
            }
            found
        };

        Ok(Self { bytes, matches })
    }

    /// Matches not yet returned.
    pub fn remaining(&self) -> usize {
        self.matches.len()
    }
}

impl Iterator for AstChunker {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let captures = self.matches.pop_front()?;
        let mut text = String::new();
        for range in captures {
            text.push_str(&String::from_utf8_lossy(&self.bytes[range]));
        }
        Some(text)
    }
}

impl FusedIterator for AstChunker {}
