//! Byte-window chunking for files with no usable grammar.

use std::iter::FusedIterator;
use std::ops::Range;

use crate::types::ChunkOpts;

/// Fixed-size byte windows with `overlap` bytes shared between neighbours.
///
/// First window is `[0, min(stride, len))`; each next one starts `overlap` bytes before the previous
/// end. The window whose end reaches `len` is the last. Empty content still yields one empty window.
pub struct StridedChunker {
    bytes: Vec<u8>,
    stride: usize,
    overlap: usize,
    prev_end: Option<usize>,
    done: bool,
}

impl StridedChunker {
    pub fn new(bytes: Vec<u8>, opts: &ChunkOpts) -> Self {
        Self {
            bytes,
            stride: opts.stride.max(1),
            overlap: opts.overlap.min(opts.stride.saturating_sub(1)),
            prev_end: None,
            done: false,
        }
    }

    /// Byte range of the next window, or None once the end of content has been covered.
    pub fn next_range(&mut self) -> Option<Range<usize>> {
        if self.done {
            return None;
        }
        let len = self.bytes.len();
        let start = match self.prev_end {
            None => 0,
            Some(end) => end.saturating_sub(self.overlap),
        };
        let end = (start + self.stride).min(len);
        self.prev_end = Some(end);
        if end == len {
            self.done = true;
        }
        Some(start..end)
    }
}

impl Iterator for StridedChunker {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let range = self.next_range()?;
        Some(String::from_utf8_lossy(&self.bytes[range]).into_owned())
    }
}

impl FusedIterator for StridedChunker {}
