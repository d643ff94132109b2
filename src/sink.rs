//! Terminal stage: where finished windows go. The embedding service itself is external; this is
//! only the submission boundary and a few sinks.

use anyhow::{Context, Result};
use crossbeam_channel::Receiver;
use log::warn;
use serde::Serialize;
use std::collections::HashMap;
use std::io::Write;

use crate::types::SourcedWindow;

/// Submission interface of the external embedding service.
pub trait Embedder: Send + Sync {
    fn submit(&self, tokens: &[u32], attention_mask: &[u32]) -> Result<Vec<f32>>;
}

/// Consumer of the final queue.
pub trait WindowSink {
    fn accept(&mut self, item: SourcedWindow) -> Result<()>;

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Feed every window from `window_rx` to `sink` until the queue closes. Returns windows consumed.
pub fn drain<S: WindowSink + ?Sized>(window_rx: &Receiver<SourcedWindow>, sink: &mut S) -> Result<usize> {
    let mut n = 0;
    for item in window_rx.iter() {
        sink.accept(item)?;
        n += 1;
    }
    sink.flush()?;
    Ok(n)
}

/// Window count per source path.
#[derive(Debug, Default)]
pub struct CountingSink {
    pub per_source: HashMap<String, usize>,
    pub total: usize,
}

impl WindowSink for CountingSink {
    fn accept(&mut self, item: SourcedWindow) -> Result<()> {
        *self.per_source.entry(item.source.to_string()).or_default() += 1;
        self.total += 1;
        Ok(())
    }
}

#[derive(Serialize)]
struct JsonWindow<'a> {
    path: &'a str,
    tokens: &'a [u32],
    attention_mask: &'a [u32],
    segment_ids: &'a [u32],
    text: &'a str,
}

/// One JSON object per line.
pub struct JsonLinesSink<W: Write> {
    out: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> WindowSink for JsonLinesSink<W> {
    fn accept(&mut self, item: SourcedWindow) -> Result<()> {
        let w = &item.window;
        let row = JsonWindow {
            path: &item.source,
            tokens: &w.tokens,
            attention_mask: &w.attention_mask,
            segment_ids: &w.segment_ids,
            text: &w.decoded_text,
        };
        serde_json::to_writer(&mut self.out, &row).context("write window")?;
        self.out.write_all(b"\n").context("write window")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.out.flush().context("flush output")
    }
}

/// Submit each window to an [`Embedder`]. A failed submission is logged and counted; it does not
/// stop the run.
pub struct EmbedSink<E: Embedder> {
    embedder: E,
    pub embedded: Vec<(String, Vec<f32>)>,
    pub failures: usize,
}

impl<E: Embedder> EmbedSink<E> {
    pub fn new(embedder: E) -> Self {
        Self {
            embedder,
            embedded: Vec::new(),
            failures: 0,
        }
    }
}

impl<E: Embedder> WindowSink for EmbedSink<E> {
    fn accept(&mut self, item: SourcedWindow) -> Result<()> {
        let w = &item.window;
        match self.embedder.submit(&w.tokens, &w.attention_mask) {
            Ok(vec) => self.embedded.push((item.source.to_string(), vec)),
            Err(err) => {
                warn!("embed {}: {:#}", item.source, err);
                self.failures += 1;
            }
        }
        Ok(())
    }
}
