//! Chunk and window workers. Each item is processed behind a panic boundary: a failure is logged
//! with worker id and path, recorded, and the worker moves on to the next item.

use crossbeam_channel::{Receiver, Sender};
use log::{debug, warn};
use std::any::Any;
use std::io::Read;
use std::ops::ControlFlow;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use super::context::{Counters, PipelineContext};
use super::queue;
use crate::chunk::Chunker;
use crate::error::{ChunkError, EncodeError};
use crate::tokenize::Windower;
use crate::types::{Chunk, FileEntry, SourcedWindow};

/// Chunk worker: FileEntry in, chunk texts out.
pub fn chunk_worker_loop(
    id: usize,
    file_rx: Receiver<FileEntry>,
    chunk_tx: Sender<Chunk>,
    ctx: Arc<PipelineContext>,
) {
    while let Some(entry) = queue::recv(&file_rx, &ctx.cancel) {
        let path = Arc::clone(&entry.path);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| chunk_file(entry, &chunk_tx, &ctx)));
        match outcome {
            Ok(Ok(ControlFlow::Continue(()))) => Counters::bump(&ctx.counters.chunked_files),
            Ok(Ok(ControlFlow::Break(()))) => break,
            Ok(Err(ChunkError::Binary)) => {
                debug!("chunk-{id}: binary, skipped: {path}");
                Counters::bump(&ctx.counters.binary);
            }
            Ok(Err(err)) => {
                warn!("chunk-{id}: {path}: {err}");
                ctx.counters.record_failure(&path, err.to_string());
            }
            Err(payload) => {
                let msg = panic_message(payload.as_ref());
                warn!("chunk-{id}: panicked on {path}: {msg}");
                ctx.counters.record_failure(&path, format!("panic: {msg}"));
            }
        }
    }
    debug!("chunk-{id}: input closed, exiting");
}

/// Chunk one file and push every chunk downstream, in order. The file handle is released as soon
/// as its content has been read. The language is the one the walker detected; none means strided.
pub fn chunk_file(
    entry: FileEntry,
    chunk_tx: &Sender<Chunk>,
    ctx: &PipelineContext,
) -> Result<ControlFlow<()>, ChunkError> {
    let FileEntry {
        path,
        mut content,
        language,
    } = entry;
    let mut bytes = Vec::new();
    content.read_to_end(&mut bytes)?;
    drop(content);

    let lang = language.and_then(|name| ctx.registry.language_named(name));
    let chunker = Chunker::with_language(&path, bytes, lang, &ctx.chunk_opts)?;
    for text in chunker {
        let chunk = Chunk {
            source: Arc::clone(&path),
            text,
        };
        if queue::send(chunk_tx, chunk, &ctx.cancel).is_err() {
            return Ok(ControlFlow::Break(()));
        }
        Counters::bump(&ctx.counters.chunks);
    }
    Ok(ControlFlow::Continue(()))
}

/// Window worker: chunk text in, token windows out.
pub fn window_worker_loop(
    id: usize,
    chunk_rx: Receiver<Chunk>,
    window_tx: Sender<SourcedWindow>,
    ctx: Arc<PipelineContext>,
) {
    while let Some(chunk) = queue::recv(&chunk_rx, &ctx.cancel) {
        let source = Arc::clone(&chunk.source);
        let outcome =
            panic::catch_unwind(AssertUnwindSafe(|| window_chunk(chunk, &window_tx, &ctx)));
        match outcome {
            Ok(Ok(ControlFlow::Continue(()))) => {}
            Ok(Ok(ControlFlow::Break(()))) => break,
            Ok(Err(err)) => {
                warn!("window-{id}: {source}: {err}");
                ctx.counters.record_failure(&source, err.to_string());
            }
            Err(payload) => {
                let msg = panic_message(payload.as_ref());
                warn!("window-{id}: panicked on {source}: {msg}");
                ctx.counters.record_failure(&source, format!("panic: {msg}"));
            }
        }
    }
    debug!("window-{id}: input closed, exiting");
}

/// Encode one chunk and push all of its windows downstream, in order. A window that fails to
/// decode is recorded and skipped; the rest of the chunk still goes through.
pub fn window_chunk(
    chunk: Chunk,
    window_tx: &Sender<SourcedWindow>,
    ctx: &PipelineContext,
) -> Result<ControlFlow<()>, EncodeError> {
    let windower = Windower::new(&chunk.text, Arc::clone(&ctx.encoder))?;
    for window in windower.windows() {
        let window = match window {
            Ok(window) => window,
            Err(err) => {
                ctx.counters.record_failure(&chunk.source, err.to_string());
                continue;
            }
        };
        let item = SourcedWindow {
            source: Arc::clone(&chunk.source),
            window,
        };
        if queue::send(window_tx, item, &ctx.cancel).is_err() {
            return Ok(ControlFlow::Break(()));
        }
        Counters::bump(&ctx.counters.windows);
    }
    Ok(ControlFlow::Continue(()))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
