//! Pipeline context: shared read-only state for the workers, counters and the stage channels.

use crossbeam_channel::{Receiver, Sender};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::pipeline::queue::queue;
use crate::tokenize::Encoder;
use crate::types::{Chunk, ChunkOpts, FileEntry, SourcedWindow};
use crate::utils::cancel::CancelToken;
use crate::utils::config::Registry;
use crate::walker::WalkSummary;

/// Shared by every worker of every stage. Everything but the counters is read-only.
pub struct PipelineContext {
    pub registry: Arc<Registry>,
    pub encoder: Arc<dyn Encoder>,
    pub chunk_opts: ChunkOpts,
    pub cancel: CancelToken,
    pub counters: Counters,
}

/// Live counters, updated by workers.
#[derive(Default)]
pub struct Counters {
    pub chunked_files: AtomicUsize,
    pub binary: AtomicUsize,
    pub chunks: AtomicUsize,
    pub windows: AtomicUsize,
    pub failed: Mutex<Vec<(String, String)>>,
}

impl Counters {
    pub fn bump(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a file- or chunk-scoped failure.
    pub fn record_failure(&self, path: &str, reason: String) {
        self.failed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((path.to_string(), reason));
    }
}

impl PipelineContext {
    pub fn snapshot(&self, walked: WalkSummary) -> PipelineStats {
        let c = &self.counters;
        PipelineStats {
            files: walked.emitted,
            chunked_files: c.chunked_files.load(Ordering::Relaxed),
            binary: walked.binary + c.binary.load(Ordering::Relaxed),
            filtered: walked.filtered,
            unreadable: walked.unreadable,
            chunks: c.chunks.load(Ordering::Relaxed),
            windows: c.windows.load(Ordering::Relaxed),
            failed: c
                .failed
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
        }
    }
}

/// End-of-run report.
#[derive(Clone, Debug, Default)]
pub struct PipelineStats {
    /// Files (and piped inputs) handed to the chunk stage.
    pub files: usize,
    /// Files fully chunked.
    pub chunked_files: usize,
    pub binary: usize,
    pub filtered: usize,
    pub unreadable: usize,
    pub chunks: usize,
    pub windows: usize,
    /// `(path, reason)` for every item that failed.
    pub failed: Vec<(String, String)>,
}

/// Queues between stages. Each is bounded by the worker count of the stage it feeds.
pub struct PipelineChannels {
    pub file_tx: Sender<FileEntry>,
    pub file_rx: Receiver<FileEntry>,
    pub chunk_tx: Sender<Chunk>,
    pub chunk_rx: Receiver<Chunk>,
    pub window_tx: Sender<SourcedWindow>,
    pub window_rx: Receiver<SourcedWindow>,
}

pub fn create_pipeline_channels(workers: usize) -> PipelineChannels {
    let (file_tx, file_rx) = queue::<FileEntry>(workers);
    let (chunk_tx, chunk_rx) = queue::<Chunk>(workers);
    let (window_tx, window_rx) = queue::<SourcedWindow>(workers);
    PipelineChannels {
        file_tx,
        file_rx,
        chunk_tx,
        chunk_rx,
        window_tx,
        window_rx,
    }
}
