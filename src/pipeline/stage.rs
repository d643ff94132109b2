//! A worker pool for one pipeline stage, plus the barrier that closes its output queue.

use crossbeam_channel::{Receiver, Sender};
use log::{debug, error};
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use super::context::PipelineContext;

/// Worker body: `(worker_id, input, output, ctx)`. Returns when its input is closed and empty.
pub type WorkerFn<I, O> = fn(usize, Receiver<I>, Sender<O>, Arc<PipelineContext>);

/// Workers of one stage plus the stage's own handle on the downstream queue.
///
/// Workers send on clones of `tx`. The queue closes when the last clone drops, so [`Stage::close`]
/// joins every worker before dropping `tx`: downstream never sees a close while a worker can
/// still send.
pub struct Stage<O> {
    name: &'static str,
    tx: Option<Sender<O>>,
    workers: Vec<JoinHandle<()>>,
}

impl<O: Send + 'static> Stage<O> {
    pub fn spawn<I: Send + 'static>(
        name: &'static str,
        num_workers: usize,
        rx: Receiver<I>,
        tx: Sender<O>,
        ctx: &Arc<PipelineContext>,
        work: WorkerFn<I, O>,
    ) -> io::Result<Self> {
        let mut workers = Vec::with_capacity(num_workers);
        for id in 0..num_workers.max(1) {
            let rx = rx.clone();
            let tx = tx.clone();
            let ctx = Arc::clone(ctx);
            let handle = thread::Builder::new()
                .name(format!("{name}-{id}"))
                .spawn(move || work(id, rx, tx, ctx))?;
            workers.push(handle);
        }
        debug!("{} stage: {} workers", name, workers.len());
        Ok(Self {
            name,
            tx: Some(tx),
            workers,
        })
    }

    pub fn num_workers(&self) -> usize {
        self.workers.len()
    }

    /// Wait for every worker to exit, then close the output queue. Returns workers that died.
    pub fn close(mut self) -> usize {
        let mut died = 0;
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                died += 1;
            }
        }
        if died > 0 {
            error!("{} stage: {} worker thread(s) panicked", self.name, died);
        }
        drop(self.tx.take());
        debug!("{} stage closed", self.name);
        died
    }
}
