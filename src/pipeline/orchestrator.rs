use anyhow::{Context, Result};
use crossbeam_channel::Receiver;
use log::debug;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::Opts;
use crate::pipeline::context::{PipelineContext, PipelineStats, create_pipeline_channels};
use crate::pipeline::queue;
use crate::pipeline::stage::Stage;
use crate::pipeline::workers::{chunk_worker_loop, window_worker_loop};
use crate::tokenize::Encoder;
use crate::types::SourcedWindow;
use crate::utils::cancel::CancelToken;
use crate::utils::config::Registry;
use crate::walker::{Input, StdinSource, process_stdin, walk_inputs};

/// Handles returned by [`run_pipeline`]: receive windows from `window_rx` until it closes, then
/// call [`finish_pipeline`] to get the report (or the fatal error).
pub struct PipelineHandles {
    pub window_rx: Receiver<SourcedWindow>,
    pub supervisor: JoinHandle<Result<PipelineStats>>,
    pub num_workers: usize,
}

/// Start walk → chunk pool → window pool.
///
/// The supervisor thread walks every input, then closes each stage in order: file queue after
/// the walk, chunk queue after every chunk worker exited, window queue after every window
/// worker exited. A root that cannot be read ends the walk; what was already queued still
/// drains, then the supervisor returns the error.
pub fn run_pipeline(
    inputs: Vec<Input>,
    opts: &Opts,
    registry: Arc<Registry>,
    encoder: Arc<dyn Encoder>,
    cancel: CancelToken,
) -> Result<PipelineHandles> {
    run_pipeline_with_stdin(inputs, opts, registry, encoder, cancel, process_stdin())
}

/// [`run_pipeline`] with `-` read from `stdin` instead of the process stdin.
pub fn run_pipeline_with_stdin(
    inputs: Vec<Input>,
    opts: &Opts,
    registry: Arc<Registry>,
    encoder: Arc<dyn Encoder>,
    cancel: CancelToken,
    stdin: StdinSource,
) -> Result<PipelineHandles> {
    let num_workers = opts.num_workers();
    let follow_links = opts.follow_links;
    let channels = create_pipeline_channels(num_workers);
    let ctx = Arc::new(PipelineContext {
        registry,
        encoder,
        chunk_opts: opts.chunk,
        cancel,
        counters: Default::default(),
    });

    let chunk_stage = Stage::spawn(
        "chunk",
        num_workers,
        channels.file_rx,
        channels.chunk_tx,
        &ctx,
        chunk_worker_loop,
    )
    .context("spawn chunk workers")?;
    let window_stage = Stage::spawn(
        "window",
        num_workers,
        channels.chunk_rx,
        channels.window_tx,
        &ctx,
        window_worker_loop,
    )
    .context("spawn window workers")?;

    let file_tx = channels.file_tx;
    let supervisor = thread::Builder::new()
        .name("walk".to_string())
        .spawn(move || {
            let walked = walk_inputs(
                &inputs,
                &ctx.registry,
                follow_links,
                &ctx.cancel,
                stdin,
                |entry| match queue::send(&file_tx, entry, &ctx.cancel) {
                    Ok(()) => ControlFlow::Continue(()),
                    Err(_) => ControlFlow::Break(()),
                },
            );
            drop(file_tx);
            debug!("walk done, file queue closed");

            chunk_stage.close();
            window_stage.close();

            let walked = walked?;
            if ctx.cancel.is_cancelled() {
                anyhow::bail!("cancelled");
            }
            Ok(ctx.snapshot(walked))
        })
        .context("spawn walk thread")?;

    Ok(PipelineHandles {
        window_rx: channels.window_rx,
        supervisor,
        num_workers,
    })
}

/// Join the supervisor (after `window_rx` has been drained or dropped).
pub fn finish_pipeline(supervisor: JoinHandle<Result<PipelineStats>>) -> Result<PipelineStats> {
    supervisor
        .join()
        .map_err(|_| anyhow::anyhow!("walk thread panicked"))?
}

/// Main orchestrator for library callers: run the whole pipeline and collect every window.
/// Windows from different files arrive in no particular order; within a file they keep order.
pub fn collect_windows(
    inputs: Vec<Input>,
    opts: &Opts,
    registry: Arc<Registry>,
    encoder: Arc<dyn Encoder>,
    cancel: CancelToken,
) -> Result<(Vec<SourcedWindow>, PipelineStats)> {
    let PipelineHandles {
        window_rx,
        supervisor,
        ..
    } = run_pipeline(inputs, opts, registry, encoder, cancel)?;

    let windows: Vec<SourcedWindow> = window_rx.iter().collect();
    debug!("main: window queue closed, {} windows", windows.len());

    let stats = finish_pipeline(supervisor)?;
    Ok((windows, stats))
}
