//! CLI command handler: resolve options and inputs, run the pipeline, drain windows to a sink.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::io::{self, BufWriter};
use std::sync::Arc;

use crate::engine::arg_parser::Cli;
use crate::error::ConfigError;
use crate::pipeline::{PipelineHandles, finish_pipeline, report_pipeline_stats, run_pipeline};
use crate::sink::{CountingSink, JsonLinesSink, drain};
use crate::tokenize::{Encoder, HfEncoder, Windower};
use crate::utils::{
    CancelToken, PackagePaths, Registry, SoftgrepToml, apply_file_to_opts, load_softgrep_toml,
    setup_logging,
};
use crate::walker::{resolve_inputs, stdin_is_terminal};
use crate::Opts;

/// Defaults, then `file` (`.softgrep.toml`), then CLI flags, then the tokenizer environment
/// variable if nothing else named one.
pub fn setup_opts(cli: &Cli, file: Option<&SoftgrepToml>) -> Opts {
    let mut opts = Opts::default();
    if let Some(file) = file {
        apply_file_to_opts(file, &mut opts);
    }
    apply_cli_to_opts(cli, &mut opts);
    if opts.tokenizer.is_none() {
        opts.tokenizer = std::env::var_os(PackagePaths::get().tokenizer_env()).map(Into::into);
    }
    opts
}

/// `.softgrep.toml` from the working directory, if any.
fn load_cwd_toml() -> Result<Option<SoftgrepToml>, ConfigError> {
    match std::env::current_dir() {
        Ok(dir) => load_softgrep_toml(&dir),
        Err(_) => Ok(None),
    }
}

pub fn apply_cli_to_opts(cli: &Cli, opts: &mut Opts) {
    if let Some(stride) = cli.stride {
        opts.chunk.stride = stride;
    }
    if let Some(overlap) = cli.overlap {
        opts.chunk.overlap = overlap;
    }
    if cli.workers.is_some() {
        opts.workers = cli.workers;
    }
    if cli.tokenizer.is_some() {
        opts.tokenizer = cli.tokenizer.clone();
    }
    if !cli.exclude.is_empty() {
        opts.exclude.extend(cli.exclude.iter().cloned());
    }
    if cli.no_follow_links {
        opts.follow_links = false;
    }
    if let Some(verbose) = cli.verbose {
        opts.verbose = verbose;
    }
    opts.json = cli.json;
}

/// Encoder from the configured `tokenizer.json`, else the vocabulary built into the binary.
pub fn load_encoder(opts: &Opts) -> Result<HfEncoder> {
    if let Some(path) = &opts.tokenizer {
        return Ok(HfEncoder::from_file(path)?);
    }
    match HfEncoder::embedded() {
        Some(encoder) => {
            debug!("using built-in vocabulary");
            Ok(encoder?)
        }
        None => Err(ConfigError::MissingTokenizer.into()),
    }
}

/// Run one search: walk, chunk, tokenize, and hand windows to the sink.
pub fn handle_run(cli: &Cli) -> Result<()> {
    let file = load_cwd_toml();
    let opts = setup_opts(cli, file.as_ref().ok().and_then(Option::as_ref));
    setup_logging(opts.verbose);
    if let Err(err) = &file {
        warn!("{err}; using defaults and flags only");
    }
    opts.validate()?;

    let inputs = resolve_inputs(&cli.paths, stdin_is_terminal())?;
    let registry = Arc::new(Registry::with_excludes(&opts.exclude)?);
    let encoder: Arc<dyn Encoder> = Arc::new(load_encoder(&opts)?);

    let query = Windower::new(&cli.query, Arc::clone(&encoder))?;
    debug!(
        "query: {} tokens, {} window(s)",
        query.token_count(),
        query.len()
    );

    let cancel = CancelToken::new();
    let cancel_handler = cancel.clone();
    ctrlc::set_handler(move || cancel_handler.cancel()).context("set Ctrl+C handler")?;

    let PipelineHandles {
        window_rx,
        supervisor,
        num_workers,
    } = run_pipeline(inputs, &opts, registry, encoder, cancel.clone())?;
    debug!("{} workers per stage", num_workers);

    let drained = if opts.json {
        let mut sink = JsonLinesSink::new(BufWriter::new(io::stdout().lock()));
        drain(&window_rx, &mut sink)
    } else {
        let mut sink = CountingSink::default();
        let n = drain(&window_rx, &mut sink);
        for (path, count) in &sink.per_source {
            debug!("{path}: {count} windows");
        }
        n
    };
    if drained.is_err() {
        // Stop the stages before waiting for them; nobody reads the window queue any more.
        cancel.cancel();
    }
    drop(window_rx);

    let stats = finish_pipeline(supervisor);
    let consumed = drained?;
    let stats = stats?;
    info!("{} windows ready for embedding", consumed);
    report_pipeline_stats(&stats, opts.verbose);
    Ok(())
}
