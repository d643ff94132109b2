//! Softgrep CLI: walk, chunk and tokenize files for a semantic query.

use anyhow::Result;
use clap::Parser;
use softgrep::engine::{Cli, handle_run};
use std::time::Instant;

fn main() -> Result<()> {
    let start_time = Instant::now();
    let cli = Cli::parse();
    handle_run(&cli)?;
    log::debug!("Total time: {:?}", start_time.elapsed());
    Ok(())
}
