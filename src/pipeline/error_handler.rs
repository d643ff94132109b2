use log::{info, warn};

use super::context::PipelineStats;

/// Log the end-of-run summary. Failed items are counted at warn; with `verbose` each one is listed.
pub fn report_pipeline_stats(stats: &PipelineStats, verbose: bool) {
    info!(
        "{} files, {} chunks, {} windows ({} binary, {} filtered)",
        stats.files, stats.chunks, stats.windows, stats.binary, stats.filtered
    );
    let skipped = stats.failed.len() + stats.unreadable;
    if skipped > 0 {
        warn!(
            "Skipped {} items due to read, parse or encode errors",
            skipped
        );
        if verbose {
            for (path, reason) in &stats.failed {
                eprintln!("  skipped: {path}: {reason}");
            }
        }
    }
}
