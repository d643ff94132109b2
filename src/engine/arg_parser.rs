use clap::Parser;
use std::path::PathBuf;

/// Semantic search front-end: walk, chunk and tokenize files into embedding-model windows.
#[derive(Clone, Debug, Parser)]
#[command(name = "softgrep", version)]
#[command(
    about = "Recursively turn files into token windows for a semantic QUERY. Respects .gitignore, skips binary files."
)]
pub struct Cli {
    /// Text to embed against the contents of the files.
    #[arg(value_name = "QUERY")]
    pub query: String,

    /// Files or directories to search, recursively. `-` reads piped stdin.
    #[arg(value_name = "PATH")]
    pub paths: Vec<String>,

    /// Bytes per window for files without a registered grammar.
    #[arg(long)]
    pub stride: Option<usize>,

    /// Bytes shared by consecutive strided windows. Must be smaller than --stride.
    #[arg(long)]
    pub overlap: Option<usize>,

    /// Workers per pipeline stage. Default: available threads minus one.
    #[arg(long, short = 'j')]
    pub workers: Option<usize>,

    /// Path to a tokenizer.json (BERT-style vocabulary).
    #[arg(long, short = 't')]
    pub tokenizer: Option<PathBuf>,

    /// Extra exclude regex, matched against the full path. Repeatable.
    #[arg(long, short = 'e')]
    pub exclude: Vec<String>,

    /// Do not follow symbolic links.
    #[arg(long)]
    pub no_follow_links: bool,

    /// Write every window as a JSON line to stdout.
    #[arg(long)]
    pub json: bool,

    /// Verbose output.
    #[arg(long, short = 'v', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub verbose: Option<bool>,
}
