//! Engine module: CLI surface and shared path/content tools

pub mod arg_parser;
pub mod cli;
pub mod tools;

// Re-export commonly used functions
pub use arg_parser::Cli;
pub use cli::{apply_cli_to_opts, handle_run, load_encoder, setup_opts};
pub use tools::{canonical_key, is_binary, path_to_match_string, sniff_binary};
