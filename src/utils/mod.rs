pub mod cancel;
pub mod config;
pub mod logger;
pub mod softgrep_toml;

pub use cancel::CancelToken;
pub use config::*;
pub use logger::setup_logging;
pub use softgrep_toml::{
    SoftgrepToml, apply_file_to_opts, load_softgrep_toml, parse_softgrep_toml,
};
