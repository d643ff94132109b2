//! Load `.softgrep.toml` from a directory (CLI only). Lib callers build [`Opts`] directly.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::Opts;
use crate::error::ConfigError;
use crate::utils::config::PackagePaths;

#[derive(Debug, Default, Deserialize)]
pub struct SoftgrepToml {
    #[serde(default)]
    settings: SettingsSection,
}

#[derive(Debug, Default, Deserialize)]
struct SettingsSection {
    stride: Option<usize>,
    overlap: Option<usize>,
    workers: Option<usize>,
    tokenizer: Option<String>,
    follow_links: Option<bool>,
    exclude: Option<Vec<String>>,
    verbose: Option<bool>,
}

/// Parse config text. Errors are returned so the caller decides how loud to be.
pub fn parse_softgrep_toml(s: &str) -> Result<SoftgrepToml, toml::de::Error> {
    toml::from_str(s)
}

/// Load the config file from `dir`. `Ok(None)` when there is none; a file that cannot be read
/// or parsed is an error so the caller can report it once logging is up.
pub fn load_softgrep_toml(dir: &Path) -> Result<Option<SoftgrepToml>, ConfigError> {
    let path = dir.join(PackagePaths::get().toml_filename());
    let s = match std::fs::read_to_string(&path) {
        Ok(s) => s,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => return Err(ConfigError::ReadFile { path, source }),
    };
    parse_softgrep_toml(&s)
        .map(Some)
        .map_err(|source| ConfigError::Toml { path, source })
}

/// Overwrite opts field from file when present.
macro_rules! apply_file_opt {
    ($idx:expr, $opts:expr, $idx_field:ident => $($opts_field:ident).+) => {
        if let Some(v) = $idx.$idx_field {
            $opts.$($opts_field).+ = v;
        }
    };
}

/// Apply file config to opts (only fields present in the file). Call before applying CLI flags.
pub fn apply_file_to_opts(file: &SoftgrepToml, opts: &mut Opts) {
    let s = &file.settings;
    apply_file_opt!(s, opts, stride => chunk.stride);
    apply_file_opt!(s, opts, overlap => chunk.overlap);
    apply_file_opt!(s, opts, follow_links => follow_links);
    apply_file_opt!(s, opts, verbose => verbose);
    if let Some(n) = s.workers {
        opts.workers = Some(n);
    }
    if let Some(ref p) = s.tokenizer {
        opts.tokenizer = Some(PathBuf::from(p));
    }
    if let Some(ref v) = s.exclude {
        opts.exclude = v.clone();
    }
}
