//! Application configuration constants and the immutable registry (languages + skip pattern).
//! Tuning and thresholds in one place.

use regex::Regex;
use std::sync::OnceLock;

use crate::chunk::language::{Grammar, LanguageSpec};
use crate::error::ConfigError;

// ---- Package / paths (from CARGO_PKG_NAME, cached) ----

/// Package-derived names: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    toml_filename: String,
    tokenizer_env: String,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    /// Build and cache names from `CARGO_PKG_NAME`. Called once on first use.
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                toml_filename: format!(".{pkg}.toml"),
                tokenizer_env: format!("{}_TOKENIZER", pkg.to_uppercase()),
            }
        })
    }

    /// Config file looked up in the working directory (e.g. `.softgrep.toml`).
    pub fn toml_filename(&self) -> &str {
        &self.toml_filename
    }

    /// Environment variable holding a tokenizer path (e.g. `SOFTGREP_TOKENIZER`).
    pub fn tokenizer_env(&self) -> &str {
        &self.tokenizer_env
    }
}

// ---- Worker threads ----

/// Worker count per stage: one less than the available threads, never below one.
pub fn default_workers() -> usize {
    rayon::current_num_threads().saturating_sub(1).max(1)
}

// ---- Binary sniffing ----

/// Leading bytes inspected for a NUL before a file is treated as binary.
pub const BINARY_SNIFF_LEN: usize = 1024;

// ---- Chunking ----

pub struct ChunkConsts;

impl ChunkConsts {
    /// Strided window size in bytes.
    pub const DEFAULT_STRIDE: usize = 500;
    /// Bytes shared by consecutive strided windows.
    pub const DEFAULT_OVERLAP: usize = 50;
}

// ---- Token windows ----

pub struct WindowConsts;

impl WindowConsts {
    /// Total slots per window, including CLS and SEP.
    pub const MAX_LEN: usize = 512;
    /// Real tokens per window once CLS and SEP are reserved.
    pub const BODY_LEN: usize = Self::MAX_LEN - 2;
}

// ---- Queues ----

/// How long a blocked send/recv waits before re-checking the cancel token.
pub const QUEUE_POLL_MS: u64 = 50;

// ---- Registry ----

/// Paths whose tail matches this are never traversed: VCS dirs, node_modules, logs, lock files, archives.
pub const SKIP_PATTERN: &str = r"(/\.git|/node_modules|[^/]\.log|\w\.lock|\.zip|\.tgz)$";

/// Language table plus skip patterns. Built once, then shared read-only by walker and chunkers.
pub struct Registry {
    languages: Vec<LanguageSpec>,
    skip: Regex,
    exclude: Vec<Regex>,
}

impl Registry {
    /// Built-in languages and skip pattern, no extra excludes.
    pub fn builtin() -> Self {
        Self {
            languages: builtin_languages(),
            skip: Regex::new(SKIP_PATTERN).expect("SKIP_PATTERN is a valid regex"),
            exclude: Vec::new(),
        }
    }

    /// Built-in registry plus user exclude regexes (matched against the full path).
    pub fn with_excludes(patterns: &[String]) -> Result<Self, ConfigError> {
        let mut registry = Self::builtin();
        for pattern in patterns {
            let re = Regex::new(pattern).map_err(|source| ConfigError::Exclude {
                pattern: pattern.clone(),
                source,
            })?;
            registry.exclude.push(re);
        }
        Ok(registry)
    }

    /// Build from an explicit language table (tests, embedders of the library).
    pub fn from_languages(languages: Vec<LanguageSpec>) -> Self {
        Self {
            languages,
            ..Self::builtin()
        }
    }

    pub fn languages(&self) -> &[LanguageSpec] {
        &self.languages
    }

    /// Registration for `filename`. Several entries may match; the last one wins.
    pub fn language_for(&self, filename: &str) -> Option<&LanguageSpec> {
        self.languages
            .iter()
            .filter(|l| l.matches(filename))
            .next_back()
    }

    /// Registration by its `name`, as recorded on a [`FileEntry`](crate::FileEntry).
    pub fn language_named(&self, name: &str) -> Option<&LanguageSpec> {
        self.languages.iter().find(|l| l.name == name)
    }

    /// True if the fixed skip pattern or a user exclude matches `path`.
    pub fn is_skipped(&self, path: &str) -> bool {
        self.skip.is_match(path) || self.exclude.iter().any(|re| re.is_match(path))
    }
}

fn builtin_languages() -> Vec<LanguageSpec> {
    vec![
        LanguageSpec::new(
            "go",
            r"\.go$",
            Some(Grammar::Go),
            "(function_declaration) @function\n(method_declaration) @method",
            false,
        ),
        LanguageSpec::new(
            "rust",
            r"\.rs$",
            Some(Grammar::Rust),
            "(function_item) @function\n(struct_item) @struct\n(enum_item) @enum\n(trait_item) @trait",
            false,
        ),
        LanguageSpec::new(
            "python",
            r"\.pyw?$",
            Some(Grammar::Python),
            "(function_definition) @function",
            false,
        ),
        LanguageSpec::new(
            "javascript",
            r"\.(m|c)?jsx?$",
            Some(Grammar::JavaScript),
            "(function_declaration) @function\n(method_definition) @method",
            false,
        ),
        LanguageSpec::new(
            "typescript",
            r"\.ts$",
            Some(Grammar::TypeScript),
            "(function_declaration) @function\n(method_definition) @method",
            false,
        ),
        LanguageSpec::new(
            "tsx",
            r"\.tsx$",
            Some(Grammar::Tsx),
            "(function_declaration) @function\n(method_definition) @method",
            false,
        ),
        // Prose and generated Go code: no useful structure, window them.
        LanguageSpec::new("markdown", r"\.(md|markdown|txt)$", None, "", true),
        LanguageSpec::new("go-generated", r"\.pb\.go$", None, "", true),
    ]
}
