//! Per-traversal eligibility: seen-set, fixed skip pattern and `.gitignore` rules.

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use log::{debug, warn};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::engine::tools::{canonical_key, path_to_match_string};
use crate::utils::config::Registry;

pub const IGNORE_FILENAME: &str = ".gitignore";

/// Why a path was rejected, or that it passed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    /// Resolved path already visited during this traversal.
    Seen,
    /// Matched the fixed skip pattern or a user exclude.
    Skipped,
    /// Matched an active `.gitignore` rule.
    Ignored,
}

/// Rules from one `.gitignore`, applied only below the directory holding it.
struct ScopedRules {
    dir: PathBuf,
    rules: Gitignore,
}

/// Filter state for one traversal. Never shared between walkers.
pub struct PathFilter<'a> {
    registry: &'a Registry,
    rules: Vec<ScopedRules>,
    seen: HashSet<PathBuf>,
}

impl<'a> PathFilter<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self {
            registry,
            rules: Vec::new(),
            seen: HashSet::new(),
        }
    }

    /// Classify `path`, marking it as seen when it is new.
    pub fn check(&mut self, path: &Path, is_dir: bool) -> Verdict {
        if !self.seen.insert(canonical_key(path)) {
            return Verdict::Seen;
        }
        if self.registry.is_skipped(&path_to_match_string(path)) {
            return Verdict::Skipped;
        }
        if self.is_ignored(path, is_dir) {
            return Verdict::Ignored;
        }
        Verdict::Accept
    }

    /// True if a `.gitignore` from `path`'s own ancestors ignores it.
    pub fn is_ignored(&self, path: &Path, is_dir: bool) -> bool {
        self.rules
            .iter()
            .filter(|r| path.starts_with(&r.dir) && path != r.dir)
            .any(|r| r.rules.matched(path, is_dir).is_ignore())
    }

    /// Load `dir/.gitignore` if present. A file that fails to parse is logged and ignored (fail open).
    pub fn load_ignore_file(&mut self, dir: &Path) {
        let file = dir.join(IGNORE_FILENAME);
        if !file.is_file() {
            return;
        }
        let mut builder = GitignoreBuilder::new(dir);
        if let Some(err) = builder.add(&file) {
            warn!("{}: {}; rules not applied", file.display(), err);
            return;
        }
        match builder.build() {
            Ok(rules) => {
                debug!("{}: {} rules", file.display(), rules.num_ignores());
                self.rules.push(ScopedRules {
                    dir: dir.to_path_buf(),
                    rules,
                });
            }
            Err(err) => warn!("{}: {}; rules not applied", file.display(), err),
        }
    }

    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }
}
