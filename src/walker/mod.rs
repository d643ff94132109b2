//! Directory traversal: depth-first, following symlinks, emitting each eligible text file once.

pub mod filter;
pub mod input;

use log::{debug, warn};
use std::fs::File;
use std::io;
use std::ops::ControlFlow;
use std::path::Path;
use walkdir::WalkDir;

use crate::engine::tools::{path_to_match_string, sniff_binary};
use crate::error::WalkError;
use crate::types::FileEntry;
use crate::utils::cancel::CancelToken;
use crate::utils::config::Registry;

pub use filter::{PathFilter, Verdict};
pub use input::{
    Input, StdinSource, process_stdin, resolve_inputs, stdin_entry, stdin_is_terminal,
};

/// Counts for one traversal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WalkSummary {
    pub emitted: usize,
    pub binary: usize,
    /// Rejected by seen-set, skip pattern or ignore rules.
    pub filtered: usize,
    /// Entries that could not be read and were skipped.
    pub unreadable: usize,
    /// Emitter asked to stop, or cancel was requested.
    pub stopped: bool,
}

/// Walker for a single root. Ignore rules and the seen-set live and die with it.
pub struct Walker<'a> {
    registry: &'a Registry,
    filter: PathFilter<'a>,
    follow_links: bool,
    cancel: CancelToken,
}

impl<'a> Walker<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self {
            registry,
            filter: PathFilter::new(registry),
            follow_links: true,
            cancel: CancelToken::new(),
        }
    }

    pub fn follow_links(mut self, follow: bool) -> Self {
        self.follow_links = follow;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Traverse `root`, calling `emit` once per eligible text file.
    ///
    /// Only a root that cannot be opened is an error; unreadable entries and broken ignore files
    /// are logged and skipped. `emit` returning `Break` ends the traversal early.
    pub fn walk<F>(&mut self, root: &Path, mut emit: F) -> Result<WalkSummary, WalkError>
    where
        F: FnMut(FileEntry) -> ControlFlow<()>,
    {
        std::fs::metadata(root).map_err(|source| WalkError::Root {
            path: root.to_path_buf(),
            source,
        })?;

        let mut summary = WalkSummary::default();
        let mut it = WalkDir::new(root).follow_links(self.follow_links).into_iter();
        while let Some(next) = it.next() {
            if self.cancel.is_cancelled() {
                summary.stopped = true;
                break;
            }
            let entry = match next {
                Ok(entry) => entry,
                Err(err) if err.depth() == 0 => {
                    return Err(WalkError::Root {
                        path: root.to_path_buf(),
                        source: io::Error::from(err),
                    });
                }
                Err(err) => {
                    if err.loop_ancestor().is_some() {
                        debug!("symlink loop skipped: {}", err);
                    } else {
                        warn!("Error accessing path: {}", err);
                        summary.unreadable += 1;
                    }
                    continue;
                }
            };

            let path = entry.path();
            let is_dir = entry.file_type().is_dir();
            let verdict = self.filter.check(path, is_dir);
            if verdict != Verdict::Accept {
                debug!("{:?}: {}", verdict, path.display());
                summary.filtered += 1;
                if is_dir {
                    it.skip_current_dir();
                }
                continue;
            }

            if is_dir {
                // Rules must be active before the directory's children are yielded.
                self.filter.load_ignore_file(path);
                continue;
            }
            if !entry.file_type().is_file() {
                continue;
            }

            let file = match open_text_file(path) {
                Ok(Some(file)) => file,
                Ok(None) => {
                    debug!("binary: {}", path.display());
                    summary.binary += 1;
                    continue;
                }
                Err(err) => {
                    warn!("Cannot read {}: {}", path.display(), err);
                    summary.unreadable += 1;
                    continue;
                }
            };

            let name = path_to_match_string(path);
            let mut file_entry = FileEntry::new(name.as_str(), Box::new(file));
            file_entry.language = self.registry.language_for(&name).map(|l| l.name);
            summary.emitted += 1;
            if emit(file_entry).is_break() {
                summary.stopped = true;
                break;
            }
        }
        debug!(
            "walk {}: {} emitted, {} binary, {} filtered, {} seen",
            root.display(),
            summary.emitted,
            summary.binary,
            summary.filtered,
            self.filter.seen_count()
        );
        Ok(summary)
    }
}

/// Open `path` for reading; `None` if it looks binary. Text files come back rewound to the start.
pub fn open_text_file(path: &Path) -> io::Result<Option<File>> {
    let mut file = File::open(path)?;
    if sniff_binary(&mut file)? {
        return Ok(None);
    }
    Ok(Some(file))
}

/// Walk every input in order, each root with its own [`Walker`]. Piped input is opened from
/// `stdin` and emitted once without traversal. Stops at the first root error.
pub fn walk_inputs<F>(
    inputs: &[Input],
    registry: &Registry,
    follow_links: bool,
    cancel: &CancelToken,
    stdin: StdinSource,
    mut emit: F,
) -> Result<WalkSummary, WalkError>
where
    F: FnMut(FileEntry) -> ControlFlow<()>,
{
    let mut stdin = Some(stdin);
    let mut total = WalkSummary::default();
    for input in inputs {
        if cancel.is_cancelled() {
            total.stopped = true;
            break;
        }
        let summary = match input {
            Input::Stdin => match stdin.take() {
                Some(open) => {
                    let stopped = emit(stdin_entry(open())).is_break();
                    WalkSummary {
                        emitted: 1,
                        stopped,
                        ..WalkSummary::default()
                    }
                }
                None => {
                    warn!("stdin already read, skipping repeated '-'");
                    WalkSummary::default()
                }
            },
            Input::Root(root) => Walker::new(registry)
                .follow_links(follow_links)
                .with_cancel(cancel.clone())
                .walk(root, &mut emit)?,
        };
        total.emitted += summary.emitted;
        total.binary += summary.binary;
        total.filtered += summary.filtered;
        total.unreadable += summary.unreadable;
        if summary.stopped {
            total.stopped = true;
            break;
        }
    }
    Ok(total)
}
