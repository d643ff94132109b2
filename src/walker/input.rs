//! Turn path arguments into traversal inputs, including the single piped-stdin input.

use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;

use crate::error::UsageError;
use crate::types::{FileEntry, STDIN_PATH};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Input {
    Stdin,
    Root(PathBuf),
}

/// Resolve path arguments. `-` means piped stdin and may appear once; it is rejected when stdin
/// is a terminal. With no arguments, piped stdin is the only input.
pub fn resolve_inputs<S: AsRef<str>>(
    args: &[S],
    stdin_is_terminal: bool,
) -> Result<Vec<Input>, UsageError> {
    if args.is_empty() {
        return match stdin_is_terminal {
            true => Err(UsageError::NoInput),
            false => Ok(vec![Input::Stdin]),
        };
    }
    let mut inputs = Vec::with_capacity(args.len());
    let mut stdin_used = false;
    for arg in args {
        let arg = arg.as_ref();
        if arg == STDIN_PATH {
            if stdin_used {
                return Err(UsageError::StdinTwice);
            }
            if stdin_is_terminal {
                return Err(UsageError::StdinIsTerminal);
            }
            stdin_used = true;
            inputs.push(Input::Stdin);
        } else {
            inputs.push(Input::Root(PathBuf::from(arg)));
        }
    }
    Ok(inputs)
}

/// Whether the process stdin is an interactive terminal.
pub fn stdin_is_terminal() -> bool {
    io::stdin().is_terminal()
}

/// Opens the reader behind `-`. Called at most once per run.
pub type StdinSource = Box<dyn FnOnce() -> Box<dyn Read + Send> + Send>;

/// The process stdin.
pub fn process_stdin() -> StdinSource {
    Box::new(|| -> Box<dyn Read + Send> { Box::new(io::stdin()) })
}

/// Entry for piped input.
pub fn stdin_entry(reader: Box<dyn Read + Send>) -> FileEntry {
    FileEntry::new(STDIN_PATH, reader)
}
