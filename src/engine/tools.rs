//! Path and content utilities shared by walker and chunker

use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::utils::config::BINARY_SNIFF_LEN;

/// True if any of the first [`BINARY_SNIFF_LEN`] bytes is NUL.
pub fn is_binary(bytes: &[u8]) -> bool {
    let n = bytes.len().min(BINARY_SNIFF_LEN);
    bytes[..n].contains(&0)
}

/// Read up to [`BINARY_SNIFF_LEN`] leading bytes and test them with [`is_binary`].
/// Text files are rewound to the start so the caller can read them from the beginning.
pub fn sniff_binary<R: Read + Seek>(reader: &mut R) -> io::Result<bool> {
    let mut head = [0u8; BINARY_SNIFF_LEN];
    let mut filled = 0;
    while filled < head.len() {
        match reader.read(&mut head[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    if is_binary(&head[..filled]) {
        return Ok(true);
    }
    reader.seek(SeekFrom::Start(0))?;
    Ok(false)
}

/// Path as a `/`-separated string, used for pattern matching and as the emitted file name.
pub fn path_to_match_string(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Key for the seen-set: the resolved path, or the path itself when it cannot be resolved.
pub fn canonical_key(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

