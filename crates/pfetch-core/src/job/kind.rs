//! Decide whether a manifest entry names a single file or a directory to mirror.

use serde::Serialize;
use std::path::Path;

/// Extensions fetched as single files by default (archives and data files).
pub const DEFAULT_SINGLE_FILE_EXTENSIONS: &[&str] = &[
    "fits", "fit", "fts", "fz", "gz", "bz2", "xz", "zst", "zip", "tar", "tgz", "7z", "rar", "dat",
    "csv", "txt", "h5", "hdf5", "hdf", "nc",
];

/// How a manifest entry is transferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// File-level transfer into the entry's parent directory.
    File,
    /// Mirror the remote directory's contents (trailing-slash semantics).
    Directory,
}

/// Classify an entry by its extension (case-insensitive). An entry written
/// with a trailing `/` is always a directory.
pub fn classify_entry<S: AsRef<str>>(entry: &str, single_file_extensions: &[S]) -> EntryKind {
    if entry.ends_with('/') {
        return EntryKind::Directory;
    }
    let Some(ext) = Path::new(entry).extension().and_then(|e| e.to_str()) else {
        return EntryKind::Directory;
    };
    let is_file = single_file_extensions
        .iter()
        .any(|known| known.as_ref().trim_start_matches('.').eq_ignore_ascii_case(ext));
    if is_file {
        EntryKind::File
    } else {
        EntryKind::Directory
    }
}
