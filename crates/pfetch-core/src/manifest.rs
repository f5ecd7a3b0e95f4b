//! Manifest parsing: one remote path per line, relative to the remote root.

use std::io;
use std::path::{Component, Path, PathBuf};

/// Fatal manifest problems; the run does not start.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("read manifest {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("manifest line {line}: entry {entry:?} escapes the destination root")]
    EscapesRoot { line: usize, entry: String },
}

/// One usable manifest line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// 1-based line number in the manifest file.
    pub line: usize,
    pub path: String,
}

/// Parse manifest text. Surrounding whitespace is trimmed and blank lines are
/// skipped; absolute entries and entries with `..` are rejected.
pub fn parse_manifest(text: &str) -> Result<Vec<ManifestEntry>, ManifestError> {
    let mut entries = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let path = raw.trim();
        if path.is_empty() {
            continue;
        }
        let escapes = Path::new(path).components().any(|c| {
            matches!(
                c,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });
        if escapes {
            return Err(ManifestError::EscapesRoot {
                line: idx + 1,
                entry: path.to_string(),
            });
        }
        entries.push(ManifestEntry {
            line: idx + 1,
            path: path.to_string(),
        });
    }
    Ok(entries)
}

/// Read and parse a manifest file.
pub fn read_manifest(path: &Path) -> Result<Vec<ManifestEntry>, ManifestError> {
    let text = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_manifest(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn one_entry_per_line() {
        let entries = parse_manifest("a/b.fits\nc/d\ne.zip").unwrap();
        let paths: Vec<_> = entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, ["a/b.fits", "c/d", "e.zip"]);
        assert_eq!(entries[2].line, 3);
    }

    #[test]
    fn blank_lines_and_whitespace() {
        let entries = parse_manifest("  a/b  \r\n\n\t\nc/d/\n").unwrap();
        let paths: Vec<_> = entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, ["a/b", "c/d/"]);
        assert_eq!(entries[1].line, 4);
    }

    #[test]
    fn rejects_escaping_entries() {
        let err = parse_manifest("ok\n../etc\n").unwrap_err();
        match err {
            ManifestError::EscapesRoot { line, entry } => {
                assert_eq!(line, 2);
                assert_eq!(entry, "../etc");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(parse_manifest("/abs/path").is_err());
        assert!(parse_manifest("a/../../b").is_err());
    }

    #[test]
    fn empty_manifest_is_valid() {
        assert!(parse_manifest("").unwrap().is_empty());
    }

    #[test]
    fn read_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_manifest(&dir.path().join("nope.txt")).unwrap_err();
        assert!(matches!(err, ManifestError::Read { .. }));
        assert!(err.to_string().contains("nope.txt"));
    }

    #[test]
    fn read_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "x/y").unwrap();
        writeln!(f, "z.gz").unwrap();
        let entries = read_manifest(f.path()).unwrap();
        assert_eq!(entries.len(), 2);
    }
}
