//! Data model shared by the enumerator, the warmer and the reporter

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::WarmError;

/// A user-supplied path, resolved to a single file or a directory root
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    File(PathBuf),
    Directory(PathBuf),
}

impl Target {
    /// Resolve a path argument. Fails if it is neither a file nor a directory.
    ///
    /// The returned path is absolute; symlinks are resolved when possible.
    pub fn resolve(path: &Path) -> Result<Self, WarmError> {
        let metadata = std::fs::metadata(path).map_err(|_| WarmError::InvalidTarget {
            path: path.to_path_buf(),
        })?;

        let absolute = path
            .canonicalize()
            .or_else(|_| std::path::absolute(path))
            .unwrap_or_else(|_| path.to_path_buf());

        if metadata.is_dir() {
            Ok(Target::Directory(absolute))
        } else if metadata.is_file() {
            Ok(Target::File(absolute))
        } else {
            Err(WarmError::InvalidTarget {
                path: path.to_path_buf(),
            })
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Target::File(p) | Target::Directory(p) => p,
        }
    }
}

/// One regular file reachable under a target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: PathBuf,
    pub len: u64,
}

/// Per-target counters mutated by the warming loop
#[derive(Debug, Clone, Default)]
pub struct WarmRunState {
    /// Sum of file lengths, minus the lengths of skipped files
    pub total_bytes_expected: u64,
    /// Bytes read so far in the warm pass
    pub bytes_read: u64,
    /// Files seen by the scan pass
    pub file_count: usize,
    /// Files abandoned in the warm pass
    pub skipped: Vec<PathBuf>,
}

impl WarmRunState {
    /// Record one file found by the scan pass
    pub fn add_scanned(&mut self, entry: &FileEntry) {
        self.total_bytes_expected += entry.len;
        self.file_count += 1;
    }

    /// Record bytes returned by one read call
    pub fn add_read(&mut self, n: usize) {
        self.bytes_read += n as u64;
    }

    /// Abandon a file: drop its full length from the expected total and
    /// take back whatever was already read from it.
    pub fn skip(&mut self, entry: &FileEntry, already_read: u64) {
        self.total_bytes_expected = self.total_bytes_expected.saturating_sub(entry.len);
        self.bytes_read = self.bytes_read.saturating_sub(already_read);
        self.skipped.push(entry.path.clone());
    }

    /// Progress ratio in [0, 1]
    pub fn ratio(&self) -> f64 {
        if self.total_bytes_expected == 0 {
            return 1.0;
        }
        (self.bytes_read as f64 / self.total_bytes_expected as f64).clamp(0.0, 1.0)
    }
}

/// Outcome of warming one target
#[derive(Debug, Clone)]
pub struct WarmSummary {
    pub target: PathBuf,
    pub file_count: usize,
    pub total_bytes: u64,
    pub bytes_read: u64,
    pub skipped: Vec<PathBuf>,
    pub elapsed: Duration,
}

impl WarmSummary {
    pub fn from_state(target: &Path, state: WarmRunState, elapsed: Duration) -> Self {
        Self {
            target: target.to_path_buf(),
            file_count: state.file_count,
            total_bytes: state.total_bytes_expected,
            bytes_read: state.bytes_read,
            skipped: state.skipped,
            elapsed,
        }
    }
}
