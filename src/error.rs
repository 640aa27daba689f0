//! Error types for cachewarm

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced while validating targets or warming files
#[derive(Error, Debug)]
pub enum WarmError {
    /// Positional argument is neither a file nor a directory
    #[error("\"{}\" is neither a file nor a directory", path.display())]
    InvalidTarget { path: PathBuf },

    /// A file could not be opened or read during the warm pass
    #[error("cannot read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Directory listing failed or a link loop was detected
    #[error("cannot list '{}': {source}", path.display())]
    Enumerate {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// Reasons the OS file cache could not be cleared
#[derive(Error, Debug)]
pub enum ClearCacheError {
    #[cfg_attr(not(any(target_os = "linux", target_os = "macos")), allow(dead_code))]
    #[error("permission denied")]
    PermissionDenied,

    #[cfg_attr(not(target_os = "macos"), allow(dead_code))]
    #[error("`{command}` exited with {status}")]
    CommandFailed { command: String, status: String },

    #[cfg_attr(any(target_os = "linux", target_os = "macos"), allow(dead_code))]
    #[error("clearing the file cache is not supported on this platform")]
    Unsupported,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClearCacheError {
    /// Short text shown after "Clearing cache... "
    pub fn short_reason(&self) -> &'static str {
        match self {
            ClearCacheError::PermissionDenied => "Permission denied",
            ClearCacheError::CommandFailed { .. } => "Command failed",
            ClearCacheError::Unsupported => "Not supported",
            ClearCacheError::Io(_) => "I/O error",
        }
    }
}
