//! Clearing the OS file cache
//!
//! - Linux: flush dirty pages, then drop the page cache via procfs (root only)
//! - macOS: `purge`
//! - elsewhere: unsupported

use crate::error::ClearCacheError;

/// An operation that empties the OS file cache
pub trait CacheClearer {
    fn clear(&self) -> Result<(), ClearCacheError>;
}

/// Clears the cache of the running system
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemCacheClearer;

#[cfg(target_os = "linux")]
const DROP_CACHES: &str = "/proc/sys/vm/drop_caches";

impl CacheClearer for SystemCacheClearer {
    #[cfg(target_os = "linux")]
    fn clear(&self) -> Result<(), ClearCacheError> {
        // SAFETY: sync(2) takes no arguments and cannot fail
        unsafe { libc::sync() };
        // "1" drops the page cache only; dentries and inodes stay
        std::fs::write(DROP_CACHES, "1").map_err(map_io)
    }

    #[cfg(target_os = "macos")]
    fn clear(&self) -> Result<(), ClearCacheError> {
        let status = std::process::Command::new("purge")
            .status()
            .map_err(map_io)?;
        if status.success() {
            Ok(())
        } else {
            Err(ClearCacheError::CommandFailed {
                command: "purge".to_string(),
                status: status.to_string(),
            })
        }
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    fn clear(&self) -> Result<(), ClearCacheError> {
        Err(ClearCacheError::Unsupported)
    }
}

#[cfg(any(target_os = "linux", target_os = "macos"))]
fn map_io(err: std::io::Error) -> ClearCacheError {
    match err.kind() {
        std::io::ErrorKind::PermissionDenied => ClearCacheError::PermissionDenied,
        _ => ClearCacheError::Io(err),
    }
}
