//! File enumeration
//!
//! Expands a target into the flat sequence of regular files beneath it.
//! Each call to [`FileSet::iter`] starts a fresh walk, so the sequence can be
//! consumed any number of times and always reflects the filesystem as it is
//! at that moment.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use crate::core::model::{FileEntry, Target};
use crate::error::WarmError;

/// Restartable set of regular files under one root
#[derive(Debug, Clone)]
pub struct FileSet {
    root: PathBuf,
}

impl FileSet {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn for_target(target: &Target) -> Self {
        Self::new(target.path())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Start a new walk from the root
    pub fn iter(&self) -> Files {
        let walker = WalkDir::new(&self.root)
            .follow_links(true)
            .sort_by(subdirs_first);
        Files {
            inner: walker.into_iter(),
        }
    }
}

impl IntoIterator for &FileSet {
    type Item = Result<FileEntry, WarmError>;
    type IntoIter = Files;

    fn into_iter(self) -> Files {
        self.iter()
    }
}

/// Directories sort ahead of everything else; the listing order is kept
/// within each group.
fn subdirs_first(a: &DirEntry, b: &DirEntry) -> Ordering {
    match (a.file_type().is_dir(), b.file_type().is_dir()) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

/// Lazy iterator over the regular files of one walk
pub struct Files {
    inner: walkdir::IntoIter,
}

impl Iterator for Files {
    type Item = Result<FileEntry, WarmError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.inner.next()? {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_default();
                    return Some(Err(WarmError::Enumerate { path, source: err }));
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let len = match entry.metadata() {
                Ok(meta) => meta.len(),
                Err(err) => {
                    return Some(Err(WarmError::Enumerate {
                        path: entry.into_path(),
                        source: err,
                    }))
                }
            };

            return Some(Ok(FileEntry {
                path: entry.into_path(),
                len,
            }));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::fs;
    use tempfile::tempdir;

    fn write_file(path: &Path, content: &[u8]) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    fn collect_paths(set: &FileSet) -> Vec<PathBuf> {
        set.iter().map(|e| e.unwrap().path).collect()
    }

    #[test]
    fn test_single_file_yields_itself() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("only.bin");
        write_file(&file, b"12345");

        let entries: Vec<_> = FileSet::new(&file).iter().map(|e| e.unwrap()).collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, file);
        assert_eq!(entries[0].len, 5);
    }

    #[test]
    fn test_empty_dir() {
        let temp = tempdir().unwrap();
        assert!(collect_paths(&FileSet::new(temp.path())).is_empty());
    }

    #[test]
    fn test_visits_every_file_once() {
        let temp = tempdir().unwrap();
        let root = temp.path();
        let expected: HashSet<PathBuf> = [
            "top.txt",
            "a/one.txt",
            "a/two.txt",
            "a/deep/er/three.txt",
            "b/four.txt",
        ]
        .iter()
        .map(|p| root.join(p))
        .collect();
        for path in &expected {
            write_file(path, b"x");
        }
        fs::create_dir_all(root.join("empty/nested")).unwrap();

        let paths = collect_paths(&FileSet::new(root));
        let unique: HashSet<PathBuf> = paths.iter().cloned().collect();

        assert_eq!(paths.len(), expected.len());
        assert_eq!(unique, expected);
    }

    #[test]
    fn test_subdirs_before_own_files() {
        let temp = tempdir().unwrap();
        let root = temp.path();
        write_file(&root.join("z_root.txt"), b"r");
        write_file(&root.join("sub/inner.txt"), b"i");
        write_file(&root.join("sub/child/leaf.txt"), b"l");

        let paths = collect_paths(&FileSet::new(root));
        let pos = |name: &str| paths.iter().position(|p| p.ends_with(name)).unwrap();

        assert!(pos("leaf.txt") < pos("inner.txt"));
        assert!(pos("inner.txt") < pos("z_root.txt"));
    }

    #[test]
    fn test_restartable() {
        let temp = tempdir().unwrap();
        write_file(&temp.path().join("a.txt"), b"a");
        write_file(&temp.path().join("d/b.txt"), b"bb");

        let set = FileSet::new(temp.path());
        let first = collect_paths(&set);
        let second = collect_paths(&set);
        assert_eq!(first, second);

        write_file(&temp.path().join("d/c.txt"), b"ccc");
        assert_eq!(collect_paths(&set).len(), 3);
    }

    #[test]
    fn test_lengths_match_metadata() {
        let temp = tempdir().unwrap();
        write_file(&temp.path().join("ten.bin"), &[0u8; 10]);
        write_file(&temp.path().join("sub/twenty.bin"), &[0u8; 20]);

        let total: u64 = FileSet::new(temp.path())
            .iter()
            .map(|e| e.unwrap().len)
            .sum();
        assert_eq!(total, 30);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_loop_terminates() {
        let temp = tempdir().unwrap();
        let root = temp.path();
        write_file(&root.join("dir/file.txt"), b"f");
        std::os::unix::fs::symlink(root, root.join("dir/loop")).unwrap();

        let results: Vec<_> = FileSet::new(root).iter().collect();
        let files: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
        assert_eq!(files.len(), 1);
        assert!(results.iter().any(|r| r.is_err()));
    }
}
