//! Removal of intermediate downloads.

use std::path::{Path, PathBuf};

use tracing::debug;

/// Deletes the tracked files when dropped, whatever happened in between.
///
/// Individual deletion errors are swallowed: a file that is already gone or
/// locked must not stop the rest from being removed.
#[derive(Debug, Default)]
pub struct WorkspaceCleaner {
    paths: Vec<PathBuf>,
}

impl WorkspaceCleaner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&mut self, path: impl Into<PathBuf>) {
        self.paths.push(path.into());
    }

    /// Stop tracking `path`, e.g. once it has been promoted to the final artifact.
    pub fn release(&mut self, path: &Path) {
        self.paths.retain(|p| p != path);
    }

    pub fn tracked(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Remove everything now. Returns how many files were actually deleted.
    pub fn finish(mut self) -> usize {
        self.sweep()
    }

    fn sweep(&mut self) -> usize {
        let mut removed = 0;
        for path in self.paths.drain(..) {
            match std::fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) => debug!(path = %path.display(), error = %e, "Could not remove intermediate file"),
            }
        }
        removed
    }
}

impl Drop for WorkspaceCleaner {
    fn drop(&mut self) {
        self.sweep();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removes_on_drop_and_ignores_missing() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.apk");
        let b = dir.path().join("b.apk");
        std::fs::write(&a, b"a").unwrap();

        {
            let mut cleaner = WorkspaceCleaner::new();
            cleaner.track(&a);
            cleaner.track(&b);
        }

        assert!(!a.exists());
    }

    #[test]
    fn test_finish_counts_and_release_keeps() {
        let dir = tempfile::tempdir().unwrap();
        let keep = dir.path().join("keep.apk");
        let gone = dir.path().join("gone.apk");
        std::fs::write(&keep, b"k").unwrap();
        std::fs::write(&gone, b"g").unwrap();

        let mut cleaner = WorkspaceCleaner::new();
        cleaner.track(&keep);
        cleaner.track(&gone);
        cleaner.track(dir.path().join("never-written.apk"));
        cleaner.release(&keep);

        assert_eq!(cleaner.finish(), 1);
        assert!(keep.exists());
        assert!(!gone.exists());
    }
}
