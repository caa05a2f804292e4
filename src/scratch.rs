//! Scoped temporary storage for converted audio, uploads and engine output.
//!
//! Every temporary artifact created while serving a request lives inside a
//! [`ScratchDir`]. The directory is removed when the guard is dropped, which
//! happens on normal return, on `?` propagation, during panic unwinding and
//! when a tokio task holding it is aborted.

use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

use crate::error::Result;

const DEFAULT_PREFIX: &str = "audioscribe-";

/// Request-scoped temporary directory, deleted on drop
#[derive(Debug)]
pub struct ScratchDir {
    dir: TempDir,
}

impl ScratchDir {
    /// Create a scratch directory under the system temp location
    pub fn new() -> Result<Self> {
        Self::with_prefix(DEFAULT_PREFIX)
    }

    /// Create a scratch directory with a custom name prefix
    pub fn with_prefix(prefix: &str) -> Result<Self> {
        let dir = tempfile::Builder::new().prefix(prefix).tempdir()?;
        debug!("Created scratch directory: {}", dir.path().display());
        Ok(Self { dir })
    }

    /// Create a scratch directory inside `root`
    pub fn new_in(root: &Path) -> Result<Self> {
        std::fs::create_dir_all(root)?;
        let dir = tempfile::Builder::new()
            .prefix(DEFAULT_PREFIX)
            .tempdir_in(root)?;
        debug!("Created scratch directory: {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path of an entry inside the scratch directory (not created)
    pub fn child(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Discard one entry early. Missing entries are ignored.
    pub fn discard(&self, name: &str) -> Result<()> {
        remove_path(&self.child(name))?;
        Ok(())
    }

    /// Remove the directory now and report failures.
    ///
    /// A directory that is already gone counts as removed.
    pub fn close(self) -> Result<()> {
        let path = self.dir.path().to_path_buf();
        match self.dir.close() {
            Ok(()) => {
                debug!("Removed scratch directory: {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                warn!("Failed to remove scratch directory {}: {}", path.display(), e);
                Err(e.into())
            }
        }
    }
}

/// Delete a file or directory tree, treating a missing path as success
pub fn remove_path(path: &Path) -> io::Result<()> {
    let result = match std::fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => std::fs::remove_dir_all(path),
        Ok(_) => std::fs::remove_file(path),
        Err(e) => Err(e),
    };

    match result {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScribeError;
    use std::time::Duration;

    #[test]
    fn test_scratch_dir_removed_on_drop() {
        let path = {
            let scratch = ScratchDir::new().unwrap();
            std::fs::write(scratch.child("canonical.wav"), b"RIFF").unwrap();
            assert!(scratch.path().exists());
            scratch.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_scratch_dir_removed_on_error_path() {
        fn failing_request(seen: &mut Option<PathBuf>) -> Result<()> {
            let scratch = ScratchDir::new()?;
            std::fs::write(scratch.child("upload.mp3"), b"ID3")?;
            *seen = Some(scratch.path().to_path_buf());
            Err(ScribeError::Conversion("decoder exploded".to_string()))
        }

        let mut seen = None;
        assert!(failing_request(&mut seen).is_err());
        assert!(!seen.unwrap().exists());
    }

    #[test]
    fn test_scratch_dir_removed_on_panic() {
        let mut seen = None;
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let scratch = ScratchDir::new().unwrap();
            seen = Some(scratch.path().to_path_buf());
            panic!("unexpected failure mid-request");
        }));
        assert!(outcome.is_err());
        assert!(!seen.unwrap().exists());
    }

    #[tokio::test]
    async fn test_scratch_dir_removed_when_task_aborted() {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let handle = tokio::spawn(async move {
            let scratch = ScratchDir::new().unwrap();
            tx.send(scratch.path().to_path_buf()).unwrap();
            tokio::time::sleep(Duration::from_secs(3600)).await;
            drop(scratch);
        });

        let path = rx.await.unwrap();
        assert!(path.exists());
        handle.abort();
        assert!(handle.await.unwrap_err().is_cancelled());
        assert!(!path.exists());
    }

    #[test]
    fn test_close_tolerates_missing_directory() {
        let scratch = ScratchDir::new().unwrap();
        std::fs::remove_dir_all(scratch.path()).unwrap();
        assert!(scratch.close().is_ok());
    }

    #[test]
    fn test_remove_path_is_idempotent() {
        let scratch = ScratchDir::new().unwrap();
        let file = scratch.child("out.json");
        std::fs::write(&file, b"{}").unwrap();

        assert!(remove_path(&file).is_ok());
        assert!(remove_path(&file).is_ok());
        assert!(!file.exists());

        let nested = scratch.child("nested");
        std::fs::create_dir_all(nested.join("deeper")).unwrap();
        assert!(remove_path(&nested).is_ok());
        assert!(!nested.exists());
    }

    #[test]
    fn test_discard_entry() {
        let scratch = ScratchDir::new().unwrap();
        std::fs::write(scratch.child("upload.flac"), b"fLaC").unwrap();

        scratch.discard("upload.flac").unwrap();
        scratch.discard("upload.flac").unwrap();
        assert!(!scratch.child("upload.flac").exists());
        assert!(scratch.path().exists());
    }

    #[test]
    fn test_new_in_creates_root() {
        let root = ScratchDir::new().unwrap();
        let nested_root = root.child("scratch-root");
        let scratch = ScratchDir::new_in(&nested_root).unwrap();
        assert!(scratch.path().starts_with(&nested_root));
    }
}
