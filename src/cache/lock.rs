//! Advisory directory locks
//!
//! On Unix the lock is held on an open handle of the package cache
//! directory itself; elsewhere, where directories cannot be opened as files,
//! on a [`LOCK_FILE`] inside it. Either way the kernel releases the lock when
//! the handle is closed, including when the process dies. Advisory locks may
//! be unreliable on network filesystems.

use crate::error::{GrError, GrResult};
use fs2::FileExt;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Lock file used where a directory handle cannot be locked. Never a cache
/// entry: entries are named by hex fingerprints.
pub const LOCK_FILE: &str = ".lock";

/// Exclusive lock on a directory, released on drop
#[derive(Debug)]
pub struct DirLock {
    path: PathBuf,
    handle: File,
}

impl DirLock {
    /// Block until an exclusive lock on `dir` is held
    pub fn acquire(dir: &Path) -> GrResult<Self> {
        let lock_err = |e: io::Error| GrError::CacheLock {
            path: dir.to_path_buf(),
            source: e,
        };

        let handle = open_handle(dir).map_err(lock_err)?;
        loop {
            match handle.lock_exclusive() {
                Ok(()) => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(lock_err(e)),
            }
        }
        debug!("locked {}", dir.display());

        Ok(Self {
            path: dir.to_path_buf(),
            handle,
        })
    }

}

impl Drop for DirLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.handle) {
            debug!("unlocking {}: {e}", self.path.display());
        }
        debug!("unlocked {}", self.path.display());
    }
}

#[cfg(unix)]
fn open_handle(dir: &Path) -> io::Result<File> {
    File::open(dir)
}

#[cfg(not(unix))]
fn open_handle(dir: &Path) -> io::Result<File> {
    if !dir.is_dir() {
        return Err(io::Error::new(io::ErrorKind::NotFound, "not a directory"));
    }
    File::options()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(dir.join(LOCK_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn missing_directory_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = DirLock::acquire(&dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, GrError::CacheLock { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn second_lock_waits_for_release() {
        let dir = TempDir::new().unwrap();
        let first = DirLock::acquire(dir.path()).unwrap();

        let acquired = Arc::new(AtomicBool::new(false));
        let waiter = {
            let path = dir.path().to_path_buf();
            let acquired = Arc::clone(&acquired);
            std::thread::spawn(move || {
                let _second = DirLock::acquire(&path).unwrap();
                acquired.store(true, Ordering::SeqCst);
            })
        };

        std::thread::sleep(Duration::from_millis(200));
        assert!(!acquired.load(Ordering::SeqCst));

        drop(first);
        waiter.join().unwrap();
        assert!(acquired.load(Ordering::SeqCst));
    }
}
