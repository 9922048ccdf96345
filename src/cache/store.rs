//! On-disk executable cache
//!
//! Layout: `<cache root>/gr/exe/<absolute package path>/<fingerprint>`.
//! Entries are write-once at content-addressed paths, so probing needs no
//! lock. Building and retention cleanup of one package happen under an
//! exclusive lock on its cache directory.

use super::lock::{DirLock, LOCK_FILE};
use crate::build::{BuildRequest, Compiler};
use crate::error::{GrError, GrResult};
use crate::exec::Launcher;
use crate::paths;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info};

/// Subdirectory of the cache root holding executables
pub const EXE_SUBDIR: [&str; 2] = ["gr", "exe"];

/// Number of entries kept per package unless configured otherwise
pub const DEFAULT_KEEP_ENTRIES: usize = 2;

/// Outcome of trying to run a cache entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    /// The entry ran and exited with this status
    Exited(i32),
    /// There is no such entry
    Missing,
}

/// Cached executables of every package
#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
    keep_entries: usize,
}

impl CacheStore {
    /// Store below `cache_root`, keeping `keep_entries` (at least one)
    /// entries per package
    pub fn new(cache_root: &Path, keep_entries: usize) -> Self {
        let mut root = cache_root.to_path_buf();
        root.extend(EXE_SUBDIR);
        Self {
            root,
            keep_entries: keep_entries.max(1),
        }
    }

    /// Store below the configured cache root, or the user cache directory
    pub fn open(cache_root: Option<&Path>, keep_entries: usize) -> GrResult<Self> {
        let cache_root = match cache_root {
            Some(dir) => dir.to_path_buf(),
            None => dirs::cache_dir().ok_or(GrError::NoCacheDir)?,
        };
        let cache_root = paths::absolute(&cache_root)
            .map_err(|e| GrError::io(format!("resolving cache root {}", cache_root.display()), e))?;
        debug!("cache root {}", cache_root.display());
        Ok(Self::new(&cache_root, keep_entries))
    }

    /// Directory holding every entry of the package at `package` (absolute)
    pub fn package_dir(&self, package: &Path) -> PathBuf {
        paths::nest(&self.root, package)
    }

    /// Path of the entry for a package and fingerprint
    pub fn entry_path(&self, package: &Path, fingerprint: &str) -> PathBuf {
        self.package_dir(package).join(fingerprint)
    }

    /// Try to run an entry. A missing entry is reported as [`Probe::Missing`];
    /// any other failure to start it is fatal.
    pub fn probe(&self, launcher: &dyn Launcher, path: &Path, arg0: &str, args: &[String]) -> GrResult<Probe> {
        match launcher.launch(path, arg0, args) {
            Ok(code) => Ok(Probe::Exited(code)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("cache miss: {}", path.display());
                Ok(Probe::Missing)
            }
            Err(e) => Err(GrError::Exec {
                path: path.to_path_buf(),
                source: e,
            }),
        }
    }

    /// Build the entry at `request.output` unless another process has built
    /// it meanwhile, then drop old entries of the package.
    ///
    /// Cleanup runs even when the build fails; the build error wins.
    pub async fn update(&self, compiler: &dyn Compiler, request: &BuildRequest) -> GrResult<()> {
        let dir = request
            .output
            .parent()
            .ok_or_else(|| GrError::Internal(format!("cache entry {} has no parent", request.output.display())))?
            .to_path_buf();

        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| GrError::io(format!("creating {}", dir.display()), e))?;

        let lock_dir = dir.clone();
        let _lock = tokio::task::spawn_blocking(move || DirLock::acquire(&lock_dir))
            .await
            .map_err(|e| GrError::Internal(format!("cache lock task failed: {e}")))??;

        let exists = tokio::fs::try_exists(&request.output)
            .await
            .map_err(|e| GrError::io(format!("checking {}", request.output.display()), e))?;

        let built = if exists {
            debug!("{} was built while waiting for the lock", request.output.display());
            Ok(())
        } else {
            info!("building {}", request.package_dir.display());
            compiler.build(request).await
        };

        let cleaned = self.cleanup(&dir);
        built?;
        let removed = cleaned?;
        if removed > 0 {
            debug!("removed {removed} old cache entries from {}", dir.display());
        }
        Ok(())
    }

    /// Remove all but the `keep_entries` most recently modified entries of a
    /// package directory. Entries that vanish meanwhile are ignored.
    ///
    /// Callers must hold the directory lock.
    pub fn cleanup(&self, dir: &Path) -> GrResult<usize> {
        let read_err = |e: io::Error| GrError::io(format!("reading {}", dir.display()), e);

        let mut entries: Vec<(SystemTime, PathBuf)> = Vec::new();
        for entry in fs::read_dir(dir).map_err(read_err)? {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(read_err(e)),
            };
            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(GrError::io(format!("reading {}", entry.path().display()), e)),
            };
            if !metadata.is_file() || entry.file_name() == LOCK_FILE {
                continue;
            }
            let modified = metadata
                .modified()
                .map_err(|e| GrError::io(format!("reading {}", entry.path().display()), e))?;
            entries.push((modified, entry.path()));
        }

        // Newest first; ties broken by name so the outcome is stable.
        entries.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));

        let mut removed = 0;
        for (_, path) in entries.into_iter().skip(self.keep_entries) {
            match fs::remove_file(&path) {
                Ok(()) => {
                    debug!("removed {}", path.display());
                    removed += 1;
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(GrError::io(format!("removing {}", path.display()), e)),
            }
        }

        Ok(removed)
    }
}
