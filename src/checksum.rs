//! Source checksums and the cache fingerprint
//!
//! Walks the source tree of a package and everything it imports locally,
//! hashing every file the compiler reads, then folds those hashes together
//! with the build flags and build-affecting environment into one key.
//!
//! The key does not need to be perfect: returning a fresh value every time
//! would be correct, if useless. The only real failure mode is returning the
//! same key for sources that differ.
//!
//! `go list` is deliberately not used here; it is far too slow to run on
//! every invocation.

use crate::build::BuildEnv;
use crate::error::{GrError, GrResult};
use crate::module::ModuleInfo;
use crate::paths;
use crate::source;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::debug;

/// Mutable state of one fingerprint computation
///
/// Created fresh for every computation and passed explicitly through every
/// resolution call. Never shared between computations.
#[derive(Debug, Default)]
pub struct TraversalState {
    /// Content hash of every file that went into the build, by absolute path
    pub(crate) file_hashes: BTreeMap<PathBuf, String>,

    /// Package directories already traced
    pub(crate) visited_packages: HashSet<PathBuf>,

    /// Owning module of every directory seen so far
    pub(crate) modules: HashMap<PathBuf, Rc<ModuleInfo>>,
}

impl TraversalState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a file has already been hashed
    pub fn contains(&self, path: &Path) -> bool {
        self.file_hashes.contains_key(path)
    }

    /// Hash a file and record it. Recording a file twice is an internal error.
    pub fn add_file(&mut self, path: &Path) -> GrResult<()> {
        if self.add_file_if_exists(path)? {
            Ok(())
        } else {
            Err(GrError::io(
                format!("reading {}", path.display()),
                io::Error::from(io::ErrorKind::NotFound),
            ))
        }
    }

    /// Like [`add_file`](Self::add_file), but a missing file is skipped.
    /// Returns whether the file was recorded.
    pub fn add_file_if_exists(&mut self, path: &Path) -> GrResult<bool> {
        if self.contains(path) {
            return Err(GrError::Internal(format!(
                "a checksum has been requested twice for file {}",
                path.display()
            )));
        }
        let hash = match hash_file(path) {
            Ok(hash) => hash,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(GrError::io(format!("reading {}", path.display()), e)),
        };
        debug!("hashed {} ({})", path.display(), &hash[..12]);
        self.file_hashes.insert(path.to_path_buf(), hash);
        Ok(true)
    }

    /// The hashes collected so far
    pub fn file_hashes(&self) -> &BTreeMap<PathBuf, String> {
        &self.file_hashes
    }
}

/// SHA256 of a file's contents as lowercase hex
pub fn hash_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

/// Collect the checksums of every source file of a package and its local
/// dependencies
pub fn package_source_checksums(dir: &Path) -> GrResult<BTreeMap<PathBuf, String>> {
    let abs_dir = paths::absolute(dir)
        .map_err(|e| GrError::io(format!("resolving {}", dir.display()), e))?;

    let mut state = TraversalState::new();
    source::trace_package(&mut state, &abs_dir)?;

    debug!(
        "traced {} files in {} packages",
        state.file_hashes.len(),
        state.visited_packages.len()
    );
    Ok(state.file_hashes)
}

/// Compute the cache key for a package built with the given flags and
/// environment
pub fn fingerprint(
    dir: &Path,
    compiler_flags: &[String],
    compiler_env: &BuildEnv,
) -> GrResult<String> {
    let files = package_source_checksums(dir)?;
    aggregate(&files, compiler_flags, compiler_env)
}

/// Environment value as it appears in the canonical form: a JSON string
/// when it is valid UTF-8, its raw bytes otherwise
#[derive(Serialize)]
#[serde(untagged)]
enum EnvValue<'a> {
    Text(&'a str),
    Bytes(&'a [u8]),
}

/// Fold file hashes, flags and environment into the fingerprint.
///
/// Map keys serialize in sorted order, so only the flags are order-sensitive.
pub fn aggregate(
    files: &BTreeMap<PathBuf, String>,
    compiler_flags: &[String],
    compiler_env: &BuildEnv,
) -> GrResult<String> {
    let env: BTreeMap<&str, EnvValue<'_>> = compiler_env
        .iter()
        .map(|(name, value)| {
            let value = match value.to_str() {
                Some(text) => EnvValue::Text(text),
                None => EnvValue::Bytes(value.as_encoded_bytes()),
            };
            (name.as_str(), value)
        })
        .collect();
    let files: BTreeMap<Cow<'_, str>, &String> = files
        .iter()
        .map(|(path, hash)| {
            let key = match path.to_str() {
                Some(text) => Cow::Borrowed(text),
                // Never collides with a real key: those are absolute paths.
                None => Cow::Owned(format!("bytes:{}", hex::encode(path.as_os_str().as_encoded_bytes()))),
            };
            (key, hash)
        })
        .collect();
    let canonical = serde_json::to_vec(&(&files, compiler_flags, &env))?;

    let mut hasher = Sha256::new();
    hasher.update(&canonical);
    Ok(hex::encode(hasher.finalize()))
}
