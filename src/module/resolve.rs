//! Import path resolution across module boundaries

use super::{find_module, PackageLocation};
use crate::checksum::TraversalState;
use crate::error::{GrError, GrResult};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Outcome of resolving an import path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// Package sources live in this directory and must be traced
    Local(PathBuf),
    /// Package comes from a remote module pinned by `go.mod`/`go.sum`
    Remote,
}

/// Resolve `import_path` as seen from the package in `dir`.
///
/// The longest matching package path of the owning module decides. When it
/// points at a replacement in another module, resolution restarts from the
/// replacement directory, so chains of replacements are followed.
pub fn resolve_import(state: &mut TraversalState, dir: &Path, import_path: &str) -> GrResult<Resolved> {
    let mut root = dir.to_path_buf();
    let mut hops = HashSet::new();

    loop {
        let module = find_module(state, &root)?;

        let (matched, location) = module
            .longest_match(import_path)
            .ok_or_else(|| GrError::OutsideModule(import_path.to_string()))?;

        let target = match location {
            PackageLocation::Remote => {
                debug!("{import_path}: remote (via {matched})");
                return Ok(Resolved::Remote);
            }
            PackageLocation::Local(target) => target.clone(),
        };

        if matched == module.path {
            let dir = module.dir_for_package(import_path);
            debug!("{import_path}: {}", dir.display());
            return Ok(Resolved::Local(dir));
        }

        // The package lives in another module; continue from there.
        if !hops.insert(target.clone()) {
            return Err(GrError::ReplacementCycle {
                import_path: import_path.to_string(),
                dir: target,
            });
        }
        debug!("{import_path}: replaced by {}", target.display());
        root = target;
    }
}
