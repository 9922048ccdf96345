//! Go module discovery
//!
//! Finds the module owning a directory, parses its `go.mod`, and records
//! `go.mod`/`go.sum` in the traversal checksums. Remote modules are never
//! traced: their influence on the build is pinned by those two files.

pub mod gomod;
pub mod resolve;

pub use gomod::{GoMod, Replace};
pub use resolve::{resolve_import, Resolved};

use crate::checksum::TraversalState;
use crate::error::{GrError, GrResult};
use crate::paths;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::debug;

/// Module manifest file name
pub const MANIFEST: &str = "go.mod";

/// Module lockfile name
pub const LOCKFILE: &str = "go.sum";

/// Where the packages under an import path prefix live
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageLocation {
    /// Sources on disk, rooted at this directory
    Local(PathBuf),
    /// Fetched by the toolchain; not traced
    Remote,
}

/// What a module's `go.mod` says about package locations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleInfo {
    /// Declared module path
    pub path: String,

    /// Module root directory
    pub root: PathBuf,

    /// Import path prefix -> location. Always maps `path` to `Local(root)`.
    pub packages: HashMap<String, PackageLocation>,
}

impl ModuleInfo {
    /// Build module information from a parsed manifest located in `root`
    pub fn from_gomod(root: &Path, gomod: &GoMod) -> Self {
        let mut packages = HashMap::new();
        packages.insert(gomod.module.clone(), PackageLocation::Local(root.to_path_buf()));

        for require in &gomod.requires {
            packages.insert(require.clone(), PackageLocation::Remote);
        }

        for replace in gomod.replaces.iter().filter(|r| r.is_local()) {
            let target = Path::new(&replace.new_path);
            let dir = if target.is_absolute() {
                target.to_path_buf()
            } else {
                paths::clean(&root.join(target))
            };
            packages.insert(replace.old_path.clone(), PackageLocation::Local(dir));
        }

        // A require of the module itself must not hide the module root.
        packages.insert(gomod.module.clone(), PackageLocation::Local(root.to_path_buf()));

        Self {
            path: gomod.module.clone(),
            root: root.to_path_buf(),
            packages,
        }
    }

    /// The longest package path equal to or `/`-prefixing `import_path`
    pub fn longest_match(&self, import_path: &str) -> Option<(&str, &PackageLocation)> {
        self.packages
            .iter()
            .filter(|(path, _)| package_inside_of(import_path, path))
            .max_by_key(|(path, _)| path.len())
            .map(|(path, location)| (path.as_str(), location))
    }

    /// Directory of a package belonging to this module
    pub fn dir_for_package(&self, import_path: &str) -> PathBuf {
        if import_path == self.path {
            return self.root.clone();
        }
        let rest = import_path
            .strip_prefix(&self.path)
            .and_then(|r| r.strip_prefix('/'))
            .unwrap_or(import_path);
        paths::clean(&self.root.join(rest))
    }
}

/// Whether `path` is `base` or a package below it
pub fn package_inside_of(path: &str, base: &str) -> bool {
    path == base
        || path
            .strip_prefix(base)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Find the module owning `dir`, climbing towards the filesystem root.
///
/// Every directory passed on the way is cached, so sibling packages resolve
/// without touching the filesystem again.
pub fn find_module(state: &mut TraversalState, dir: &Path) -> GrResult<Rc<ModuleInfo>> {
    let mut uncached = Vec::new();
    let mut current = dir.to_path_buf();

    let info = loop {
        if let Some(info) = state.modules.get(&current) {
            break Rc::clone(info);
        }
        uncached.push(current.clone());

        let manifest = current.join(MANIFEST);
        match fs::metadata(&manifest) {
            Ok(_) => {
                let info = parse_module(state, &current)?;
                break Rc::new(info);
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(GrError::io(format!("reading {}", manifest.display()), e)),
        }

        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => return Err(GrError::NoEnclosingModule(dir.to_path_buf())),
        }
    };

    for d in uncached {
        state.modules.insert(d, Rc::clone(&info));
    }
    Ok(info)
}

/// Parse the module rooted at `dir` and checksum its manifest and lockfile
fn parse_module(state: &mut TraversalState, dir: &Path) -> GrResult<ModuleInfo> {
    let manifest = dir.join(MANIFEST);
    let contents = fs::read_to_string(&manifest)
        .map_err(|e| GrError::io(format!("reading {}", manifest.display()), e))?;

    let gomod = gomod::parse(&manifest, &contents)?;
    debug!("module {} at {}", gomod.module, dir.display());
    let info = ModuleInfo::from_gomod(dir, &gomod);

    state.add_file(&manifest)?;
    state.add_file_if_exists(&dir.join(LOCKFILE))?;

    Ok(info)
}
