//! Package source discovery
//!
//! Enumerates the files the Go toolchain reads when building a package,
//! hashes them, and follows local imports and `//go:embed` patterns.

pub mod scan;

pub use scan::{scan, SourceInfo};

use crate::checksum::TraversalState;
use crate::embed;
use crate::error::{GrError, GrResult};
use crate::module::{find_module, resolve_import, Resolved};
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use tracing::debug;

// The Go compiler reads .go files; cgo reads the rest.
static SOURCE_FILE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\.(go|s|S|c|cc|cpp|cxx|m|h|hh|hpp|hxx|f|F|for|f90)$").expect("valid regex")
});

// Standard library import paths have no dot in their first element.
static STDLIB_IMPORT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]+(/|$)").expect("valid regex"));

/// Whether a file name is part of a package's compiled sources
pub fn is_package_file(name: &str) -> bool {
    if name.ends_with("_test.go") {
        return false;
    }
    if name.starts_with('_') || name.starts_with('.') {
        return false;
    }
    SOURCE_FILE.is_match(name)
}

/// Whether an import path names a standard library package.
///
/// These are versioned with the toolchain, which the tracked environment
/// already covers, so they are never resolved.
pub fn is_standard_library(import_path: &str) -> bool {
    STDLIB_IMPORT.is_match(import_path)
}

/// Hash the sources of the package in `dir` and of every local package it
/// imports, directly or not
pub fn trace_package(state: &mut TraversalState, dir: &Path) -> GrResult<()> {
    if !state.visited_packages.insert(dir.to_path_buf()) {
        return Ok(());
    }
    debug!("tracing package {}", dir.display());

    // Resolve the module even for stdlib-only packages so that go.mod and
    // go.sum always end up in the checksum.
    find_module(state, dir)?;

    let mut entries = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| GrError::io(format!("reading {}", dir.display()), e))? {
        let entry = entry.map_err(|e| GrError::io(format!("reading {}", dir.display()), e))?;
        let file_type = entry
            .file_type()
            .map_err(|e| GrError::io(format!("reading {}", entry.path().display()), e))?;
        if !file_type.is_file() {
            continue;
        }
        let name = entry.file_name();
        if is_package_file(&name.to_string_lossy()) {
            entries.push(name);
        }
    }
    entries.sort();

    let mut embed_patterns = Vec::new();

    for name in &entries {
        let path = dir.join(name);
        state.add_file(&path)?;

        if !name.to_string_lossy().ends_with(".go") {
            continue;
        }

        let contents = fs::read_to_string(&path)
            .map_err(|e| GrError::io(format!("reading {}", path.display()), e))?;
        let info = scan(&contents).map_err(|reason| GrError::source_invalid(&path, reason))?;

        for import in &info.imports {
            if is_standard_library(import) {
                continue;
            }
            match resolve_import(state, dir, import)? {
                // Remote packages are pinned by go.mod/go.sum already.
                Resolved::Remote => {}
                Resolved::Local(package_dir) => trace_package(state, &package_dir)?,
            }
        }

        for args in &info.embeds {
            let patterns = embed::parse_directive(args).map_err(|reason| GrError::EmbedDirective {
                path: path.clone(),
                reason,
            })?;
            embed_patterns.extend(patterns);
        }
    }

    let files = embed::resolve(dir, &embed_patterns)?;
    for file in files {
        let path = dir.join(&file);
        // An embedded source file has been hashed above already.
        if !state.contains(&path) {
            state.add_file(&path)?;
        }
    }

    Ok(())
}
