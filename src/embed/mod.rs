//! `//go:embed` resolution
//!
//! Expands the patterns of a package's embed directives into the set of files
//! the Go toolchain would embed, applying the same module-boundary and
//! file-name restrictions so that the checksum covers exactly those files.

pub mod directive;
pub mod names;
pub mod pattern;

pub use directive::parse_directive;

use crate::error::{GrError, GrResult};
use crate::module::MANIFEST;
use crate::paths;
use names::is_bad_embed_name;
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Prefix that includes hidden files when embedding a directory
const ALL_PREFIX: &str = "all:";

/// Resolve embed patterns of the package in `dir` to the sorted, deduplicated
/// list of embedded files, relative to `dir` with `/` separators.
///
/// Every pattern must match at least one file. Directories are embedded
/// recursively, skipping nested modules and files that could not be part of a
/// module.
pub fn resolve(dir: &Path, patterns: &[String]) -> GrResult<Vec<String>> {
    let mut files = BTreeSet::new();
    let mut dir_ok = HashSet::new();

    for pattern in patterns {
        let fail = |reason: String| GrError::EmbedPattern {
            dir: dir.to_path_buf(),
            pattern: pattern.clone(),
            reason,
        };

        let (glob, all) = match pattern.strip_prefix(ALL_PREFIX) {
            Some(glob) => (glob, true),
            None => (pattern.as_str(), false),
        };
        if !pattern::is_valid_embed_pattern(glob) {
            return Err(fail("invalid pattern syntax".to_string()));
        }

        let mut matched = 0usize;
        for file in pattern::glob(dir, glob) {
            let rel = relative(&file, dir);
            let info = fs::symlink_metadata(&file)
                .map_err(|e| GrError::io(format!("reading {}", file.display()), e))?;
            let what = if info.is_dir() { "directory" } else { "file" };

            check_path(dir, &file, &mut dir_ok).map_err(|problem| {
                fail(format!("cannot embed {what} {rel}: {problem}"))
            })?;

            if info.is_file() {
                matched += 1;
                files.insert(rel);
            } else if info.is_dir() {
                let found = embed_directory(dir, &file, all, &mut files)?;
                if found == 0 {
                    return Err(fail(format!(
                        "cannot embed directory {rel}: contains no embeddable files"
                    )));
                }
                matched += found;
            } else {
                return Err(fail(format!("cannot embed irregular file {rel}")));
            }
        }

        if matched == 0 {
            return Err(fail("no matching files found".to_string()));
        }
        debug!("embed pattern {pattern}: {matched} file(s)");
    }

    Ok(files.into_iter().collect())
}

/// Check every path element from `file` up to (excluding) `dir`.
///
/// No element may start a nested module, be a non-directory or carry a name
/// that cannot be embedded.
fn check_path(dir: &Path, file: &Path, dir_ok: &mut HashSet<PathBuf>) -> Result<(), String> {
    let mut current = file.to_path_buf();

    while current != dir && current.starts_with(dir) && !dir_ok.contains(&current) {
        if fs::metadata(current.join(MANIFEST)).is_ok() {
            return Err("in different module".to_string());
        }
        if current != file {
            if let Ok(info) = fs::symlink_metadata(&current) {
                if !info.is_dir() {
                    return Err(format!("in non-directory {}", relative(&current, dir)));
                }
            }
        }
        dir_ok.insert(current.clone());

        let elem = current
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if is_bad_embed_name(&elem) {
            return Err(if current == file {
                format!("invalid name {elem}")
            } else {
                format!("in invalid directory {elem}")
            });
        }

        current.pop();
    }

    Ok(())
}

/// Add every embeddable regular file below `root` and return how many were
/// found
fn embed_directory(dir: &Path, root: &Path, all: bool, files: &mut BTreeSet<String>) -> GrResult<usize> {
    let mut count = 0;
    let mut walker = WalkDir::new(root).follow_links(false).sort_by_file_name().into_iter();

    while let Some(entry) = walker.next() {
        let entry = entry.map_err(|e| GrError::io(format!("walking {}", root.display()), e.into()))?;
        let is_dir = entry.file_type().is_dir();

        if entry.depth() > 0 {
            let skip = match entry.file_name().to_str() {
                None => true,
                Some(name) => {
                    is_bad_embed_name(name) || (!all && (name.starts_with('.') || name.starts_with('_')))
                }
            };
            if skip {
                if is_dir {
                    walker.skip_current_dir();
                }
                continue;
            }
        }

        if is_dir {
            if entry.depth() > 0 && fs::metadata(entry.path().join(MANIFEST)).is_ok() {
                walker.skip_current_dir();
            }
            continue;
        }
        if !entry.file_type().is_file() {
            continue;
        }

        count += 1;
        files.insert(relative(entry.path(), dir));
    }

    Ok(count)
}

fn relative(path: &Path, dir: &Path) -> String {
    paths::slash_relative(path, dir).unwrap_or_else(|| path.display().to_string())
}
