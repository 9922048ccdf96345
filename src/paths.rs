//! Lexical path helpers

use std::path::{Component, Path, PathBuf};

/// Lexically clean a path: drop `.` components and fold `..` into its parent.
///
/// A `..` directly below the root is dropped, as `/..` is `/`. No filesystem
/// access is made, so symlinks are not resolved.
pub fn clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    let mut depth = 0usize;
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if depth > 0 {
                    out.pop();
                    depth -= 1;
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            Component::Normal(name) => {
                out.push(name);
                depth += 1;
            }
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// Make a path absolute against the current directory and clean it
pub fn absolute(path: &Path) -> std::io::Result<PathBuf> {
    if path.is_absolute() {
        return Ok(clean(path));
    }
    Ok(clean(&std::env::current_dir()?.join(path)))
}

/// Join an absolute path below `base`, keeping only its normal components
pub fn nest(base: &Path, absolute: &Path) -> PathBuf {
    let mut out = base.to_path_buf();
    for component in absolute.components() {
        if let Component::Normal(name) = component {
            out.push(name);
        }
    }
    out
}

/// Relative path of `path` below `base` with `/` separators
pub fn slash_relative(path: &Path, base: &Path) -> Option<String> {
    let rel = path.strip_prefix(base).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}
