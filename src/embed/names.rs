//! File name rules for embedded files
//!
//! The Go toolchain refuses to embed files whose names could not appear in a
//! module zip, as well as version-control metadata directories.

const VCS_DIRS: [&str; 4] = [".bzr", ".hg", ".git", ".svn"];

const RESERVED_NAMES: [&str; 22] = [
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8", "COM9",
    "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Whether a single path element may not be embedded
pub fn is_bad_embed_name(name: &str) -> bool {
    if !is_valid_file_element(name) {
        return true;
    }
    VCS_DIRS.contains(&name)
}

fn is_valid_file_element(elem: &str) -> bool {
    if elem.is_empty() || elem.chars().all(|c| c == '.') || elem.ends_with('.') {
        return false;
    }
    if !elem.chars().all(is_allowed_char) {
        return false;
    }

    let short = elem.split('.').next().unwrap_or(elem);
    if RESERVED_NAMES.iter().any(|r| r.eq_ignore_ascii_case(short)) {
        return false;
    }

    // Windows 8.3 short names such as EXAMPL~1.
    if let Some(tilde) = short.rfind('~') {
        let suffix = &short[tilde + 1..];
        if !suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }
    }

    true
}

fn is_allowed_char(c: char) -> bool {
    if c.is_ascii() {
        return c.is_ascii_alphanumeric() || "!#$%&()+,-.=@[]^_{}~ ".contains(c);
    }
    c.is_alphabetic()
}
