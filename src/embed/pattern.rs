//! Glob patterns with Go `path.Match` / `filepath.Glob` semantics
//!
//! `*` matches any run of non-`/` characters, `?` a single non-`/`
//! character, `[...]` a character class (`^` negates, `a-z` ranges) and
//! `\` escapes the next character. Leading dots are not special.

use std::fs;
use std::path::{Path, PathBuf};

/// Malformed pattern syntax
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BadPattern;

/// Whether a pattern contains glob metacharacters
pub fn has_meta(pattern: &str) -> bool {
    pattern.contains(['*', '?', '[', '\\'])
}

/// Whether `pattern` is acceptable in a `//go:embed` directive: valid glob
/// syntax and a clean, relative, slash-separated path
pub fn is_valid_embed_pattern(pattern: &str) -> bool {
    if matches(pattern, "").is_err() || pattern == "." {
        return false;
    }
    pattern
        .split('/')
        .all(|elem| !elem.is_empty() && elem != "." && elem != "..")
}

/// Report whether `name` matches the shell pattern
pub fn matches(pattern: &str, name: &str) -> Result<bool, BadPattern> {
    let pattern: Vec<char> = pattern.chars().collect();
    let name: Vec<char> = name.chars().collect();
    match_chars(&pattern, &name)
}

fn match_chars(mut pattern: &[char], mut name: &[char]) -> Result<bool, BadPattern> {
    'chunks: while !pattern.is_empty() {
        let (star, chunk, rest) = scan_chunk(pattern);
        pattern = rest;

        if star && chunk.is_empty() {
            // Trailing * matches the rest unless it has a /.
            return Ok(!name.contains(&'/'));
        }

        if let Some(t) = match_chunk(chunk, name)? {
            // The last chunk has to consume the whole name.
            if t.is_empty() || !pattern.is_empty() {
                name = t;
                continue;
            }
        }

        if star {
            let mut i = 0;
            while i < name.len() && name[i] != '/' {
                if let Some(t) = match_chunk(chunk, &name[i + 1..])? {
                    if pattern.is_empty() && !t.is_empty() {
                        i += 1;
                        continue;
                    }
                    name = t;
                    continue 'chunks;
                }
                i += 1;
            }
        }

        // No match; still report syntax errors in the remaining pattern.
        while !pattern.is_empty() {
            let (_, chunk, rest) = scan_chunk(pattern);
            pattern = rest;
            match_chunk(chunk, &[])?;
        }
        return Ok(false);
    }

    Ok(name.is_empty())
}

/// Split off leading stars and the literal/class chunk that follows them
fn scan_chunk(pattern: &[char]) -> (bool, &[char], &[char]) {
    let mut star = false;
    let mut p = pattern;
    while p.first() == Some(&'*') {
        p = &p[1..];
        star = true;
    }

    let mut in_range = false;
    let mut i = 0;
    while i < p.len() {
        match p[i] {
            '\\' if i + 1 < p.len() => i += 1,
            '[' => in_range = true,
            ']' => in_range = false,
            '*' if !in_range => break,
            _ => {}
        }
        i += 1;
    }
    (star, &p[..i], &p[i..])
}

/// Match a chunk against the start of `s`, returning the unmatched rest.
///
/// After a mismatch the chunk is still parsed to the end so that malformed
/// syntax is reported regardless of the input.
fn match_chunk<'s>(mut chunk: &[char], mut s: &'s [char]) -> Result<Option<&'s [char]>, BadPattern> {
    let mut failed = false;

    while let Some(&c) = chunk.first() {
        if !failed && s.is_empty() {
            failed = true;
        }
        match c {
            '[' => {
                let mut r = '\0';
                if !failed {
                    r = s[0];
                    s = &s[1..];
                }
                chunk = &chunk[1..];

                let negated = chunk.first() == Some(&'^');
                if negated {
                    chunk = &chunk[1..];
                }

                let mut matched = false;
                let mut ranges = 0;
                loop {
                    if chunk.first() == Some(&']') && ranges > 0 {
                        chunk = &chunk[1..];
                        break;
                    }
                    let (lo, rest) = class_char(chunk)?;
                    chunk = rest;
                    let mut hi = lo;
                    if chunk[0] == '-' {
                        let (h, rest) = class_char(&chunk[1..])?;
                        hi = h;
                        chunk = rest;
                    }
                    if lo <= r && r <= hi {
                        matched = true;
                    }
                    ranges += 1;
                }
                if matched == negated {
                    failed = true;
                }
            }
            '?' => {
                if !failed {
                    if s[0] == '/' {
                        failed = true;
                    }
                    s = &s[1..];
                }
                chunk = &chunk[1..];
            }
            _ => {
                let mut literal = c;
                if c == '\\' {
                    chunk = &chunk[1..];
                    literal = *chunk.first().ok_or(BadPattern)?;
                }
                if !failed {
                    if literal != s[0] {
                        failed = true;
                    }
                    s = &s[1..];
                }
                chunk = &chunk[1..];
            }
        }
    }

    Ok(if failed { None } else { Some(s) })
}

/// One possibly escaped character of a class. The class must continue
/// after it.
fn class_char(chunk: &[char]) -> Result<(char, &[char]), BadPattern> {
    let mut chunk = chunk;
    match chunk.first() {
        None | Some('-') | Some(']') => return Err(BadPattern),
        Some('\\') => {
            chunk = &chunk[1..];
            if chunk.is_empty() {
                return Err(BadPattern);
            }
        }
        Some(_) => {}
    }
    let rest = &chunk[1..];
    if rest.is_empty() {
        return Err(BadPattern);
    }
    Ok((chunk[0], rest))
}

/// Expand a slash-separated pattern relative to `base`.
///
/// Matches are returned in directory-listing order per level, names sorted.
/// Unreadable directories contribute nothing.
pub fn glob(base: &Path, pattern: &str) -> Vec<PathBuf> {
    if !has_meta(pattern) {
        let path = base.join(pattern);
        return if fs::symlink_metadata(&path).is_ok() {
            vec![path]
        } else {
            Vec::new()
        };
    }

    let segments: Vec<&str> = pattern.split('/').collect();
    let mut current = vec![base.to_path_buf()];

    for (index, segment) in segments.iter().enumerate() {
        let last = index + 1 == segments.len();
        let mut next = Vec::new();

        for dir in &current {
            if !has_meta(segment) {
                let path = dir.join(segment);
                if !last || fs::symlink_metadata(&path).is_ok() {
                    next.push(path);
                }
                continue;
            }

            if !fs::metadata(dir).is_ok_and(|m| m.is_dir()) {
                continue;
            }
            let Ok(entries) = fs::read_dir(dir) else {
                continue;
            };
            let mut names: Vec<String> = entries
                .filter_map(Result::ok)
                .filter_map(|e| e.file_name().into_string().ok())
                .collect();
            names.sort();

            for name in names {
                if matches(segment, &name).unwrap_or(false) {
                    next.push(dir.join(name));
                }
            }
        }

        current = next;
    }

    current
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::write_tree;
    use tempfile::TempDir;

    #[test]
    fn match_semantics() {
        let cases = [
            ("abc", "abc", true),
            ("*", "abc", true),
            ("*", ".hidden", true),
            ("*c", "abc", true),
            ("a*", "a", true),
            ("a*/b", "abc/b", true),
            ("a*", "ab/c", false),
            ("a*b*c*d*e*/f", "axbxcxdxe/f", true),
            ("a*b?c*x", "abxbbxdbxebxczzx", true),
            ("a*b?c*x", "abxbbxdbxebxczzy", false),
            ("ab[c]", "abc", true),
            ("ab[b-d]", "abc", true),
            ("ab[e-g]", "abc", false),
            ("ab[^c]", "abc", false),
            ("ab[^b-d]", "abe", true),
            ("a\\*b", "a*b", true),
            ("a\\*b", "ab", false),
            ("a?b", "a☺b", true),
            ("a?b", "a/b", false),
            ("a*b", "a/b", false),
            ("[\\]a]", "]", true),
            ("[x\\-]", "-", true),
            ("*x", "xxx", true),
        ];
        for (pattern, name, want) in cases {
            assert_eq!(matches(pattern, name), Ok(want), "{pattern} vs {name}");
        }
    }

    #[test]
    fn bad_patterns() {
        for pattern in ["[", "[^", "[^bc", "a[", "[]a]", "[-]", "[x-]", "[a-b-c]", "\\", "a\\", "*x["] {
            assert_eq!(matches(pattern, "x"), Err(BadPattern), "{pattern}");
        }
    }

    #[test]
    fn embed_pattern_validity() {
        assert!(is_valid_embed_pattern("static/*.html"));
        assert!(is_valid_embed_pattern(".hidden"));
        assert!(!is_valid_embed_pattern("."));
        assert!(!is_valid_embed_pattern(""));
        assert!(!is_valid_embed_pattern("../x"));
        assert!(!is_valid_embed_pattern("a/./b"));
        assert!(!is_valid_embed_pattern("/abs"));
        assert!(!is_valid_embed_pattern("dir/"));
        assert!(!is_valid_embed_pattern("a["));
    }

    #[test]
    fn glob_expands_per_segment() {
        let dir = TempDir::new().unwrap();
        write_tree(
            dir.path(),
            &[
                ("a/x.txt", ""),
                ("a/y.txt", ""),
                ("a/z.md", ""),
                ("b/x.txt", ""),
                ("c", ""),
                (".dot.txt", ""),
            ],
        );

        let rel = |v: Vec<PathBuf>| -> Vec<String> {
            v.iter()
                .map(|p| crate::paths::slash_relative(p, dir.path()).unwrap())
                .collect()
        };

        assert_eq!(rel(glob(dir.path(), "a/*.txt")), vec!["a/x.txt", "a/y.txt"]);
        assert_eq!(rel(glob(dir.path(), "*/x.txt")), vec!["a/x.txt", "b/x.txt"]);
        assert_eq!(rel(glob(dir.path(), "*.txt")), vec![".dot.txt"]);
        assert_eq!(rel(glob(dir.path(), "c")), vec!["c"]);
        assert!(glob(dir.path(), "missing").is_empty());
        assert!(glob(dir.path(), "c/*").is_empty());
    }
}
