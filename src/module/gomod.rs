//! `go.mod` parsing
//!
//! A self-contained reimplementation of the parts of the `go.mod` grammar
//! that matter for source tracing: the module path, required modules and
//! `replace` directives. Every other directive is syntax-checked and dropped.

use crate::error::{GrError, GrResult};
use crate::literal;
use std::path::{Path, PathBuf};

/// Parsed contents of a `go.mod` file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoMod {
    /// Declared module path
    pub module: String,

    /// Paths of required modules, in file order
    pub requires: Vec<String>,

    /// Replace directives, in file order
    pub replaces: Vec<Replace>,
}

/// A single `replace old [v] => new [v]` directive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replace {
    pub old_path: String,
    pub new_path: String,
    pub new_version: Option<String>,
}

impl Replace {
    /// Whether this replacement points at a directory on disk
    pub fn is_local(&self) -> bool {
        self.new_version.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Token {
    text: String,
    quoted: bool,
}

impl Token {
    fn is(&self, s: &str) -> bool {
        !self.quoted && self.text == s
    }
}

/// Parse `go.mod` contents; `path` is only used in error messages
pub fn parse(path: &Path, contents: &str) -> GrResult<GoMod> {
    let invalid = |line: usize, reason: String| GrError::ManifestInvalid {
        path: path.to_path_buf(),
        line,
        reason,
    };

    let mut parsed = GoMod::default();
    let mut have_module = false;
    let mut block: Option<(String, usize)> = None;

    for (index, raw_line) in contents.lines().enumerate() {
        let line = index + 1;
        let tokens = tokenize(raw_line).map_err(|reason| invalid(line, reason))?;
        if tokens.is_empty() {
            continue;
        }

        if let Some(verb) = block.as_ref().map(|(verb, _)| verb.clone()) {
            if tokens.len() == 1 && tokens[0].is(")") {
                block = None;
                continue;
            }
            if tokens.iter().any(|t| t.is("(") || t.is(")")) {
                return Err(invalid(line, "unexpected parenthesis".to_string()));
            }
            apply(&mut parsed, &mut have_module, &verb, &tokens).map_err(|r| invalid(line, r))?;
            continue;
        }

        let verb = &tokens[0];
        if verb.quoted {
            return Err(invalid(line, format!("unknown directive: {}", verb.text)));
        }
        if tokens.len() == 2 && tokens[1].is("(") {
            block = Some((verb.text.clone(), line));
            continue;
        }
        if tokens.iter().any(|t| t.is("(") || t.is(")")) {
            return Err(invalid(line, "unexpected parenthesis".to_string()));
        }
        let verb = verb.text.clone();
        apply(&mut parsed, &mut have_module, &verb, &tokens[1..]).map_err(|r| invalid(line, r))?;
    }

    if let Some((verb, line)) = block {
        return Err(invalid(line, format!("unterminated {verb} block")));
    }
    if !have_module {
        return Err(invalid(1, "no module directive".to_string()));
    }

    Ok(parsed)
}

fn apply(parsed: &mut GoMod, have_module: &mut bool, verb: &str, args: &[Token]) -> Result<(), String> {
    match verb {
        "module" => {
            if *have_module {
                return Err("repeated module statement".to_string());
            }
            let [path] = args else {
                return Err("usage: module module/path".to_string());
            };
            parsed.module = path.text.clone();
            *have_module = true;
        }
        "go" | "toolchain" | "tool" | "ignore" => {
            if args.len() != 1 {
                return Err(format!("usage: {verb} <value>"));
            }
        }
        "godebug" => {
            if args.len() != 1 || !args[0].text.contains('=') {
                return Err("usage: godebug key=value".to_string());
            }
        }
        "require" | "exclude" => {
            let [path, _version] = args else {
                return Err(format!("usage: {verb} module/path v1.2.3"));
            };
            if verb == "require" {
                parsed.requires.push(path.text.clone());
            }
        }
        "replace" => parsed.replaces.push(parse_replace(args)?),
        "retract" => {
            if args.is_empty() {
                return Err("usage: retract version".to_string());
            }
        }
        _ => return Err(format!("unknown directive: {verb}")),
    }
    Ok(())
}

fn parse_replace(args: &[Token]) -> Result<Replace, String> {
    const USAGE: &str = "usage: replace module/path [v1.2.3] => other/module v1.4 \
                         or replace module/path [v1.2.3] => ../local/directory";

    let arrow = args.iter().position(|t| t.is("=>")).ok_or(USAGE)?;
    let (old, new) = (&args[..arrow], &args[arrow + 1..]);
    if !(1..=2).contains(&old.len()) || !(1..=2).contains(&new.len()) {
        return Err(USAGE.to_string());
    }

    let replace = Replace {
        old_path: old[0].text.clone(),
        new_path: new[0].text.clone(),
        new_version: new.get(1).map(|t| t.text.clone()),
    };

    if replace.is_local() && !is_directory_path(&replace.new_path) {
        return Err(
            "replacement module without version must be directory path (rooted or starting with ./ or ../)"
                .to_string(),
        );
    }
    Ok(replace)
}

/// Whether a replacement target names a directory rather than a module
pub fn is_directory_path(path: &str) -> bool {
    path == "."
        || path == ".."
        || path.starts_with("./")
        || path.starts_with("../")
        || path.starts_with('/')
        || path.starts_with(".\\")
        || path.starts_with("..\\")
        || PathBuf::from(path).is_absolute()
}

fn tokenize(line: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut rest = line;

    loop {
        rest = rest.trim_start();
        if rest.is_empty() || rest.starts_with("//") {
            break;
        }

        let first = rest.as_bytes()[0];
        match first {
            b'(' | b')' => {
                tokens.push(Token {
                    text: rest[..1].to_string(),
                    quoted: false,
                });
                rest = &rest[1..];
            }
            b'"' | b'`' => {
                let end = quoted_end(rest).ok_or_else(|| format!("unterminated quoted string: {rest}"))?;
                let text = literal::unquote(&rest[..end])
                    .ok_or_else(|| format!("invalid quoted string: {}", &rest[..end]))?;
                tokens.push(Token { text, quoted: true });
                rest = &rest[end..];
            }
            _ => {
                let end = rest
                    .char_indices()
                    .find(|&(i, c)| {
                        c.is_whitespace()
                            || matches!(c, '(' | ')' | '"' | '`')
                            || rest[i..].starts_with("//")
                    })
                    .map_or(rest.len(), |(i, _)| i);
                tokens.push(Token {
                    text: rest[..end].to_string(),
                    quoted: false,
                });
                rest = &rest[end..];
            }
        }
    }

    Ok(tokens)
}

/// Byte offset just past the closing quote of the literal starting `s`
fn quoted_end(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let quote = bytes[0];
    let mut i = 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if quote == b'"' => i += 2,
            b if b == quote => return Some(i + 1),
            _ => i += 1,
        }
    }
    None
}
