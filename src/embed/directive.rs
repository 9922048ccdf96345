//! `//go:embed` argument grammar
//!
//! Arguments are unquoted space-separated patterns, double-quoted Go strings
//! or back-quoted Go strings. A quoted pattern must be followed by space or
//! the end of the line. This matches what the Go compiler accepts.

use crate::literal;

/// Split the text following `//go:embed` into patterns
pub fn parse_directive(args: &str) -> Result<Vec<String>, String> {
    let mut list = Vec::new();
    let mut args = args.trim();

    while !args.is_empty() {
        let (pattern, rest) = match args.as_bytes()[0] {
            b'`' => {
                let close = args[1..]
                    .find('`')
                    .ok_or_else(|| invalid(args))?;
                (args[1..1 + close].to_string(), &args[1 + close + 1..])
            }
            b'"' => {
                let end = double_quoted_end(args).ok_or_else(|| invalid(args))?;
                let pattern = literal::unquote(&args[..end]).ok_or_else(|| invalid(&args[..end]))?;
                (pattern, &args[end..])
            }
            _ => {
                let end = args.find(char::is_whitespace).unwrap_or(args.len());
                (args[..end].to_string(), &args[end..])
            }
        };

        if rest.chars().next().is_some_and(|c| !c.is_whitespace()) {
            return Err(invalid(rest));
        }

        list.push(pattern);
        args = rest.trim();
    }

    Ok(list)
}

/// Byte offset just past the closing quote of a double-quoted string
fn double_quoted_end(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut i = 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'"' => return Some(i + 1),
            _ => i += 1,
        }
    }
    None
}

fn invalid(s: &str) -> String {
    format!("invalid quoted string in //go:embed: {s}")
}
