//! Go string literal decoding
//!
//! Shared by the `go.mod` lexer, the source scanner and the `//go:embed`
//! directive grammar. Mirrors the rules of Go's `strconv.Unquote` for
//! interpreted (`"..."`) and raw (`` `...` ``) string literals.

/// Decode a quoted Go string literal, including its quotes.
///
/// Returns `None` for anything `strconv.Unquote` would reject, including
/// escapes that decode to invalid UTF-8.
pub fn unquote(literal: &str) -> Option<String> {
    let bytes = literal.as_bytes();
    if bytes.len() < 2 {
        return None;
    }
    let quote = bytes[0];
    if bytes[bytes.len() - 1] != quote {
        return None;
    }
    let body = &literal[1..literal.len() - 1];

    match quote {
        b'`' => {
            if body.contains('`') {
                return None;
            }
            Some(body.replace('\r', ""))
        }
        b'"' => unquote_interpreted(body),
        _ => None,
    }
}

fn unquote_interpreted(body: &str) -> Option<String> {
    let mut out: Vec<u8> = Vec::with_capacity(body.len());
    let mut chars = body.chars();

    while let Some(c) = chars.next() {
        match c {
            '"' | '\n' => return None,
            '\\' => {
                let escape = chars.next()?;
                match escape {
                    'a' => out.push(0x07),
                    'b' => out.push(0x08),
                    'f' => out.push(0x0c),
                    'n' => out.push(b'\n'),
                    'r' => out.push(b'\r'),
                    't' => out.push(b'\t'),
                    'v' => out.push(0x0b),
                    '\\' => out.push(b'\\'),
                    '"' => out.push(b'"'),
                    'x' => {
                        let value = take_digits(&mut chars, 2, 16)?;
                        out.push(u8::try_from(value).ok()?);
                    }
                    '0'..='7' => {
                        let rest = take_digits(&mut chars, 2, 8)?;
                        let value = escape.to_digit(8)? * 64 + rest;
                        out.push(u8::try_from(value).ok()?);
                    }
                    'u' => push_char(&mut out, char::from_u32(take_digits(&mut chars, 4, 16)?)?),
                    'U' => push_char(&mut out, char::from_u32(take_digits(&mut chars, 8, 16)?)?),
                    _ => return None,
                }
            }
            _ => push_char(&mut out, c),
        }
    }

    String::from_utf8(out).ok()
}

fn take_digits(chars: &mut std::str::Chars<'_>, count: usize, radix: u32) -> Option<u32> {
    let mut value = 0u32;
    for _ in 0..count {
        value = value * radix + chars.next()?.to_digit(radix)?;
    }
    Some(value)
}

fn push_char(out: &mut Vec<u8>, c: char) {
    let mut buf = [0u8; 4];
    out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_strings_are_verbatim() {
        assert_eq!(unquote("`a\\nb`").as_deref(), Some("a\\nb"));
        assert_eq!(unquote("`a\r\nb`").as_deref(), Some("a\nb"));
    }

    #[test]
    fn interpreted_escapes() {
        assert_eq!(unquote(r#""a\tb""#).as_deref(), Some("a\tb"));
        assert_eq!(unquote(r#""\x41\101é""#).as_deref(), Some("AAé"));
        assert_eq!(unquote(r#""sp ace\"q""#).as_deref(), Some("sp ace\"q"));
    }

    #[test]
    fn rejects_malformed() {
        assert_eq!(unquote(r#""unterminated"#), None);
        assert_eq!(unquote(r#""bad \q escape""#), None);
        assert_eq!(unquote(r#""\'""#), None);
        assert_eq!(unquote(r#""\xff""#), None);
        assert_eq!(unquote("'x'"), None);
        assert_eq!(unquote("\""), None);
    }
}
