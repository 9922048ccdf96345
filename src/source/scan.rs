//! Lightweight Go source scanning
//!
//! Extracts just what source tracing needs from a `.go` file: the import
//! paths of its leading import declarations and its `//go:embed` directives.
//! The whole file is lexed so that unterminated literals and comments are
//! reported instead of silently producing a wrong import set.

use crate::literal;

const EMBED_PREFIX: &str = "//go:embed ";

/// Imports and embed directives of one Go source file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceInfo {
    /// Unquoted import paths, in declaration order
    pub imports: Vec<String>,

    /// Arguments of every `//go:embed` comment, prefix removed
    pub embeds: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    Str(String),
    Punct(char),
}

/// Scan a Go source file
pub fn scan(src: &str) -> Result<SourceInfo, String> {
    let (tokens, comments) = lex(src)?;

    let embeds = comments
        .iter()
        .filter_map(|c| c.strip_prefix(EMBED_PREFIX))
        .map(str::to_string)
        .collect();

    let mut parser = Parser { tokens: &tokens, pos: 0 };
    parser.package_clause()?;
    let imports = parser.imports()?;

    Ok(SourceInfo { imports, embeds })
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn skip_semicolons(&mut self) {
        while self.peek() == Some(&Token::Punct(';')) {
            self.pos += 1;
        }
    }

    fn package_clause(&mut self) -> Result<(), String> {
        self.skip_semicolons();
        match self.next() {
            Some(Token::Ident(kw)) if kw == "package" => {}
            _ => return Err("expected 'package' clause".to_string()),
        }
        match self.next() {
            Some(Token::Ident(_)) => Ok(()),
            _ => Err("expected package name".to_string()),
        }
    }

    fn imports(&mut self) -> Result<Vec<String>, String> {
        let mut imports = Vec::new();
        loop {
            self.skip_semicolons();
            match self.peek() {
                Some(Token::Ident(kw)) if kw == "import" => self.pos += 1,
                _ => return Ok(imports),
            }

            if self.peek() == Some(&Token::Punct('(')) {
                self.pos += 1;
                loop {
                    self.skip_semicolons();
                    if self.peek() == Some(&Token::Punct(')')) {
                        self.pos += 1;
                        break;
                    }
                    imports.push(self.import_spec()?);
                }
            } else {
                imports.push(self.import_spec()?);
            }
        }
    }

    fn import_spec(&mut self) -> Result<String, String> {
        if matches!(self.peek(), Some(Token::Ident(_)) | Some(Token::Punct('.'))) {
            self.pos += 1;
        }
        match self.next() {
            Some(Token::Str(lit)) => {
                literal::unquote(lit).ok_or_else(|| format!("invalid import path: {lit}"))
            }
            _ => Err("expected import path".to_string()),
        }
    }
}

/// Whether a newline after `token` terminates the statement
fn ends_statement(token: &Token) -> bool {
    match token {
        Token::Ident(word) => !matches!(word.as_str(), "package" | "import"),
        Token::Str(_) => true,
        Token::Punct(c) => matches!(c, ')' | ']' | '}' | '\''),
    }
}

/// Split source into tokens and line comments.
///
/// Numbers lex as identifiers and operators as single punctuation
/// characters; neither matters to the import parser.
fn lex(src: &str) -> Result<(Vec<Token>, Vec<String>), String> {
    let src = src.strip_prefix('\u{feff}').unwrap_or(src);
    let mut tokens = Vec::new();
    let mut comments = Vec::new();
    let mut chars = src.char_indices().peekable();
    let mut line = 1usize;

    while let Some((start, c)) = chars.next() {
        match c {
            '\n' => line += 1,
            c if c.is_whitespace() => {}
            '/' if matches!(chars.peek(), Some((_, '/'))) => {
                let end = src[start..].find('\n').map_or(src.len(), |i| start + i);
                comments.push(src[start..end].trim_end_matches('\r').to_string());
                while chars.peek().is_some_and(|&(i, _)| i < end) {
                    chars.next();
                }
            }
            '/' if matches!(chars.peek(), Some((_, '*'))) => {
                let close = src[start + 2..]
                    .find("*/")
                    .ok_or_else(|| format!("line {line}: comment not terminated"))?;
                let end = start + 2 + close + 2;
                let newlines = src[start..end].matches('\n').count();
                line += newlines;
                while chars.peek().is_some_and(|&(i, _)| i < end) {
                    chars.next();
                }
                // A comment spanning lines acts as a newline, anything else as a space.
                if newlines > 0 && tokens.last().is_some_and(ends_statement) {
                    tokens.push(Token::Punct(';'));
                }
            }
            '"' | '\'' => {
                let mut escaped = false;
                let end = loop {
                    match chars.next() {
                        None | Some((_, '\n')) => {
                            let what = if c == '"' { "string literal" } else { "rune literal" };
                            return Err(format!("line {line}: {what} not terminated"));
                        }
                        Some((_, '\\')) if !escaped => escaped = true,
                        Some((i, q)) if q == c && !escaped => break i + 1,
                        Some(_) => escaped = false,
                    }
                };
                if c == '"' {
                    tokens.push(Token::Str(src[start..end].to_string()));
                } else {
                    tokens.push(Token::Punct('\''));
                }
            }
            '`' => {
                let close = src[start + 1..]
                    .find('`')
                    .ok_or_else(|| format!("line {line}: raw string literal not terminated"))?;
                let end = start + 1 + close + 1;
                line += src[start..end].matches('\n').count();
                while chars.peek().is_some_and(|&(i, _)| i < end) {
                    chars.next();
                }
                tokens.push(Token::Str(src[start..end].to_string()));
            }
            c if c.is_alphanumeric() || c == '_' => {
                let mut end = start + c.len_utf8();
                while let Some(&(i, n)) = chars.peek() {
                    if !(n.is_alphanumeric() || n == '_') {
                        break;
                    }
                    end = i + n.len_utf8();
                    chars.next();
                }
                tokens.push(Token::Ident(src[start..end].to_string()));
            }
            c => tokens.push(Token::Punct(c)),
        }
    }

    Ok((tokens, comments))
}
