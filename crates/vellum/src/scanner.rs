use crate::error::{ParseError, ParseErrorKind};

const PLACEHOLDER_OPEN: &str = "[data-v-";
const COMMENT_OPEN: &str = "<!--";
const COMMENT_CLOSE: &str = "-->";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Token<'s> {
    pub(crate) kind: TokenKind<'s>,
    pub(crate) offset: usize,
    pub(crate) len: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenKind<'s> {
    Literal(&'s str),
    Placeholder { path: &'s str, raw: bool },
    LoopStart { collection: &'s str, alias: &'s str },
    LoopEnd,
    IfStart { path: &'s str, negate: bool },
    Else,
    IfEnd,
}

/// Scan template text left to right into a flat token stream.
///
/// `[data-v-<path>]` and `[data-v-<path>:raw]` become placeholder tokens,
/// `<!-- @... -->` comments become directive tokens, and everything else is
/// emitted as literal runs. Bracket runs that do not match the `data-v-`
/// prefix and ordinary HTML comments stay literal. A comment that opens a
/// directive but is malformed or never closed is a compile error.
pub(crate) fn scan(source: &str) -> Result<Vec<Token<'_>>, ParseError> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut lit_start = 0;
    let mut pos = 0;

    while pos < bytes.len() {
        match bytes[pos] {
            b'[' if source[pos..].starts_with(PLACEHOLDER_OPEN) => {
                if let Some((path, raw, end)) = scan_placeholder(source, pos) {
                    flush_literal(&mut tokens, source, lit_start, pos);
                    tokens.push(Token {
                        kind: TokenKind::Placeholder { path, raw },
                        offset: pos,
                        len: end - pos,
                    });
                    pos = end;
                    lit_start = end;
                } else {
                    // Not a well-formed placeholder: leave the bracket in the
                    // literal run.
                    pos += 1;
                }
            }
            b'<' if source[pos..].starts_with(COMMENT_OPEN) => {
                let body_start = pos + COMMENT_OPEN.len();
                match source[body_start..].find(COMMENT_CLOSE) {
                    Some(rel) => {
                        let body = &source[body_start..body_start + rel];
                        let end = body_start + rel + COMMENT_CLOSE.len();
                        if body.trim().starts_with('@') {
                            flush_literal(&mut tokens, source, lit_start, pos);
                            let kind = scan_directive(body.trim()).map_err(|kind| {
                                ParseError::new(kind, source, (pos, end - pos))
                            })?;
                            tokens.push(Token {
                                kind,
                                offset: pos,
                                len: end - pos,
                            });
                            lit_start = end;
                        }
                        // A plain comment stays inside the current literal run.
                        pos = end;
                    }
                    None => {
                        if source[body_start..].trim_start().starts_with('@') {
                            return Err(ParseError::new(
                                ParseErrorKind::UnterminatedComment,
                                source,
                                (pos, bytes.len() - pos),
                            ));
                        }
                        pos = bytes.len();
                    }
                }
            }
            _ => pos += 1,
        }
    }

    flush_literal(&mut tokens, source, lit_start, bytes.len());
    Ok(tokens)
}

fn flush_literal<'s>(tokens: &mut Vec<Token<'s>>, source: &'s str, start: usize, end: usize) {
    if start < end {
        tokens.push(Token {
            kind: TokenKind::Literal(&source[start..end]),
            offset: start,
            len: end - start,
        });
    }
}

/// Try to scan a placeholder starting at `start` (which points at `[data-v-`).
/// Returns the dotted path, the raw flag and the byte offset just past `]`.
fn scan_placeholder(source: &str, start: usize) -> Option<(&str, bool, usize)> {
    let bytes = source.as_bytes();
    let path_start = start + PLACEHOLDER_OPEN.len();

    let mut i = path_start;
    while i < bytes.len() && is_path_byte(bytes[i]) {
        i += 1;
    }
    if i == path_start {
        return None;
    }
    let path = &source[path_start..i];

    if bytes.get(i) == Some(&b']') {
        Some((path, false, i + 1))
    } else if source[i..].starts_with(":raw]") {
        Some((path, true, i + ":raw]".len()))
    } else {
        None
    }
}

/// Scan a trimmed `@...` comment body into a directive token kind.
fn scan_directive(body: &str) -> Result<TokenKind<'_>, ParseErrorKind> {
    match body {
        "@endloop" => return Ok(TokenKind::LoopEnd),
        "@endif" => return Ok(TokenKind::IfEnd),
        "@else" => return Ok(TokenKind::Else),
        _ => {}
    }

    if let Some(rest) = strip_directive(body, "@loop") {
        let rest = rest.trim_start();
        let (collection, rest) = attr(rest, "name").ok_or(ParseErrorKind::MalformedLoop)?;
        let (alias, rest) = attr(rest.trim_start(), "as").ok_or(ParseErrorKind::MalformedLoop)?;
        if !rest.trim().is_empty() || !is_path(collection) || !is_ident(alias) {
            return Err(ParseErrorKind::MalformedLoop);
        }
        return Ok(TokenKind::LoopStart { collection, alias });
    }

    if let Some(rest) = strip_directive(body, "@if") {
        let rest = rest.trim();
        let (negate, path) = match rest.strip_prefix('!') {
            Some(path) => (true, path.trim_start()),
            None => (false, rest),
        };
        if !is_path(path) {
            return Err(ParseErrorKind::MalformedIf);
        }
        return Ok(TokenKind::IfStart { path, negate });
    }

    let word = body[1..].split_whitespace().next().unwrap_or("");
    Err(ParseErrorKind::UnknownDirective(word.into()))
}

/// Strip a directive keyword, requiring it to be followed by whitespace or
/// end of body (so `@loopy` is not mistaken for `@loop`).
fn strip_directive<'s>(body: &'s str, keyword: &str) -> Option<&'s str> {
    let rest = body.strip_prefix(keyword)?;
    if rest.is_empty() || rest.starts_with(char::is_whitespace) {
        Some(rest)
    } else {
        None
    }
}

/// Parse `key="value"` at the head of `s`, returning the value and the rest.
fn attr<'s>(s: &'s str, key: &str) -> Option<(&'s str, &'s str)> {
    let rest = s.strip_prefix(key)?;
    let rest = rest.trim_start().strip_prefix('=')?;
    let rest = rest.trim_start().strip_prefix('"')?;
    let end = rest.find('"')?;
    Some((&rest[..end], &rest[end + 1..]))
}

fn is_path_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-' | b'$')
}

fn is_path(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(is_path_byte)
}

fn is_ident(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'$'))
}
