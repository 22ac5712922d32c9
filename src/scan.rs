//! Tokenizer for MDX article bodies.
//!
//! The scanner only knows about the few constructs the Markdown export cares about: component
//! tags (tag names starting with an uppercase letter) and fenced code blocks. Everything else,
//! including plain HTML tags, is text. Scanning never fails: anything that doesn't look like a
//! complete tag is kept as text.

use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    Open,
    Close,
    SelfClosing,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tag<'a> {
    pub kind: TagKind,
    pub name: &'a str,
    /// Raw text between the tag name and the closing `>` (or `/>`)
    pub attrs: &'a str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fence<'a> {
    /// Info string following the opening backticks, trimmed
    pub info: &'a str,
    /// Lines between the opening and closing fence lines, including the final newline
    pub body: &'a str,
    pub closed: bool,
}

impl<'a> Fence<'a> {
    /// Language of the fence, i.e. the first word of the info string.
    pub fn lang(&self) -> &'a str {
        self.info.split_whitespace().next().unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind<'a> {
    Text,
    Tag(Tag<'a>),
    Fence(Fence<'a>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token<'a> {
    pub kind: TokenKind<'a>,
    /// Byte range of the token in the scanned text
    pub span: Range<usize>,
}

/// Split `src` into a flat token stream. Concatenating the spans of all tokens gives back `src`.
pub fn tokenize(src: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut text_start = 0;
    let mut pos = 0;

    while pos < src.len() {
        if is_line_start(src, pos) {
            if let Some((fence, end)) = scan_fence(src, pos) {
                flush_text(&mut tokens, text_start, pos);
                tokens.push(Token { kind: TokenKind::Fence(fence), span: pos..end });
                pos = end;
                text_start = pos;
                continue;
            }
        }

        if src.as_bytes()[pos] == b'`' {
            // Inline code spans are text, whatever they contain
            pos = skip_code_span(src, pos);
            continue;
        }

        if src.as_bytes()[pos] == b'<' {
            if let Some((tag, end)) = scan_tag(src, pos) {
                flush_text(&mut tokens, text_start, pos);
                tokens.push(Token { kind: TokenKind::Tag(tag), span: pos..end });
                pos = end;
                text_start = pos;
                continue;
            }
        }

        pos += next_char_len(src, pos);
    }

    flush_text(&mut tokens, text_start, src.len());
    tokens
}

fn flush_text(tokens: &mut Vec<Token<'_>>, start: usize, end: usize) {
    if end > start {
        tokens.push(Token { kind: TokenKind::Text, span: start..end });
    }
}

/// Skips a backtick-delimited code span starting at `pos`. If the span isn't closed by a run of
/// the same length before the end of the paragraph, only the opening run is skipped.
fn skip_code_span(src: &str, pos: usize) -> usize {
    let run = src[pos..].bytes().take_while(|b| *b == b'`').count();
    let limit = paragraph_end(src, pos + run);
    let mut cursor = pos + run;
    while let Some(found) = src[cursor..limit].find('`') {
        let start = cursor + found;
        let len = src[start..limit].bytes().take_while(|b| *b == b'`').count();
        if len == run {
            return start + len;
        }
        cursor = start + len;
    }
    pos + run
}

/// Start of the first line after `pos` that ends the current paragraph: a blank line or a
/// code fence.
fn paragraph_end(src: &str, pos: usize) -> usize {
    let mut cursor = line_end(src, pos);
    while cursor < src.len() {
        let end = line_end(src, cursor);
        let line = &src[cursor..end];
        if line.trim().is_empty() || fence_marker(line).is_some() {
            return cursor;
        }
        cursor = end;
    }
    src.len()
}

pub fn is_line_start(src: &str, pos: usize) -> bool {
    pos == 0 || src.as_bytes()[pos - 1] == b'\n'
}

pub fn is_line_end(src: &str, pos: usize) -> bool {
    pos == src.len() || src.as_bytes()[pos] == b'\n'
}

fn next_char_len(src: &str, pos: usize) -> usize {
    src[pos..].chars().next().map(char::len_utf8).unwrap_or(1)
}

/// Returns the end of the line starting at `pos`, including its newline if any.
fn line_end(src: &str, pos: usize) -> usize {
    src[pos..].find('\n').map(|i| pos + i + 1).unwrap_or(src.len())
}

//----- Fenced code blocks

/// Recognizes a fenced code block starting on the line at `pos`. Fences may be indented (MDX
/// components often indent their children) and use backticks or tildes. An unclosed fence runs
/// to the end of the text.
fn scan_fence(src: &str, pos: usize) -> Option<(Fence<'_>, usize)> {
    let first_end = line_end(src, pos);
    let line = &src[pos..first_end];
    let (marker, count) = fence_marker(line)?;

    let info = line.trim_start()[count..].trim();
    if marker == '`' && info.contains('`') {
        // Inline code span, not a fence
        return None;
    }

    let body_start = first_end;
    let mut cursor = body_start;
    while cursor < src.len() {
        let end = line_end(src, cursor);
        let candidate = &src[cursor..end];
        if let Some((m, c)) = fence_marker(candidate) {
            if m == marker && c >= count && candidate.trim_start()[c..].trim().is_empty() {
                let fence = Fence {
                    info,
                    body: &src[body_start..cursor],
                    closed: true,
                };
                return Some((fence, end));
            }
        }
        cursor = end;
    }

    let fence = Fence {
        info,
        body: &src[body_start..],
        closed: false,
    };
    Some((fence, src.len()))
}

fn fence_marker(line: &str) -> Option<(char, usize)> {
    let trimmed = line.trim_start_matches(|c: char| c == ' ' || c == '\t');
    let marker = trimmed.chars().next()?;
    if marker != '`' && marker != '~' {
        return None;
    }
    let count = trimmed.chars().take_while(|c| *c == marker).count();
    if count >= 3 {
        Some((marker, count))
    } else {
        None
    }
}

//----- Component tags

/// Recognizes a component tag at `pos`, which must point to a `<`. Attribute values may contain
/// `>` when they're quoted or inside a `{...}` expression.
fn scan_tag(src: &str, pos: usize) -> Option<(Tag<'_>, usize)> {
    let bytes = src.as_bytes();
    let mut cursor = pos + 1;

    let closing = bytes.get(cursor) == Some(&b'/');
    if closing {
        cursor += 1;
    }

    if !bytes.get(cursor)?.is_ascii_uppercase() {
        return None;
    }

    let name_start = cursor;
    while cursor < bytes.len() && bytes[cursor].is_ascii_alphanumeric() {
        cursor += 1;
    }
    let name = &src[name_start..cursor];

    let attrs_start = cursor;
    let gt = find_tag_end(src, attrs_start)?;
    let raw_attrs = &src[attrs_start..gt];

    let trimmed = raw_attrs.trim_end();
    let (kind, attrs) = if closing {
        (TagKind::Close, raw_attrs)
    } else if let Some(attrs) = trimmed.strip_suffix('/') {
        (TagKind::SelfClosing, attrs)
    } else {
        (TagKind::Open, raw_attrs)
    };

    Some((Tag { kind, name, attrs: attrs.trim() }, gt + 1))
}

/// Finds the `>` ending a tag, skipping over quoted strings and brace-delimited expressions.
fn find_tag_end(src: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (i, c) in src[start..].char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }

        match c {
            '"' | '\'' if depth == 0 => quote = Some(c),
            '"' | '\'' | '`' if depth > 0 => quote = Some(c),
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            '>' if depth == 0 => return Some(start + i),
            '<' if depth == 0 => {
                // A new tag starts before this one was closed: not a tag.
                return None;
            }
            _ => {}
        }
    }

    None
}

//----- Attributes

/// Returns the source of a `{...}` expression attribute, without the braces.
///
/// `attr_expression(r#"title="x" tabs={[1, 2]}"#, "tabs")` returns `Some("[1, 2]")`.
pub fn attr_expression<'a>(attrs: &'a str, name: &str) -> Option<&'a str> {
    let mut search = 0;
    while let Some(found) = attrs[search..].find(name) {
        let start = search + found;
        search = start + name.len();

        let preceded_ok = attrs[..start]
            .chars()
            .next_back()
            .map_or(true, |c| c.is_whitespace());
        if !preceded_ok {
            continue;
        }

        let rest = attrs[search..].trim_start();
        let rest = match rest.strip_prefix('=') {
            Some(r) => r.trim_start(),
            None => continue,
        };
        if !rest.starts_with('{') {
            continue;
        }

        let open = attrs.len() - rest.len();
        let close = matching_brace(attrs, open)?;
        return Some(&attrs[open + 1..close]);
    }
    None
}

/// Returns the value of a quoted string attribute, e.g. `lang="python"` or `lang='python'`.
pub fn attr_string<'a>(attrs: &'a str, name: &str) -> Option<&'a str> {
    let mut search = 0;
    while let Some(found) = attrs[search..].find(name) {
        let start = search + found;
        search = start + name.len();

        let preceded_ok = attrs[..start]
            .chars()
            .next_back()
            .map_or(true, |c| c.is_whitespace());
        if !preceded_ok {
            continue;
        }

        let rest = match attrs[search..].trim_start().strip_prefix('=') {
            Some(r) => r.trim_start(),
            None => continue,
        };
        let quote = match rest.chars().next() {
            Some(q @ ('"' | '\'')) => q,
            _ => continue,
        };
        let value = &rest[1..];
        return value.find(quote).map(|end| &value[..end]);
    }
    None
}

fn matching_brace(src: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (i, c) in src[open..].char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' | '`' => quote = Some(c),
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}
