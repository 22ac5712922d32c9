//! Parser for the `tabs={[...]}` attribute of tabbed code samples.
//!
//! The attribute is a JavaScript expression. We don't evaluate it: it's parsed with a restricted
//! grammar of literals (objects, arrays, strings, numbers, booleans, null), tolerant of unquoted
//! keys, single quotes, template strings without substitutions, trailing commas and comments.
//! Anything else is a parse error.

use anyhow::{anyhow, bail};
use nom::branch::alt;
use nom::bytes::complete::{tag, take_until, take_while1};
use nom::character::complete::{char, multispace1};
use nom::combinator::{all_consuming, map, opt, value};
use nom::error::{Error, ErrorKind};
use nom::multi::{many0, separated_list0};
use nom::number::complete::double;
use nom::sequence::{delimited, pair, preceded, separated_pair, terminated};
use nom::IResult;
use serde_json::{Map, Number, Value};

#[derive(Debug, Default, Deserialize, PartialEq)]
pub struct Tab {
    pub label: Option<String>,
    pub title: Option<String>,
    pub code: Option<String>,
    pub language: Option<String>,
}

impl Tab {
    /// Heading for the tab: its label, falling back to the title.
    pub fn heading(&self) -> &str {
        self.label.as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| self.title.as_deref().filter(|s| !s.is_empty()))
            .unwrap_or("Example")
    }
}

/// Parse the source of a tabs expression into a list of tabs.
pub fn parse_tabs(src: &str) -> anyhow::Result<Vec<Tab>> {
    let value = parse_literal(src)?;
    if !value.is_array() {
        bail!("Tabs expression is not an array");
    }
    let tabs = serde_json::from_value(value)?;
    Ok(tabs)
}

/// Parse a JavaScript literal expression into a JSON value.
pub fn parse_literal(src: &str) -> anyhow::Result<Value> {
    let (_, value) = all_consuming(delimited(ws, literal, ws))(src)
        .map_err(|e| anyhow!("Invalid literal: {}", e))?;
    Ok(value)
}

fn literal(input: &str) -> IResult<&str, Value> {
    alt((
        map(object, Value::Object),
        map(array, Value::Array),
        map(string, Value::String),
        value(Value::Bool(true), keyword("true")),
        value(Value::Bool(false), keyword("false")),
        value(Value::Null, keyword("null")),
        value(Value::Null, keyword("undefined")),
        number,
    ))(input)
}

/// Whitespace and comments
fn ws(input: &str) -> IResult<&str, ()> {
    value(
        (),
        many0(alt((
            value((), multispace1),
            value((), pair(tag("//"), opt(take_while1(|c: char| c != '\n')))),
            value((), delimited(tag("/*"), take_until("*/"), tag("*/"))),
        ))),
    )(input)
}

fn token<'a, O>(
    parser: impl FnMut(&'a str) -> IResult<&'a str, O>,
) -> impl FnMut(&'a str) -> IResult<&'a str, O> {
    preceded(ws, parser)
}

fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    move |input: &'a str| {
        let res: IResult<&str, &str> = tag(word)(input);
        let (rest, matched) = res?;
        if rest.starts_with(is_ident_char) {
            return Err(nom::Err::Error(Error::new(input, ErrorKind::Tag)));
        }
        Ok((rest, matched))
    }
}

fn number(input: &str) -> IResult<&str, Value> {
    let res: IResult<&str, f64> = double(input);
    let (rest, n) = res?;
    let num = if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Number::from(n as i64)
    } else {
        Number::from_f64(n).ok_or_else(|| nom::Err::Error(Error::new(input, ErrorKind::Float)))?
    };
    Ok((rest, Value::Number(num)))
}

fn array(input: &str) -> IResult<&str, Vec<Value>> {
    delimited(
        char('['),
        terminated(
            separated_list0(token(char(',')), token(literal)),
            opt(token(char(','))),
        ),
        token(char(']')),
    )(input)
}

fn object(input: &str) -> IResult<&str, Map<String, Value>> {
    let entries = separated_list0(
        token(char(',')),
        separated_pair(token(key), token(char(':')), token(literal)),
    );

    map(
        delimited(char('{'), terminated(entries, opt(token(char(',')))), token(char('}'))),
        |entries| entries.into_iter().collect(),
    )(input)
}

fn key(input: &str) -> IResult<&str, String> {
    alt((string, map(identifier, String::from)))(input)
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

fn identifier(input: &str) -> IResult<&str, &str> {
    let res: IResult<&str, &str> = take_while1(is_ident_char)(input);
    let (rest, ident) = res?;
    if ident.starts_with(|c: char| c.is_ascii_digit()) {
        return Err(nom::Err::Error(Error::new(input, ErrorKind::AlphaNumeric)));
    }
    Ok((rest, ident))
}

/// Single-quoted, double-quoted, or backtick string. Template strings keep their raw newlines
/// but can't contain `${...}` substitutions.
fn string(input: &str) -> IResult<&str, String> {
    let fail = |kind| nom::Err::Error(Error::new(input, kind));

    let mut chars = input.char_indices();
    let quote = match chars.next() {
        Some((_, c @ ('"' | '\'' | '`'))) => c,
        _ => return Err(fail(ErrorKind::Char)),
    };

    let mut result = String::new();
    while let Some((i, c)) = chars.next() {
        match c {
            c if c == quote => return Ok((&input[i + c.len_utf8()..], result)),
            '\\' => {
                let (_, escaped) = chars.next().ok_or_else(|| fail(ErrorKind::Escaped))?;
                match escaped {
                    'n' => result.push('\n'),
                    't' => result.push('\t'),
                    'r' => result.push('\r'),
                    '0' => result.push('\0'),
                    'b' => result.push('\u{8}'),
                    'f' => result.push('\u{c}'),
                    'v' => result.push('\u{b}'),
                    '\n' => {} // line continuation
                    'u' => {
                        let hex: String = (0..4)
                            .filter_map(|_| chars.next().map(|(_, h)| h))
                            .collect();
                        let ch = u32::from_str_radix(&hex, 16)
                            .ok()
                            .and_then(char::from_u32)
                            .ok_or_else(|| fail(ErrorKind::Escaped))?;
                        result.push(ch);
                    }
                    other => result.push(other),
                }
            }
            '$' if quote == '`' && input[i..].starts_with("${") => {
                return Err(fail(ErrorKind::Verify));
            }
            '\n' if quote != '`' => return Err(fail(ErrorKind::Char)),
            c => result.push(c),
        }
    }

    Err(fail(ErrorKind::Eof))
}
