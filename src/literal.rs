//! Restricted literal grammar for model output.
//!
//! Accepts strings, integers, floats, booleans, null and nested lists or
//! mappings of the same, in both Python (`True`, `None`, single quotes) and
//! JSON (`true`, `null`) spellings. Nothing is evaluated: any other token is
//! a parse error.

use std::fmt;
use std::str::CharIndices;

use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::character::complete::{char, multispace0, satisfy};
use nom::combinator::{all_consuming, map, not, opt, value};
use nom::error::{Error as NomError, ErrorKind};
use nom::multi::separated_list0;
use nom::number::complete::recognize_float;
use nom::sequence::{delimited, pair, separated_pair, terminated};
use nom::{Err as NomErr, IResult};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use thiserror::Error;

/// A value parsed from completion text.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Literal>),
    /// Key/value pairs in source order; a repeated key keeps its last value.
    Map(Vec<(Literal, Literal)>),
}

/// Runtime kind of a [`Literal`], used as a type filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    Null,
    Bool,
    /// Integers and floats.
    Number,
    Str,
    List,
    Map,
}

impl LiteralKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Number => "number",
            Self::Str => "string",
            Self::List => "list",
            Self::Map => "mapping",
        }
    }
}

impl Literal {
    pub fn kind(&self) -> LiteralKind {
        match self {
            Self::Null => LiteralKind::Null,
            Self::Bool(_) => LiteralKind::Bool,
            Self::Int(_) | Self::Float(_) => LiteralKind::Number,
            Self::Str(_) => LiteralKind::Str,
            Self::List(_) => LiteralKind::List,
            Self::Map(_) => LiteralKind::Map,
        }
    }

    pub fn is(&self, kind: LiteralKind) -> bool {
        self.kind() == kind
    }

    /// Consumes the literal, returning the inner string for [`Literal::Str`].
    pub fn into_string(self) -> Option<String> {
        match self {
            Self::Str(value) => Some(value),
            _ => None,
        }
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<Vec<Literal>> for Literal {
    fn from(value: Vec<Literal>) -> Self {
        Self::List(value)
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value:?}"),
            Self::Str(value) => {
                let quoted = serde_json::to_string(value).map_err(|_| fmt::Error)?;
                f.write_str(&quoted)
            }
            Self::List(items) => {
                f.write_str("[")?;
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Map(entries) => {
                f.write_str("{")?;
                for (idx, (key, value)) in entries.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_str("}")
            }
        }
    }
}

impl Serialize for Literal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(value) => serializer.serialize_bool(*value),
            Self::Int(value) => serializer.serialize_i64(*value),
            Self::Float(value) => serializer.serialize_f64(*value),
            Self::Str(value) => serializer.serialize_str(value),
            Self::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Map(entries) => {
                // JSON objects only take string keys.
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    match key {
                        Self::Str(key) => map.serialize_entry(key, value)?,
                        other => map.serialize_entry(&other.to_string(), value)?,
                    }
                }
                map.end()
            }
        }
    }
}

/// Completion text that does not form a valid literal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed literal at offset {offset}")]
pub struct LiteralError {
    /// Byte offset where parsing stopped.
    pub offset: usize,
}

impl LiteralError {
    fn at(text: &str, remaining: &str) -> Self {
        Self {
            offset: text.len().saturating_sub(remaining.len()),
        }
    }
}

/// Parses the whole of `text` as one literal, ignoring surrounding whitespace.
pub fn parse_literal(text: &str) -> Result<Literal, LiteralError> {
    match all_consuming(delimited(multispace0, literal, multispace0))(text) {
        Ok((_, parsed)) => Ok(parsed),
        Err(NomErr::Error(err) | NomErr::Failure(err)) => Err(LiteralError::at(text, err.input)),
        Err(NomErr::Incomplete(_)) => Err(LiteralError::at(text, "")),
    }
}

fn literal(input: &str) -> IResult<&str, Literal> {
    alt((
        map(quoted, Literal::Str),
        list,
        mapping,
        keyword("True", Literal::Bool(true)),
        keyword("true", Literal::Bool(true)),
        keyword("False", Literal::Bool(false)),
        keyword("false", Literal::Bool(false)),
        keyword("None", Literal::Null),
        keyword("null", Literal::Null),
        number,
    ))(input)
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn keyword<'a>(
    word: &'static str,
    parsed: Literal,
) -> impl FnMut(&'a str) -> IResult<&'a str, Literal> {
    value(parsed, terminated(tag(word), word_boundary))
}

fn word_boundary(input: &str) -> IResult<&str, ()> {
    not(satisfy(is_ident_char))(input)
}

fn float_text(input: &str) -> IResult<&str, &str> {
    recognize_float(input)
}

fn number(input: &str) -> IResult<&str, Literal> {
    let (rest, text) = float_text(input)?;
    let (rest, _) = word_boundary(rest)?;
    let parsed = if text.contains(['.', 'e', 'E']) {
        text.parse::<f64>().map(Literal::Float).ok()
    } else {
        // Integers too wide for i64 degrade to floats.
        text.parse::<i64>()
            .map(Literal::Int)
            .or_else(|_| text.parse::<f64>().map(Literal::Float))
            .ok()
    };
    match parsed {
        Some(parsed) => Ok((rest, parsed)),
        None => Err(NomErr::Error(NomError::new(input, ErrorKind::Float))),
    }
}

fn comma(input: &str) -> IResult<&str, char> {
    delimited(multispace0, char(','), multispace0)(input)
}

/// Comma-separated elements; a trailing comma is allowed after at least one.
fn elements<'a, O>(
    mut element: impl FnMut(&'a str) -> IResult<&'a str, O>,
) -> impl FnMut(&'a str) -> IResult<&'a str, Vec<O>> {
    move |input: &'a str| {
        let (rest, items) = separated_list0(comma, &mut element)(input)?;
        if items.is_empty() {
            return Ok((rest, items));
        }
        let (rest, _) = opt(comma)(rest)?;
        Ok((rest, items))
    }
}

fn list(input: &str) -> IResult<&str, Literal> {
    map(
        delimited(
            pair(char('['), multispace0),
            elements(literal),
            pair(multispace0, char(']')),
        ),
        Literal::List,
    )(input)
}

fn mapping(input: &str) -> IResult<&str, Literal> {
    let entry = separated_pair(literal, delimited(multispace0, char(':'), multispace0), literal);
    map(
        delimited(
            pair(char('{'), multispace0),
            elements(entry),
            pair(multispace0, char('}')),
        ),
        |entries| {
            let mut unique: Vec<(Literal, Literal)> = Vec::with_capacity(entries.len());
            for (key, value) in entries {
                match unique.iter_mut().find(|(existing, _)| *existing == key) {
                    Some(slot) => slot.1 = value,
                    None => unique.push((key, value)),
                }
            }
            Literal::Map(unique)
        },
    )(input)
}

fn quoted(input: &str) -> IResult<&str, String> {
    let fail = || NomErr::Error(NomError::new(input, ErrorKind::Escaped));
    let quote = match input.chars().next() {
        Some(quote @ ('"' | '\'')) => quote,
        _ => return Err(NomErr::Error(NomError::new(input, ErrorKind::Char))),
    };
    let body = &input[1..];
    let mut out = String::new();
    let mut chars = body.char_indices();

    while let Some((idx, c)) = chars.next() {
        match c {
            c if c == quote => return Ok((&body[idx + c.len_utf8()..], out)),
            '\n' => return Err(fail()),
            '\\' => {
                let (_, escaped) = chars.next().ok_or_else(fail)?;
                match escaped {
                    'n' => out.push('\n'),
                    't' => out.push('\t'),
                    'r' => out.push('\r'),
                    'b' => out.push('\u{8}'),
                    'f' => out.push('\u{c}'),
                    '\\' | '\'' | '"' | '/' => out.push(escaped),
                    '\n' => {}
                    '0'..='7' => {
                        let code = take_octal(&mut chars, escaped);
                        out.push(char::from_u32(code).ok_or_else(fail)?);
                    }
                    'x' => {
                        let code = take_hex(&mut chars, 2).ok_or_else(fail)?;
                        out.push(char::from_u32(code).ok_or_else(fail)?);
                    }
                    'U' => {
                        let code = take_hex(&mut chars, 8).ok_or_else(fail)?;
                        out.push(char::from_u32(code).ok_or_else(fail)?);
                    }
                    'u' => {
                        let mut code = take_hex(&mut chars, 4).ok_or_else(fail)?;
                        if (0xD800..0xDC00).contains(&code) {
                            let mut lookahead = chars.clone();
                            if let (Some((_, '\\')), Some((_, 'u'))) =
                                (lookahead.next(), lookahead.next())
                            {
                                if let Some(low) = take_hex(&mut lookahead, 4)
                                    .filter(|low| (0xDC00..0xE000).contains(low))
                                {
                                    code = 0x10000 + ((code - 0xD800) << 10) + (low - 0xDC00);
                                    chars = lookahead;
                                }
                            }
                        }
                        out.push(char::from_u32(code).ok_or_else(fail)?);
                    }
                    other => {
                        out.push('\\');
                        out.push(other);
                    }
                }
            }
            c => out.push(c),
        }
    }

    Err(fail())
}

/// Up to three octal digits, the first already consumed.
fn take_octal(chars: &mut CharIndices<'_>, first: char) -> u32 {
    let mut code = first as u32 - '0' as u32;
    for _ in 0..2 {
        let mut lookahead = chars.clone();
        match lookahead.next().and_then(|(_, c)| c.to_digit(8)) {
            Some(digit) => {
                code = code * 8 + digit;
                *chars = lookahead;
            }
            None => break,
        }
    }
    code
}

fn take_hex(chars: &mut CharIndices<'_>, digits: usize) -> Option<u32> {
    let mut code = 0u32;
    for _ in 0..digits {
        let (_, c) = chars.next()?;
        code = code * 16 + c.to_digit(16)?;
    }
    Some(code)
}
