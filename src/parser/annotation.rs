//! `@name(key: value, ...)` annotation block parser.
//!
//! Blocks may sit on one line or spread properties across lines until the
//! closing `)`. Values are quoted strings (quotes stripped), bare tokens,
//! or flags: a property with no `:` whose value is the empty string,
//! meaning presence.

use crate::error::{Error, Result};
use crate::lexer::{Line, LineReader};
use crate::model::Annotation;
use regex::Regex;
use std::sync::LazyLock;

static RE_OPEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^@([A-Za-z_]\w*)\(").unwrap());

static RE_IDENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z_]\w*$").unwrap());

/// The annotation block names a parse recognizes.
///
/// An explicit value handed to the parser rather than a process-wide
/// constant, so alternative DSL dialects extend it without recompilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dialect {
    names: Vec<String>,
}

impl Default for Dialect {
    fn default() -> Dialect {
        Dialect::new(&["doc", "server"])
    }
}

impl Dialect {
    pub fn new<S: AsRef<str>>(names: &[S]) -> Dialect {
        Dialect {
            names: names.iter().map(|s| s.as_ref().to_string()).collect(),
        }
    }

    pub fn push(&mut self, name: impl Into<String>) {
        self.names.push(name.into());
    }

    pub fn recognizes(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }
}

/// True if a trimmed line opens an annotation block.
pub(crate) fn is_annotation(line: &str) -> bool {
    line.starts_with('@')
}

/// Parse one annotation block starting at `first`, consuming continuation
/// lines from `reader` until the closing `)`.
pub(crate) fn parse(first: &Line, reader: &mut LineReader, dialect: &Dialect) -> Result<Annotation> {
    let trimmed = first.text.trim();
    let caps = RE_OPEN
        .captures(trimmed)
        .ok_or_else(|| Error::syntax(first.no, format!("malformed annotation {trimmed:?}")))?;
    let name = caps[1].to_string();
    if !dialect.recognizes(&name) {
        return Err(Error::syntax(
            first.no,
            format!("unknown annotation @{name}"),
        ));
    }

    // Accumulate the body up to the matching `)`, across lines if needed.
    let mut body = String::new();
    let mut rest = trimmed[caps[0].len()..].to_string();
    let mut at = first.no;
    loop {
        match find_close(&rest) {
            Some(pos) => {
                if !rest[pos + 1..].trim().is_empty() {
                    return Err(Error::syntax(at, format!("unexpected text after `)` in @{name}")));
                }
                body.push_str(&rest[..pos]);
                break;
            }
            None => {
                body.push_str(&rest);
                body.push('\n');
                let Some(line) = reader.next() else {
                    return Err(Error::syntax(
                        reader.last_no().max(first.no),
                        format!("unexpected end of input in @{name} annotation"),
                    ));
                };
                at = line.no;
                rest = line.text.trim().to_string();
            }
        }
    }

    let mut annotation = Annotation {
        name: name.clone(),
        properties: Default::default(),
    };
    for segment in split_properties(&body) {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }
        let (key, value) = match segment.split_once(':') {
            Some((k, v)) => (k.trim(), strip_quotes(v.trim())),
            // Flag property: presence only.
            None => (segment, ""),
        };
        if !RE_IDENT.is_match(key) {
            return Err(Error::syntax(
                at,
                format!("malformed property {segment:?} in @{name}"),
            ));
        }
        if annotation
            .properties
            .insert(key.to_string(), value.to_string())
            .is_some()
        {
            return Err(Error::syntax(
                at,
                format!("duplicate property {key:?} in @{name}"),
            ));
        }
    }

    Ok(annotation)
}

/// Position of the `)` closing the paren the caller already consumed.
/// Parens and separators inside double-quoted values do not count.
fn find_close(s: &str) -> Option<usize> {
    let mut depth = 1;
    let mut in_quote = false;
    for (i, ch) in s.char_indices() {
        match ch {
            '"' => in_quote = !in_quote,
            '(' if !in_quote => depth += 1,
            ')' if !in_quote => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split the body on commas and newlines, but only those outside quotes.
fn split_properties(body: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut start = 0;
    let mut in_quote = false;
    for (i, ch) in body.char_indices() {
        match ch {
            '"' => in_quote = !in_quote,
            ',' | '\n' if !in_quote => {
                segments.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    segments.push(&body[start..]);
    segments
}

fn strip_quotes(s: &str) -> &str {
    if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
        &s[1..s.len() - 1]
    } else {
        s
    }
}
