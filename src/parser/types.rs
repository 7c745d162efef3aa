//! Struct-literal parser — `type X struct { ... }` declarations.
//!
//! A small recursive-descent grammar of its own: scalar keywords, slices,
//! maps, pointers, and named references to other declared types. Member
//! lines carry an optional backtick tag and an optional trailing comment.

use crate::error::{Error, Result};
use crate::lexer::{Line, LineReader};
use crate::model::{Member, Scalar, Type, TypeExpr};
use regex::Regex;
use std::sync::LazyLock;

static RE_TYPE_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^type\s+([A-Za-z_]\w*)\s+struct\s*\{").unwrap());

static RE_MEMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z_]\w*)\s+([^\s`]+)\s*(?:`([^`]*)`)?\s*(?://\s?(.*))?$").unwrap()
});

static RE_IDENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z_]\w*$").unwrap());

/// True if a trimmed line opens a type declaration.
pub(crate) fn is_type_opener(line: &str) -> bool {
    RE_TYPE_OPEN.is_match(line)
}

/// Parse the pre-extracted struct-literal stream into the types table.
///
/// Zero-member structs are legal. Name collisions are left to the
/// validator, which reports both declaration sites.
pub fn parse_types(lines: &[Line]) -> Result<Vec<Type>> {
    let mut reader = LineReader::new(lines.to_vec());
    let mut out = Vec::new();

    while let Some(line) = reader.next() {
        let trimmed = line.text.trim();
        if trimmed.is_empty() || trimmed.starts_with("//") {
            continue;
        }
        let caps = RE_TYPE_OPEN.captures(trimmed).ok_or_else(|| {
            Error::syntax(line.no, format!("expected type declaration, found {trimmed:?}"))
        })?;
        let name = caps[1].to_string();

        // `type Empty struct {}` closes on the opener line.
        let open_end = caps.get(0).map_or(trimmed.len(), |m| m.end());
        let after_brace = &trimmed[open_end..];
        if let Some(rest) = after_brace.trim().strip_prefix('}') {
            if !rest.trim().is_empty() {
                return Err(Error::syntax(line.no, "unexpected text after `}`"));
            }
            out.push(Type {
                name,
                line: line.no,
                members: Vec::new(),
            });
            continue;
        }
        if !after_brace.trim().is_empty() {
            return Err(Error::syntax(
                line.no,
                "struct members must be declared one per line",
            ));
        }

        out.push(parse_body(name, line.no, &mut reader)?);
    }

    Ok(out)
}

fn parse_body(name: String, opened_at: usize, reader: &mut LineReader) -> Result<Type> {
    let mut members = Vec::new();

    loop {
        let Some(line) = reader.next() else {
            return Err(Error::syntax(
                reader.last_no().max(opened_at),
                format!("unexpected end of input in type {name}"),
            ));
        };
        let trimmed = line.text.trim();
        if trimmed.is_empty() || trimmed.starts_with("//") {
            continue;
        }
        if trimmed == "}" {
            break;
        }
        members.push(parse_member(&line)?);
    }

    Ok(Type {
        name,
        line: opened_at,
        members,
    })
}

fn parse_member(line: &Line) -> Result<Member> {
    let trimmed = line.text.trim();
    let caps = RE_MEMBER
        .captures(trimmed)
        .ok_or_else(|| Error::syntax(line.no, format!("malformed member {trimmed:?}")))?;

    Ok(Member {
        name: caps[1].to_string(),
        ty: parse_type_expr(&caps[2], line.no)?,
        tag: caps.get(3).map(|m| m.as_str().to_string()),
        comment: caps.get(4).map(|m| m.as_str().trim_end().to_string()),
    })
}

/// Parse one type expression: `*T`, `[]T`, `map[K]V`, scalar, or reference.
pub fn parse_type_expr(s: &str, line: usize) -> Result<TypeExpr> {
    if let Some(rest) = s.strip_prefix('*') {
        return Ok(TypeExpr::Pointer(Box::new(parse_type_expr(rest, line)?)));
    }
    if let Some(rest) = s.strip_prefix("[]") {
        return Ok(TypeExpr::Slice(Box::new(parse_type_expr(rest, line)?)));
    }
    if let Some(rest) = s.strip_prefix("map[") {
        let close = matching_bracket(rest).ok_or_else(|| {
            Error::syntax(line, format!("unterminated map key in type expression {s:?}"))
        })?;
        let key = parse_type_expr(&rest[..close], line)?;
        let value = parse_type_expr(&rest[close + 1..], line)?;
        return Ok(TypeExpr::Map(Box::new(key), Box::new(value)));
    }
    if let Some(scalar) = Scalar::from_keyword(s) {
        return Ok(TypeExpr::Scalar(scalar));
    }
    if RE_IDENT.is_match(s) {
        return Ok(TypeExpr::Named(s.to_string()));
    }
    Err(Error::syntax(
        line,
        format!("unparseable type expression {s:?}"),
    ))
}

/// Index of the `]` closing the bracket already consumed by the caller.
fn matching_bracket(s: &str) -> Option<usize> {
    let mut depth = 1;
    for (i, ch) in s.char_indices() {
        match ch {
            '[' => depth += 1,
            ']' => {
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
