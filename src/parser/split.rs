//! Source pre-pass: partition raw text into the struct-literal stream and
//! the info/service stream the state machine consumes.
//!
//! Type declarations are pulled out whole (braces included) before the
//! line-oriented state machine runs, so the struct-literal parser can work
//! on a contiguous stream. Everything else keeps its source order.

use crate::error::{Error, Result};
use crate::lexer::Line;
use crate::parser::types;
use regex::Regex;
use std::sync::LazyLock;

static RE_INFO_OPEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^info\b").unwrap());

static RE_SERVICE_OPEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^service\b").unwrap());

/// The two line streams a source file decomposes into.
#[derive(Debug, Default)]
pub struct Segments {
    /// Info and service lines, source order, openers and closers included.
    pub root: Vec<Line>,
    /// Every top-level `type X struct { ... }` block, braces included.
    pub types: Vec<Line>,
}

#[derive(PartialEq)]
enum BlockKind {
    None,
    Type,
    Root,
}

/// Split `src` into numbered line streams.
///
/// Tracks brace depth per line (ignoring braces inside backtick tags,
/// double-quoted strings, and `//` comments) so a block claims every line
/// through its closing brace. A non-blank top-level line that opens no known
/// block is a syntax error; a missing terminator is left for the downstream
/// parser that owns the block.
pub fn split_source(src: &str) -> Result<Segments> {
    let mut segments = Segments::default();
    let mut block = BlockKind::None;
    let mut depth: i32 = 0;

    for (i, raw) in src.lines().enumerate() {
        let line = Line::new(i + 1, raw);
        let trimmed = raw.trim();

        match block {
            BlockKind::None => {
                if trimmed.is_empty() || trimmed.starts_with("//") {
                    continue;
                }
                if types::is_type_opener(trimmed) {
                    depth = brace_delta(raw);
                    segments.types.push(line);
                    if depth > 0 {
                        block = BlockKind::Type;
                    }
                } else if RE_INFO_OPEN.is_match(trimmed) || RE_SERVICE_OPEN.is_match(trimmed) {
                    depth = brace_delta(raw);
                    segments.root.push(line);
                    if depth > 0 {
                        block = BlockKind::Root;
                    }
                } else {
                    return Err(Error::syntax(
                        i + 1,
                        format!("expected `info`, `type` or `service`, found {trimmed:?}"),
                    ));
                }
            }
            BlockKind::Type => {
                depth += brace_delta(raw);
                segments.types.push(line);
                if depth <= 0 {
                    block = BlockKind::None;
                }
            }
            BlockKind::Root => {
                depth += brace_delta(raw);
                segments.root.push(line);
                if depth <= 0 {
                    block = BlockKind::None;
                }
            }
        }
    }

    Ok(segments)
}

/// Net change in brace depth across one line.
///
/// Braces inside backtick tag strings and double-quoted strings do not
/// count, and scanning stops at a `//` comment outside either.
fn brace_delta(line: &str) -> i32 {
    let mut delta = 0;
    let mut in_backtick = false;
    let mut in_quote = false;
    let mut prev = '\0';

    for ch in line.chars() {
        match ch {
            '`' if !in_quote => in_backtick = !in_backtick,
            '"' if !in_backtick => in_quote = !in_quote,
            '/' if prev == '/' && !in_quote && !in_backtick => return delta,
            '{' if !in_quote && !in_backtick => delta += 1,
            '}' if !in_quote && !in_backtick => delta -= 1,
            _ => {}
        }
        prev = ch;
    }
    delta
}
