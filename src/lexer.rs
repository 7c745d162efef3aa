//! Position-tracked line stream feeding the state machine.

/// One source line with its original 1-based number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub no: usize,
    pub text: String,
}

impl Line {
    pub fn new(no: usize, text: impl Into<String>) -> Line {
        Line {
            no,
            text: text.into(),
        }
    }
}

/// Sequential reader over pre-numbered lines with one line of lookahead.
///
/// `next()` returning `None` is the distinguished end-of-input signal, not a
/// failure; the caller decides whether that means completion (outermost
/// scope) or a missing terminator (anywhere else).
#[derive(Debug)]
pub struct LineReader {
    lines: Vec<Line>,
    pos: usize,
}

impl LineReader {
    pub fn new(lines: Vec<Line>) -> LineReader {
        LineReader { lines, pos: 0 }
    }

    /// Number every line of `src`, 1-based.
    pub fn from_source(src: &str) -> LineReader {
        LineReader::new(
            src.lines()
                .enumerate()
                .map(|(i, text)| Line::new(i + 1, text))
                .collect(),
        )
    }

    pub fn next(&mut self) -> Option<Line> {
        let line = self.lines.get(self.pos).cloned()?;
        self.pos += 1;
        Some(line)
    }

    pub fn peek(&self) -> Option<&Line> {
        self.lines.get(self.pos)
    }

    /// Line number of the most recently consumed line, for end-of-input
    /// diagnostics. 0 when nothing has been read yet.
    pub fn last_no(&self) -> usize {
        if self.pos == 0 {
            0
        } else {
            self.lines[self.pos - 1].no
        }
    }
}
