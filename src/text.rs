//! Line/column bookkeeping for source text.
//!
//! Positions coming from the front end are 0-based lines with character
//! columns; tree-sitter works in byte offsets. [`LineIndex`] converts
//! between the two and snaps ranges to whole lines.

use crate::types::{Position, TextRange};

/// Byte offsets of every line start in a source string.
#[derive(Debug, Clone)]
pub struct LineIndex<'a> {
    source: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    pub fn new(source: &'a str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(source.match_indices('\n').map(|(i, _)| i + 1));
        Self {
            source,
            line_starts,
        }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Text of line `line` without its terminator. Empty past the end.
    pub fn line_text(&self, line: usize) -> &'a str {
        let Some(&start) = self.line_starts.get(line) else {
            return "";
        };
        let end = self.line_end(line);
        &self.source[start..end]
    }

    /// Byte offset just past the last character of `line`, excluding the
    /// `\n` (and a preceding `\r`).
    fn line_end(&self, line: usize) -> usize {
        let raw_end = self
            .line_starts
            .get(line + 1)
            .map(|next| next - 1)
            .unwrap_or(self.source.len());
        let start = self.line_starts[line];
        if raw_end > start && self.source.as_bytes()[raw_end - 1] == b'\r' {
            raw_end - 1
        } else {
            raw_end
        }
    }

    /// Byte offset of `pos`, clamped to the end of its line and to the end
    /// of the source.
    pub fn offset(&self, pos: Position) -> usize {
        let Some(&start) = self.line_starts.get(pos.line) else {
            return self.source.len();
        };
        let text = self.line_text(pos.line);
        let within = text
            .char_indices()
            .nth(pos.column)
            .map(|(i, _)| i)
            .unwrap_or(text.len());
        start + within
    }

    /// Position of a byte offset. Offsets must fall on a char boundary.
    pub fn position(&self, offset: usize) -> Position {
        let offset = offset.min(self.source.len());
        let line = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        let start = self.line_starts[line];
        let column = self.source[start..offset].chars().count();
        Position::new(line, column)
    }

    /// Byte span `(start, end)` of a range.
    pub fn byte_span(&self, range: TextRange) -> (usize, usize) {
        (self.offset(range.start), self.offset(range.end))
    }

    /// Range of a byte span.
    pub fn range_of(&self, start: usize, end: usize) -> TextRange {
        TextRange::new(self.position(start), self.position(end))
    }

    /// Widen a range to cover whole lines, from the first character of the
    /// start line to the last character of the end line.
    pub fn snap_to_lines(&self, range: TextRange) -> TextRange {
        let last = self.line_count() - 1;
        let start_line = range.start.line.min(last);
        let end_line = range.end.line.min(last);
        let end_col = self.line_text(end_line).chars().count();
        TextRange::new(Position::new(start_line, 0), Position::new(end_line, end_col))
    }

    /// The text of a range widened to whole lines.
    pub fn line_snapped_text(&self, range: TextRange) -> String {
        let (start, end) = self.byte_span(self.snap_to_lines(range));
        self.source[start..end].to_string()
    }
}
