//! Byte offset to line/column conversion.
//!
//! Built once per validation pass in O(n). Columns are UTF-16 code units,
//! the default LSP position encoding. ASCII lines resolve columns by
//! subtraction; other lines keep a per-character table that is searched.

use crate::diagnostics::{Position, SourceRange};
use crate::node::Span;

/// One character of a non-ASCII line, relative to the line start
#[derive(Debug, Clone, Copy)]
struct CharPos {
    byte: usize,
    utf16: u32,
}

#[derive(Debug, Clone)]
pub struct LineIndex<'a> {
    text: &'a str,
    line_starts: Vec<usize>,
    /// `None` for ASCII lines. Otherwise one entry per character plus a
    /// final entry for the end of the line.
    wide: Vec<Option<Vec<CharPos>>>,
}

impl<'a> LineIndex<'a> {
    pub fn new(text: &'a str) -> Self {
        let mut line_starts = Vec::with_capacity(text.len() / 32 + 1);
        line_starts.push(0);
        line_starts.extend(
            text.bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );

        let wide = (0..line_starts.len())
            .map(|line| {
                let start = line_starts[line];
                let end = line_end(text, &line_starts, line);
                let body = &text[start..end];
                (!body.is_ascii()).then(|| char_table(body))
            })
            .collect();

        Self {
            text,
            line_starts,
            wide,
        }
    }

    /// Convert a byte offset to a position. Offsets past the end clamp to
    /// the end of the document; offsets inside a multi-byte character
    /// snap back to its start.
    pub fn position(&self, offset: usize) -> Position {
        let mut offset = offset.min(self.text.len());
        while !self.text.is_char_boundary(offset) {
            offset -= 1;
        }
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        let relative = offset - self.line_starts[line];
        let character = match &self.wide[line] {
            None => relative as u32,
            Some(table) => {
                let at = table.partition_point(|c| c.byte < relative);
                table.get(at).or(table.last()).map_or(0, |c| c.utf16)
            }
        };
        Position::new(line as u32, character)
    }

    pub fn range(&self, span: Span) -> SourceRange {
        let start = self.position(span.start);
        let end = self.position(span.end.max(span.start));
        SourceRange::new(start, end)
    }

    /// Byte offset of the `column`th character (counting Unicode scalar
    /// values) on `line`. Both past-the-end cases clamp: a column beyond
    /// the line to its end, a line beyond the text to the text end.
    pub fn offset_of_char(&self, line: usize, column: usize) -> usize {
        let Some(&start) = self.line_starts.get(line) else {
            return self.text.len();
        };
        let end = line_end(self.text, &self.line_starts, line);
        match &self.wide[line] {
            None => start + column.min(end - start),
            Some(table) => {
                start + table.get(column).or(table.last()).map_or(0, |c| c.byte)
            }
        }
    }
}

/// End of `line`, excluding its newline
fn line_end(text: &str, line_starts: &[usize], line: usize) -> usize {
    line_starts
        .get(line + 1)
        .map_or(text.len(), |next| next - 1)
}

fn char_table(body: &str) -> Vec<CharPos> {
    let mut table = Vec::with_capacity(body.len() + 1);
    let mut utf16 = 0u32;
    for (byte, c) in body.char_indices() {
        table.push(CharPos { byte, utf16 });
        utf16 += c.len_utf16() as u32;
    }
    table.push(CharPos {
        byte: body.len(),
        utf16,
    });
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[test]
    fn test_trailing_newline_opens_a_line() {
        let index = LineIndex::new("a\n");
        assert_eq!(index.position(2), Position::new(1, 0));
    }

    #[test]
    fn test_position_from_offset() {
        let index = LineIndex::new("line1\nline2\nline3");
        assert_eq!(index.position(0), Position::new(0, 0));
        assert_eq!(index.position(5), Position::new(0, 5));
        assert_eq!(index.position(6), Position::new(1, 0));
        assert_eq!(index.position(12), Position::new(2, 0));
        assert_eq!(index.position(999), Position::new(2, 5));
    }

    #[test]
    fn test_utf16_columns() {
        // 'é' is one UTF-16 unit, '𝔸' is two
        let text = "é𝔸x";
        let index = LineIndex::new(text);
        assert_eq!(index.position(text.len() - 1), Position::new(0, 3));
        assert_eq!(index.position(text.len()), Position::new(0, 4));
        // inside the 4-byte char snaps back to its start
        assert_eq!(index.position(3), Position::new(0, 1));
    }

    #[test]
    fn test_wide_line_newline_position() {
        let text = "aé\nb";
        let index = LineIndex::new(text);
        assert_eq!(index.position(3), Position::new(0, 2));
        assert_eq!(index.position(4), Position::new(1, 0));
    }

    #[test]
    fn test_offset_of_char() {
        let text = "ab\né𝔸x\n";
        let index = LineIndex::new(text);
        assert_eq!(index.offset_of_char(0, 1), 1);
        assert_eq!(index.offset_of_char(0, 9), 2);
        assert_eq!(index.offset_of_char(1, 2), 3 + 2 + 4);
        assert_eq!(index.offset_of_char(1, 99), 3 + 7);
        assert_eq!(index.offset_of_char(2, 0), text.len());
        assert_eq!(index.offset_of_char(7, 0), text.len());
    }

    #[test]
    fn test_range_orders_start_before_end() {
        let index = LineIndex::new("abc\ndef");
        let range = index.range(Span::new(5, 2));
        assert!(range.start <= range.end);
    }

    #[test]
    fn test_long_line_lookups_stay_linear() {
        let ascii = "1,".repeat(512 * 1024);
        let wide = "é,".repeat(256 * 1024);
        for text in [ascii.as_str(), wide.as_str()] {
            let started = Instant::now();
            let index = LineIndex::new(text);
            let mut last = Position::default();
            for offset in (0..text.len()).step_by(2) {
                last = index.position(offset);
            }
            assert_eq!(last.line, 0);
            assert!(started.elapsed() < Duration::from_secs(5));
        }
    }
}
