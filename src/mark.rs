//! Source positions used for diagnostics.
//!
//! A [`Mark`] records where a token, event or node came from: the input
//! label, the absolute code point index, the 0-based line and column, and a
//! short window of the surrounding source text so that errors can show the
//! offending line with a caret under the column.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Maximum width of a rendered snippet line.
const SNIPPET_MAX_LENGTH: usize = 75;

/// Indentation applied to rendered snippet lines.
const SNIPPET_INDENT: usize = 4;

/// Code points kept before and after the pointer when a mark is taken.
///
/// Must be larger than half of [`SNIPPET_MAX_LENGTH`] so that rendering only
/// ever depends on the captured window.
pub(crate) const SNIPPET_CONTEXT: usize = 40;

/// A position in the input stream.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Mark {
    /// Label of the input (file name or `reader`)
    pub name: String,
    /// Absolute code point index (after line break normalization)
    pub index: usize,
    /// Line number (0-indexed)
    pub line: usize,
    /// Column number (0-indexed, in code points)
    pub column: usize,
    /// Code points surrounding the position
    pub buffer: Vec<char>,
    /// Offset of the position inside `buffer`
    pub pointer: usize,
}

impl Mark {
    /// Create a new mark.
    pub fn new(
        name: impl Into<String>,
        index: usize,
        line: usize,
        column: usize,
        buffer: Vec<char>,
        pointer: usize,
    ) -> Self {
        Self {
            name: name.into(),
            index,
            line,
            column,
            buffer,
            pointer,
        }
    }

    /// Whether two marks point at the same place of the same input.
    pub fn same_position(&self, other: &Mark) -> bool {
        self.name == other.name && self.line == other.line && self.column == other.column
    }

    /// Render the line containing this mark with a caret under the column.
    ///
    /// Long lines are cut to a window around the pointer and the cut ends
    /// are replaced by ` ... `.
    pub fn snippet(&self) -> String {
        self.snippet_with(SNIPPET_INDENT, SNIPPET_MAX_LENGTH)
    }

    fn snippet_with(&self, indent: usize, max_length: usize) -> String {
        let half = max_length / 2 - 1;
        let mut head = "";
        let mut start = self.pointer.min(self.buffer.len());
        while start > 0 && !is_snippet_break(self.buffer[start - 1]) {
            start -= 1;
            if self.pointer - start > half {
                head = " ... ";
                start += 5;
                break;
            }
        }

        let mut tail = "";
        let mut end = self.pointer.min(self.buffer.len());
        while end < self.buffer.len() && !is_snippet_break(self.buffer[end]) {
            end += 1;
            if end - self.pointer > half {
                tail = " ... ";
                end -= 5;
                break;
            }
        }

        let mut out = String::with_capacity(indent * 2 + max_length + 8);
        out.extend(core::iter::repeat(' ').take(indent));
        out.push_str(head);
        out.extend(self.buffer[start..end].iter());
        out.push_str(tail);
        out.push('\n');
        let caret = indent + self.pointer - start + head.len();
        out.extend(core::iter::repeat(' ').take(caret));
        out.push('^');
        out
    }
}

#[inline]
fn is_snippet_break(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\u{85}' | '\u{2028}' | '\u{2029}' | '\0')
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            " in \"{}\", line {}, column {}:\n{}",
            self.name,
            self.line + 1,
            self.column + 1,
            self.snippet()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mark_in(text: &str, pointer: usize) -> Mark {
        Mark::new("test", pointer, 0, pointer, text.chars().collect(), pointer)
    }

    #[test]
    fn test_snippet_caret_under_column() {
        let mark = mark_in("key: [a, b", 5);
        assert_eq!(mark.snippet(), "    key: [a, b\n         ^");
    }

    #[test]
    fn test_snippet_stops_at_line_breaks() {
        let text = "first\nsecond line\nthird";
        let mark = Mark::new("test", 8, 1, 2, text.chars().collect(), 8);
        assert_eq!(mark.snippet(), "    second line\n      ^");
    }

    #[test]
    fn test_snippet_truncates_long_lines() {
        let text: String = core::iter::repeat('x').take(100).collect();
        let mark = mark_in(&text, 50);
        let snippet = mark.snippet();
        let first = snippet.lines().next().unwrap();
        assert!(first.contains(" ... "));
        assert!(first.len() <= SNIPPET_INDENT + SNIPPET_MAX_LENGTH);
    }

    #[test]
    fn test_display_is_one_based() {
        let mark = Mark::new("doc.yaml", 12, 2, 4, "  - item".chars().collect(), 4);
        let text = mark.to_string();
        assert!(text.starts_with(" in \"doc.yaml\", line 3, column 5:\n"));
    }
}
