//! Character reader with position tracking.
//!
//! [`StreamReader`] turns decoded text (or raw bytes plus a BOM-detected
//! encoding) into a sequence of code points with a lookahead window. It
//! normalizes line breaks eagerly (`\r\n` and lone `\r` become `\n`), so
//! later stages never see the source's line-ending convention, and it keeps
//! `index`, `line` and `column` for marks.
//!
//! Invalid input (undecodable bytes, non-printable code points) does not
//! fail immediately: the reader stops filling its buffer at the bad code
//! point and records the failure. The scanner raises it once it actually
//! reaches that position, so the reported error never depends on the
//! configured buffer size.

mod decode;

use core::fmt;

use tracing::trace;

pub use decode::{detect_encoding, ByteDecoder, DecodeError, DecodeErrorKind, Encoding};

use crate::mark::{Mark, SNIPPET_CONTEXT};
use crate::settings::{LineBreaks, LoadSettings};

/// Code point returned by [`StreamReader::peek`] past the end of input.
pub const EOF: char = '\0';

/// What went wrong while reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReaderErrorKind {
    /// The byte input is not valid in its encoding.
    Decode(DecodeError),
    /// A code point outside the printable YAML character set.
    NonPrintable {
        /// The offending code point
        code_point: u32,
    },
    /// The document is longer than the configured code point limit.
    CodePointLimit {
        /// The configured limit
        limit: usize,
    },
}

/// A failure of the reader, positioned by code point index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderError {
    /// Label of the input
    pub name: String,
    /// Code point index where reading failed
    pub position: usize,
    /// What went wrong
    pub kind: ReaderErrorKind,
}

impl fmt::Display for ReaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ReaderErrorKind::Decode(err) => write!(
                f,
                "cannot decode {} input: {} at byte {}\nin \"{}\", position {}",
                err.encoding, err.kind, err.offset, self.name, self.position
            ),
            ReaderErrorKind::NonPrintable { code_point } => {
                let shown = char::from_u32(*code_point)
                    .map(|c| format!("{:?}", c))
                    .unwrap_or_else(|| "?".to_string());
                write!(
                    f,
                    "unacceptable code point {} (0x{:X}) special characters are not allowed\nin \"{}\", position {}",
                    shown, code_point, self.name, self.position
                )
            }
            ReaderErrorKind::CodePointLimit { limit } => write!(
                f,
                "the incoming YAML document exceeds the limit: {} code points\nin \"{}\", position {}",
                limit, self.name, self.position
            ),
        }
    }
}

impl std::error::Error for ReaderError {}

/// Whether `c` may appear in a YAML stream.
#[inline]
pub fn is_printable(c: char) -> bool {
    matches!(c,
        '\t' | '\n' | '\r' | '\u{85}'
        | '\u{20}'..='\u{7E}'
        | '\u{A0}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FFFD}'
        | '\u{10000}'..='\u{10FFFF}')
}

type Source<'a> = Box<dyn Iterator<Item = Result<char, DecodeError>> + 'a>;

/// Reader over a code point source with a refillable lookahead buffer.
pub struct StreamReader<'a> {
    name: String,
    source: Source<'a>,
    encoding: Encoding,
    buffer: Vec<char>,
    pointer: usize,
    eof: bool,
    skip_lf: bool,
    started: bool,
    index: usize,
    document_index: usize,
    line: usize,
    column: usize,
    line_has_content: bool,
    buffer_size: usize,
    line_breaks: LineBreaks,
    use_marks: bool,
    code_point_limit: usize,
    stop_error: Option<ReaderError>,
    limit_error: Option<ReaderError>,
}

impl<'a> StreamReader<'a> {
    /// Reader over already decoded text.
    pub fn new(text: &'a str, settings: &LoadSettings) -> Self {
        Self::from_source(Box::new(text.chars().map(Ok)), Encoding::Utf8, settings)
    }

    /// Reader over raw bytes; the encoding is detected from a BOM.
    pub fn from_bytes(bytes: &'a [u8], settings: &LoadSettings) -> Self {
        let (encoding, bom) = detect_encoding(bytes);
        trace!(%encoding, bom, "detected input encoding");
        Self::from_source(
            Box::new(ByteDecoder::new(bytes, encoding, bom)),
            encoding,
            settings,
        )
    }

    fn from_source(source: Source<'a>, encoding: Encoding, settings: &LoadSettings) -> Self {
        Self {
            name: settings.label.clone(),
            source,
            encoding,
            buffer: Vec::with_capacity(settings.buffer_size.max(1) + SNIPPET_CONTEXT),
            pointer: 0,
            eof: false,
            skip_lf: false,
            started: false,
            index: 0,
            document_index: 0,
            line: 0,
            column: 0,
            line_has_content: false,
            buffer_size: settings.buffer_size.max(1),
            line_breaks: settings.line_breaks,
            use_marks: settings.use_marks,
            code_point_limit: settings.code_point_limit,
            stop_error: None,
            limit_error: None,
        }
    }

    /// Label used in marks and errors.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Encoding of the input.
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Absolute code point index of the current position.
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Code points consumed since the last [`reset_document_index`](Self::reset_document_index).
    #[inline]
    pub fn document_index(&self) -> usize {
        self.document_index
    }

    /// Start counting code points for a new document.
    pub fn reset_document_index(&mut self) {
        self.document_index = 0;
    }

    /// Current line (0-indexed).
    #[inline]
    pub fn line(&self) -> usize {
        self.line
    }

    /// Current column (0-indexed).
    #[inline]
    pub fn column(&self) -> usize {
        self.column
    }

    /// Whether anything other than spaces and tabs was consumed on the current line.
    #[inline]
    pub fn line_has_content(&self) -> bool {
        self.line_has_content
    }

    /// The line break convention in effect.
    #[inline]
    pub fn line_breaks(&self) -> LineBreaks {
        self.line_breaks
    }

    /// Switch the line break convention, e.g. after a `%YAML 1.1` directive.
    pub fn set_line_breaks(&mut self, line_breaks: LineBreaks) {
        self.line_breaks = line_breaks;
    }

    /// The failure that stopped reading, if reading stopped early.
    pub fn stop_error(&self) -> Option<&ReaderError> {
        self.stop_error.as_ref()
    }

    /// The code point limit failure, once the limit was crossed.
    pub fn limit_error(&self) -> Option<&ReaderError> {
        self.limit_error.as_ref()
    }

    /// Whether the line break at `c` starts a new line.
    #[inline]
    pub fn is_line_break(&self, c: char) -> bool {
        c == '\n' || (self.line_breaks == LineBreaks::Yaml11 && matches!(c, '\u{85}' | '\u{2028}' | '\u{2029}'))
    }

    /// Look at the code point `offset` positions ahead without consuming.
    ///
    /// Returns [`EOF`] past the end of input (or past an unreadable position).
    #[inline]
    pub fn peek_at(&mut self, offset: usize) -> char {
        if self.pointer + offset >= self.buffer.len() {
            self.fill(offset + 1);
        }
        self.buffer.get(self.pointer + offset).copied().unwrap_or(EOF)
    }

    /// Look at the current code point.
    #[inline]
    pub fn peek(&mut self) -> char {
        self.peek_at(0)
    }

    /// The next `length` code points as a string, without consuming them.
    pub fn prefix(&mut self, length: usize) -> String {
        if self.pointer + length > self.buffer.len() {
            self.fill(length);
        }
        let end = (self.pointer + length).min(self.buffer.len());
        self.buffer[self.pointer..end].iter().collect()
    }

    /// The next `length` code points, consuming them.
    pub fn prefix_forward(&mut self, length: usize) -> String {
        let prefix = self.prefix(length);
        self.forward(length);
        prefix
    }

    /// Advance by one code point.
    #[inline]
    pub fn forward_one(&mut self) {
        self.forward(1);
    }

    /// Advance by `length` code points, clamping at the end of input.
    pub fn forward(&mut self, length: usize) {
        for _ in 0..length {
            if self.pointer >= self.buffer.len() {
                self.fill(1);
                if self.pointer >= self.buffer.len() {
                    break;
                }
            }
            let c = self.buffer[self.pointer];
            self.pointer += 1;
            self.index += 1;
            self.document_index += 1;
            if self.is_line_break(c) {
                self.line += 1;
                self.column = 0;
                self.line_has_content = false;
            } else {
                if c != '\u{FEFF}' {
                    self.column += 1;
                }
                if c != ' ' && c != '\t' {
                    self.line_has_content = true;
                }
            }
        }
        if self.document_index > self.code_point_limit && self.limit_error.is_none() {
            self.limit_error = Some(ReaderError {
                name: self.name.clone(),
                position: self.index,
                kind: ReaderErrorKind::CodePointLimit {
                    limit: self.code_point_limit,
                },
            });
        }
    }

    /// A mark at the current position, or `None` when marks are disabled.
    pub fn mark(&mut self) -> Option<Mark> {
        if !self.use_marks {
            return None;
        }
        if self.pointer + SNIPPET_CONTEXT > self.buffer.len() {
            self.fill(SNIPPET_CONTEXT);
        }
        let start = self.pointer.saturating_sub(SNIPPET_CONTEXT);
        let end = (self.pointer + SNIPPET_CONTEXT).min(self.buffer.len());
        Some(Mark::new(
            self.name.clone(),
            self.index,
            self.line,
            self.column,
            self.buffer[start..end].to_vec(),
            self.pointer - start,
        ))
    }

    /// Make sure `wanted` code points past the pointer are buffered (unless input ends).
    fn fill(&mut self, wanted: usize) {
        if self.eof {
            return;
        }
        // Keep a snippet's worth of consumed text for marks.
        if self.pointer > SNIPPET_CONTEXT {
            let drop = self.pointer - SNIPPET_CONTEXT;
            self.buffer.drain(..drop);
            self.pointer -= drop;
        }
        while !self.eof && self.buffer.len() < self.pointer + wanted {
            self.read_chunk();
        }
    }

    /// Pull up to `buffer_size` code points from the source.
    fn read_chunk(&mut self) {
        let mut read = 0;
        while read < self.buffer_size {
            let next = match self.source.next() {
                None => {
                    self.eof = true;
                    break;
                }
                Some(next) => next,
            };
            let c = match next {
                Ok(c) => c,
                Err(err) => {
                    self.stop(ReaderErrorKind::Decode(err));
                    break;
                }
            };
            if !self.started {
                self.started = true;
                if c == '\u{FEFF}' {
                    continue;
                }
            }
            if self.skip_lf {
                self.skip_lf = false;
                if c == '\n' {
                    continue;
                }
            }
            let c = if c == '\r' {
                self.skip_lf = true;
                '\n'
            } else {
                c
            };
            if !is_printable(c) {
                self.stop(ReaderErrorKind::NonPrintable {
                    code_point: u32::from(c),
                });
                break;
            }
            self.buffer.push(c);
            read += 1;
        }
    }

    fn stop(&mut self, kind: ReaderErrorKind) {
        let position = self.index + (self.buffer.len() - self.pointer);
        self.stop_error = Some(ReaderError {
            name: self.name.clone(),
            position,
            kind,
        });
        self.eof = true;
    }
}

impl fmt::Debug for StreamReader<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamReader")
            .field("name", &self.name)
            .field("encoding", &self.encoding)
            .field("index", &self.index)
            .field("line", &self.line)
            .field("column", &self.column)
            .field("eof", &self.eof)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> LoadSettings {
        LoadSettings::default()
    }

    fn read_all(reader: &mut StreamReader<'_>) -> String {
        let mut out = String::new();
        while reader.peek() != EOF {
            out.push(reader.peek());
            reader.forward_one();
        }
        out
    }

    #[test]
    fn test_peek_and_forward() {
        let settings = settings();
        let mut reader = StreamReader::new("abc", &settings);
        assert_eq!(reader.peek(), 'a');
        assert_eq!(reader.peek_at(2), 'c');
        assert_eq!(reader.peek_at(3), EOF);
        reader.forward(2);
        assert_eq!(reader.peek(), 'c');
        assert_eq!(reader.index(), 2);
        assert_eq!(reader.column(), 2);
    }

    #[test]
    fn test_forward_past_end_clamps() {
        let settings = settings();
        let mut reader = StreamReader::new("ab", &settings);
        reader.forward(10);
        assert_eq!(reader.index(), 2);
        assert_eq!(reader.peek(), EOF);
    }

    #[test]
    fn test_crlf_normalized() {
        let settings = settings();
        let mut crlf = StreamReader::new("foo\r\nbar\rbaz", &settings);
        assert_eq!(read_all(&mut crlf), "foo\nbar\nbaz");
        assert_eq!(crlf.line(), 2);
        assert_eq!(crlf.column(), 3);
    }

    #[test]
    fn test_crlf_and_lf_report_same_positions() {
        let settings = settings();
        let mut a = StreamReader::new("foo\r\nbar", &settings);
        let mut b = StreamReader::new("foo\nbar", &settings);
        for _ in 0..6 {
            a.forward_one();
            b.forward_one();
            assert_eq!((a.line(), a.column()), (b.line(), b.column()));
        }
    }

    #[test]
    fn test_bom_stripped() {
        let settings = settings();
        let mut reader = StreamReader::new("\u{FEFF}a: 1", &settings);
        assert_eq!(reader.peek(), 'a');

        let mut bytes = StreamReader::from_bytes(b"\xEF\xBB\xBFa: 1", &settings);
        assert_eq!(bytes.encoding(), Encoding::Utf8);
        assert_eq!(read_all(&mut bytes), "a: 1");
    }

    #[test]
    fn test_non_printable_stops_reading() {
        let settings = settings();
        let mut reader = StreamReader::new("ab\u{1}cd", &settings);
        assert_eq!(read_all(&mut reader), "ab");
        let err = reader.stop_error().unwrap();
        assert_eq!(err.position, 2);
        assert_eq!(err.kind, ReaderErrorKind::NonPrintable { code_point: 1 });
        assert!(err.to_string().contains("special characters are not allowed"));
    }

    #[test]
    fn test_small_buffer_same_content() {
        let text = "key: value\nlist:\n  - a\n  - b\n";
        let big = settings();
        let small = LoadSettings::default().with_buffer_size(1);
        let mut a = StreamReader::new(text, &big);
        let mut b = StreamReader::new(text, &small);
        assert_eq!(read_all(&mut a), read_all(&mut b));
    }

    #[test]
    fn test_mark_window_independent_of_buffer() {
        let text = "a: 1\nbb: [x, y, zzzzzz]\n";
        let big = settings();
        let small = LoadSettings::default().with_buffer_size(2);
        let mut a = StreamReader::new(text, &big);
        let mut b = StreamReader::new(text, &small);
        a.forward(12);
        b.forward(12);
        assert_eq!(a.mark(), b.mark());
    }

    #[test]
    fn test_yaml11_line_breaks() {
        let settings = LoadSettings::default().with_line_breaks(LineBreaks::Yaml11);
        let mut reader = StreamReader::new("a\u{2028}b", &settings);
        reader.forward(2);
        assert_eq!(reader.line(), 1);
        assert_eq!(reader.column(), 0);
    }

    #[test]
    fn test_code_point_limit() {
        let settings = LoadSettings::default().with_code_point_limit(4);
        let mut reader = StreamReader::new("abcdef", &settings);
        reader.forward(4);
        assert!(reader.limit_error().is_none());
        reader.forward(1);
        assert!(matches!(
            reader.limit_error().map(|e| &e.kind),
            Some(ReaderErrorKind::CodePointLimit { limit: 4 })
        ));
    }

    #[test]
    fn test_marks_disabled() {
        let settings = LoadSettings::default().with_use_marks(false);
        let mut reader = StreamReader::new("abc", &settings);
        assert!(reader.mark().is_none());
    }
}
