//! Plain, quoted and block scalar scanning.

use crate::common::{CommentType, ScalarStyle};
use crate::error::Result;
use crate::mark::Mark;
use crate::reader::EOF;
use crate::tokens::{Token, TokenKind};

use super::Scanner;

/// Single-character escapes of double-quoted scalars.
fn escape_replacement(c: char) -> Option<char> {
    Some(match c {
        '0' => '\0',
        'a' => '\x07',
        'b' => '\x08',
        't' | '\t' => '\t',
        'n' => '\n',
        'v' => '\x0B',
        'f' => '\x0C',
        'r' => '\r',
        'e' => '\x1B',
        ' ' => ' ',
        '"' => '"',
        '/' => '/',
        '\\' => '\\',
        'N' => '\u{85}',
        '_' => '\u{A0}',
        'L' => '\u{2028}',
        'P' => '\u{2029}',
        _ => return None,
    })
}

/// Number of hex digits following `\x`, `\u` and `\U`.
fn escape_code_length(c: char) -> Option<usize> {
    match c {
        'x' => Some(2),
        'u' => Some(4),
        'U' => Some(8),
        _ => None,
    }
}

/// Block scalar chomping: `-` strips, `+` keeps, default clips.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Chomping {
    Strip,
    Clip,
    Keep,
}

impl Scanner<'_> {
    // ========================================================================
    // Plain scalars
    // ========================================================================

    pub(super) fn scan_plain(&mut self) -> Result<Token> {
        let mut chunks = String::new();
        let start = self.reader.mark();
        let mut end = start.clone();
        let indent = self.indent + 1;
        let mut spaces = String::new();
        loop {
            if self.reader.peek() == '#' {
                break;
            }
            let mut length = 0;
            loop {
                let c = self.reader.peek_at(length);
                let next = self.reader.peek_at(length + 1);
                let ends_at_colon = c == ':'
                    && (self.is_blankz(next)
                        || (self.flow_level > 0 && ",[]{}".contains(next)));
                if self.is_blankz(c)
                    || ends_at_colon
                    || (self.flow_level > 0 && ",[]{}".contains(c))
                {
                    break;
                }
                length += 1;
            }
            if length == 0 {
                break;
            }
            self.allow_simple_key = false;
            chunks.push_str(&spaces);
            chunks.push_str(&self.reader.prefix_forward(length));
            end = self.reader.mark();
            spaces = self.scan_plain_spaces();
            if spaces.is_empty()
                || self.reader.peek() == '#'
                || (self.flow_level == 0 && (self.reader.column() as isize) < indent)
            {
                break;
            }
        }
        Ok(Token::spanning(
            TokenKind::Scalar {
                value: chunks,
                plain: true,
                style: ScalarStyle::Plain,
            },
            start,
            end,
        ))
    }

    /// Whitespace between plain scalar chunks, folded. Empty when the scalar ends.
    fn scan_plain_spaces(&mut self) -> String {
        let mut length = 0;
        while matches!(self.reader.peek_at(length), ' ' | '\t') {
            length += 1;
        }
        let whitespaces = self.reader.prefix_forward(length);
        let c = self.reader.peek();
        if !self.is_break(c) {
            return whitespaces;
        }

        let line_break = self.scan_line_break();
        self.allow_simple_key = true;
        if self.at_document_marker() {
            return String::new();
        }
        let mut breaks = String::new();
        loop {
            let c = self.reader.peek();
            if c == ' ' || c == '\t' {
                self.reader.forward_one();
            } else if self.is_break(c) {
                breaks.push_str(&self.scan_line_break());
                if self.at_document_marker() {
                    return String::new();
                }
            } else {
                break;
            }
        }

        let mut chunks = String::new();
        if line_break != "\n" {
            chunks.push_str(&line_break);
        } else if breaks.is_empty() {
            chunks.push(' ');
        }
        chunks.push_str(&breaks);
        chunks
    }

    /// `---` or `...` followed by a blank at the start of a line.
    fn at_document_marker(&mut self) -> bool {
        if self.reader.column() != 0 {
            return false;
        }
        let prefix = self.reader.prefix(3);
        let next = self.reader.peek_at(3);
        (prefix == "---" || prefix == "...") && self.is_blankz(next)
    }

    // ========================================================================
    // Quoted scalars
    // ========================================================================

    pub(super) fn scan_flow_scalar(&mut self, style: ScalarStyle) -> Result<Token> {
        let double = style == ScalarStyle::DoubleQuoted;
        let start = self.reader.mark();
        let quote = self.reader.peek();
        self.reader.forward_one();
        let mut chunks = String::new();
        self.scan_flow_scalar_non_spaces(double, &start, &mut chunks)?;
        while self.reader.peek() != quote {
            self.scan_flow_scalar_spaces(&start, &mut chunks)?;
            self.scan_flow_scalar_non_spaces(double, &start, &mut chunks)?;
        }
        self.reader.forward_one();
        let end = self.reader.mark();
        Ok(Token::spanning(
            TokenKind::Scalar {
                value: chunks,
                plain: false,
                style,
            },
            start,
            end,
        ))
    }

    fn scan_flow_scalar_non_spaces(
        &mut self,
        double: bool,
        start: &Option<Mark>,
        chunks: &mut String,
    ) -> Result<()> {
        loop {
            let mut length = 0;
            loop {
                let c = self.reader.peek_at(length);
                if "'\"\\".contains(c) || self.is_blankz(c) {
                    break;
                }
                length += 1;
            }
            if length > 0 {
                chunks.push_str(&self.reader.prefix_forward(length));
            }
            let c = self.reader.peek();
            if !double && c == '\'' && self.reader.peek_at(1) == '\'' {
                chunks.push('\'');
                self.reader.forward(2);
            } else if (double && c == '\'') || (!double && (c == '"' || c == '\\')) {
                chunks.push(c);
                self.reader.forward_one();
            } else if double && c == '\\' {
                self.reader.forward_one();
                let c = self.reader.peek();
                if let Some(replacement) = escape_replacement(c) {
                    chunks.push(replacement);
                    self.reader.forward_one();
                } else if let Some(length) = escape_code_length(c) {
                    self.reader.forward_one();
                    chunks.push(self.scan_escape_code(length, start)?);
                } else if self.is_break(c) {
                    self.scan_line_break();
                    let breaks = self.scan_flow_scalar_breaks(start)?;
                    chunks.push_str(&breaks);
                } else {
                    return Err(self.error(
                        Some("while scanning a double-quoted scalar"),
                        start.clone(),
                        format!("found unknown escape character {:?}", c),
                    ));
                }
            } else {
                return Ok(());
            }
        }
    }

    fn scan_escape_code(&mut self, length: usize, start: &Option<Mark>) -> Result<char> {
        let mut code: u32 = 0;
        for k in 0..length {
            let c = self.reader.peek_at(k);
            match c.to_digit(16) {
                Some(digit) => code = code * 16 + digit,
                None => {
                    return Err(self.error(
                        Some("while scanning a double-quoted scalar"),
                        start.clone(),
                        format!(
                            "expected escape sequence of {} hexadecimal numbers, but found {:?}",
                            length, c
                        ),
                    ))
                }
            }
        }
        match char::from_u32(code) {
            Some(c) => {
                self.reader.forward(length);
                Ok(c)
            }
            None => Err(self.error(
                Some("while scanning a double-quoted scalar"),
                start.clone(),
                format!("found invalid Unicode character escape code {:X}", code),
            )),
        }
    }

    fn scan_flow_scalar_spaces(&mut self, start: &Option<Mark>, chunks: &mut String) -> Result<()> {
        let mut length = 0;
        while matches!(self.reader.peek_at(length), ' ' | '\t') {
            length += 1;
        }
        let whitespaces = self.reader.prefix_forward(length);
        let c = self.reader.peek();
        if c == EOF {
            return Err(self.error(
                Some("while scanning a quoted scalar"),
                start.clone(),
                "found unexpected end of stream",
            ));
        }
        if self.is_break(c) {
            let line_break = self.scan_line_break();
            let breaks = self.scan_flow_scalar_breaks(start)?;
            if line_break != "\n" {
                chunks.push_str(&line_break);
            } else if breaks.is_empty() {
                chunks.push(' ');
            }
            chunks.push_str(&breaks);
        } else {
            chunks.push_str(&whitespaces);
        }
        Ok(())
    }

    fn scan_flow_scalar_breaks(&mut self, start: &Option<Mark>) -> Result<String> {
        let mut chunks = String::new();
        loop {
            if self.at_document_marker() {
                return Err(self.error(
                    Some("while scanning a quoted scalar"),
                    start.clone(),
                    "found unexpected document separator",
                ));
            }
            while matches!(self.reader.peek(), ' ' | '\t') {
                self.reader.forward_one();
            }
            let c = self.reader.peek();
            if self.is_break(c) {
                chunks.push_str(&self.scan_line_break());
            } else {
                return Ok(chunks);
            }
        }
    }

    // ========================================================================
    // Block scalars
    // ========================================================================

    /// Scan a `|` or `>` scalar, returning it and the header comment if any.
    pub(super) fn scan_block_scalar(
        &mut self,
        style: ScalarStyle,
    ) -> Result<(Token, Option<Token>)> {
        let folded = style == ScalarStyle::Folded;
        let mut chunks = String::new();
        let start = self.reader.mark();
        self.reader.forward_one();
        let (chomping, increment) = self.scan_block_scalar_indicators(&start)?;
        let comment = self.scan_block_scalar_ignored_line(&start)?;

        let min_indent = (self.indent + 1).max(1) as usize;
        let (mut breaks, mut end, indent) = match increment {
            None => {
                let (breaks, max_indent, end) = self.scan_block_scalar_indentation();
                (breaks, end, min_indent.max(max_indent))
            }
            Some(increment) => {
                let indent = min_indent + increment - 1;
                let (breaks, end) = self.scan_block_scalar_breaks(indent);
                (breaks, end, indent)
            }
        };

        let mut line_break = String::new();
        while self.reader.column() == indent && self.reader.peek() != EOF {
            chunks.push_str(&breaks);
            let leading_non_space = !matches!(self.reader.peek(), ' ' | '\t');
            let mut length = 0;
            loop {
                let c = self.reader.peek_at(length);
                if self.is_breakz(c) {
                    break;
                }
                length += 1;
            }
            chunks.push_str(&self.reader.prefix_forward(length));
            line_break = self.scan_line_break();
            let (next_breaks, next_end) = self.scan_block_scalar_breaks(indent);
            breaks = next_breaks;
            end = next_end;
            if self.reader.column() == indent && self.reader.peek() != EOF {
                let next_is_space = matches!(self.reader.peek(), ' ' | '\t');
                if folded && line_break == "\n" && leading_non_space && !next_is_space {
                    if breaks.is_empty() {
                        chunks.push(' ');
                    }
                } else {
                    chunks.push_str(&line_break);
                }
            } else {
                break;
            }
        }

        if chomping != Chomping::Strip {
            chunks.push_str(&line_break);
        }
        if chomping == Chomping::Keep {
            chunks.push_str(&breaks);
        }
        let token = Token::spanning(
            TokenKind::Scalar {
                value: chunks,
                plain: false,
                style,
            },
            start,
            end,
        );
        Ok((token, comment))
    }

    fn scan_block_scalar_indicators(
        &mut self,
        start: &Option<Mark>,
    ) -> Result<(Chomping, Option<usize>)> {
        let mut chomping = Chomping::Clip;
        let mut increment = None;
        let c = self.reader.peek();
        if c == '+' || c == '-' {
            chomping = if c == '+' { Chomping::Keep } else { Chomping::Strip };
            self.reader.forward_one();
            if let Some(digit) = self.reader.peek().to_digit(10) {
                increment = Some(self.scan_indentation_indicator(digit, start)?);
            }
        } else if let Some(digit) = c.to_digit(10) {
            increment = Some(self.scan_indentation_indicator(digit, start)?);
            let c = self.reader.peek();
            if c == '+' || c == '-' {
                chomping = if c == '+' { Chomping::Keep } else { Chomping::Strip };
                self.reader.forward_one();
            }
        }
        let c = self.reader.peek();
        if !self.is_blankz(c) {
            return Err(self.error(
                Some("while scanning a block scalar"),
                start.clone(),
                format!(
                    "expected chomping or indentation indicators, but found {:?}",
                    c
                ),
            ));
        }
        Ok((chomping, increment))
    }

    fn scan_indentation_indicator(&mut self, digit: u32, start: &Option<Mark>) -> Result<usize> {
        if digit == 0 {
            return Err(self.error(
                Some("while scanning a block scalar"),
                start.clone(),
                "expected indentation indicator in the range 1-9, but found 0",
            ));
        }
        self.reader.forward_one();
        Ok(digit as usize)
    }

    /// Rest of the header line: optional spaces and comment, then a break.
    fn scan_block_scalar_ignored_line(&mut self, start: &Option<Mark>) -> Result<Option<Token>> {
        while matches!(self.reader.peek(), ' ' | '\t') {
            self.reader.forward_one();
        }
        let comment = if self.reader.peek() == '#' {
            Some(self.scan_comment(CommentType::Inline))
        } else {
            None
        };
        let c = self.reader.peek();
        if !self.is_breakz(c) {
            return Err(self.error(
                Some("while scanning a block scalar"),
                start.clone(),
                format!("expected a comment or a line break, but found {:?}", c),
            ));
        }
        self.scan_line_break();
        Ok(comment)
    }

    /// Leading empty lines of an auto-indented block scalar and the deepest indentation seen.
    fn scan_block_scalar_indentation(&mut self) -> (String, usize, Option<Mark>) {
        let mut chunks = String::new();
        let mut max_indent = 0;
        let mut end = self.reader.mark();
        loop {
            let c = self.reader.peek();
            if c == ' ' {
                self.reader.forward_one();
                max_indent = max_indent.max(self.reader.column());
            } else if self.is_break(c) {
                chunks.push_str(&self.scan_line_break());
                end = self.reader.mark();
            } else {
                break;
            }
        }
        (chunks, max_indent, end)
    }

    fn scan_block_scalar_breaks(&mut self, indent: usize) -> (String, Option<Mark>) {
        let mut chunks = String::new();
        let mut end = self.reader.mark();
        while self.reader.column() < indent && self.reader.peek() == ' ' {
            self.reader.forward_one();
        }
        loop {
            let c = self.reader.peek();
            if !self.is_break(c) {
                break;
            }
            chunks.push_str(&self.scan_line_break());
            end = self.reader.mark();
            while self.reader.column() < indent && self.reader.peek() == ' ' {
                self.reader.forward_one();
            }
        }
        (chunks, end)
    }
}

#[cfg(test)]
mod tests {
    use crate::common::ScalarStyle;
    use crate::error::Result;
    use crate::reader::StreamReader;
    use crate::scanner::Scanner;
    use crate::settings::LoadSettings;
    use crate::tokens::TokenKind;

    fn scalars(text: &str) -> Result<Vec<(String, ScalarStyle)>> {
        let settings = LoadSettings::default();
        let reader = StreamReader::new(text, &settings);
        let mut out = Vec::new();
        for token in Scanner::new(reader, &settings) {
            if let TokenKind::Scalar { value, style, .. } = token?.kind() {
                out.push((value.clone(), *style));
            }
        }
        Ok(out)
    }

    fn single(text: &str) -> String {
        let values = scalars(text).unwrap();
        assert_eq!(values.len(), 1, "{values:?}");
        values[0].0.clone()
    }

    #[test]
    fn test_single_quoted() {
        assert_eq!(single("'it''s'"), "it's");
        assert_eq!(single("'a\n  b\n\n  c'"), "a b\nc");
        assert_eq!(single("'back\\slash'"), "back\\slash");
    }

    #[test]
    fn test_double_quoted_escapes() {
        assert_eq!(single(r#""a\tb\n\x41é\U0001F600""#), "a\tb\nAé😀");
        assert_eq!(single(r#""\0\a\b\e\N\_\L\P\/""#), "\0\x07\x08\x1B\u{85}\u{A0}\u{2028}\u{2029}/");
    }

    #[test]
    fn test_double_quoted_line_continuation() {
        assert_eq!(single("\"a\\\n   b\""), "ab");
        assert_eq!(single("\"a \n  b\""), "a b");
    }

    #[test]
    fn test_unknown_escape() {
        let err = scalars(r#""\q""#).unwrap_err();
        assert!(err.to_string().contains("found unknown escape character 'q'"));
    }

    #[test]
    fn test_bad_hex_escape() {
        let err = scalars(r#""\x4g""#).unwrap_err();
        assert!(err
            .to_string()
            .contains("expected escape sequence of 2 hexadecimal numbers, but found 'g'"));
    }

    #[test]
    fn test_unterminated_quote() {
        let err = scalars("'abc").unwrap_err();
        let text = err.to_string();
        assert!(text.contains("while scanning a quoted scalar"));
        assert!(text.contains("found unexpected end of stream"));
    }

    #[test]
    fn test_document_separator_in_quote() {
        let err = scalars("'abc\n--- x'").unwrap_err();
        assert!(err.to_string().contains("found unexpected document separator"));
    }

    #[test]
    fn test_literal_block_chomping() {
        assert_eq!(single("|\n  a\n  b\n\n"), "a\nb\n");
        assert_eq!(single("|-\n  a\n  b\n\n"), "a\nb");
        assert_eq!(single("|+\n  a\n  b\n\n"), "a\nb\n\n");
    }

    #[test]
    fn test_folded_block() {
        assert_eq!(single(">\n  a\n  b\n\n  c\n"), "a b\nc\n");
        assert_eq!(single(">\n  a\n    indented\n  b\n"), "a\n  indented\nb\n");
    }

    #[test]
    fn test_explicit_indentation_indicator() {
        assert_eq!(single("|2\n   a\n  b\n"), " a\nb\n");
    }

    #[test]
    fn test_zero_indentation_indicator() {
        let err = scalars("|0\n  a").unwrap_err();
        assert!(err
            .to_string()
            .contains("expected indentation indicator in the range 1-9, but found 0"));
    }

    #[test]
    fn test_block_header_garbage() {
        let err = scalars("| x\n  a").unwrap_err();
        assert!(err
            .to_string()
            .contains("expected a comment or a line break, but found 'x'"));
    }

    #[test]
    fn test_block_scalar_in_mapping() {
        let values = scalars("key: |\n  line one\n  line two\nnext: v").unwrap();
        assert_eq!(values[1], ("line one\nline two\n".to_string(), ScalarStyle::Literal));
        assert_eq!(values[2].0, "next");
    }

    #[test]
    fn test_plain_in_flow_context() {
        let values = scalars("[a:b, c d]").unwrap();
        assert_eq!(values[0].0, "a:b");
        assert_eq!(values[1].0, "c d");
    }

    #[test]
    fn test_plain_with_inner_tab() {
        assert_eq!(single("a\tb"), "a\tb");
    }
}
