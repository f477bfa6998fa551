//! Directives, anchors, aliases and tags.

use tracing::debug;

use crate::anchor::Anchor;
use crate::common::{CommentType, SpecVersion};
use crate::error::Result;
use crate::mark::Mark;
use crate::tokens::{Directive, Token, TokenKind};

use super::Scanner;

/// Longest `%YAML` version component accepted.
const MAX_VERSION_DIGITS: usize = 3;

impl Scanner<'_> {
    // ========================================================================
    // Directives
    // ========================================================================

    /// Scan a `%` directive line.
    ///
    /// Returns the directive token (`None` for unknown directives, which are
    /// skipped) and the trailing comment, if any.
    pub(super) fn scan_directive(&mut self) -> Result<(Option<Token>, Option<Token>)> {
        let start = self.reader.mark();
        self.reader.forward_one();
        let name = self.scan_directive_name(&start)?;
        let directive = match name.as_str() {
            "YAML" => Some(Directive::Yaml(self.scan_yaml_directive_value(&start)?)),
            "TAG" => {
                let (handle, prefix) = self.scan_tag_directive_value(&start)?;
                Some(Directive::Tag { handle, prefix })
            }
            _ => {
                loop {
                    let c = self.reader.peek();
                    if self.is_breakz(c) {
                        break;
                    }
                    self.reader.forward_one();
                }
                debug!(directive = %name, "skipping unknown directive");
                None
            }
        };
        let end = self.reader.mark();
        let comment = self.scan_directive_ignored_line(&start)?;
        let token = directive.map(|d| Token::spanning(TokenKind::Directive(d), start, end));
        Ok((token, comment))
    }

    fn scan_directive_name(&mut self, start: &Option<Mark>) -> Result<String> {
        let mut length = 0;
        loop {
            let c = self.reader.peek_at(length);
            if !(c.is_ascii_alphanumeric() || c == '-' || c == '_') {
                break;
            }
            length += 1;
        }
        if length == 0 {
            let c = self.reader.peek();
            return Err(self.error(
                Some("while scanning a directive"),
                start.clone(),
                format!("expected alphabetic or numeric character, but found {:?}", c),
            ));
        }
        let name = self.reader.prefix_forward(length);
        let c = self.reader.peek();
        if !self.is_blankz(c) {
            return Err(self.error(
                Some("while scanning a directive"),
                start.clone(),
                format!("expected alphabetic or numeric character, but found {:?}", c),
            ));
        }
        Ok(name)
    }

    fn skip_directive_spaces(&mut self) {
        while matches!(self.reader.peek(), ' ' | '\t') {
            self.reader.forward_one();
        }
    }

    fn scan_yaml_directive_value(&mut self, start: &Option<Mark>) -> Result<SpecVersion> {
        self.skip_directive_spaces();
        let major = self.scan_yaml_directive_number(start)?;
        let c = self.reader.peek();
        if c != '.' {
            return Err(self.error(
                Some("while scanning a directive"),
                start.clone(),
                format!("expected a digit or '.', but found {:?}", c),
            ));
        }
        self.reader.forward_one();
        let minor = self.scan_yaml_directive_number(start)?;
        let c = self.reader.peek();
        if !self.is_blankz(c) {
            return Err(self.error(
                Some("while scanning a directive"),
                start.clone(),
                format!("expected a digit or ' ', but found {:?}", c),
            ));
        }
        Ok(SpecVersion::new(major, minor))
    }

    fn scan_yaml_directive_number(&mut self, start: &Option<Mark>) -> Result<u32> {
        let c = self.reader.peek();
        if !c.is_ascii_digit() {
            return Err(self.error(
                Some("while scanning a directive"),
                start.clone(),
                format!("expected a digit, but found {:?}", c),
            ));
        }
        let mut length = 0;
        while self.reader.peek_at(length).is_ascii_digit() {
            length += 1;
        }
        if length > MAX_VERSION_DIGITS {
            return Err(self.error(
                Some("while scanning a YAML directive"),
                start.clone(),
                "found a number which cannot represent a valid version",
            ));
        }
        let digits = self.reader.prefix_forward(length);
        Ok(digits
            .chars()
            .filter_map(|c| c.to_digit(10))
            .fold(0, |acc, d| acc * 10 + d))
    }

    fn scan_tag_directive_value(&mut self, start: &Option<Mark>) -> Result<(String, String)> {
        self.skip_directive_spaces();
        let handle = self.scan_tag_handle("directive", start)?;
        let c = self.reader.peek();
        if c != ' ' && c != '\t' {
            return Err(self.error(
                Some("while scanning a directive"),
                start.clone(),
                format!("expected ' ', but found {:?}", c),
            ));
        }
        self.skip_directive_spaces();
        let prefix = self.scan_tag_uri("directive", start)?;
        let c = self.reader.peek();
        if !self.is_blankz(c) {
            return Err(self.error(
                Some("while scanning a directive"),
                start.clone(),
                format!("expected ' ', but found {:?}", c),
            ));
        }
        Ok((handle, prefix))
    }

    fn scan_directive_ignored_line(&mut self, start: &Option<Mark>) -> Result<Option<Token>> {
        self.skip_directive_spaces();
        let comment = if self.reader.peek() == '#' {
            Some(self.scan_comment(CommentType::Inline))
        } else {
            None
        };
        let c = self.reader.peek();
        if !self.is_breakz(c) {
            return Err(self.error(
                Some("while scanning a directive"),
                start.clone(),
                format!("expected a comment or a line break, but found {:?}", c),
            ));
        }
        self.scan_line_break();
        Ok(comment)
    }

    // ========================================================================
    // Anchors and aliases
    // ========================================================================

    pub(super) fn scan_anchor(&mut self, alias: bool) -> Result<Token> {
        let start = self.reader.mark();
        let context = if alias {
            "while scanning an alias"
        } else {
            "while scanning an anchor"
        };
        self.reader.forward_one();
        let mut length = 0;
        loop {
            let c = self.reader.peek_at(length);
            if self.is_blankz(c) || ",[]{}".contains(c) {
                break;
            }
            length += 1;
        }
        if length == 0 {
            let c = self.reader.peek();
            return Err(self.error(
                Some(context),
                start,
                format!("expected anchor name, but found {:?}", c),
            ));
        }
        let name = self.reader.prefix_forward(length);
        let c = self.reader.peek();
        if !self.is_blankz(c) && !"?:,]}%@`".contains(c) {
            return Err(self.error(
                Some(context),
                start,
                format!("expected alphabetic or numeric character, but found {:?}", c),
            ));
        }
        let anchor = Anchor::new(name)?;
        let end = self.reader.mark();
        let kind = if alias {
            TokenKind::Alias(anchor)
        } else {
            TokenKind::Anchor(anchor)
        };
        Ok(Token::spanning(kind, start, end))
    }

    // ========================================================================
    // Tags
    // ========================================================================

    pub(super) fn scan_tag(&mut self) -> Result<Token> {
        let start = self.reader.mark();
        let c = self.reader.peek_at(1);
        let (handle, suffix) = if c == '<' {
            self.reader.forward(2);
            let suffix = self.scan_tag_uri("tag", &start)?;
            let c = self.reader.peek();
            if c != '>' {
                return Err(self.error(
                    Some("while parsing a tag"),
                    start,
                    format!("expected '>', but found {:?}", c),
                ));
            }
            self.reader.forward_one();
            (None, suffix)
        } else if self.is_blankz(c) {
            self.reader.forward_one();
            (None, "!".to_string())
        } else {
            let mut length = 1;
            let mut use_handle = false;
            loop {
                let c = self.reader.peek_at(length);
                if self.is_blankz(c) {
                    break;
                }
                if c == '!' {
                    use_handle = true;
                    break;
                }
                length += 1;
            }
            let handle = if use_handle {
                self.scan_tag_handle("tag", &start)?
            } else {
                self.reader.forward_one();
                "!".to_string()
            };
            let suffix = self.scan_tag_uri("tag", &start)?;
            (Some(handle), suffix)
        };
        let c = self.reader.peek();
        if !self.is_blankz(c) && !(self.flow_level > 0 && ",[]{}".contains(c)) {
            return Err(self.error(
                Some("while scanning a tag"),
                start,
                format!("expected ' ', but found {:?}", c),
            ));
        }
        let end = self.reader.mark();
        Ok(Token::spanning(TokenKind::Tag { handle, suffix }, start, end))
    }

    /// Scan `!`, `!!` or `!name!`.
    fn scan_tag_handle(&mut self, name: &str, start: &Option<Mark>) -> Result<String> {
        let context = format!("while scanning a {}", name);
        let c = self.reader.peek();
        if c != '!' {
            return Err(self.error(
                Some(&context),
                start.clone(),
                format!("expected '!', but found {:?}", c),
            ));
        }
        let mut length = 1;
        let mut c = self.reader.peek_at(length);
        if c != ' ' {
            while c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                length += 1;
                c = self.reader.peek_at(length);
            }
            if c != '!' {
                self.reader.forward(length);
                return Err(self.error(
                    Some(&context),
                    start.clone(),
                    format!("expected '!', but found {:?}", c),
                ));
            }
            length += 1;
        }
        Ok(self.reader.prefix_forward(length))
    }

    fn is_uri_char(&self, c: char) -> bool {
        c.is_ascii_alphanumeric()
            || "-;/?:@&=+$_.!~*'()%".contains(c)
            || (self.flow_level == 0 && ",[]".contains(c))
    }

    /// Scan a tag URI, decoding `%XX` escapes.
    fn scan_tag_uri(&mut self, name: &str, start: &Option<Mark>) -> Result<String> {
        let mut chunks = String::new();
        let mut length = 0;
        let mut c = self.reader.peek();
        while self.is_uri_char(c) {
            if c == '%' {
                chunks.push_str(&self.reader.prefix_forward(length));
                length = 0;
                chunks.push_str(&self.scan_uri_escapes(name, start)?);
            } else {
                length += 1;
            }
            c = self.reader.peek_at(length);
        }
        if length > 0 {
            chunks.push_str(&self.reader.prefix_forward(length));
        }
        if chunks.is_empty() {
            return Err(self.error(
                Some(&format!("while parsing a {}", name)),
                start.clone(),
                format!("expected URI, but found {:?}", c),
            ));
        }
        Ok(chunks)
    }

    fn scan_uri_escapes(&mut self, name: &str, start: &Option<Mark>) -> Result<String> {
        let context = format!("while scanning a {}", name);
        let mut bytes = Vec::new();
        while self.reader.peek() == '%' {
            self.reader.forward_one();
            let high = self.reader.peek().to_digit(16);
            let low = self.reader.peek_at(1).to_digit(16);
            match (high, low) {
                (Some(high), Some(low)) => {
                    bytes.push((high * 16 + low) as u8);
                    self.reader.forward(2);
                }
                _ => {
                    let found = if high.is_none() {
                        self.reader.peek()
                    } else {
                        self.reader.peek_at(1)
                    };
                    return Err(self.error(
                        Some(&context),
                        start.clone(),
                        format!(
                            "expected URI escape sequence of 2 hexadecimal numbers, but found {:?}",
                            found
                        ),
                    ));
                }
            }
        }
        String::from_utf8(bytes).map_err(|_| {
            self.error(Some(&context), start.clone(), "found invalid UTF-8 sequence")
        })
    }
}
