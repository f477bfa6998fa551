//! Tokenizer.
//!
//! The scanner turns the reader's code points into [`Token`]s. YAML's
//! lexical structure depends on context, so the scanner carries:
//!
//! - an indentation stack, one column per open block collection, which
//!   produces `BlockSequenceStart`/`BlockMappingStart` when a collection
//!   opens at a deeper column and `BlockEnd`s when lines dedent
//! - a flow level (0 in block context, depth of `[`/`{` nesting otherwise)
//! - at most one *possible simple key* per flow level
//! - a queue of tokens that are produced but not yet taken
//!
//! # Simple keys
//!
//! A key without `?` (`key: value`) is only recognizable once the `:` is
//! seen. When a token that may start a simple key is scanned, its position
//! in the token stream is remembered. If a `:` follows on the same line and
//! within 1024 code points, a `Key` token (and, in block context, possibly
//! a `BlockMappingStart`) is inserted back into the queue in front of it.
//! Tokens are only handed out once no pending key could still claim them.

mod directives;
mod scalars;

use std::collections::{BTreeMap, VecDeque};

use tracing::trace;

use crate::common::{CommentType, ScalarStyle};
use crate::error::{Result, YamlError};
use crate::mark::Mark;
use crate::reader::{StreamReader, EOF};
use crate::settings::{LineBreaks, LoadSettings};
use crate::tokens::{Directive, Token, TokenId, TokenKind};

/// Longest distance, in code points, between a simple key and its `:`.
const MAX_SIMPLE_KEY_LENGTH: usize = 1024;

/// A position where a simple key may start.
#[derive(Debug, Clone)]
struct SimpleKey {
    token_number: usize,
    required: bool,
    index: usize,
    line: usize,
    column: usize,
    mark: Option<Mark>,
}

/// Tokenizer over a [`StreamReader`].
pub struct Scanner<'a> {
    reader: StreamReader<'a>,
    done: bool,
    stream_start_produced: bool,
    flow_level: usize,
    tokens: VecDeque<Token>,
    tokens_taken: usize,
    indent: isize,
    indents: Vec<isize>,
    allow_simple_key: bool,
    possible_simple_keys: BTreeMap<usize, SimpleKey>,
    parse_comments: bool,
    line_breaks: LineBreaks,
    version_directive_pending: bool,
}

impl<'a> Scanner<'a> {
    pub fn new(reader: StreamReader<'a>, settings: &LoadSettings) -> Self {
        Self {
            reader,
            done: false,
            stream_start_produced: false,
            flow_level: 0,
            tokens: VecDeque::new(),
            tokens_taken: 0,
            indent: -1,
            indents: Vec::new(),
            allow_simple_key: true,
            possible_simple_keys: BTreeMap::new(),
            parse_comments: settings.parse_comments,
            line_breaks: settings.line_breaks,
            version_directive_pending: false,
        }
    }

    /// Whether the next token is one of `ids` (any token when `ids` is empty).
    pub fn check_token(&mut self, ids: &[TokenId]) -> Result<bool> {
        self.ensure_tokens()?;
        Ok(match self.tokens.front() {
            None => false,
            Some(token) => ids.is_empty() || ids.contains(&token.id()),
        })
    }

    /// The next token without consuming it.
    pub fn peek_token(&mut self) -> Result<Option<&Token>> {
        self.ensure_tokens()?;
        Ok(self.tokens.front())
    }

    /// Consume and return the next token; `None` after `StreamEnd`.
    pub fn next_token(&mut self) -> Result<Option<Token>> {
        self.ensure_tokens()?;
        let token = self.tokens.pop_front();
        if let Some(token) = &token {
            self.tokens_taken += 1;
            trace!(
                token = %token.id(),
                line = token.start().map(|m| m.line),
                column = token.start().map(|m| m.column),
                "token"
            );
        }
        Ok(token)
    }

    fn ensure_tokens(&mut self) -> Result<()> {
        while self.need_more_tokens()? {
            self.fetch_more_tokens()?;
        }
        Ok(())
    }

    fn need_more_tokens(&mut self) -> Result<bool> {
        if self.done {
            return Ok(false);
        }
        if self.tokens.is_empty() {
            return Ok(true);
        }
        // The current token may be a simple key, so we need to look further.
        self.stale_possible_simple_keys()?;
        Ok(self.next_possible_simple_key() == Some(self.tokens_taken))
    }

    /// Raise a reader failure once scanning has reached its position.
    fn check_reader(&self) -> Result<()> {
        if let Some(err) = self.reader.stop_error() {
            if self.reader.index() >= err.position {
                return Err(err.clone().into());
            }
        }
        if let Some(err) = self.reader.limit_error() {
            return Err(err.clone().into());
        }
        Ok(())
    }

    /// Scanner error at the current position, unless the reader failed here first.
    pub(crate) fn error(
        &mut self,
        context: Option<&str>,
        context_mark: Option<Mark>,
        problem: impl Into<String>,
    ) -> YamlError {
        if let Err(err) = self.check_reader() {
            return err;
        }
        let mark = self.reader.mark();
        YamlError::scanner(context, context_mark, problem, mark)
    }

    fn fetch_more_tokens(&mut self) -> Result<()> {
        if !self.stream_start_produced {
            self.fetch_stream_start();
            return Ok(());
        }
        self.check_reader()?;
        self.scan_to_next_token()?;
        self.check_reader()?;
        self.stale_possible_simple_keys()?;
        self.unwind_indent(self.reader.column() as isize);

        let c = self.reader.peek();
        match c {
            EOF => return self.fetch_stream_end(),
            '%' if self.check_directive() => return self.fetch_directive(),
            '-' if self.check_document_marker("---") => {
                return self.fetch_document_indicator(TokenKind::DocumentStart)
            }
            '.' if self.check_document_marker("...") => {
                return self.fetch_document_indicator(TokenKind::DocumentEnd)
            }
            '[' => return self.fetch_flow_collection_start(TokenKind::FlowSequenceStart),
            '{' => return self.fetch_flow_collection_start(TokenKind::FlowMappingStart),
            ']' => return self.fetch_flow_collection_end(TokenKind::FlowSequenceEnd),
            '}' => return self.fetch_flow_collection_end(TokenKind::FlowMappingEnd),
            ',' => return self.fetch_flow_entry(),
            '-' if self.check_block_entry() => return self.fetch_block_entry(),
            '?' if self.check_key() => return self.fetch_key(),
            ':' if self.check_value() => return self.fetch_value(),
            '*' => return self.fetch_anchor(true),
            '&' => return self.fetch_anchor(false),
            '!' => return self.fetch_tag(),
            '|' if self.flow_level == 0 => return self.fetch_block_scalar(ScalarStyle::Literal),
            '>' if self.flow_level == 0 => return self.fetch_block_scalar(ScalarStyle::Folded),
            '\'' => return self.fetch_flow_scalar(ScalarStyle::SingleQuoted),
            '"' => return self.fetch_flow_scalar(ScalarStyle::DoubleQuoted),
            _ if self.check_plain() => return self.fetch_plain(),
            _ => {}
        }

        let mark = self.reader.mark();
        Err(self.error(
            Some("while scanning for the next token"),
            mark,
            format!("found character {:?} that cannot start any token", c),
        ))
    }

    // ========================================================================
    // Simple keys
    // ========================================================================

    fn next_possible_simple_key(&self) -> Option<usize> {
        self.possible_simple_keys
            .values()
            .map(|key| key.token_number)
            .min()
    }

    /// Drop keys that can no longer be followed by `:`.
    fn stale_possible_simple_keys(&mut self) -> Result<()> {
        let line = self.reader.line();
        let index = self.reader.index();
        let stale: Vec<usize> = self
            .possible_simple_keys
            .iter()
            .filter(|(_, key)| key.line != line || index - key.index > MAX_SIMPLE_KEY_LENGTH)
            .map(|(level, _)| *level)
            .collect();
        for level in stale {
            if let Some(key) = self.possible_simple_keys.remove(&level) {
                if key.required {
                    return Err(self.error(
                        Some("while scanning a simple key"),
                        key.mark,
                        "could not find expected ':'",
                    ));
                }
            }
        }
        Ok(())
    }

    /// Remember that the next token may start a simple key.
    fn save_possible_simple_key(&mut self) -> Result<()> {
        // A key at the indentation column of a block collection must be a key.
        let required = self.flow_level == 0 && self.indent == self.reader.column() as isize;
        if self.allow_simple_key {
            self.remove_possible_simple_key()?;
            let key = SimpleKey {
                token_number: self.tokens_taken + self.tokens.len(),
                required,
                index: self.reader.index(),
                line: self.reader.line(),
                column: self.reader.column(),
                mark: self.reader.mark(),
            };
            self.possible_simple_keys.insert(self.flow_level, key);
        }
        Ok(())
    }

    fn remove_possible_simple_key(&mut self) -> Result<()> {
        if let Some(key) = self.possible_simple_keys.remove(&self.flow_level) {
            if key.required {
                return Err(self.error(
                    Some("while scanning a simple key"),
                    key.mark,
                    "could not find expected ':'",
                ));
            }
        }
        Ok(())
    }

    // ========================================================================
    // Indentation
    // ========================================================================

    /// Close block collections indented deeper than `column`.
    fn unwind_indent(&mut self, column: isize) {
        // Indentation is ignored in flow context.
        if self.flow_level > 0 {
            return;
        }
        while self.indent > column {
            let mark = self.reader.mark();
            self.indent = self.indents.pop().unwrap_or(-1);
            self.tokens
                .push_back(Token::spanning(TokenKind::BlockEnd, mark.clone(), mark));
        }
    }

    /// Open a new indentation level if `column` is deeper than the current one.
    fn add_indent(&mut self, column: isize) -> bool {
        if self.indent < column {
            self.indents.push(self.indent);
            self.indent = column;
            true
        } else {
            false
        }
    }

    // ========================================================================
    // Character classes
    // ========================================================================

    #[inline]
    pub(crate) fn is_break(&self, c: char) -> bool {
        self.reader.is_line_break(c)
    }

    #[inline]
    pub(crate) fn is_breakz(&self, c: char) -> bool {
        c == EOF || self.is_break(c)
    }

    #[inline]
    pub(crate) fn is_blankz(&self, c: char) -> bool {
        c == ' ' || c == '\t' || self.is_breakz(c)
    }

    fn check_directive(&self) -> bool {
        self.reader.column() == 0
    }

    fn check_document_marker(&mut self, marker: &str) -> bool {
        if self.reader.column() != 0 {
            return false;
        }
        let next = self.reader.peek_at(3);
        self.reader.prefix(3) == marker && self.is_blankz(next)
    }

    fn check_block_entry(&mut self) -> bool {
        let next = self.reader.peek_at(1);
        self.is_blankz(next)
    }

    fn check_key(&mut self) -> bool {
        let next = self.reader.peek_at(1);
        self.flow_level > 0 || self.is_blankz(next)
    }

    fn check_value(&mut self) -> bool {
        let next = self.reader.peek_at(1);
        self.flow_level > 0 || self.is_blankz(next)
    }

    fn check_plain(&mut self) -> bool {
        let c = self.reader.peek();
        let next = self.reader.peek_at(1);
        let indicator = "-?:,[]{}#&*!|>'\"%@`".contains(c);
        (!self.is_blankz(c) && !indicator)
            || (!self.is_blankz(next) && (c == '-' || (self.flow_level == 0 && (c == '?' || c == ':'))))
    }

    // ========================================================================
    // Whitespace and comments
    // ========================================================================

    /// Skip separation spaces, comments and line breaks before the next token.
    fn scan_to_next_token(&mut self) -> Result<()> {
        loop {
            loop {
                match self.reader.peek() {
                    ' ' => self.reader.forward_one(),
                    '\t' if self.flow_level > 0
                        || self.reader.line_has_content()
                        || self.only_whitespace_to_line_end() =>
                    {
                        self.reader.forward_one()
                    }
                    _ => break,
                }
            }
            if self.reader.peek() == '#' {
                let comment_type = if self.reader.line_has_content() {
                    CommentType::Inline
                } else {
                    CommentType::Block
                };
                let comment = self.scan_comment(comment_type);
                self.push_comment(comment);
            }
            let c = self.reader.peek();
            if !self.is_break(c) {
                break;
            }
            if self.reader.column() == 0 && self.parse_comments {
                let start = self.reader.mark();
                let end = self.reader.mark();
                self.push_comment(Token::spanning(
                    TokenKind::Comment {
                        comment_type: CommentType::Blank,
                        value: String::new(),
                    },
                    start,
                    end,
                ));
            }
            self.scan_line_break();
            if self.flow_level == 0 {
                self.allow_simple_key = true;
            }
        }
        Ok(())
    }

    /// Whether the rest of the line is spaces and tabs, optionally ending in a comment.
    fn only_whitespace_to_line_end(&mut self) -> bool {
        let mut offset = 0;
        while matches!(self.reader.peek_at(offset), ' ' | '\t') {
            offset += 1;
        }
        let c = self.reader.peek_at(offset);
        c == '#' || self.is_breakz(c)
    }

    /// Scan a `#` comment up to (not including) the line break.
    pub(crate) fn scan_comment(&mut self, comment_type: CommentType) -> Token {
        let start = self.reader.mark();
        self.reader.forward_one();
        let mut length = 0;
        loop {
            let c = self.reader.peek_at(length);
            if self.is_breakz(c) {
                break;
            }
            length += 1;
        }
        let value = self.reader.prefix_forward(length);
        let end = self.reader.mark();
        Token::spanning(
            TokenKind::Comment {
                comment_type,
                value,
            },
            start,
            end,
        )
    }

    pub(crate) fn push_comment(&mut self, comment: Token) {
        if self.parse_comments {
            self.tokens.push_back(comment);
        }
    }

    /// Consume one line break, returning its normalized text (empty if none).
    pub(crate) fn scan_line_break(&mut self) -> String {
        let c = self.reader.peek();
        if !self.is_break(c) {
            return String::new();
        }
        self.reader.forward_one();
        match c {
            '\u{2028}' | '\u{2029}' => c.to_string(),
            _ => "\n".to_string(),
        }
    }

    // ========================================================================
    // Fetchers
    // ========================================================================

    fn fetch_stream_start(&mut self) {
        let mark = self.reader.mark();
        let encoding = self.reader.encoding();
        self.tokens.push_back(Token::spanning(
            TokenKind::StreamStart { encoding },
            mark.clone(),
            mark,
        ));
        self.stream_start_produced = true;
    }

    fn fetch_stream_end(&mut self) -> Result<()> {
        self.unwind_indent(-1);
        self.remove_possible_simple_key()?;
        self.allow_simple_key = false;
        self.possible_simple_keys.clear();
        let mark = self.reader.mark();
        self.tokens
            .push_back(Token::spanning(TokenKind::StreamEnd, mark.clone(), mark));
        self.done = true;
        Ok(())
    }

    fn fetch_directive(&mut self) -> Result<()> {
        self.unwind_indent(-1);
        self.remove_possible_simple_key()?;
        self.allow_simple_key = false;
        let (token, comment) = self.scan_directive()?;
        if let Some(token) = token {
            if let TokenKind::Directive(Directive::Yaml(version)) = token.kind() {
                // NEL, LS and PS are line breaks before YAML 1.2
                let line_breaks = if version.major == 1 && version.minor < 2 {
                    LineBreaks::Yaml11
                } else {
                    LineBreaks::Yaml12
                };
                self.reader.set_line_breaks(line_breaks);
                self.version_directive_pending = true;
            }
            self.tokens.push_back(token);
        }
        if let Some(comment) = comment {
            self.push_comment(comment);
        }
        Ok(())
    }

    fn fetch_document_indicator(&mut self, kind: TokenKind) -> Result<()> {
        self.unwind_indent(-1);
        self.remove_possible_simple_key()?;
        self.allow_simple_key = false;
        self.reader.reset_document_index();
        if kind == TokenKind::DocumentEnd || !self.version_directive_pending {
            self.reader.set_line_breaks(self.line_breaks);
        }
        self.version_directive_pending = false;
        let start = self.reader.mark();
        self.reader.forward(3);
        let end = self.reader.mark();
        self.tokens.push_back(Token::spanning(kind, start, end));
        Ok(())
    }

    fn fetch_flow_collection_start(&mut self, kind: TokenKind) -> Result<()> {
        self.save_possible_simple_key()?;
        self.flow_level += 1;
        self.allow_simple_key = true;
        self.push_indicator(kind);
        Ok(())
    }

    fn fetch_flow_collection_end(&mut self, kind: TokenKind) -> Result<()> {
        self.remove_possible_simple_key()?;
        self.flow_level = self.flow_level.saturating_sub(1);
        self.allow_simple_key = false;
        self.push_indicator(kind);
        Ok(())
    }

    fn fetch_flow_entry(&mut self) -> Result<()> {
        self.allow_simple_key = true;
        self.remove_possible_simple_key()?;
        self.push_indicator(TokenKind::FlowEntry);
        Ok(())
    }

    fn fetch_block_entry(&mut self) -> Result<()> {
        if self.flow_level == 0 {
            if !self.allow_simple_key {
                return Err(self.error(None, None, "sequence entries are not allowed here"));
            }
            if self.add_indent(self.reader.column() as isize) {
                let mark = self.reader.mark();
                self.tokens.push_back(Token::spanning(
                    TokenKind::BlockSequenceStart,
                    mark.clone(),
                    mark,
                ));
            }
        }
        // A '-' inside a flow collection is left for the parser to reject.
        self.allow_simple_key = true;
        self.remove_possible_simple_key()?;
        self.push_indicator(TokenKind::BlockEntry);
        Ok(())
    }

    fn fetch_key(&mut self) -> Result<()> {
        if self.flow_level == 0 {
            if !self.allow_simple_key {
                return Err(self.error(None, None, "mapping keys are not allowed here"));
            }
            if self.add_indent(self.reader.column() as isize) {
                let mark = self.reader.mark();
                self.tokens.push_back(Token::spanning(
                    TokenKind::BlockMappingStart,
                    mark.clone(),
                    mark,
                ));
            }
        }
        self.allow_simple_key = self.flow_level == 0;
        self.remove_possible_simple_key()?;
        self.push_indicator(TokenKind::Key);
        Ok(())
    }

    fn fetch_value(&mut self) -> Result<()> {
        if let Some(key) = self.possible_simple_keys.remove(&self.flow_level) {
            let position = key.token_number - self.tokens_taken;
            let marks = key.mark.map(|mark| (mark.clone(), mark));
            self.tokens
                .insert(position, Token::new(TokenKind::Key, marks.clone()));
            if self.flow_level == 0 && self.add_indent(key.column as isize) {
                self.tokens
                    .insert(position, Token::new(TokenKind::BlockMappingStart, marks));
            }
            self.allow_simple_key = false;
        } else {
            if self.flow_level == 0 {
                if !self.allow_simple_key {
                    return Err(self.error(None, None, "mapping values are not allowed here"));
                }
                if self.add_indent(self.reader.column() as isize) {
                    let mark = self.reader.mark();
                    self.tokens.push_back(Token::spanning(
                        TokenKind::BlockMappingStart,
                        mark.clone(),
                        mark,
                    ));
                }
            }
            self.allow_simple_key = self.flow_level == 0;
            self.remove_possible_simple_key()?;
        }
        self.push_indicator(TokenKind::Value);
        Ok(())
    }

    fn fetch_anchor(&mut self, alias: bool) -> Result<()> {
        self.save_possible_simple_key()?;
        self.allow_simple_key = false;
        let token = self.scan_anchor(alias)?;
        self.tokens.push_back(token);
        Ok(())
    }

    fn fetch_tag(&mut self) -> Result<()> {
        self.save_possible_simple_key()?;
        self.allow_simple_key = false;
        let token = self.scan_tag()?;
        self.tokens.push_back(token);
        Ok(())
    }

    fn fetch_block_scalar(&mut self, style: ScalarStyle) -> Result<()> {
        // A simple key may follow a block scalar.
        self.allow_simple_key = true;
        self.remove_possible_simple_key()?;
        let (token, comment) = self.scan_block_scalar(style)?;
        self.tokens.push_back(token);
        if let Some(comment) = comment {
            self.push_comment(comment);
        }
        Ok(())
    }

    fn fetch_flow_scalar(&mut self, style: ScalarStyle) -> Result<()> {
        self.save_possible_simple_key()?;
        self.allow_simple_key = false;
        let token = self.scan_flow_scalar(style)?;
        self.tokens.push_back(token);
        Ok(())
    }

    fn fetch_plain(&mut self) -> Result<()> {
        self.save_possible_simple_key()?;
        self.allow_simple_key = false;
        let token = self.scan_plain()?;
        self.tokens.push_back(token);
        Ok(())
    }

    /// Push a single-character indicator token and consume it.
    fn push_indicator(&mut self, kind: TokenKind) {
        let start = self.reader.mark();
        self.reader.forward_one();
        let end = self.reader.mark();
        self.tokens.push_back(Token::spanning(kind, start, end));
    }
}

impl Iterator for Scanner<'_> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_token() {
            Ok(token) => token.map(Ok),
            Err(err) => {
                self.done = true;
                self.tokens.clear();
                Some(Err(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan_with(text: &str, settings: &LoadSettings) -> Result<Vec<TokenKind>> {
        let reader = StreamReader::new(text, settings);
        Scanner::new(reader, settings)
            .map(|token| token.map(|t| t.kind().clone()))
            .collect()
    }

    fn ids(text: &str) -> Vec<TokenId> {
        scan_with(text, &LoadSettings::default())
            .unwrap()
            .iter()
            .map(TokenKind::id)
            .collect()
    }

    fn scalar(value: &str) -> TokenKind {
        TokenKind::Scalar {
            value: value.into(),
            plain: true,
            style: ScalarStyle::Plain,
        }
    }

    #[test]
    fn test_empty_stream() {
        assert_eq!(ids(""), vec![TokenId::StreamStart, TokenId::StreamEnd]);
    }

    #[test]
    fn test_simple_key_inserts_key_and_mapping_start() {
        use TokenId::*;
        assert_eq!(
            ids("a: 1\nb: 2\n"),
            vec![
                StreamStart,
                BlockMappingStart,
                Key,
                Scalar,
                Value,
                Scalar,
                Key,
                Scalar,
                Value,
                Scalar,
                BlockEnd,
                StreamEnd
            ]
        );
    }

    #[test]
    fn test_nested_block_ends() {
        use TokenId::*;
        assert_eq!(
            ids("a:\n  b:\n    - c\nd: e"),
            vec![
                StreamStart,
                BlockMappingStart,
                Key,
                Scalar,
                Value,
                BlockMappingStart,
                Key,
                Scalar,
                Value,
                BlockSequenceStart,
                BlockEntry,
                Scalar,
                BlockEnd,
                BlockEnd,
                Key,
                Scalar,
                Value,
                Scalar,
                BlockEnd,
                StreamEnd
            ]
        );
    }

    #[test]
    fn test_flow_collections() {
        use TokenId::*;
        assert_eq!(
            ids("[a, {b: c}]"),
            vec![
                StreamStart,
                FlowSequenceStart,
                Scalar,
                FlowEntry,
                FlowMappingStart,
                Key,
                Scalar,
                Value,
                Scalar,
                FlowMappingEnd,
                FlowSequenceEnd,
                StreamEnd
            ]
        );
    }

    #[test]
    fn test_plain_multiline_folds() {
        let tokens = scan_with("a\n  b\n\n  c", &LoadSettings::default()).unwrap();
        assert_eq!(tokens[1], scalar("a b\nc"));
    }

    #[test]
    fn test_plain_stops_at_comment() {
        let tokens = scan_with("a b # c", &LoadSettings::default()).unwrap();
        assert_eq!(tokens[1], scalar("a b"));
    }

    #[test]
    fn test_document_markers() {
        use TokenId::*;
        assert_eq!(
            ids("---\na\n...\n"),
            vec![StreamStart, DocumentStart, Scalar, DocumentEnd, StreamEnd]
        );
        // Not a marker when followed by content
        assert_eq!(ids("---a"), vec![StreamStart, Scalar, StreamEnd]);
    }

    #[test]
    fn test_directives() {
        let tokens = scan_with("%YAML 1.2\n%TAG !e! tag:example.com,2000:\n---", &LoadSettings::default())
            .unwrap();
        assert_eq!(
            tokens[1],
            TokenKind::Directive(Directive::Yaml(crate::common::SpecVersion::V1_2))
        );
        assert_eq!(
            tokens[2],
            TokenKind::Directive(Directive::Tag {
                handle: "!e!".into(),
                prefix: "tag:example.com,2000:".into()
            })
        );
    }

    #[test]
    fn test_unknown_directive_skipped() {
        use TokenId::*;
        assert_eq!(
            ids("%FOO bar baz\n--- a"),
            vec![StreamStart, DocumentStart, Scalar, StreamEnd]
        );
    }

    #[test]
    fn test_anchor_alias_tag() {
        let tokens = scan_with("- &x !!str a\n- *x\n- !<tag:x> b\n- ! c", &LoadSettings::default())
            .unwrap();
        assert!(tokens.contains(&TokenKind::Anchor(crate::anchor::Anchor::new("x").unwrap())));
        assert!(tokens.contains(&TokenKind::Alias(crate::anchor::Anchor::new("x").unwrap())));
        assert!(tokens.contains(&TokenKind::Tag {
            handle: Some("!!".into()),
            suffix: "str".into()
        }));
        assert!(tokens.contains(&TokenKind::Tag {
            handle: None,
            suffix: "tag:x".into()
        }));
        assert!(tokens.contains(&TokenKind::Tag {
            handle: None,
            suffix: "!".into()
        }));
    }

    #[test]
    fn test_tag_uri_escapes_decoded() {
        let tokens = scan_with("!my%20t%C3%A9g a", &LoadSettings::default()).unwrap();
        assert_eq!(
            tokens[1],
            TokenKind::Tag {
                handle: Some("!".into()),
                suffix: "my tég".into()
            }
        );
    }

    #[test]
    fn test_tag_invalid_utf8_escape() {
        let err = scan_with("!a%C3%28 b", &LoadSettings::default()).unwrap_err();
        assert!(err.to_string().contains("found invalid UTF-8 sequence"));
    }

    #[test]
    fn test_comments_when_enabled() {
        let settings = LoadSettings::default().with_parse_comments(true);
        let tokens = scan_with("# head\na: 1 # tail\n\nb: 2", &settings).unwrap();
        let comments: Vec<_> = tokens
            .iter()
            .filter_map(|t| match t {
                TokenKind::Comment {
                    comment_type,
                    value,
                } => Some((*comment_type, value.as_str())),
                _ => None,
            })
            .collect();
        assert_eq!(
            comments,
            vec![
                (CommentType::Block, " head"),
                (CommentType::Inline, " tail"),
                (CommentType::Blank, ""),
            ]
        );
    }

    #[test]
    fn test_comments_dropped_by_default() {
        assert!(!ids("# c\na # d").contains(&TokenId::Comment));
    }

    #[test]
    fn test_tab_cannot_start_token() {
        let err = scan_with("\tkey: value", &LoadSettings::default()).unwrap_err();
        assert!(err
            .to_string()
            .contains("found character '\\t' that cannot start any token"));
    }

    #[test]
    fn test_tabs_allowed_as_separation() {
        use TokenId::*;
        assert_eq!(
            ids("[a,\tb]"),
            vec![StreamStart, FlowSequenceStart, Scalar, FlowEntry, Scalar, FlowSequenceEnd, StreamEnd]
        );
        assert_eq!(
            ids("key:\tvalue"),
            vec![StreamStart, BlockMappingStart, Key, Scalar, Value, Scalar, BlockEnd, StreamEnd]
        );
    }

    #[test]
    fn test_tab_only_lines_in_block_context() {
        use TokenId::*;
        let mapping = vec![
            StreamStart,
            BlockMappingStart,
            Key,
            Scalar,
            Value,
            Scalar,
            Key,
            Scalar,
            Value,
            Scalar,
            BlockEnd,
            StreamEnd,
        ];
        for text in [
            "a: 1\n\t\nb: 2\n",
            "a: '1'\n\t\nb: 2\n",
            "a: '1' \t\n \t \nb: 2\n",
            "\t\na: 1\n\t# note\nb: 2\n",
        ] {
            assert_eq!(ids(text), mapping, "{:?}", text);
        }
    }

    #[test]
    fn test_yaml11_directive_enables_unicode_line_breaks() {
        let text = "%YAML 1.1\n--- [a,\u{85}b]\n--- [a,\u{85}b]\n";
        let values: Vec<String> = scan_with(text, &LoadSettings::default())
            .unwrap()
            .into_iter()
            .filter_map(|kind| match kind {
                TokenKind::Scalar { value, .. } => Some(value),
                _ => None,
            })
            .collect();
        // the directive only covers the first document
        assert_eq!(values, vec!["a", "b", "a", "\u{85}b"]);
    }

    #[test]
    fn test_required_simple_key_missing_colon() {
        let err = scan_with("a: 1\nb\nc: 2", &LoadSettings::default()).unwrap_err();
        let text = err.to_string();
        assert!(text.contains("while scanning a simple key"));
        assert!(text.contains("could not find expected ':'"));
    }

    #[test]
    fn test_simple_key_too_long_is_not_a_key() {
        let long: String = core::iter::repeat('x').take(1100).collect();
        let text = format!("[{}: v]", long);
        let tokens = scan_with(&text, &LoadSettings::default()).unwrap();
        assert!(!tokens.contains(&TokenKind::Key));
    }

    #[test]
    fn test_mapping_values_not_allowed() {
        let err = scan_with("a: b: c", &LoadSettings::default()).unwrap_err();
        assert!(err.to_string().contains("mapping values are not allowed here"));
    }

    #[test]
    fn test_non_printable_reported_at_position() {
        let err = scan_with("a: b\u{1}", &LoadSettings::default()).unwrap_err();
        assert!(matches!(err, YamlError::Reader(ref e) if e.position == 4));
    }

    #[test]
    fn test_iterator_stops_after_error() {
        let settings = LoadSettings::default();
        let reader = StreamReader::new("\tx", &settings);
        let mut scanner = Scanner::new(reader, &settings);
        assert!(scanner.next().unwrap().is_ok());
        assert!(scanner.next().unwrap().is_err());
        assert!(scanner.next().is_none());
    }

    #[test]
    fn test_marks_disabled() {
        let settings = LoadSettings::default().with_use_marks(false);
        let reader = StreamReader::new("a: [b]", &settings);
        for token in Scanner::new(reader, &settings) {
            let token = token.unwrap();
            assert!(token.start().is_none() && token.end().is_none());
        }
    }
}
