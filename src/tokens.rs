//! Lexical tokens produced by the scanner.

use core::fmt;

use crate::anchor::Anchor;
use crate::common::{CommentType, ScalarStyle, SpecVersion};
use crate::mark::Mark;
use crate::reader::Encoding;

/// Payload of a `%` directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// `%YAML major.minor`
    Yaml(SpecVersion),
    /// `%TAG handle prefix`
    Tag {
        /// Handle such as `!e!`
        handle: String,
        /// Prefix the handle expands to
        prefix: String,
    },
}

/// Kind and payload of a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    StreamStart { encoding: Encoding },
    StreamEnd,
    Directive(Directive),
    DocumentStart,
    DocumentEnd,
    BlockSequenceStart,
    BlockMappingStart,
    BlockEnd,
    BlockEntry,
    FlowSequenceStart,
    FlowSequenceEnd,
    FlowMappingStart,
    FlowMappingEnd,
    FlowEntry,
    Key,
    Value,
    Alias(Anchor),
    Anchor(Anchor),
    /// `handle` is `None` for verbatim tags (`!<...>`) and for the lone `!`.
    Tag {
        handle: Option<String>,
        suffix: String,
    },
    Scalar {
        value: String,
        plain: bool,
        style: ScalarStyle,
    },
    Comment {
        comment_type: CommentType,
        value: String,
    },
}

/// Payload-free token discriminant, used for lookahead checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenId {
    StreamStart,
    StreamEnd,
    Directive,
    DocumentStart,
    DocumentEnd,
    BlockSequenceStart,
    BlockMappingStart,
    BlockEnd,
    BlockEntry,
    FlowSequenceStart,
    FlowSequenceEnd,
    FlowMappingStart,
    FlowMappingEnd,
    FlowEntry,
    Key,
    Value,
    Alias,
    Anchor,
    Tag,
    Scalar,
    Comment,
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TokenId::StreamStart => "<stream start>",
            TokenId::StreamEnd => "<stream end>",
            TokenId::Directive => "<directive>",
            TokenId::DocumentStart => "<document start>",
            TokenId::DocumentEnd => "<document end>",
            TokenId::BlockSequenceStart => "<block sequence start>",
            TokenId::BlockMappingStart => "<block mapping start>",
            TokenId::BlockEnd => "<block end>",
            TokenId::BlockEntry => "-",
            TokenId::FlowSequenceStart => "[",
            TokenId::FlowSequenceEnd => "]",
            TokenId::FlowMappingStart => "{",
            TokenId::FlowMappingEnd => "}",
            TokenId::FlowEntry => ",",
            TokenId::Key => "?",
            TokenId::Value => ":",
            TokenId::Alias => "<alias>",
            TokenId::Anchor => "<anchor>",
            TokenId::Tag => "<tag>",
            TokenId::Scalar => "<scalar>",
            TokenId::Comment => "#",
        };
        f.write_str(text)
    }
}

impl TokenKind {
    /// The discriminant of this token.
    pub fn id(&self) -> TokenId {
        match self {
            TokenKind::StreamStart { .. } => TokenId::StreamStart,
            TokenKind::StreamEnd => TokenId::StreamEnd,
            TokenKind::Directive(_) => TokenId::Directive,
            TokenKind::DocumentStart => TokenId::DocumentStart,
            TokenKind::DocumentEnd => TokenId::DocumentEnd,
            TokenKind::BlockSequenceStart => TokenId::BlockSequenceStart,
            TokenKind::BlockMappingStart => TokenId::BlockMappingStart,
            TokenKind::BlockEnd => TokenId::BlockEnd,
            TokenKind::BlockEntry => TokenId::BlockEntry,
            TokenKind::FlowSequenceStart => TokenId::FlowSequenceStart,
            TokenKind::FlowSequenceEnd => TokenId::FlowSequenceEnd,
            TokenKind::FlowMappingStart => TokenId::FlowMappingStart,
            TokenKind::FlowMappingEnd => TokenId::FlowMappingEnd,
            TokenKind::FlowEntry => TokenId::FlowEntry,
            TokenKind::Key => TokenId::Key,
            TokenKind::Value => TokenId::Value,
            TokenKind::Alias(_) => TokenId::Alias,
            TokenKind::Anchor(_) => TokenId::Anchor,
            TokenKind::Tag { .. } => TokenId::Tag,
            TokenKind::Scalar { .. } => TokenId::Scalar,
            TokenKind::Comment { .. } => TokenId::Comment,
        }
    }
}

/// A token with its source span.
///
/// The start and end marks are either both present or both absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    kind: TokenKind,
    marks: Option<(Mark, Mark)>,
}

impl Token {
    /// Create a token spanning `marks`.
    pub fn new(kind: TokenKind, marks: Option<(Mark, Mark)>) -> Self {
        Self { kind, marks }
    }

    /// Create a token from optional start and end marks.
    ///
    /// The span is dropped unless both marks are known.
    pub fn spanning(kind: TokenKind, start: Option<Mark>, end: Option<Mark>) -> Self {
        Self::new(kind, start.zip(end))
    }

    #[inline]
    pub fn kind(&self) -> &TokenKind {
        &self.kind
    }

    #[inline]
    pub fn id(&self) -> TokenId {
        self.kind.id()
    }

    #[inline]
    pub fn start(&self) -> Option<&Mark> {
        self.marks.as_ref().map(|(start, _)| start)
    }

    #[inline]
    pub fn end(&self) -> Option<&Mark> {
        self.marks.as_ref().map(|(_, end)| end)
    }

    /// Split into the kind and the (start, end) marks.
    pub fn into_parts(self) -> (TokenKind, Option<Mark>, Option<Mark>) {
        match self.marks {
            Some((start, end)) => (self.kind, Some(start), Some(end)),
            None => (self.kind, None, None),
        }
    }
}
