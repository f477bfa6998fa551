//! Comment lines attached to nodes.
//!
//! Comments only exist when `parse_comments` is enabled. The composer turns
//! each comment event into a [`CommentLine`] and attaches it to a node:
//!
//! - `Block` and `Blank` lines before a node become its block comments
//! - an `Inline` comment after a node becomes its inline comment
//! - lines before the end of a collection become its end comments

use crate::common::CommentType;
use crate::events::{Event, EventKind};
use crate::mark::Mark;

/// One comment (or blank line) taken from the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentLine {
    pub start: Option<Mark>,
    pub end: Option<Mark>,
    /// Comment text after `#`; empty for blank lines
    pub value: String,
    pub comment_type: CommentType,
}

impl CommentLine {
    pub fn new(
        start: Option<Mark>,
        end: Option<Mark>,
        value: impl Into<String>,
        comment_type: CommentType,
    ) -> Self {
        Self {
            start,
            end,
            value: value.into(),
            comment_type,
        }
    }

    /// Convert a comment event; `None` for any other event.
    pub fn from_event(event: Event) -> Option<Self> {
        match event.kind {
            EventKind::Comment {
                comment_type,
                value,
            } => Some(Self::new(event.start, event.end, value, comment_type)),
            _ => None,
        }
    }
}
