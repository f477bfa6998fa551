//! Parser events.
//!
//! Events are the grammar-level view of a stream: balanced start/end pairs
//! for streams, documents, sequences and mappings, plus scalars, aliases and
//! (optionally) comments. [`Event`]'s `Display` prints the compact notation
//! of the YAML test suite (`+STR`, `=VAL :text`, `-MAP`, ...), which keeps
//! event-level tests readable.

use core::fmt;

use indexmap::IndexMap;

use crate::anchor::Anchor;
use crate::common::{CommentType, FlowStyle, ScalarStyle, SpecVersion};
use crate::mark::Mark;

/// Whether the tag of a scalar may be omitted when it is presented plain
/// or non-plain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImplicitTuple {
    /// Tag may be omitted for the plain style
    pub plain: bool,
    /// Tag may be omitted for the other styles
    pub non_plain: bool,
}

impl ImplicitTuple {
    pub const fn new(plain: bool, non_plain: bool) -> Self {
        Self { plain, non_plain }
    }

    /// Both flags are false: the tag was written explicitly.
    pub fn both_false(self) -> bool {
        !self.plain && !self.non_plain
    }
}

/// Kind and payload of an event.
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    StreamStart,
    StreamEnd,
    DocumentStart {
        explicit: bool,
        version: Option<SpecVersion>,
        /// `%TAG` directives of this document
        tags: IndexMap<String, String>,
    },
    DocumentEnd {
        explicit: bool,
    },
    Alias(Anchor),
    Scalar {
        anchor: Option<Anchor>,
        tag: Option<String>,
        implicit: ImplicitTuple,
        value: String,
        style: ScalarStyle,
    },
    SequenceStart {
        anchor: Option<Anchor>,
        tag: Option<String>,
        implicit: bool,
        flow_style: FlowStyle,
    },
    SequenceEnd,
    MappingStart {
        anchor: Option<Anchor>,
        tag: Option<String>,
        implicit: bool,
        flow_style: FlowStyle,
    },
    MappingEnd,
    Comment {
        comment_type: CommentType,
        value: String,
    },
}

/// Payload-free event discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventId {
    StreamStart,
    StreamEnd,
    DocumentStart,
    DocumentEnd,
    Alias,
    Scalar,
    SequenceStart,
    SequenceEnd,
    MappingStart,
    MappingEnd,
    Comment,
}

impl EventKind {
    pub fn id(&self) -> EventId {
        match self {
            EventKind::StreamStart => EventId::StreamStart,
            EventKind::StreamEnd => EventId::StreamEnd,
            EventKind::DocumentStart { .. } => EventId::DocumentStart,
            EventKind::DocumentEnd { .. } => EventId::DocumentEnd,
            EventKind::Alias(_) => EventId::Alias,
            EventKind::Scalar { .. } => EventId::Scalar,
            EventKind::SequenceStart { .. } => EventId::SequenceStart,
            EventKind::SequenceEnd => EventId::SequenceEnd,
            EventKind::MappingStart { .. } => EventId::MappingStart,
            EventKind::MappingEnd => EventId::MappingEnd,
            EventKind::Comment { .. } => EventId::Comment,
        }
    }
}

/// An event with its source span.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub kind: EventKind,
    pub start: Option<Mark>,
    pub end: Option<Mark>,
}

impl Event {
    pub fn new(kind: EventKind, start: Option<Mark>, end: Option<Mark>) -> Self {
        Self { kind, start, end }
    }

    #[inline]
    pub fn id(&self) -> EventId {
        self.kind.id()
    }
}

fn write_properties(
    f: &mut fmt::Formatter<'_>,
    anchor: &Option<Anchor>,
    tag: &Option<String>,
) -> fmt::Result {
    if let Some(anchor) = anchor {
        write!(f, " &{}", anchor)?;
    }
    if let Some(tag) = tag {
        write!(f, " <{}>", tag)?;
    }
    Ok(())
}

fn write_escaped(f: &mut fmt::Formatter<'_>, value: &str) -> fmt::Result {
    for c in value.chars() {
        match c {
            '\\' => f.write_str("\\\\")?,
            '\0' => f.write_str("\\0")?,
            '\x07' => f.write_str("\\a")?,
            '\x08' => f.write_str("\\b")?,
            '\t' => f.write_str("\\t")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\x0B' => f.write_str("\\v")?,
            '\x0C' => f.write_str("\\f")?,
            '\x1B' => f.write_str("\\e")?,
            '\u{85}' => f.write_str("\\N")?,
            '\u{A0}' => f.write_str("\\_")?,
            '\u{2028}' => f.write_str("\\L")?,
            '\u{2029}' => f.write_str("\\P")?,
            c => write!(f, "{}", c)?,
        }
    }
    Ok(())
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            EventKind::StreamStart => f.write_str("+STR"),
            EventKind::StreamEnd => f.write_str("-STR"),
            EventKind::DocumentStart { explicit, .. } => {
                f.write_str("+DOC")?;
                if *explicit {
                    f.write_str(" ---")?;
                }
                Ok(())
            }
            EventKind::DocumentEnd { explicit } => {
                f.write_str("-DOC")?;
                if *explicit {
                    f.write_str(" ...")?;
                }
                Ok(())
            }
            EventKind::Alias(anchor) => write!(f, "=ALI *{}", anchor),
            EventKind::Scalar {
                anchor,
                tag,
                value,
                style,
                ..
            } => {
                f.write_str("=VAL")?;
                write_properties(f, anchor, tag)?;
                let indicator = style.indicator().unwrap_or(':');
                write!(f, " {}", indicator)?;
                write_escaped(f, value)
            }
            EventKind::SequenceStart {
                anchor,
                tag,
                flow_style,
                ..
            } => {
                f.write_str("+SEQ")?;
                if *flow_style == FlowStyle::Flow {
                    f.write_str(" []")?;
                }
                write_properties(f, anchor, tag)
            }
            EventKind::SequenceEnd => f.write_str("-SEQ"),
            EventKind::MappingStart {
                anchor,
                tag,
                flow_style,
                ..
            } => {
                f.write_str("+MAP")?;
                if *flow_style == FlowStyle::Flow {
                    f.write_str(" {}")?;
                }
                write_properties(f, anchor, tag)
            }
            EventKind::MappingEnd => f.write_str("-MAP"),
            EventKind::Comment {
                comment_type,
                value,
            } => {
                let kind = match comment_type {
                    CommentType::Blank => "blank",
                    CommentType::Block => "block",
                    CommentType::Inline => "inline",
                };
                write!(f, "=COM {} #", kind)?;
                write_escaped(f, value)
            }
        }
    }
}
