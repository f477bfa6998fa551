//! Small value types shared by tokens, events and nodes.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Presentation style of a scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ScalarStyle {
    /// Unquoted
    Plain,
    /// `'...'`
    SingleQuoted,
    /// `"..."`
    DoubleQuoted,
    /// `|`
    Literal,
    /// `>`
    Folded,
}

impl ScalarStyle {
    /// The indicator character that introduces this style, if any.
    pub fn indicator(self) -> Option<char> {
        match self {
            ScalarStyle::Plain => None,
            ScalarStyle::SingleQuoted => Some('\''),
            ScalarStyle::DoubleQuoted => Some('"'),
            ScalarStyle::Literal => Some('|'),
            ScalarStyle::Folded => Some('>'),
        }
    }
}

/// Presentation style of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FlowStyle {
    /// Indentation based (`- item`, `key: value`)
    Block,
    /// Bracketed (`[a, b]`, `{k: v}`)
    Flow,
    /// Not decided yet; for nodes built programmatically
    Auto,
}

/// Kind of a comment line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CommentType {
    /// An empty line
    Blank,
    /// A comment on a line of its own
    Block,
    /// A comment following content on the same line
    Inline,
}

/// A `%YAML major.minor` version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SpecVersion {
    /// Major version (only 1 is supported by default)
    pub major: u32,
    /// Minor version
    pub minor: u32,
}

impl SpecVersion {
    /// YAML 1.1
    pub const V1_1: SpecVersion = SpecVersion { major: 1, minor: 1 };
    /// YAML 1.2
    pub const V1_2: SpecVersion = SpecVersion { major: 1, minor: 2 };

    /// Create a version.
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for SpecVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}
