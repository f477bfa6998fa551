//! Node tags.
//!
//! Tags are URI-like strings. The scanner decodes `%XX` escapes in tag
//! text and [`Tag::new`] percent-encodes every character outside the
//! URI-safe set, so `!my%20tag` and a programmatic `Tag::new("!my tag")`
//! end up as the same value.

use core::fmt;
use std::borrow::Cow;

/// Prefix shared by the standard YAML tags.
pub const YAML_PREFIX: &str = "tag:yaml.org,2002:";

/// A normalized node tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag(Cow<'static, str>);

impl Tag {
    /// `tag:yaml.org,2002:str`
    pub const STR: Tag = Tag::from_static("tag:yaml.org,2002:str");
    /// `tag:yaml.org,2002:int`
    pub const INT: Tag = Tag::from_static("tag:yaml.org,2002:int");
    /// `tag:yaml.org,2002:float`
    pub const FLOAT: Tag = Tag::from_static("tag:yaml.org,2002:float");
    /// `tag:yaml.org,2002:bool`
    pub const BOOL: Tag = Tag::from_static("tag:yaml.org,2002:bool");
    /// `tag:yaml.org,2002:null`
    pub const NULL: Tag = Tag::from_static("tag:yaml.org,2002:null");
    /// `tag:yaml.org,2002:binary`
    pub const BINARY: Tag = Tag::from_static("tag:yaml.org,2002:binary");
    /// `tag:yaml.org,2002:seq`
    pub const SEQ: Tag = Tag::from_static("tag:yaml.org,2002:seq");
    /// `tag:yaml.org,2002:map`
    pub const MAP: Tag = Tag::from_static("tag:yaml.org,2002:map");
    /// `tag:yaml.org,2002:set`
    pub const SET: Tag = Tag::from_static("tag:yaml.org,2002:set");
    /// `tag:yaml.org,2002:merge`, the tag of `<<` keys
    pub const MERGE: Tag = Tag::from_static("tag:yaml.org,2002:merge");
    /// Tag of `${VAR}` environment placeholders
    pub const ENV_TAG: Tag = Tag::from_static("!ENV_VARIABLE");
    /// The non-specific tag `!`
    pub const NON_SPECIFIC: Tag = Tag::from_static("!");

    /// Wrap a tag that is already in normalized form.
    pub const fn from_static(value: &'static str) -> Self {
        Tag(Cow::Borrowed(value))
    }

    /// Create a tag, percent-encoding characters outside the URI-safe set.
    pub fn new(value: &str) -> Self {
        Tag(Cow::Owned(encode_uri(value)))
    }

    /// The `tag:yaml.org,2002:` tag for a type name, e.g. `"timestamp"`.
    pub fn for_type(name: &str) -> Self {
        Tag::new(&format!("{}{}", YAML_PREFIX, name))
    }

    /// The normalized tag text.
    #[inline]
    pub fn value(&self) -> &str {
        &self.0
    }

    /// Whether this is one of the `tag:yaml.org,2002:` tags.
    pub fn is_secondary(&self) -> bool {
        self.0.starts_with(YAML_PREFIX)
    }

    /// Whether this tag is one of the collection defaults (`seq`, `map`, `set`).
    pub fn is_collection(&self) -> bool {
        *self == Tag::SEQ || *self == Tag::MAP || *self == Tag::SET
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Tag {
    fn from(value: &str) -> Self {
        Tag::new(value)
    }
}

/// Characters left untouched by [`encode_uri`] besides ASCII alphanumerics.
const URI_SAFE: &str = "-_.!~*'()@:$&,;=[]/";

#[inline]
fn is_uri_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || URI_SAFE.contains(c)
}

/// Percent-encode every character outside the URI-safe set as UTF-8 bytes.
pub fn encode_uri(value: &str) -> String {
    if value.chars().all(is_uri_safe) {
        return value.to_string();
    }
    let mut out = String::with_capacity(value.len() + 8);
    let mut buf = [0u8; 4];
    for c in value.chars() {
        if is_uri_safe(c) {
            out.push(c);
        } else {
            for byte in c.encode_utf8(&mut buf).bytes() {
                out.push('%');
                out.push(hex_digit(byte >> 4));
                out.push(hex_digit(byte & 0x0F));
            }
        }
    }
    out
}

#[inline]
fn hex_digit(nibble: u8) -> char {
    char::from_digit(u32::from(nibble), 16)
        .map(|c| c.to_ascii_uppercase())
        .unwrap_or('0')
}
