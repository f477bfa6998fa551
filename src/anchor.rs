//! Anchor names (`&name` / `*name`).

use core::fmt;

use crate::error::{Result, YamlError};

/// Characters that may never appear in an anchor name.
const INVALID_ANCHOR_CHARS: &[char] = &['[', ']', '{', '}', ',', '*', '&'];

/// A validated anchor name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Anchor(String);

impl Anchor {
    /// Validate and wrap an anchor name.
    ///
    /// Fails for the empty string, for whitespace and for any of
    /// `[ ] { } , * &`.
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if value.is_empty() {
            return Err(YamlError::InvalidAnchor(
                "anchor name must not be empty".to_string(),
            ));
        }
        if let Some(c) = value
            .chars()
            .find(|c| c.is_whitespace() || INVALID_ANCHOR_CHARS.contains(c))
        {
            return Err(YamlError::InvalidAnchor(format!(
                "invalid character {:?} in the anchor: {}",
                c, value
            )));
        }
        Ok(Anchor(value))
    }

    /// The anchor name.
    #[inline]
    pub fn value(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Anchor {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_anchor() {
        let anchor = Anchor::new("base-config_1").unwrap();
        assert_eq!(anchor.value(), "base-config_1");
        assert_eq!(anchor.to_string(), "base-config_1");
    }

    #[test]
    fn test_invalid_anchor_chars() {
        for name in ["a[b", "a]b", "a{b", "a}b", "a,b", "a*b", "a&b", "a b", "a\tb"] {
            assert!(
                matches!(Anchor::new(name), Err(YamlError::InvalidAnchor(_))),
                "{name:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_empty_anchor() {
        assert!(Anchor::new("").is_err());
    }

    #[test]
    fn test_non_ascii_anchor() {
        assert!(Anchor::new("ключ").is_ok());
    }
}
