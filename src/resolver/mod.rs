//! Implicit tag resolution and schemas.
//!
//! A [`Schema`] pairs a [`ScalarResolver`], which picks the tag of an
//! untagged plain scalar, with the constructors for the tags it resolves.
//! Three schemas ship with the crate:
//!
//! * [`FailsafeSchema`]: every scalar is a string.
//! * [`JsonSchema`]: lowercase `null`/`true`/`false`, JSON numbers.
//! * [`CoreSchema`] (the default): the YAML 1.2 core schema plus `<<`
//!   merge keys.
//!
//! Both JSON and core also recognize `${NAME}` placeholders as
//! [`Tag::ENV_TAG`]. The placeholder text is kept as is.

mod construct;
pub mod numbers;

use std::collections::HashMap;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::tag::Tag;

pub use construct::{
    construct_binary, construct_bool, construct_float, construct_int, construct_null,
    construct_str, construct_with, ConstructHook, ScalarValue,
};
pub use numbers::{parse_float, parse_int, YamlInt};

static EMPTY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^$").unwrap());

static ENV_FORMAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\$\{\s*(?:(\w+)(?:(:?[-?])(\w+)?)?)\s*\})$").unwrap()
});

static JSON_BOOL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:true|false)$").unwrap());

static JSON_INT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:-?(?:0|[1-9][0-9]*))$").unwrap());

static JSON_FLOAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:-?(0?\.[0-9]+|[1-9][0-9]*(\.[0-9]*)?)(e[-+]?[0-9]+)?|-?\.(?:inf)|\.(?:nan))$",
    )
    .unwrap()
});

static JSON_NULL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:null)$").unwrap());

static CORE_BOOL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:true|True|TRUE|false|False|FALSE)$").unwrap());

static CORE_INT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[-+]?[0-9]+|0o[0-7]+|0x[0-9a-fA-F]+)$").unwrap());

static CORE_FLOAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:[-+]?(\.[0-9]+|[0-9]+(\.[0-9]*)?)([eE][-+]?[0-9]+)?|[-+]?\.(?:inf|Inf|INF)|\.(?:nan|NaN|NAN))$",
    )
    .unwrap()
});

static CORE_NULL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:~|null|Null|NULL)$").unwrap());

static MERGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:<<)$").unwrap());

/// Chooses the tag of an untagged scalar.
pub trait ScalarResolver: Send + Sync {
    /// `implicit` is false when the scalar was quoted or otherwise cannot
    /// carry an implicit tag; such scalars are always strings.
    fn resolve(&self, value: &str, implicit: bool) -> Tag;
}

/// A named resolver plus the constructors for its tags.
pub trait Schema: Send + Sync {
    fn scalar_resolver(&self) -> &dyn ScalarResolver;

    fn schema_tag_constructors(&self) -> IndexMap<Tag, ConstructHook>;

    fn name(&self) -> &str;
}

/// Ordered table of implicit resolvers, indexed by the first character of
/// the values they can match.
///
/// Resolution tries the resolvers registered for the value's first
/// character (`'\0'` for the empty string) in registration order, then the
/// wildcard resolvers, and falls back to `str`.
#[derive(Debug, Clone, Default)]
pub struct RegexResolver {
    by_first: HashMap<char, Vec<(Tag, Regex)>>,
    wildcard: Vec<(Tag, Regex)>,
}

impl RegexResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `regex` for `tag`. With `first` set the resolver is tried
    /// only for values starting with one of its characters; `None` makes
    /// it a wildcard. The regex must match the whole value.
    pub fn add_implicit_resolver(&mut self, tag: Tag, regex: Regex, first: Option<&str>) {
        match first {
            Some(chars) => {
                for c in chars.chars() {
                    self.by_first
                        .entry(c)
                        .or_default()
                        .push((tag.clone(), regex.clone()));
                }
            }
            None => self.wildcard.push((tag, regex)),
        }
    }

    fn add_env(&mut self) {
        self.add_implicit_resolver(Tag::ENV_TAG, ENV_FORMAT.clone(), Some("$"));
    }

    /// Resolvers of the JSON schema.
    pub fn json() -> Self {
        let mut resolver = Self::new();
        resolver.add_implicit_resolver(Tag::NULL, EMPTY.clone(), None);
        resolver.add_implicit_resolver(Tag::BOOL, JSON_BOOL.clone(), Some("tf"));
        resolver.add_implicit_resolver(Tag::INT, JSON_INT.clone(), Some("-0123456789"));
        resolver.add_implicit_resolver(Tag::FLOAT, JSON_FLOAT.clone(), Some("-0123456789."));
        resolver.add_implicit_resolver(Tag::NULL, JSON_NULL.clone(), Some("n\0"));
        resolver.add_env();
        resolver
    }

    /// Resolvers of the core schema.
    pub fn core() -> Self {
        let mut resolver = Self::new();
        resolver.add_implicit_resolver(Tag::BOOL, CORE_BOOL.clone(), Some("tfTF"));
        resolver.add_implicit_resolver(Tag::INT, CORE_INT.clone(), Some("-+0123456789"));
        resolver.add_implicit_resolver(Tag::FLOAT, CORE_FLOAT.clone(), Some("-+0123456789."));
        resolver.add_implicit_resolver(Tag::NULL, CORE_NULL.clone(), Some("nN~\0"));
        resolver.add_implicit_resolver(Tag::NULL, EMPTY.clone(), None);
        resolver.add_implicit_resolver(Tag::MERGE, MERGE.clone(), Some("<"));
        resolver.add_env();
        resolver
    }
}

impl ScalarResolver for RegexResolver {
    fn resolve(&self, value: &str, implicit: bool) -> Tag {
        if !implicit {
            return Tag::STR;
        }
        let first = value.chars().next().unwrap_or('\0');
        let candidates = self.by_first.get(&first).into_iter().flatten();
        candidates
            .chain(self.wildcard.iter())
            .find(|(_, regex)| regex.is_match(value))
            .map(|(tag, _)| tag.clone())
            .unwrap_or(Tag::STR)
    }
}

struct StrResolver;

impl ScalarResolver for StrResolver {
    fn resolve(&self, _value: &str, _implicit: bool) -> Tag {
        Tag::STR
    }
}

/// Every scalar resolves to `str`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailsafeSchema;

impl FailsafeSchema {
    pub fn new() -> Self {
        FailsafeSchema
    }
}

impl Schema for FailsafeSchema {
    fn scalar_resolver(&self) -> &dyn ScalarResolver {
        &StrResolver
    }

    fn schema_tag_constructors(&self) -> IndexMap<Tag, ConstructHook> {
        construct::failsafe_constructors()
    }

    fn name(&self) -> &str {
        "failsafe"
    }
}

#[derive(Debug, Clone)]
pub struct JsonSchema {
    resolver: RegexResolver,
}

impl JsonSchema {
    pub fn new() -> Self {
        Self {
            resolver: RegexResolver::json(),
        }
    }
}

impl Default for JsonSchema {
    fn default() -> Self {
        Self::new()
    }
}

impl Schema for JsonSchema {
    fn scalar_resolver(&self) -> &dyn ScalarResolver {
        &self.resolver
    }

    fn schema_tag_constructors(&self) -> IndexMap<Tag, ConstructHook> {
        construct::standard_constructors()
    }

    fn name(&self) -> &str {
        "json"
    }
}

#[derive(Debug, Clone)]
pub struct CoreSchema {
    resolver: RegexResolver,
}

impl CoreSchema {
    pub fn new() -> Self {
        Self {
            resolver: RegexResolver::core(),
        }
    }
}

impl Default for CoreSchema {
    fn default() -> Self {
        Self::new()
    }
}

impl Schema for CoreSchema {
    fn scalar_resolver(&self) -> &dyn ScalarResolver {
        &self.resolver
    }

    fn schema_tag_constructors(&self) -> IndexMap<Tag, ConstructHook> {
        construct::standard_constructors()
    }

    fn name(&self) -> &str {
        "core"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(schema: &dyn Schema, value: &str) -> Tag {
        schema.scalar_resolver().resolve(value, true)
    }

    #[test]
    fn test_core_resolution() {
        let core = CoreSchema::new();
        let cases = [
            ("", Tag::NULL),
            ("~", Tag::NULL),
            ("Null", Tag::NULL),
            ("TRUE", Tag::BOOL),
            ("False", Tag::BOOL),
            ("+12", Tag::INT),
            ("0o17", Tag::INT),
            ("0xFF", Tag::INT),
            ("1.5e3", Tag::FLOAT),
            ("-.Inf", Tag::FLOAT),
            (".NaN", Tag::FLOAT),
            ("<<", Tag::MERGE),
            ("${HOME}", Tag::ENV_TAG),
            ("${HOME:-/root}", Tag::ENV_TAG),
            ("yes", Tag::STR),
            ("0xZZ", Tag::STR),
            ("1.2.3", Tag::STR),
            ("nothing", Tag::STR),
        ];
        for (value, tag) in cases {
            assert_eq!(resolve(&core, value), tag, "value {:?}", value);
        }
    }

    #[test]
    fn test_json_resolution() {
        let json = JsonSchema::new();
        let cases = [
            ("", Tag::NULL),
            ("null", Tag::NULL),
            ("Null", Tag::STR),
            ("~", Tag::STR),
            ("true", Tag::BOOL),
            ("True", Tag::STR),
            ("-0", Tag::INT),
            ("012", Tag::STR),
            ("+1", Tag::STR),
            ("0.5", Tag::FLOAT),
            ("1e10", Tag::FLOAT),
            ("-.inf", Tag::FLOAT),
            (".nan", Tag::FLOAT),
            ("<<", Tag::STR),
        ];
        for (value, tag) in cases {
            assert_eq!(resolve(&json, value), tag, "value {:?}", value);
        }
    }

    #[test]
    fn test_non_implicit_is_str() {
        let core = CoreSchema::new();
        assert_eq!(core.scalar_resolver().resolve("12", false), Tag::STR);
        assert_eq!(core.scalar_resolver().resolve("", false), Tag::STR);
    }

    #[test]
    fn test_failsafe() {
        let failsafe = FailsafeSchema::new();
        assert_eq!(resolve(&failsafe, "12"), Tag::STR);
        assert_eq!(resolve(&failsafe, ""), Tag::STR);
        assert_eq!(failsafe.name(), "failsafe");
        let constructors = failsafe.schema_tag_constructors();
        assert_eq!(constructors.len(), 1);
        assert!(constructors.contains_key(&Tag::STR));
    }

    #[test]
    fn test_custom_resolver_order() {
        let mut resolver = RegexResolver::new();
        let custom = Tag::new("!color");
        resolver.add_implicit_resolver(
            custom.clone(),
            Regex::new(r"^#[0-9a-f]{6}$").unwrap(),
            Some("#"),
        );
        resolver.add_implicit_resolver(Tag::NULL, EMPTY.clone(), None);
        assert_eq!(resolver.resolve("#00ff00", true), custom);
        assert_eq!(resolver.resolve("#00ff0", true), Tag::STR);
        assert_eq!(resolver.resolve("", true), Tag::NULL);
    }
}
