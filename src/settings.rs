//! Configuration for loading YAML.

use core::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::common::SpecVersion;
use crate::resolver::{ConstructHook, CoreSchema, Schema};
use crate::tag::Tag;

/// Hook deciding whether a `%YAML` version is acceptable.
///
/// Returns the version to continue with (it may rewrite the requested one)
/// or a message explaining the rejection.
pub type VersionCheck =
    Arc<dyn Fn(SpecVersion) -> core::result::Result<SpecVersion, String> + Send + Sync>;

/// Accept YAML 1.0 through 1.2.
pub fn default_version_check(version: SpecVersion) -> core::result::Result<SpecVersion, String> {
    if version.major != 1 {
        return Err(format!(
            "found incompatible YAML document (version 1.* is required), got {}",
            version
        ));
    }
    if version.minor > 2 {
        return Err(format!(
            "unsupported YAML version {}, the latest supported version is 1.2",
            version
        ));
    }
    Ok(version)
}

/// Which characters count as line breaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineBreaks {
    /// `\n`, `\r` and `\r\n` (YAML 1.2)
    #[default]
    Yaml12,
    /// Additionally NEL, LS and PS (YAML 1.1)
    Yaml11,
}

/// Configuration for the load pipeline.
///
/// Settings are immutable once a pipeline is built and can be shared
/// between threads.
#[derive(Clone)]
pub struct LoadSettings {
    /// Label used in marks (default: "reader")
    pub label: String,
    /// Reader chunk size in code points (default: 1024, minimum 1)
    pub buffer_size: usize,
    /// Emit comment tokens/events and attach comments to nodes (default: false)
    pub parse_comments: bool,
    /// Allow a mapping to use itself as a key (default: false)
    pub allow_recursive_keys: bool,
    /// Allow repeated scalar keys in a mapping (default: false)
    pub allow_duplicate_keys: bool,
    /// Maximum aliases to sequences and mappings per document (default: 50)
    pub max_aliases_for_collections: usize,
    /// Record marks on tokens, events and nodes (default: true)
    pub use_marks: bool,
    /// Maximum code points per document (default: 3 MiB)
    pub code_point_limit: usize,
    /// Scalar tag resolution (default: core schema)
    pub schema: Arc<dyn Schema>,
    /// `%YAML` version hook (default: [`default_version_check`])
    pub version_check: VersionCheck,
    /// Line break convention (default: YAML 1.2).
    ///
    /// A `%YAML` directive overrides it for its own document: before 1.2,
    /// NEL, LS and PS are line breaks.
    pub line_breaks: LineBreaks,
    /// Extra scalar constructors, taking precedence over the schema's own
    pub tag_constructors: IndexMap<Tag, ConstructHook>,
}

impl Default for LoadSettings {
    fn default() -> Self {
        Self {
            label: "reader".to_string(),
            buffer_size: 1024,
            parse_comments: false,
            allow_recursive_keys: false,
            allow_duplicate_keys: false,
            max_aliases_for_collections: 50,
            use_marks: true,
            code_point_limit: 3 * 1024 * 1024,
            schema: Arc::new(CoreSchema::new()),
            version_check: Arc::new(default_version_check),
            line_breaks: LineBreaks::default(),
            tag_constructors: IndexMap::new(),
        }
    }
}

impl LoadSettings {
    /// Set the label used in marks.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Set the reader buffer size (values below 1 are raised to 1).
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(1);
        self
    }

    pub fn with_parse_comments(mut self, parse: bool) -> Self {
        self.parse_comments = parse;
        self
    }

    pub fn with_allow_recursive_keys(mut self, allow: bool) -> Self {
        self.allow_recursive_keys = allow;
        self
    }

    pub fn with_allow_duplicate_keys(mut self, allow: bool) -> Self {
        self.allow_duplicate_keys = allow;
        self
    }

    pub fn with_max_aliases_for_collections(mut self, max: usize) -> Self {
        self.max_aliases_for_collections = max;
        self
    }

    pub fn with_use_marks(mut self, use_marks: bool) -> Self {
        self.use_marks = use_marks;
        self
    }

    pub fn with_code_point_limit(mut self, limit: usize) -> Self {
        self.code_point_limit = limit;
        self
    }

    /// Set the schema used for implicit tag resolution.
    pub fn with_schema(mut self, schema: impl Schema + 'static) -> Self {
        self.schema = Arc::new(schema);
        self
    }

    /// Set the `%YAML` version hook.
    pub fn with_version_check<F>(mut self, check: F) -> Self
    where
        F: Fn(SpecVersion) -> core::result::Result<SpecVersion, String> + Send + Sync + 'static,
    {
        self.version_check = Arc::new(check);
        self
    }

    pub fn with_line_breaks(mut self, line_breaks: LineBreaks) -> Self {
        self.line_breaks = line_breaks;
        self
    }

    /// Register a constructor for scalars tagged `tag`.
    pub fn with_tag_constructor(mut self, tag: Tag, hook: ConstructHook) -> Self {
        self.tag_constructors.insert(tag, hook);
        self
    }

    /// The schema's constructors with the custom ones layered on top.
    pub fn constructors(&self) -> IndexMap<Tag, ConstructHook> {
        let mut constructors = self.schema.schema_tag_constructors();
        for (tag, hook) in &self.tag_constructors {
            constructors.insert(tag.clone(), Arc::clone(hook));
        }
        constructors
    }
}

impl fmt::Debug for LoadSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadSettings")
            .field("label", &self.label)
            .field("buffer_size", &self.buffer_size)
            .field("parse_comments", &self.parse_comments)
            .field("allow_recursive_keys", &self.allow_recursive_keys)
            .field("allow_duplicate_keys", &self.allow_duplicate_keys)
            .field(
                "max_aliases_for_collections",
                &self.max_aliases_for_collections,
            )
            .field("use_marks", &self.use_marks)
            .field("code_point_limit", &self.code_point_limit)
            .field("schema", &self.schema.name())
            .field("line_breaks", &self.line_breaks)
            .field(
                "tag_constructors",
                &self.tag_constructors.keys().collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::{Document, NodeId};
    use crate::resolver::{JsonSchema, ScalarValue};

    #[test]
    fn test_defaults() {
        let settings = LoadSettings::default();
        assert_eq!(settings.label, "reader");
        assert_eq!(settings.buffer_size, 1024);
        assert!(!settings.parse_comments);
        assert!(!settings.allow_duplicate_keys);
        assert_eq!(settings.max_aliases_for_collections, 50);
        assert!(settings.use_marks);
        assert_eq!(settings.schema.name(), "core");
    }

    #[test]
    fn test_builder() {
        let settings = LoadSettings::default()
            .with_label("config.yaml")
            .with_buffer_size(0)
            .with_parse_comments(true)
            .with_schema(JsonSchema::new());
        assert_eq!(settings.label, "config.yaml");
        assert_eq!(settings.buffer_size, 1);
        assert!(settings.parse_comments);
        assert_eq!(settings.schema.name(), "json");
    }

    #[test]
    fn test_default_version_check() {
        assert!(default_version_check(SpecVersion::V1_1).is_ok());
        assert!(default_version_check(SpecVersion::V1_2).is_ok());
        assert!(default_version_check(SpecVersion::new(1, 3)).is_err());
        assert!(default_version_check(SpecVersion::new(2, 0)).is_err());
    }

    #[test]
    fn test_custom_constructor_overrides_schema() {
        let hook: ConstructHook =
            Arc::new(|_: &Document, _: NodeId| Ok(ScalarValue::Str("custom".into())));
        let settings = LoadSettings::default().with_tag_constructor(Tag::INT, hook);
        let constructors = settings.constructors();
        assert!(constructors.contains_key(&Tag::STR));
        assert!(constructors.contains_key(&Tag::INT));
        assert_eq!(settings.tag_constructors.len(), 1);
    }

    #[test]
    fn test_settings_are_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<LoadSettings>();
    }
}
