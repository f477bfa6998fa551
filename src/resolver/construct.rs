//! Standard scalar constructors.

use std::sync::Arc;

use base64::prelude::*;
use indexmap::IndexMap;

use crate::error::{Result, YamlError};
use crate::nodes::{Document, NodeId};
use crate::tag::Tag;

use super::numbers::{parse_float, parse_int, YamlInt};

/// Native value produced by a scalar constructor.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Null,
    Bool(bool),
    Int(YamlInt),
    Float(f64),
    Str(String),
    Binary(Vec<u8>),
}

/// Turns the scalar node `NodeId` of a document into a [`ScalarValue`].
pub type ConstructHook = Arc<dyn Fn(&Document, NodeId) -> Result<ScalarValue> + Send + Sync>;

const CONTEXT: &str = "while constructing a scalar";

fn scalar_text(document: &Document, id: NodeId) -> Result<&str> {
    let node = document.node(id).ok_or_else(|| {
        YamlError::construct(Some(CONTEXT), None, format!("no node {}", id.index()), None)
    })?;
    node.as_str().ok_or_else(|| {
        YamlError::construct(
            Some(CONTEXT),
            None,
            format!("expected a scalar node, but found a {}", node.data.kind_name()),
            node.start.clone(),
        )
    })
}

fn invalid(document: &Document, id: NodeId, what: &str, text: &str) -> YamlError {
    YamlError::construct(
        Some(CONTEXT),
        None,
        format!("invalid {} value {:?}", what, text),
        document.node(id).and_then(|node| node.start.clone()),
    )
}

pub fn construct_null(document: &Document, id: NodeId) -> Result<ScalarValue> {
    scalar_text(document, id)?;
    Ok(ScalarValue::Null)
}

pub fn construct_bool(document: &Document, id: NodeId) -> Result<ScalarValue> {
    let text = scalar_text(document, id)?;
    match text.to_ascii_lowercase().as_str() {
        "true" => Ok(ScalarValue::Bool(true)),
        "false" => Ok(ScalarValue::Bool(false)),
        _ => Err(invalid(document, id, "bool", text)),
    }
}

pub fn construct_int(document: &Document, id: NodeId) -> Result<ScalarValue> {
    let text = scalar_text(document, id)?;
    parse_int(text)
        .map(ScalarValue::Int)
        .ok_or_else(|| invalid(document, id, "int", text))
}

pub fn construct_float(document: &Document, id: NodeId) -> Result<ScalarValue> {
    let text = scalar_text(document, id)?;
    parse_float(text)
        .map(ScalarValue::Float)
        .ok_or_else(|| invalid(document, id, "float", text))
}

/// Also used for `!ENV_VARIABLE` scalars, which keep their raw text.
pub fn construct_str(document: &Document, id: NodeId) -> Result<ScalarValue> {
    scalar_text(document, id).map(|text| ScalarValue::Str(text.to_string()))
}

/// Standard base64; whitespace and line breaks inside the scalar are ignored.
pub fn construct_binary(document: &Document, id: NodeId) -> Result<ScalarValue> {
    let text = scalar_text(document, id)?;
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    BASE64_STANDARD
        .decode(compact)
        .map(ScalarValue::Binary)
        .map_err(|_| invalid(document, id, "binary", text))
}

fn hook(f: fn(&Document, NodeId) -> Result<ScalarValue>) -> ConstructHook {
    Arc::new(f)
}

/// Constructors for the failsafe schema: strings only.
pub(crate) fn failsafe_constructors() -> IndexMap<Tag, ConstructHook> {
    let mut constructors = IndexMap::new();
    constructors.insert(Tag::STR, hook(construct_str));
    constructors
}

/// Constructors shared by the JSON and core schemas.
pub(crate) fn standard_constructors() -> IndexMap<Tag, ConstructHook> {
    let mut constructors = failsafe_constructors();
    constructors.insert(Tag::NULL, hook(construct_null));
    constructors.insert(Tag::BOOL, hook(construct_bool));
    constructors.insert(Tag::INT, hook(construct_int));
    constructors.insert(Tag::FLOAT, hook(construct_float));
    constructors.insert(Tag::BINARY, hook(construct_binary));
    constructors.insert(Tag::ENV_TAG, hook(construct_str));
    constructors
}

/// Run the constructor registered for the tag of node `id`.
pub fn construct_with(
    document: &Document,
    id: NodeId,
    constructors: &IndexMap<Tag, ConstructHook>,
) -> Result<ScalarValue> {
    let node = document.node(id).ok_or_else(|| {
        YamlError::construct(Some(CONTEXT), None, format!("no node {}", id.index()), None)
    })?;
    match constructors.get(&node.tag) {
        Some(hook) => hook(document, id),
        None => Err(YamlError::construct(
            Some(CONTEXT),
            None,
            format!("could not determine a constructor for the tag {}", node.tag),
            node.start.clone(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ScalarStyle;
    use crate::nodes::Node;

    fn single(tag: Tag, text: &str) -> Document {
        Document::new(
            vec![Node::scalar(tag, text, ScalarStyle::Plain)],
            NodeId::new(0),
        )
    }

    #[test]
    fn test_construct_binary() {
        let binary = |text: &str| {
            let doc = single(Tag::BINARY, text);
            construct_binary(&doc, doc.root())
        };
        assert_eq!(binary("aGVsbG8=").unwrap(), ScalarValue::Binary(b"hello".to_vec()));
        assert_eq!(
            binary("aGVs\n  bG8h").unwrap(),
            ScalarValue::Binary(b"hello!".to_vec())
        );
        assert_eq!(binary("").unwrap(), ScalarValue::Binary(Vec::new()));
        assert!(binary("aGV*").is_err());
        let err = binary("aG=Vs").unwrap_err();
        assert!(err.to_string().contains("invalid binary value"));
    }

    #[test]
    fn test_standard_constructors() {
        let constructors = standard_constructors();
        let cases = [
            (Tag::NULL, "~", ScalarValue::Null),
            (Tag::BOOL, "True", ScalarValue::Bool(true)),
            (Tag::INT, "0x10", ScalarValue::Int(YamlInt::I32(16))),
            (Tag::FLOAT, "-.5", ScalarValue::Float(-0.5)),
            (Tag::STR, "text", ScalarValue::Str("text".into())),
            (Tag::BINARY, "AQID", ScalarValue::Binary(vec![1, 2, 3])),
            (Tag::ENV_TAG, "${HOME}", ScalarValue::Str("${HOME}".into())),
        ];
        for (tag, text, expected) in cases {
            let doc = single(tag, text);
            assert_eq!(
                construct_with(&doc, doc.root(), &constructors).unwrap(),
                expected
            );
        }
    }

    #[test]
    fn test_invalid_values_fail() {
        let constructors = standard_constructors();
        let doc = single(Tag::INT, "twelve");
        let err = construct_with(&doc, doc.root(), &constructors).unwrap_err();
        assert!(matches!(err, YamlError::Construct(_)));
        assert!(err.to_string().contains("invalid int value"));
    }

    #[test]
    fn test_unknown_tag() {
        let doc = single(Tag::new("!custom"), "x");
        let err = construct_with(&doc, doc.root(), &failsafe_constructors()).unwrap_err();
        assert!(err
            .to_string()
            .contains("could not determine a constructor for the tag !custom"));
    }
}
