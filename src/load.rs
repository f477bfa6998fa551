//! Entry points wiring reader, scanner, parser and composer together.

use crate::composer::Composer;
use crate::error::Result;
use crate::nodes::Document;
use crate::parser::Parser;
use crate::reader::StreamReader;
use crate::scanner::Scanner;
use crate::settings::LoadSettings;

fn parser_over<'a>(reader: StreamReader<'a>, settings: &LoadSettings) -> Parser<'a> {
    Parser::new(Scanner::new(reader, settings), settings)
}

/// Event parser over `text`.
pub fn parse<'a>(text: &'a str, settings: &LoadSettings) -> Parser<'a> {
    parser_over(StreamReader::new(text, settings), settings)
}

/// Compose the single document in `text`.
///
/// Returns `Ok(None)` for a stream with no documents and an error if the
/// stream holds more than one.
///
/// ```
/// use yaml_engine::{compose, LoadSettings};
///
/// let doc = compose("name: demo\nports: [80, 443]\n", &LoadSettings::default())
///     .unwrap()
///     .unwrap();
/// let port = doc.lookup(&["ports"]).unwrap();
/// assert_eq!(doc[port].items().unwrap().len(), 2);
/// ```
pub fn compose(text: &str, settings: &LoadSettings) -> Result<Option<Document>> {
    Composer::new(parse(text, settings), settings).single_document()
}

/// Iterate over every document in `text`.
///
/// ```
/// use yaml_engine::{compose_all, LoadSettings};
///
/// let docs = compose_all("--- a\n--- b\n", &LoadSettings::default())
///     .collect::<yaml_engine::Result<Vec<_>>>()
///     .unwrap();
/// assert_eq!(docs.len(), 2);
/// ```
pub fn compose_all<'a>(text: &'a str, settings: &LoadSettings) -> Composer<'a> {
    Composer::new(parse(text, settings), settings)
}

/// Like [`compose`], decoding `bytes` first (UTF-8 unless a BOM says
/// otherwise).
pub fn compose_bytes(bytes: &[u8], settings: &LoadSettings) -> Result<Option<Document>> {
    let reader = StreamReader::from_bytes(bytes, settings);
    Composer::new(parser_over(reader, settings), settings).single_document()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::YamlError;

    #[test]
    fn test_parse_yields_events() {
        let settings = LoadSettings::default();
        let count = parse("[a, b]", &settings).count();
        // +STR +DOC +SEQ =VAL =VAL -SEQ -DOC -STR
        assert_eq!(count, 8);
    }

    #[test]
    fn test_compose_bytes_utf16() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "k: v\n".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        let doc = compose_bytes(&bytes, &LoadSettings::default())
            .unwrap()
            .unwrap();
        assert_eq!(doc.lookup(&["k"]).and_then(|id| doc.scalar(id)), Some("v"));
    }

    #[test]
    fn test_compose_bytes_invalid_utf8() {
        let err = compose_bytes(b"a: \xFF\n", &LoadSettings::default()).unwrap_err();
        assert!(matches!(err, YamlError::Reader(_)));
    }

    #[test]
    fn test_compose_empty() {
        assert!(compose("", &LoadSettings::default()).unwrap().is_none());
        assert!(compose("# nothing\n", &LoadSettings::default())
            .unwrap()
            .is_none());
    }
}
