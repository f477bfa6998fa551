//! Serialization of marks and style enums (requires the `serde` feature).
#![cfg(feature = "serde")]

use yaml_engine::{compose, FlowStyle, LoadSettings, Mark, ScalarStyle, SpecVersion};

#[test]
fn test_mark_json_roundtrip() {
    let doc = compose("key: [value]\n", &LoadSettings::default())
        .unwrap()
        .unwrap();
    let seq = doc.lookup(&["key"]).unwrap();
    let mark = doc[seq].start.clone().unwrap();

    let json = serde_json::to_value(&mark).unwrap();
    assert_eq!(json["line"], 0);
    assert_eq!(json["column"], 5);
    assert_eq!(json["name"], "reader");

    let back: Mark = serde_json::from_value(json).unwrap();
    assert_eq!(back, mark);
}

#[test]
fn test_style_enums_serialize_by_name() {
    assert_eq!(
        serde_json::to_string(&ScalarStyle::DoubleQuoted).unwrap(),
        "\"DoubleQuoted\""
    );
    assert_eq!(serde_json::to_string(&FlowStyle::Flow).unwrap(), "\"Flow\"");
    assert_eq!(
        serde_json::to_string(&SpecVersion::V1_2).unwrap(),
        r#"{"major":1,"minor":2}"#
    );
}
