use ems_utils::{dejsonify, jsonify, load_json};
use serde::{Deserialize, Serialize};
use std::io::Write;

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct Settings {
    zeta: u32,
    alpha: Vec<f64>,
    nested: Nested,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct Nested {
    b: bool,
    a: String,
}

fn settings() -> Settings {
    Settings {
        zeta: 3,
        alpha: vec![0.5, 1.0],
        nested: Nested {
            b: true,
            a: "x".to_string(),
        },
    }
}

#[test]
fn test_jsonify_sorts_keys() {
    assert_eq!(
        jsonify(&settings()).unwrap(),
        r#"{"alpha":[0.5,1.0],"nested":{"a":"x","b":true},"zeta":3}"#
    );
}

#[test]
fn test_dejsonify() {
    let parsed: Settings =
        dejsonify(r#"{"zeta":3,"alpha":[0.5,1.0],"nested":{"b":true,"a":"x"}}"#).unwrap();
    assert_eq!(parsed, settings());
    assert!(dejsonify::<Settings>("{").is_err());
}

#[test]
fn test_load_json_inline_and_file() {
    let inline = jsonify(&settings()).unwrap();
    assert_eq!(load_json::<Settings>(&inline).unwrap(), settings());

    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    file.write_all(inline.as_bytes()).unwrap();
    let path = file.path().to_str().unwrap().to_string();
    assert_eq!(load_json::<Settings>(&path).unwrap(), settings());

    assert!(load_json::<Settings>("/definitely/missing/settings.json").is_err());
    assert!(load_json::<Settings>("not json").is_err());
}
