//! Serde integration: typed views of a store and its flat serialized form

use kcfg::{AmbientDefinitions, Config, ConfigError, ConfigReader, SerdeError, from_config};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

fn parse(input: &str) -> Config {
    ConfigReader::new(input)
        .with_ambient(AmbientDefinitions::new())
        .read()
        .unwrap()
}

#[derive(Debug, Deserialize, PartialEq)]
struct Database {
    url: String,
    pool: Pool,
    replicas: Vec<String>,
}

#[derive(Debug, Deserialize, PartialEq)]
struct Pool {
    min: u32,
    max: u32,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
enum Level {
    Debug,
    Info,
    Warn,
}

#[derive(Debug, Deserialize, PartialEq)]
struct Logging {
    level: Level,
    verbose: bool,
    #[serde(default)]
    file: Option<String>,
    #[serde(default = "default_rotate")]
    rotate: u8,
}

fn default_rotate() -> u8 {
    7
}

#[derive(Debug, Deserialize, PartialEq)]
struct Application {
    database: Database,
    logging: Logging,
}

const DOCUMENT: &str = r#"
    def host = "db"

    database {
        url = "postgres://${host}:5432/app"
        pool { min = "2" max = "16" }
        replicas = [ "${host}-1", "${host}-2" ]
    }

    logging {
        level = "info"
        verbose = "enabled"
    }
"#;

#[test]
fn test_deserialize_whole_document() {
    let app: Application = from_config(&parse(DOCUMENT)).unwrap();

    assert_eq!(
        app.database,
        Database {
            url: "postgres://db:5432/app".to_string(),
            pool: Pool { min: 2, max: 16 },
            replicas: vec!["db-1".to_string(), "db-2".to_string()],
        }
    );
    assert_eq!(app.logging.level, Level::Info);
    assert!(app.logging.verbose);
    assert_eq!(app.logging.file, None);
    assert_eq!(app.logging.rotate, 7);
}

#[test]
fn test_deserialize_sub_config() {
    let config = parse(DOCUMENT);
    let pool: Pool = config.sub_config(["database.pool"]).deserialize_into().unwrap();
    assert_eq!(pool, Pool { min: 2, max: 16 });
}

#[test]
fn test_deserialize_into_maps() {
    let config = parse(r#"b = "2" a = "1" n { c = "3" }"#);

    let map: BTreeMap<String, serde_json::Value> = from_config(&config).unwrap();
    assert_eq!(map["a"], serde_json::json!("1"));
    assert_eq!(map["n"], serde_json::json!({ "c": "3" }));

    let value: serde_json::Value = from_config(&config).unwrap();
    assert_eq!(value, serde_json::json!({ "b": "2", "a": "1", "n": { "c": "3" } }));
}

#[test]
fn test_lists_deserialize_as_json_arrays() {
    let value: serde_json::Value =
        from_config(&parse(r#"l = [ "x", "y" ] e = []"#)).unwrap();
    assert_eq!(value, serde_json::json!({ "l": ["x", "y"], "e": [] }));
}

#[test]
fn test_tuples_and_chars() {
    #[derive(Debug, Deserialize)]
    struct Shape {
        point: (i32, i32),
        sep: char,
    }
    let shape: Shape = from_config(&parse(r#"point = [ "3", "-4" ] sep = ":""#)).unwrap();
    assert_eq!(shape.point, (3, -4));
    assert_eq!(shape.sep, ':');

    let result: Result<Shape, _> = from_config(&parse(r#"point = [ "1", "2" ] sep = "::""#));
    assert!(matches!(
        result,
        Err(ConfigError::Serde(SerdeError::TypeMismatch { .. }))
    ));
}

#[test]
fn test_unknown_variant() {
    let result: Result<Logging, _> =
        from_config(&parse(r#"level = "trace" verbose = "no""#));
    assert!(matches!(result, Err(ConfigError::Serde(SerdeError::Custom(_)))));
}

#[test]
fn test_section_where_value_expected() {
    let result: Result<HashMap<String, String>, _> = from_config(&parse(r#"a { b = "c" }"#));
    match result {
        Err(ConfigError::Serde(SerdeError::TypeMismatch { expected, found })) => {
            assert_eq!(expected, "string");
            assert_eq!(found, "section with 1 keys");
        }
        other => panic!("Expected TypeMismatch, got {:?}", other),
    }
}

#[test]
fn test_conflicting_paths() {
    let result: Result<serde_json::Value, _> =
        from_config(&parse(r#"a = "1" a { b = "2" }"#));
    match result {
        Err(ConfigError::Serde(SerdeError::Conflict { path })) => assert_eq!(path, "a"),
        other => panic!("Expected Conflict, got {:?}", other),
    }
}

#[test]
fn test_from_str() {
    let pool: Pool = kcfg::from_str(r#"min = "1" max = "2""#).unwrap();
    assert_eq!(pool, Pool { min: 1, max: 2 });

    let result: Result<Pool, _> = kcfg::from_str("min = 1");
    assert!(matches!(result, Err(ConfigError::Parse(_))));
}

#[test]
fn test_serialize_as_flat_map() {
    let config = parse(r#"a = "1" s { l = [ "x", "y" ] }"#);
    let json = serde_json::to_value(&config).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "a": "1",
            "s.l.size": "2",
            "s.l.1": "x",
            "s.l.2": "y",
        })
    );

    let text = serde_json::to_string(&config).unwrap();
    assert_eq!(text, r#"{"a":"1","s.l.size":"2","s.l.1":"x","s.l.2":"y"}"#);
}

#[test]
fn test_deserialize_from_flat_map() {
    let config: Config =
        serde_json::from_str(r#"{"a":"1","s.l.size":"2","s.l.1":"x","s.l.2":"y"}"#).unwrap();
    assert_eq!(config.get("a").unwrap(), "1");
    assert_eq!(config.get_list("s.l").unwrap(), vec!["x", "y"]);
    assert_eq!(config, parse(r#"a = "1" s { l = [ "x", "y" ] }"#));

    let original = parse(DOCUMENT);
    let json = serde_json::to_string(&original).unwrap();
    let decoded: Config = serde_json::from_str(&json).unwrap();
    assert_eq!(decoded, original);
}
