//! Malformed documents must be rejected with the matching error category

use kcfg::{
    AmbientDefinitions, Config, ConfigError, ConfigReader, DefinitionError, LexError, ParseError,
    Position,
};

fn parse(input: &str) -> Result<Config, ConfigError> {
    ConfigReader::new(input)
        .with_ambient(AmbientDefinitions::new())
        .read()
}

#[test]
fn test_missing_equals() {
    match parse("user") {
        Err(ConfigError::Parse(ParseError::UnexpectedToken { expected, .. })) => {
            assert_eq!(expected, "'=' or '{'");
        }
        other => panic!("Expected UnexpectedToken, got {:?}", other),
    }

    assert!(matches!(
        parse("a = \"1\"\nuser \"john\""),
        Err(ConfigError::Parse(ParseError::UnexpectedToken { .. }))
    ));
}

#[test]
fn test_missing_value() {
    match parse("user =") {
        Err(ConfigError::Parse(ParseError::UnexpectedToken { token, .. })) => {
            assert_eq!(token, "end of input");
        }
        other => panic!("Expected UnexpectedToken, got {:?}", other),
    }
}

#[test]
fn test_unquoted_value() {
    for input in ["user = john", "user = 42", "user = {", "user = ,", "user = =", "user = ]"] {
        assert!(
            matches!(
                parse(input),
                Err(ConfigError::Parse(ParseError::UnexpectedToken { .. }))
            ),
            "{input:?}"
        );
    }
}

#[test]
fn test_unterminated_strings() {
    for input in ["user = \"john", "user = 'john", "user = 'john\"", "a = [ \"x"] {
        assert!(
            matches!(
                parse(input),
                Err(ConfigError::Lex(LexError::UnterminatedString { .. }))
            ),
            "{input:?}"
        );
    }
}

#[test]
fn test_line_break_inside_string() {
    for input in ["user = 'john\n.doe'", "user = \"john\r\n\"", "user = 'john\\\ndoe'"] {
        assert!(
            matches!(
                parse(input),
                Err(ConfigError::Lex(LexError::MultilineString { .. }))
            ),
            "{input:?}"
        );
    }
}

#[test]
fn test_tab_inside_string_is_accepted() {
    let config = parse("user = 'john\t.doe'").unwrap();
    assert_eq!(config.get("user").unwrap(), "john\t.doe");
}

#[test]
fn test_trailing_characters_after_section() {
    for input in ["a { b = \"c\" } }", "a { } x", "a { } ]", "a { } \"x\""] {
        assert!(parse(input).is_err(), "{input:?}");
    }

    match parse("a { b = \"c\" }\n;") {
        Err(ConfigError::Parse(ParseError::TrailingInput {
            found, position, ..
        })) => {
            assert_eq!(found, "text ';'");
            assert_eq!(position, Position::at(2, 1));
        }
        other => panic!("Expected TrailingInput, got {:?}", other),
    }
}

#[test]
fn test_unclosed_section() {
    for input in ["a {", "a { b = \"c\"", "a { b { c = \"d\" }", "a { b = \"c\" ]"] {
        assert!(
            matches!(
                parse(input),
                Err(ConfigError::Parse(ParseError::UnclosedSection { .. }))
            ),
            "{input:?}"
        );
    }
}

#[test]
fn test_unclosed_array() {
    for input in ["a = [", "a = [ \"x\"", "a = [ \"x\", ]", "a = [ \"x\" \"y\" ]", "a = [ , ]"] {
        assert!(
            matches!(
                parse(input),
                Err(ConfigError::Parse(ParseError::UnclosedArray { .. }))
            ),
            "{input:?}"
        );
    }
}

#[test]
fn test_nested_arrays_are_rejected() {
    assert!(parse("a = [ [ \"x\" ] ]").is_err());
}

#[test]
fn test_dangling_path_dot() {
    for input in ["a. = \"x\"", "a.b. { }", "a.b.= \"x\"", "s { a. = \"x\" }"] {
        assert!(
            matches!(
                parse(input),
                Err(ConfigError::Lex(LexError::DanglingPathDot { .. }))
            ),
            "{input:?}"
        );
    }
}

#[test]
fn test_invalid_escape() {
    assert!(matches!(
        parse(r#"a = "\x41""#),
        Err(ConfigError::Lex(LexError::InvalidEscape { sequence: 'x', .. }))
    ));
}

#[test]
fn test_invalid_definitions() {
    for input in [
        "def",
        "def x",
        "def x =",
        "def 1 = \"y\"",
        "def x.y = \"z\"",
        "def x = y",
        "def x = [ \"y\" ]",
    ] {
        assert!(
            matches!(
                parse(input),
                Err(ConfigError::Parse(ParseError::InvalidDefinition { .. }))
            ),
            "{input:?}"
        );
    }
}

#[test]
fn test_def_after_items_is_rejected() {
    assert!(parse("a = \"1\"\ndef x = \"y\"").is_err());
}

#[test]
fn test_unresolved_definitions() {
    for input in [
        "p = \"${missing}\"",
        "p = [ \"ok\", \"${missing}\" ]",
        "def x = \"${missing}\"",
        "s { p = '${a.b}' }",
    ] {
        assert!(
            matches!(
                parse(input),
                Err(ConfigError::Definition(DefinitionError::Unresolved { .. }))
            ),
            "{input:?}"
        );
    }
}

#[test]
fn test_definitions_must_precede_use() {
    assert!(parse("p = \"${home}\"\ndef home = \"/x\"").is_err());
}

#[test]
fn test_reserved_user_definitions() {
    for key in ["env.HOME", "Env.HOME", "system.user.home", "SYSTEM.x"] {
        let result = ConfigReader::new("")
            .with_ambient(AmbientDefinitions::new())
            .with_definition(key, "x")
            .read();
        match result {
            Err(ConfigError::Definition(DefinitionError::ReservedKey { key: rejected })) => {
                assert_eq!(rejected, key);
            }
            other => panic!("Expected ReservedKey for {key}, got {:?}", other),
        }
    }
}

#[test]
fn test_stray_tokens() {
    for input in ["=", "}", "]", ",", "\"x\"", "@foo", "{ a = \"b\" }", "1a = \"b\""] {
        assert!(parse(input).is_err(), "{input:?}");
    }
}
