//! Recursive-descent reader turning tokens into a [`Config`]
//!
//! The reader predicts each production from a fixed four-token lookahead and
//! never backtracks. Values are substituted as soon as they are read and
//! handed to a [`ConfigBuilder`], which flattens them under the open sections.
//!
//! # Examples
//!
//! ```rust
//! use kcfg::ConfigReader;
//!
//! let config = ConfigReader::new(r#"
//!     def root = "/srv"
//!     server {
//!         host = "localhost"
//!         paths = [ "${root}/a", "${root}/b" ]
//!     }
//! "#)
//! .read()
//! .unwrap();
//!
//! assert_eq!(config.get("server.host").unwrap(), "localhost");
//! assert_eq!(config.get_list("server.paths").unwrap(), vec!["/srv/a", "/srv/b"]);
//! ```

use crate::builder::{ConfigBuilder, ConfigValue};
use crate::config::Config;
use crate::definitions::{AmbientDefinitions, Definitions, validate_user_definitions};
use crate::error::{ConfigError, ParseError, Position};
use crate::lexer::{ConfigLexer, Token, TokenKind};
use crate::lookahead::Lookahead;
use indexmap::IndexMap;
use std::panic::{self, AssertUnwindSafe};

/// Keyword introducing a definition statement
const DEF_KEYWORD: &str = "def";

/// Configuration options for the reader
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderConfig {
    /// Maximum section nesting depth to prevent stack overflow
    pub max_section_depth: usize,
}

impl ReaderConfig {
    /// Creates a reader configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum section nesting depth
    pub fn with_max_section_depth(mut self, max_section_depth: usize) -> Self {
        self.max_section_depth = max_section_depth;
        self
    }
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            max_section_depth: 128,
        }
    }
}

/// Reads one configuration document
///
/// Holds the document text and everything that feeds substitution. Every call
/// to [`ConfigReader::read`] starts from fresh lexer, definitions and builder
/// state.
#[derive(Debug, Clone)]
pub struct ConfigReader<'a> {
    input: &'a str,
    user_definitions: IndexMap<String, String>,
    ambient: Option<AmbientDefinitions>,
    config: ReaderConfig,
}

impl<'a> ConfigReader<'a> {
    /// Creates a reader for `input` with no user definitions
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            user_definitions: IndexMap::new(),
            ambient: None,
            config: ReaderConfig::default(),
        }
    }

    /// Adds user definitions; keys in the `env.` and `system.` namespaces are
    /// rejected when the document is read
    pub fn with_definitions<I, K, V>(mut self, definitions: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.user_definitions.extend(
            definitions
                .into_iter()
                .map(|(name, value)| (name.into(), value.into())),
        );
        self
    }

    /// Adds a single user definition
    pub fn with_definition(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.user_definitions.insert(name.into(), value.into());
        self
    }

    /// Uses the given environment and system snapshot instead of capturing
    /// the process state
    pub fn with_ambient(mut self, ambient: AmbientDefinitions) -> Self {
        self.ambient = Some(ambient);
        self
    }

    /// Sets the reader configuration
    pub fn with_config(mut self, config: ReaderConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the user definitions
    pub fn user_definitions(&self) -> &IndexMap<String, String> {
        &self.user_definitions
    }

    /// Parses the document
    ///
    /// Either the complete store is returned or the first error encountered.
    /// A panic raised while parsing is reported as [`ConfigError::Internal`].
    /// The panic hook still runs before that, so with the default hook the
    /// panic message is also printed to stderr.
    pub fn read(&self) -> Result<Config, ConfigError> {
        tracing::debug!(
            input_len = self.input.len(),
            user_definitions = self.user_definitions.len(),
            "Reading configuration"
        );

        match panic::catch_unwind(AssertUnwindSafe(|| self.read_document())) {
            Ok(result) => {
                if let Ok(config) = &result {
                    tracing::debug!(paths = config.len(), "Configuration read");
                }
                result
            }
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                tracing::warn!(%message, "Internal fault while reading configuration");
                Err(ConfigError::internal(format!(
                    "Internal error while reading configuration: {message}"
                )))
            }
        }
    }

    fn read_document(&self) -> Result<Config, ConfigError> {
        validate_user_definitions(&self.user_definitions)?;

        let definitions = match &self.ambient {
            Some(ambient) => Definitions::seeded(ambient, &self.user_definitions),
            None => Definitions::seeded(&AmbientDefinitions::capture(), &self.user_definitions),
        };

        let tokens = Lookahead::new(ConfigLexer::new(self.input))?;
        let mut parser = DocumentParser {
            tokens,
            definitions,
            builder: ConfigBuilder::new(),
            max_section_depth: self.config.max_section_depth,
        };
        parser.parse_document()?;
        Ok(parser.builder.build())
    }
}

/// Parses `input` with a freshly captured environment and no user definitions
pub fn read(input: &str) -> Result<Config, ConfigError> {
    ConfigReader::new(input).read()
}

/// Parser state for a single document
struct DocumentParser<'a> {
    tokens: Lookahead<'a>,
    definitions: Definitions,
    builder: ConfigBuilder,
    max_section_depth: usize,
}

impl DocumentParser<'_> {
    fn parse_document(&mut self) -> Result<(), ConfigError> {
        while self.parse_def_statement()? {}
        while self.parse_item_or_section()? {}
        self.expect_eof()
    }

    /// `'def' Identifier '=' Value`
    fn parse_def_statement(&mut self) -> Result<bool, ConfigError> {
        let head = &self.tokens[0];
        if !(head.is(TokenKind::Identifier) && head.text == DEF_KEYWORD) {
            return Ok(false);
        }

        if !self.tokens[1].is(TokenKind::Identifier) {
            return Err(invalid_definition(&self.tokens[1], "a variable name"));
        }
        if !self.tokens[2].is(TokenKind::Equals) {
            return Err(invalid_definition(&self.tokens[2], "'='"));
        }
        if !self.tokens[3].is(TokenKind::String) {
            return Err(invalid_definition(&self.tokens[3], "a quoted variable value"));
        }

        let name = self.tokens[1].text.clone();
        let value = self.substitute(&self.tokens[3])?;
        tracing::trace!(%name, %value, "Definition");
        self.definitions.define(name, value);
        self.tokens.consume(4)?;

        Ok(true)
    }

    fn parse_item_or_section(&mut self) -> Result<bool, ConfigError> {
        Ok(self.parse_config_item()? || self.parse_section()?)
    }

    /// `(Identifier | Path) '=' (Value | MultiValue)`
    fn parse_config_item(&mut self) -> Result<bool, ConfigError> {
        if !(self.tokens[0].is_name() && self.tokens[1].is(TokenKind::Equals)) {
            return Ok(false);
        }

        let name = self.tokens[0].text.clone();
        match self.tokens[2].kind {
            TokenKind::String => {
                let value = self.substitute(&self.tokens[2])?;
                self.builder.add(ConfigValue::single(name, value));
                self.tokens.consume(3)?;
            }
            TokenKind::LBrack => {
                self.tokens.consume(3)?;
                let values = self.parse_multi_values()?;
                self.builder.add(ConfigValue::multi(name, values));
            }
            _ => {
                return Err(unexpected(&self.tokens[2], "a quoted value or '['"));
            }
        }

        Ok(true)
    }

    /// Values of a multi-value, the opening bracket already consumed:
    /// `(Value (',' Value)*)? ']'`
    fn parse_multi_values(&mut self) -> Result<Vec<String>, ConfigError> {
        let mut values = Vec::new();

        if self.tokens[0].is(TokenKind::String) {
            values.push(self.substitute(&self.tokens[0])?);
            self.tokens.consume(1)?;

            while self.tokens[0].is(TokenKind::Comma) && self.tokens[1].is(TokenKind::String) {
                values.push(self.substitute(&self.tokens[1])?);
                self.tokens.consume(2)?;
            }
        }

        let close = &self.tokens[0];
        if !close.is(TokenKind::RBrack) {
            return Err(ParseError::UnclosedArray {
                position: close.position,
                found: close.describe(),
            }
            .into());
        }
        self.tokens.consume(1)?;

        Ok(values)
    }

    /// `(Identifier | Path) '{' (Section | ConfigItem)* '}'`
    fn parse_section(&mut self) -> Result<bool, ConfigError> {
        if !(self.tokens[0].is_name() && self.tokens[1].is(TokenKind::LBrace)) {
            return Ok(false);
        }

        if self.builder.depth() >= self.max_section_depth {
            return Err(ParseError::MaxDepthExceeded {
                max_depth: self.max_section_depth,
                position: self.tokens[0].position,
            }
            .into());
        }

        let name = self.tokens[0].text.clone();
        self.builder.push_section(name.clone());
        self.tokens.consume(2)?;

        while self.parse_item_or_section()? {}

        let close = &self.tokens[0];
        if !close.is(TokenKind::RBrace) {
            return Err(ParseError::UnclosedSection {
                section: name,
                position: close.position,
                found: close.describe(),
            }
            .into());
        }
        self.tokens.consume(1)?;
        self.builder.pop_section();

        Ok(true)
    }

    fn expect_eof(&self) -> Result<(), ConfigError> {
        let head = &self.tokens[0];
        if head.is(TokenKind::Eof) {
            return Ok(());
        }

        // A name that is neither an item nor a section lacks its '=' or '{'
        if head.is_name() {
            return Err(unexpected(&self.tokens[1], "'=' or '{'"));
        }

        Err(ParseError::TrailingInput {
            found: head.describe(),
            position: head.position,
            index: self.tokens.consumed(),
        }
        .into())
    }

    fn substitute(&self, token: &Token) -> Result<String, ConfigError> {
        Ok(self.definitions.substitute(&token.text, token.position)?)
    }
}

fn invalid_definition(token: &Token, expected: &str) -> ConfigError {
    ParseError::InvalidDefinition {
        position: token.position,
        expected: format!("{expected}, found {}", token.describe()),
    }
    .into()
}

fn unexpected(token: &Token, expected: &str) -> ConfigError {
    ParseError::UnexpectedToken {
        token: token.describe(),
        position: token.position,
        expected: expected.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DefinitionError, LexError};

    fn parse(input: &str) -> Result<Config, ConfigError> {
        ConfigReader::new(input)
            .with_ambient(AmbientDefinitions::new())
            .read()
    }

    #[test]
    fn test_read_scalars() {
        let config = parse("user = \"john\"\nhost = 'example.com'").unwrap();
        assert_eq!(config.get("user").unwrap(), "john");
        assert_eq!(config.get("host").unwrap(), "example.com");
        assert_eq!(config.len(), 2);
    }

    #[test]
    fn test_read_nested_sections() {
        let config = parse("a { b { c = \"v\" } d.e { f = \"w\" } }").unwrap();
        assert_eq!(config.get("a.b.c").unwrap(), "v");
        assert_eq!(config.get("a.d.e.f").unwrap(), "w");
    }

    #[test]
    fn test_read_multi_values() {
        let config = parse("arr = [\"a\", 'b', \"c\"]\nempty = []").unwrap();
        assert_eq!(config.get_list("arr").unwrap(), vec!["a", "b", "c"]);
        assert!(config.get_list("empty").unwrap().is_empty());
        assert_eq!(config.len(), 4 + 1);
    }

    #[test]
    fn test_def_statements_and_substitution() {
        let config = parse("def home = \"/x\"\ndef etc = \"${home}/etc\"\np = \"${etc}/y\"").unwrap();
        assert_eq!(config.get("p").unwrap(), "/x/etc/y");
        assert!(!config.has_path("home"));
        assert!(!config.has_path("def"));
    }

    #[test]
    fn test_def_overrides_user_definition() {
        let config = ConfigReader::new("def home = \"/doc\"\np = \"${home}\"")
            .with_ambient(AmbientDefinitions::new())
            .with_definition("home", "/user")
            .read()
            .unwrap();
        assert_eq!(config.get("p").unwrap(), "/doc");
    }

    #[test]
    fn test_invalid_def_statements() {
        for input in ["def = \"x\"", "def x \"y\"", "def x = y", "def x = [\"y\"]"] {
            match parse(input) {
                Err(ConfigError::Parse(ParseError::InvalidDefinition { .. })) => {}
                other => panic!("Expected InvalidDefinition for {input:?}, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_missing_value() {
        match parse("user = john") {
            Err(ConfigError::Parse(ParseError::UnexpectedToken { position, .. })) => {
                assert_eq!(position, Position::at(1, 8));
            }
            other => panic!("Expected UnexpectedToken, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_equals() {
        match parse("user") {
            Err(ConfigError::Parse(ParseError::UnexpectedToken { expected, .. })) => {
                assert_eq!(expected, "'=' or '{'");
            }
            other => panic!("Expected UnexpectedToken, got {:?}", other),
        }
    }

    #[test]
    fn test_trailing_input() {
        match parse("a { b = \"c\" } }") {
            Err(ConfigError::Parse(ParseError::TrailingInput {
                position, index, ..
            })) => {
                assert_eq!(position, Position::at(1, 15));
                assert_eq!(index, 6);
            }
            other => panic!("Expected TrailingInput, got {:?}", other),
        }
    }

    #[test]
    fn test_unclosed_section_and_array() {
        assert!(matches!(
            parse("a { b = \"c\""),
            Err(ConfigError::Parse(ParseError::UnclosedSection { .. }))
        ));
        assert!(matches!(
            parse("a = [\"b\", \"c\""),
            Err(ConfigError::Parse(ParseError::UnclosedArray { .. }))
        ));
        assert!(matches!(
            parse("a = [\"b\",]"),
            Err(ConfigError::Parse(ParseError::UnclosedArray { .. }))
        ));
    }

    #[test]
    fn test_unresolved_definition() {
        match parse("p = \"${missing}\"") {
            Err(ConfigError::Definition(DefinitionError::Unresolved { name, position })) => {
                assert_eq!(name, "missing");
                assert_eq!(position, Position::at(1, 5));
            }
            other => panic!("Expected Unresolved, got {:?}", other),
        }
    }

    #[test]
    fn test_reserved_user_definition() {
        let result = ConfigReader::new("a = \"b\"")
            .with_ambient(AmbientDefinitions::new())
            .with_definition("env.HOME", "/x")
            .read();
        assert!(matches!(
            result,
            Err(ConfigError::Definition(DefinitionError::ReservedKey { .. }))
        ));
    }

    #[test]
    fn test_lex_errors_propagate() {
        assert!(matches!(
            parse("a = \"b"),
            Err(ConfigError::Lex(LexError::UnterminatedString { .. }))
        ));
    }

    #[test]
    fn test_max_section_depth() {
        let input = "a { b { c { d = \"x\" } } }";
        let shallow = ReaderConfig::new().with_max_section_depth(2);
        let result = ConfigReader::new(input)
            .with_ambient(AmbientDefinitions::new())
            .with_config(shallow)
            .read();
        match result {
            Err(ConfigError::Parse(ParseError::MaxDepthExceeded {
                max_depth,
                position,
            })) => {
                assert_eq!(max_depth, 2);
                assert_eq!(position, Position::at(1, 9));
            }
            other => panic!("Expected MaxDepthExceeded, got {:?}", other),
        }

        let deep = ReaderConfig::new().with_max_section_depth(3);
        let config = ConfigReader::new(input)
            .with_ambient(AmbientDefinitions::new())
            .with_config(deep)
            .read()
            .unwrap();
        assert_eq!(config.get("a.b.c.d").unwrap(), "x");
    }

    #[test]
    fn test_reader_is_reusable() {
        let reader = ConfigReader::new("x = \"1\"").with_ambient(AmbientDefinitions::new());
        assert_eq!(reader.read().unwrap(), reader.read().unwrap());
    }

    #[test]
    fn test_default_reader_config() {
        assert_eq!(ReaderConfig::default().max_section_depth, 128);
    }
}
