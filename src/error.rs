//! Error types and position tracking for configuration parsing
//!
//! Every public operation of the crate reports failures through [`ConfigError`].
//! The wrapped category enums tell lexical, syntactic, definition, access and
//! serde failures apart, and every error tied to a token carries its
//! [`Position`].

use std::fmt;
use thiserror::Error;

/// Number of columns a tab character advances the position by
pub const TAB_WIDTH: usize = 4;

/// Represents a position in the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    /// Line number (1-based)
    pub line: usize,
    /// Column number (1-based)
    pub column: usize,
}

impl Position {
    /// Creates a new position at the start of input
    pub fn new() -> Self {
        Self { line: 1, column: 1 }
    }

    /// Creates a position at the given line and column
    pub fn at(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    /// Returns the position that follows this one after reading `ch`
    ///
    /// A newline starts the next line, a tab advances by [`TAB_WIDTH`] columns
    /// and a carriage return leaves the position untouched.
    pub fn advanced(self, ch: char) -> Self {
        match ch {
            '\n' => Self {
                line: self.line + 1,
                column: 1,
            },
            '\r' => self,
            '\t' => Self {
                line: self.line,
                column: self.column + TAB_WIDTH,
            },
            _ => Self {
                line: self.line,
                column: self.column + 1,
            },
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Main error type for configuration operations
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Lexical analysis error
    #[error("Lexical error: {0}")]
    Lex(#[from] LexError),

    /// Grammar violation
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Definition validation or substitution error
    #[error("Definition error: {0}")]
    Definition(#[from] DefinitionError),

    /// Store access error
    #[error("Access error: {0}")]
    Access(#[from] AccessError),

    /// Serde deserialization error
    #[error("Serde error: {0}")]
    Serde(#[from] SerdeError),

    /// Unexpected fault while reading a document
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

/// Lexical analysis errors
#[derive(Debug, Error)]
pub enum LexError {
    /// End of input reached before the closing quote
    #[error("Unexpected end of input within a string starting at {position}")]
    UnterminatedString { position: Position },

    /// Raw line break inside a quoted string
    #[error("A string must not span lines at {position}, use \\n instead")]
    MultilineString { position: Position },

    /// Unsupported backslash escape
    #[error(
        "Invalid escape sequence '\\{sequence}' at {position}, supported escapes are \\n, \\r, \\t, \\', \\\" and \\\\"
    )]
    InvalidEscape { sequence: char, position: Position },

    /// Path ending with a '.'
    #[error("Invalid path '{path}' at {position}, paths must not end with a '.'")]
    DanglingPathDot { path: String, position: Position },
}

/// Grammar errors
#[derive(Debug, Error)]
pub enum ParseError {
    /// Unexpected token encountered
    #[error("Unexpected {token} at {position}, expected {expected}")]
    UnexpectedToken {
        token: String,
        position: Position,
        expected: String,
    },

    /// Malformed `def` statement
    #[error("Invalid variable definition at {position}, expected {expected}")]
    InvalidDefinition { position: Position, expected: String },

    /// Multi-value without its closing bracket
    #[error("Expected array close ']' at {position}, found {found}")]
    UnclosedArray { position: Position, found: String },

    /// Section without its closing brace
    #[error("Expected section close '}}' for section '{section}' at {position}, found {found}")]
    UnclosedSection {
        section: String,
        position: Position,
        found: String,
    },

    /// Tokens left over after the last item or section
    #[error("Expected end of input at {position} after {index} tokens, found {found}")]
    TrailingInput {
        found: String,
        position: Position,
        index: usize,
    },

    /// Sections nested deeper than the configured limit
    #[error("Maximum section depth of {max_depth} exceeded at {position}")]
    MaxDepthExceeded { max_depth: usize, position: Position },
}

/// Definition errors
#[derive(Debug, Error)]
pub enum DefinitionError {
    /// A `${name}` reference survived substitution
    #[error("Unresolved definition '{name}' in value at {position}")]
    Unresolved { name: String, position: Position },

    /// User definitions may not shadow the environment or system namespaces
    #[error(
        "User supplied definition '{key}' may not start with 'env.' or 'system.', those prefixes are reserved for environment variables and system properties"
    )]
    ReservedKey { key: String },
}

/// Store access errors
#[derive(Debug, Error)]
pub enum AccessError {
    /// Path absent, or of the wrong shape for the accessor
    #[error("The configuration value '{path}' does not exist")]
    Missing { path: String },

    /// Value does not parse as the requested number type
    #[error("The configuration value '{path}' = '{value}' is not a valid {kind}")]
    InvalidNumber {
        path: String,
        value: String,
        kind: &'static str,
    },

    /// Value is not one of the recognised boolean words
    #[error(
        "Invalid boolean value '{value}' at '{path}', use one of true/false, yes/no, on/off, enabled/disabled, active/inactive"
    )]
    InvalidBoolean { path: String, value: String },
}

/// Serde integration errors
#[derive(Debug, Error)]
pub enum SerdeError {
    /// Custom serde error message
    #[error("{0}")]
    Custom(String),

    /// Type mismatch during deserialization
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    /// A path is used both as a value and as a section
    #[error("Path '{path}' is used both as a value and as a section")]
    Conflict { path: String },
}

impl ConfigError {
    /// Wraps an unexpected fault
    pub fn internal(message: impl Into<String>) -> Self {
        ConfigError::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Wraps an unexpected fault together with its cause
    pub fn internal_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ConfigError::Internal {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Returns the source position the error refers to, if any
    pub fn position(&self) -> Option<Position> {
        match self {
            ConfigError::Lex(err) => Some(err.position()),
            ConfigError::Parse(err) => Some(err.position()),
            ConfigError::Definition(DefinitionError::Unresolved { position, .. }) => {
                Some(*position)
            }
            _ => None,
        }
    }
}

impl LexError {
    /// Returns the position of the offending input
    pub fn position(&self) -> Position {
        match self {
            LexError::UnterminatedString { position }
            | LexError::MultilineString { position }
            | LexError::InvalidEscape { position, .. }
            | LexError::DanglingPathDot { position, .. } => *position,
        }
    }
}

impl ParseError {
    /// Returns the position of the offending token
    pub fn position(&self) -> Position {
        match self {
            ParseError::UnexpectedToken { position, .. }
            | ParseError::InvalidDefinition { position, .. }
            | ParseError::UnclosedArray { position, .. }
            | ParseError::UnclosedSection { position, .. }
            | ParseError::TrailingInput { position, .. }
            | ParseError::MaxDepthExceeded { position, .. } => *position,
        }
    }
}

impl serde::de::Error for ConfigError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        ConfigError::Serde(SerdeError::Custom(msg.to_string()))
    }
}

impl serde::de::Error for SerdeError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        SerdeError::Custom(msg.to_string())
    }
}
