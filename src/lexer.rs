//! Configuration lexical analyzer
//!
//! This module turns configuration text into a stream of tokens. It is built
//! from two layers: [`CharStream`] decodes characters and tracks their
//! positions, and [`ConfigLexer`] groups them into [`Token`]s while keeping a
//! single character of lookahead.

use crate::error::{LexError, Position};
use std::fmt;
use std::str::Chars;

/// A decoded input character paired with its position
///
/// `ch` is `None` once the input is exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Character {
    pub ch: Option<char>,
    pub position: Position,
}

impl Character {
    /// Returns true at end of input
    #[inline(always)]
    pub fn is_eof(&self) -> bool {
        self.ch.is_none()
    }

    /// Returns true if this is the given character
    #[inline(always)]
    pub fn is(&self, expected: char) -> bool {
        self.ch == Some(expected)
    }

    /// Returns true if this is any of the given characters
    #[inline(always)]
    pub fn is_any_of(&self, expected: &[char]) -> bool {
        self.ch.is_some_and(|ch| expected.contains(&ch))
    }
}

impl fmt::Display for Character {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ch {
            None => write!(f, "<eof> at {}", self.position),
            Some('\n') => write!(f, "<lf> at {}", self.position),
            Some('\r') => write!(f, "<cr> at {}", self.position),
            Some('\t') => write!(f, "<tab> at {}", self.position),
            Some(ch) => write!(f, "{} at {}", ch, self.position),
        }
    }
}

/// Character source with position tracking
pub struct CharStream<'a> {
    chars: Chars<'a>,
    position: Position,
}

impl<'a> CharStream<'a> {
    /// Creates a stream positioned at the start of `input`
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars(),
            position: Position::new(),
        }
    }

    /// Reads the next character; yields end-of-input characters forever once
    /// the text is exhausted
    pub fn read_next(&mut self) -> Character {
        let ch = self.chars.next();
        let character = Character {
            ch,
            position: self.position,
        };
        if let Some(ch) = ch {
            self.position = self.position.advanced(ch);
        }
        character
    }
}

/// Token types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Eof,        // end of input
    Identifier, // abc
    Path,       // abc.def.ghi
    String,     // "..." or '...'
    Any,        // anything the lexer does not recognise
    Equals,     // '='
    LBrace,     // '{'
    RBrace,     // '}'
    LBrack,     // '['
    RBrack,     // ']'
    Comma,      // ','
}

impl TokenKind {
    /// Returns a description of the token type for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            TokenKind::Eof => "end of input",
            TokenKind::Identifier => "identifier",
            TokenKind::Path => "path",
            TokenKind::String => "string",
            TokenKind::Any => "text",
            TokenKind::Equals => "'='",
            TokenKind::LBrace => "'{'",
            TokenKind::RBrace => "'}'",
            TokenKind::LBrack => "'['",
            TokenKind::RBrack => "']'",
            TokenKind::Comma => "','",
        }
    }
}

/// A lexed token
///
/// `text` holds the identifier, the path, the decoded string content or the
/// raw characters of the token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub position: Position,
}

impl Token {
    /// Creates a token
    pub fn new(kind: TokenKind, text: impl Into<String>, position: Position) -> Self {
        Self {
            kind,
            text: text.into(),
            position,
        }
    }

    /// Creates an end-of-input token
    pub fn eof(position: Position) -> Self {
        Self::new(TokenKind::Eof, "", position)
    }

    /// Returns true if the token is of the given kind
    #[inline(always)]
    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }

    /// Returns true for identifiers and paths, the tokens that can name an
    /// item or a section
    #[inline(always)]
    pub fn is_name(&self) -> bool {
        matches!(self.kind, TokenKind::Identifier | TokenKind::Path)
    }

    /// Describes the token for error messages
    pub fn describe(&self) -> String {
        match self.kind {
            TokenKind::Eof => TokenKind::Eof.type_name().to_string(),
            TokenKind::String => format!("string \"{}\"", self.text),
            kind => format!("{} '{}'", kind.type_name(), self.text),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\" ({:?}) at {}", self.text, self.kind, self.position)
    }
}

#[inline(always)]
fn is_whitespace_char(ch: char) -> bool {
    matches!(ch, ' ' | '\n' | '\r' | '\t')
}

#[inline(always)]
fn is_identifier_start_char(ch: char) -> bool {
    ch.is_ascii_alphabetic()
}

#[inline(always)]
fn is_identifier_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

/// Configuration lexer
///
/// Produces tokens lazily; once the input is exhausted every call to
/// [`ConfigLexer::next_token`] returns an `Eof` token.
pub struct ConfigLexer<'a> {
    stream: CharStream<'a>,
    /// Current, not yet consumed character
    lookahead: Character,
    /// Number of tokens produced so far
    token_count: usize,
}

impl<'a> ConfigLexer<'a> {
    /// Creates a new lexer over `input`
    pub fn new(input: &'a str) -> Self {
        let mut stream = CharStream::new(input);
        let lookahead = stream.read_next();
        Self {
            stream,
            lookahead,
            token_count: 0,
        }
    }

    /// Returns the position of the current character
    #[inline(always)]
    pub fn current_position(&self) -> Position {
        self.lookahead.position
    }

    /// Returns the number of tokens produced so far
    pub fn token_count(&self) -> usize {
        self.token_count
    }

    /// Advances to the next character and returns the consumed one
    #[inline(always)]
    fn advance(&mut self) -> Character {
        let consumed = self.lookahead;
        self.lookahead = self.stream.read_next();
        consumed
    }

    /// Returns the next token
    pub fn next_token(&mut self) -> Result<Token, LexError> {
        let token = self.lex_token()?;
        self.token_count += 1;
        Ok(token)
    }

    fn lex_token(&mut self) -> Result<Token, LexError> {
        loop {
            let Some(ch) = self.lookahead.ch else {
                return Ok(Token::eof(self.lookahead.position));
            };

            match ch {
                '{' => return Ok(self.single_char_token(TokenKind::LBrace)),
                '}' => return Ok(self.single_char_token(TokenKind::RBrace)),
                '[' => return Ok(self.single_char_token(TokenKind::LBrack)),
                ']' => return Ok(self.single_char_token(TokenKind::RBrack)),
                '=' => return Ok(self.single_char_token(TokenKind::Equals)),
                ',' => return Ok(self.single_char_token(TokenKind::Comma)),
                '"' | '\'' => return self.lex_string(ch),
                '#' => self.skip_comment(),
                c if is_whitespace_char(c) => self.skip_whitespace(),
                c if is_identifier_start_char(c) => return self.lex_identifier_or_path(),
                // Let the parser report the error with the offending text
                _ => return Ok(self.lex_any()),
            }
        }
    }

    fn single_char_token(&mut self, kind: TokenKind) -> Token {
        let consumed = self.advance();
        let text = consumed.ch.map(String::from).unwrap_or_default();
        Token::new(kind, text, consumed.position)
    }

    fn skip_whitespace(&mut self) {
        while self.lookahead.ch.is_some_and(is_whitespace_char) {
            self.advance();
        }
    }

    /// Skips a `#` comment up to, not including, the end of the line
    fn skip_comment(&mut self) {
        self.advance();
        while !self.lookahead.is_eof() && !self.lookahead.is_any_of(&['\n', '\r']) {
            self.advance();
        }
    }

    /// Lexes a quoted string, decoding escapes
    fn lex_string(&mut self, quote: char) -> Result<Token, LexError> {
        let start_pos = self.current_position();
        let mut value = String::new();

        // Skip opening quote
        self.advance();

        loop {
            match self.lookahead.ch {
                None => {
                    return Err(LexError::UnterminatedString {
                        position: start_pos,
                    });
                }
                Some(ch) if ch == quote => break,
                Some('\n') | Some('\r') => {
                    return Err(LexError::MultilineString {
                        position: self.current_position(),
                    });
                }
                Some('\\') => {
                    let escaped = self.lex_escape(start_pos)?;
                    value.push(escaped);
                }
                Some(ch) => {
                    value.push(ch);
                    self.advance();
                }
            }
        }

        // Skip closing quote
        self.advance();

        Ok(Token::new(TokenKind::String, value, start_pos))
    }

    /// Decodes the escape sequence starting at the current backslash
    fn lex_escape(&mut self, string_start: Position) -> Result<char, LexError> {
        let backslash = self.advance();
        let escaped = self.advance();

        match escaped.ch {
            Some('n') => Ok('\n'),
            Some('r') => Ok('\r'),
            Some('t') => Ok('\t'),
            Some('\'') => Ok('\''),
            Some('"') => Ok('"'),
            Some('\\') => Ok('\\'),
            Some('\n') | Some('\r') => Err(LexError::MultilineString {
                position: escaped.position,
            }),
            Some(other) => Err(LexError::InvalidEscape {
                sequence: other,
                position: backslash.position,
            }),
            None => Err(LexError::UnterminatedString {
                position: string_start,
            }),
        }
    }

    /// Lexes an identifier and, when followed by `.identifier`, extends it
    /// into a path
    fn lex_identifier_or_path(&mut self) -> Result<Token, LexError> {
        let start_pos = self.current_position();
        let mut text = self.lex_identifier();

        if !self.lookahead.is('.') {
            return Ok(Token::new(TokenKind::Identifier, text, start_pos));
        }

        while self.lookahead.is('.') {
            text.push('.');
            self.advance();

            match self.lookahead.ch {
                Some(ch) if is_identifier_start_char(ch) => {
                    let segment = self.lex_identifier();
                    text.push_str(&segment);
                }
                _ => {
                    return Err(LexError::DanglingPathDot {
                        path: text,
                        position: start_pos,
                    });
                }
            }
        }

        Ok(Token::new(TokenKind::Path, text, start_pos))
    }

    fn lex_identifier(&mut self) -> String {
        let mut text = String::new();
        while let Some(ch) = self.lookahead.ch {
            if !is_identifier_char(ch) {
                break;
            }
            text.push(ch);
            self.advance();
        }
        text
    }

    /// Lexes a run of non-whitespace characters
    fn lex_any(&mut self) -> Token {
        let start_pos = self.current_position();
        let mut text = String::new();
        while let Some(ch) = self.lookahead.ch {
            if is_whitespace_char(ch) {
                break;
            }
            text.push(ch);
            self.advance();
        }
        Token::new(TokenKind::Any, text, start_pos)
    }
}

impl Iterator for ConfigLexer<'_> {
    type Item = Result<Token, LexError>;

    /// Yields tokens up to, not including, the end of input
    fn next(&mut self) -> Option<Self::Item> {
        match self.next_token() {
            Ok(token) if token.is(TokenKind::Eof) => None,
            other => Some(other),
        }
    }
}
