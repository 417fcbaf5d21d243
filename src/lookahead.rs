//! Fixed-size token lookahead for the parser
//!
//! The grammar needs up to four tokens to tell a `def` statement, an item and
//! a section apart, so the parser reads through a ring buffer of
//! [`LOOKAHEAD_SIZE`] tokens instead of backtracking.

use crate::error::LexError;
use crate::lexer::{ConfigLexer, Token};
use smallvec::SmallVec;
use std::ops::Index;

/// Number of tokens the parser can look ahead
pub const LOOKAHEAD_SIZE: usize = 4;

/// Ring buffer of pending tokens, stored inline
pub struct Lookahead<'a> {
    lexer: ConfigLexer<'a>,
    buffer: SmallVec<[Token; LOOKAHEAD_SIZE]>,
    /// Slot holding the current token
    head: usize,
    /// Number of tokens consumed so far
    consumed: usize,
}

impl<'a> Lookahead<'a> {
    /// Creates the buffer and primes it with the first tokens of the lexer
    pub fn new(mut lexer: ConfigLexer<'a>) -> Result<Self, LexError> {
        let mut buffer = SmallVec::new();
        for _ in 0..LOOKAHEAD_SIZE {
            buffer.push(lexer.next_token()?);
        }

        Ok(Self {
            lexer,
            buffer,
            head: 0,
            consumed: 0,
        })
    }

    /// Returns the token `offset` positions ahead, 0 being the current token
    #[inline(always)]
    pub fn peek(&self, offset: usize) -> &Token {
        assert!(
            offset < LOOKAHEAD_SIZE,
            "lookahead offset {offset} out of bounds"
        );
        &self.buffer[(self.head + offset) % LOOKAHEAD_SIZE]
    }

    /// Discards the `count` oldest tokens and refills the buffer from the lexer
    pub fn consume(&mut self, count: usize) -> Result<(), LexError> {
        for _ in 0..count {
            self.buffer[self.head] = self.lexer.next_token()?;
            self.head = (self.head + 1) % LOOKAHEAD_SIZE;
            self.consumed += 1;
        }
        Ok(())
    }

    /// Returns the number of tokens consumed so far
    pub fn consumed(&self) -> usize {
        self.consumed
    }
}

impl Index<usize> for Lookahead<'_> {
    type Output = Token;

    fn index(&self, offset: usize) -> &Token {
        self.peek(offset)
    }
}
