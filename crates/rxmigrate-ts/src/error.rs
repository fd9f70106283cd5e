//! Parse errors for the TypeScript front end.

use rxmigrate_core::error::MigrateError;
use thiserror::Error;

/// Errors produced while lexing or parsing a source file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The lexer found bytes that start no token.
    #[error("unrecognized input at byte {offset}")]
    InvalidToken { offset: usize },

    /// The parser found a token it could not use here.
    #[error("unexpected `{found}` at byte {offset}, expected {expected}")]
    Unexpected {
        offset: usize,
        found: String,
        expected: &'static str,
    },

    /// The input ended in the middle of a construct.
    #[error("unexpected end of input at byte {offset}, expected {expected}")]
    UnexpectedEof {
        offset: usize,
        expected: &'static str,
    },

    /// A literal was opened but never closed.
    #[error("unterminated {what} starting at byte {offset}")]
    Unterminated { what: &'static str, offset: usize },
}

/// Result type for lexing and parsing.
pub type ParseResult<T> = Result<T, ParseError>;

impl ParseError {
    /// Byte offset the error points at.
    pub fn offset(&self) -> usize {
        match self {
            ParseError::InvalidToken { offset }
            | ParseError::Unexpected { offset, .. }
            | ParseError::UnexpectedEof { offset, .. }
            | ParseError::Unterminated { offset, .. } => *offset,
        }
    }
}

impl From<ParseError> for MigrateError {
    fn from(err: ParseError) -> Self {
        MigrateError::parse(err.offset(), err.to_string())
    }
}
