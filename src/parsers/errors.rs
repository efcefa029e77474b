//! Parse error types
//!
//! A failed condition parse means "no usable selectivity info" for that
//! query; callers fall back to a conservative estimate rather than
//! aborting the batch.

use thiserror::Error;

/// Result type for parser operations
pub type ParseResult<T> = Result<T, ParseError>;

/// Error raised by the condition parsers
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    /// The scanner hit a token sequence the grammar does not cover
    #[error("parse error at byte {position} while parsing '{input}'")]
    BadParse {
        /// Byte offset where scanning stopped
        position: usize,
        /// The full input string, for diagnosis
        input: String,
    },
}

impl ParseError {
    /// Build a `BadParse` from the scanner's current position
    pub fn bad_parse(position: usize, input: &str) -> Self {
        ParseError::BadParse {
            position,
            input: input.to_string(),
        }
    }
}
