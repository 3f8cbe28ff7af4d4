//! Error types for dump parsing.

use thiserror::Error;

/// Errors that abort a parse pass.
///
/// Malformed records are not errors: they are skipped and reported in the
/// [`ParseReport`](crate::parser::ParseReport).
#[derive(Debug, Error)]
pub enum DumpError {
    /// Reading the line source failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A numeric column could not be read while strict number handling was
    /// enabled.
    #[error("line {line}: column {column} is not a number: {value:?}")]
    InvalidNumber {
        line: usize,
        column: usize,
        value: String,
    },
}

/// Convenience alias for results with [`DumpError`].
pub type Result<T> = std::result::Result<T, DumpError>;
