//! Error types for program parsing.

use thiserror::Error;

/// Errors that can occur while reading, tokenizing or building a program.
///
/// Every variant except `Io` carries the 1-indexed source position of the
/// offending character or token. The first error aborts the parse.
#[derive(Error, Debug)]
pub enum GcodeError {
    /// I/O error reading a program file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Lexer error: a character outside the accepted classes.
    #[error("lexer error at line {line}, column {col}: {message}")]
    Lex {
        /// Line number (1-indexed).
        line: usize,
        /// Column number (1-indexed).
        col: usize,
        /// Error message.
        message: String,
    },

    /// A G, M or T code (or an unknown word letter) outside the supported set.
    #[error("unknown code {code} at line {line}, column {col}")]
    UnknownCode {
        /// The code as written, e.g. `G999`.
        code: String,
        /// Line number (1-indexed).
        line: usize,
        /// Column number (1-indexed).
        col: usize,
    },

    /// A word letter followed by a missing or malformed number.
    #[error("cannot parse argument {word} at line {line}, column {col}: {message}")]
    ArgumentParse {
        /// The word as written, e.g. `X` or `F1.2.3`.
        word: String,
        /// Line number (1-indexed).
        line: usize,
        /// Column number (1-indexed).
        col: usize,
        /// Error message.
        message: String,
    },

    /// A `%` program delimiter without its partner.
    #[error("unbalanced % program delimiter at line {line}")]
    UnbalancedDelimiter {
        /// Line of the unmatched delimiter.
        line: usize,
    },
}

impl GcodeError {
    /// Create a lexer error.
    pub fn lex(line: usize, col: usize, message: impl Into<String>) -> Self {
        Self::Lex {
            line,
            col,
            message: message.into(),
        }
    }

    /// Create an unknown-code error.
    pub fn unknown_code(code: impl Into<String>, line: usize, col: usize) -> Self {
        Self::UnknownCode {
            code: code.into(),
            line,
            col,
        }
    }

    /// Create an argument parse error.
    pub fn argument(
        word: impl Into<String>,
        line: usize,
        col: usize,
        message: impl Into<String>,
    ) -> Self {
        Self::ArgumentParse {
            word: word.into(),
            line,
            col,
            message: message.into(),
        }
    }

    /// Source line the error points at, if any.
    pub fn line(&self) -> Option<usize> {
        match self {
            GcodeError::Io(_) => None,
            GcodeError::Lex { line, .. }
            | GcodeError::UnknownCode { line, .. }
            | GcodeError::ArgumentParse { line, .. }
            | GcodeError::UnbalancedDelimiter { line } => Some(*line),
        }
    }
}

/// Result type for parsing operations.
pub type Result<T> = std::result::Result<T, GcodeError>;
