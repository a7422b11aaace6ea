//! Error types for simulation.

use thiserror::Error;

/// Errors raised while simulating a program.
///
/// A failing command leaves the machine state and tool path exactly as the
/// previous command left them.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    /// A spindle speed or tool number suffix that does not parse.
    #[error("cannot parse argument {word} at line {line}, column {col}: {message}")]
    ArgumentParse {
        /// The word as written, e.g. `T1.5`.
        word: String,
        /// Line number (1-indexed).
        line: usize,
        /// Column number (1-indexed).
        col: usize,
        /// Error message.
        message: String,
    },

    /// Zero radius, coincident points, or a step size that never converged.
    #[error("degenerate geometry: {0}")]
    GeometryDegeneracy(String),

    /// A move with nonzero length and no usable feed rate.
    #[error("zero feed rate for move at line {line}")]
    ZeroFeedRate {
        /// Line of the move.
        line: usize,
    },

    /// Rejected simulation settings.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SimError {
    /// Create an argument parse error for a command token.
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

    /// Create a geometry degeneracy error.
    pub fn degenerate(message: impl Into<String>) -> Self {
        Self::GeometryDegeneracy(message.into())
    }
}

/// Result type for simulation operations.
pub type Result<T> = std::result::Result<T, SimError>;
