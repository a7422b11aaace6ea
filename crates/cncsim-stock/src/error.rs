//! Error types for the stock model.

use thiserror::Error;

/// Errors from stock construction, voxelization and carving.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StockError {
    /// Empty input or zero-sized geometry where volume is required.
    #[error("degenerate geometry: {0}")]
    GeometryDegeneracy(String),

    /// Bounds with a non-positive extent on some axis.
    #[error("invalid stock bounds: {0}")]
    InvalidBounds(String),

    /// A cutter that cannot be built.
    #[error("invalid cutter: {0}")]
    InvalidCutter(String),
}

/// Result type for stock operations.
pub type Result<T> = std::result::Result<T, StockError>;
